/// Loader directives driving a real chip.
pub mod loading;
/// The named-parameter override surface.
pub mod parameters;
/// Idle-timeout termination and stall attribution.
pub mod termination;
