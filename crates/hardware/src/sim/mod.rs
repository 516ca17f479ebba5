//! Simulation top level: the clock loop and program loading.

/// ELF, loader-script, assembly, and data-file loading.
pub mod loader;
/// The top-level simulator.
pub mod simulator;

pub use simulator::Simulator;
