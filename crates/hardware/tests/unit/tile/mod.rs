/// Traffic crossing tile boundaries.
pub mod cross_tile;
/// Load/store traffic between cores and memory banks.
pub mod load_store;
/// Multicast delivery and credit accounting.
pub mod multicast;
/// Remote execution and remote packet control.
pub mod remote;
/// Wormhole serialisation of competing packets.
pub mod wormhole;
