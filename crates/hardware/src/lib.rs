//! Cycle-accurate simulator for the Loki tiled many-core architecture.
//!
//! This crate models the chip at cycle granularity so architects can
//! measure program behaviour under varied microarchitectural parameters.
//! It implements:
//! 1. **Cores:** A four-stage in-order pipeline (Fetch, Decode, Execute,
//!    Writeback) with an instruction-packet cache and FIFO, a register
//!    file with channel-mapped input ports, a channel map table with
//!    credit-based flow control, a scratchpad, and control registers.
//! 2. **ISA:** The full instruction set — encoding, decoding, per-opcode
//!    behaviour descriptors, and the assembly text form.
//! 3. **Network:** Tile-local packet-switched crossbars with round-robin
//!    wormhole arbitration, multicast, and a credit return network; the
//!    inter-tile mesh is abstracted to hop counts.
//! 4. **Memory:** Request/response memory banks over a flat background
//!    image.
//! 5. **Simulation:** `Simulator` (chip + clock), ELF and loader-script
//!    loading, configuration, statistics, and stall attribution.

/// Common value types, errors, and constants.
pub mod common;
/// Simulator configuration and named parameter overrides.
pub mod config;
/// The per-core pipeline and its structures.
pub mod core;
/// The instruction set.
pub mod isa;
/// The background memory image.
pub mod memory;
/// The tile-local network fabric.
pub mod network;
/// Simulation top level and loading.
pub mod sim;
/// Statistics and stall attribution.
pub mod stats;
/// Tiles, memory banks, and the chip grid.
pub mod tile;

/// Root configuration type; start from `Config::default()` and apply
/// `-P` overrides.
pub use crate::config::Config;
/// A single core, for direct-driving in tests and tools.
pub use crate::core::Core;
/// Top-level simulator; owns the chip and the clock.
pub use crate::sim::Simulator;
/// The modelled chip.
pub use crate::tile::chip::Chip;
