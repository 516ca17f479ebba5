//! The tile-local network fabric.
//!
//! This module implements the packet-switched plumbing between the
//! components of one tile:
//! 1. **Arbiters:** Clocked round-robin arbiters with wormhole holding.
//! 2. **Crossbar:** The full data crossbar with multicast accounting and
//!    per-link bandwidth caps.
//! 3. **Credit network:** The narrow return path for flow-control credits.

/// Clocked output arbiters.
pub mod arbiter;
/// Per-link bandwidth accounting.
pub mod bandwidth;
/// The data crossbar.
pub mod crossbar;
/// The credit return network.
pub mod credit;

pub use arbiter::{ArbiterState, ClockedArbiter};
pub use bandwidth::BandwidthMonitor;
pub use crossbar::Crossbar;
pub use credit::CreditNetwork;
