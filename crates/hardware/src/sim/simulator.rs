//! The top-level simulator: the chip plus the clock loop.

use crate::common::{SimError, Warnings};
use crate::config::Config;
use crate::stats::Stats;
use crate::tile::chip::{Chip, StopReason};

/// Owns the chip and drives the global clock.
pub struct Simulator {
    /// The modelled chip.
    pub chip: Chip,
}

impl Simulator {
    /// Creates a simulator for the configured chip.
    pub fn new(config: &Config, warnings: Warnings) -> Self {
        Self { chip: Chip::new(config, warnings) }
    }

    /// Advances one clock cycle.
    ///
    /// # Errors
    ///
    /// Propagates fatal faults.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.chip.tick()
    }

    /// Runs until the chip stops or `max_cycles` elapse.
    ///
    /// # Errors
    ///
    /// Propagates fatal faults.
    pub fn run(&mut self, max_cycles: u64) -> Result<StopReason, SimError> {
        for _ in 0..max_cycles {
            self.chip.tick()?;
            if let Some(reason) = self.chip.stopped() {
                return Ok(reason);
            }
        }
        Ok(StopReason::IdleTimeout)
    }

    /// The program's exit code: zero on a clean stop, otherwise the value
    /// passed to `syscall exit`.
    pub fn exit_code(&self) -> u32 {
        match self.chip.stopped() {
            Some(StopReason::Exit(code)) => code,
            _ => 0,
        }
    }

    /// Borrows the collected statistics.
    pub fn stats(&self) -> &Stats {
        &self.chip.stats
    }
}
