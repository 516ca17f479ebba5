//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the simulator. It provides:
//! 1. **Cycle and instruction counts:** Totals plus derived IPC.
//! 2. **Stall attribution:** Per-core stall time broken down by cause, so a
//!    slow program can be traced to instruction supply, operand supply, or
//!    network back-pressure.
//! 3. **Network traffic:** Flits and credits carried by the tile networks.
//! 4. **Instruction store behaviour:** Tag checks and hit rates.

use std::fmt::Write as _;

use crate::common::{ComponentId, CycleCount};

/// Reasons a core's pipeline can fail to make progress in a cycle.
///
/// Every blocking point in the pipeline names one of these, so stall time is
/// attributable to a cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallReason {
    /// No instruction available to decode.
    Instructions,
    /// Waiting for data to arrive from a memory bank.
    MemoryData,
    /// Waiting for data to arrive from another core.
    CoreData,
    /// Waiting for a forwarded result that has not been computed yet.
    Forwarding,
    /// Waiting for a fetch request to become sendable.
    Fetch,
    /// Waiting for credits or for space in the output buffer.
    Output,
    /// Nothing to do at all.
    Idle,
}

impl StallReason {
    /// All reasons, in reporting order.
    pub const ALL: [Self; 7] = [
        Self::Instructions,
        Self::MemoryData,
        Self::CoreData,
        Self::Forwarding,
        Self::Fetch,
        Self::Output,
        Self::Idle,
    ];

    /// Human-readable name used in the summary and the stall log.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instructions => "instructions",
            Self::MemoryData => "memory data",
            Self::CoreData => "core data",
            Self::Forwarding => "forwarding",
            Self::Fetch => "fetch",
            Self::Output => "output",
            Self::Idle => "idle",
        }
    }
}

/// One entry of the detailed stall log: which core stalled, why, and for
/// how long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StallRecord {
    /// Cycle the stall began.
    pub start: CycleCount,
    /// The stalled core.
    pub core: ComponentId,
    /// Why it stalled.
    pub reason: StallReason,
    /// Length of the stall in cycles.
    pub duration: CycleCount,
}

/// Per-core stall state: the active reason (if any) and the accumulated
/// time per reason.
#[derive(Clone, Debug, Default)]
struct CoreStalls {
    current: Option<(StallReason, CycleCount)>,
    time_spent: [CycleCount; StallReason::ALL.len()],
}

/// Chip-wide statistics.
///
/// One instance is owned by the chip and threaded by reference into every
/// component that records events. Counters are write-monotonic during
/// execution.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Total cycles simulated.
    pub cycles: CycleCount,
    /// Instructions that completed writeback, chip-wide.
    pub instructions_executed: u64,
    /// Operations that were squashed by a false predicate.
    pub instructions_squashed: u64,
    /// Data flits delivered by tile crossbars.
    pub flits_delivered: u64,
    /// Credit flits delivered.
    pub credits_delivered: u64,
    /// Tag checks against the instruction stores.
    pub tag_checks: u64,
    /// Tag checks that hit in the cache or FIFO.
    pub tag_hits: u64,
    /// Fetch requests sent to memory banks.
    pub fetches_sent: u64,
    /// Arbitration decisions made by the crossbar arbiters.
    pub arbitrations: u64,

    stalls: Vec<(ComponentId, CoreStalls)>,
    /// Completed stall intervals, recorded when a detailed log is requested.
    pub stall_log: Vec<StallRecord>,
    log_stalls: bool,
}

impl Stats {
    /// Creates an empty statistics object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns on the detailed per-stall log backing `-stalltrace`.
    pub const fn enable_stall_log(&mut self) {
        self.log_stalls = true;
    }

    /// Marks `core` stalled for `reason` from the current cycle.
    ///
    /// A repeated stall with the same reason is a no-op; a different reason
    /// ends the previous interval first.
    pub fn stall(&mut self, core: ComponentId, reason: StallReason) {
        let cycle = self.cycles;
        let log = self.log_stalls;
        let mut finished = None;
        let entry = self.core_stalls(core);
        match entry.current {
            Some((active, _)) if active == reason => {}
            Some((active, since)) => {
                entry.time_spent[active as usize] += cycle.saturating_sub(since);
                if log {
                    finished = Some((since, active, cycle.saturating_sub(since)));
                }
                entry.current = Some((reason, cycle));
            }
            None => entry.current = Some((reason, cycle)),
        }
        if let Some((start, reason, duration)) = finished {
            self.stall_log.push(StallRecord { start, core, reason, duration });
        }
    }

    /// Marks `core` no longer stalled.
    pub fn unstall(&mut self, core: ComponentId) {
        let cycle = self.cycles;
        let log = self.log_stalls;
        let entry = self.core_stalls(core);
        if let Some((reason, since)) = entry.current.take() {
            let duration = cycle.saturating_sub(since);
            entry.time_spent[reason as usize] += duration;
            if log && duration > 0 {
                self.stall_log.push(StallRecord { start: since, core, reason, duration });
            }
        }
    }

    /// Total time `core` has spent stalled for `reason`, excluding any
    /// still-open interval.
    pub fn stall_time(&self, core: ComponentId, reason: StallReason) -> CycleCount {
        self.stalls
            .iter()
            .find(|(id, _)| *id == core)
            .map_or(0, |(_, s)| s.time_spent[reason as usize])
    }

    /// Renders the one-line-per-metric summary printed by `-summary`.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "cycles: {}", self.cycles);
        let _ = writeln!(out, "instructions executed: {}", self.instructions_executed);
        let _ = writeln!(out, "instructions squashed: {}", self.instructions_squashed);
        if self.cycles > 0 {
            let ipc = self.instructions_executed as f64 / self.cycles as f64;
            let _ = writeln!(out, "chip IPC: {ipc:.3}");
        }
        let _ = writeln!(out, "data flits delivered: {}", self.flits_delivered);
        let _ = writeln!(out, "credits delivered: {}", self.credits_delivered);
        if self.tag_checks > 0 {
            let _ = writeln!(
                out,
                "instruction tag checks: {} ({} hits, {:.1}%)",
                self.tag_checks,
                self.tag_hits,
                100.0 * self.tag_hits as f64 / self.tag_checks as f64
            );
        }
        let _ = writeln!(out, "fetch requests sent: {}", self.fetches_sent);

        for (core, stalls) in &self.stalls {
            let total: CycleCount = stalls.time_spent.iter().sum();
            if total == 0 {
                continue;
            }
            let _ = write!(out, "core {core} stalled {total} cycles:");
            for reason in StallReason::ALL {
                let t = stalls.time_spent[reason as usize];
                if t > 0 {
                    let _ = write!(out, " {}={t}", reason.name());
                }
            }
            let _ = writeln!(out);
        }
        out
    }

    fn core_stalls(&mut self, core: ComponentId) -> &mut CoreStalls {
        if let Some(pos) = self.stalls.iter().position(|(id, _)| *id == core) {
            &mut self.stalls[pos].1
        } else {
            self.stalls.push((core, CoreStalls::default()));
            let last = self.stalls.len() - 1;
            &mut self.stalls[last].1
        }
    }
}
