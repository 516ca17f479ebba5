//! The writeback stage.
//!
//! Commits results to the register file. Indirect writes (`iwtr`) arrive
//! with their destination already resolved by Decode and their forwarding
//! suppressed, so the commit itself is uniform. Network-sending operations
//! handed their flit to the output path in Execute; here they simply
//! retire.

use crate::core::Core;
use crate::stats::Stats;

/// One cycle of the writeback stage.
pub fn writeback_stage(core: &mut Core, _stats: &mut Stats) {
    let Some(op) = core.execute_to_write.take() else {
        return;
    };

    if op.has_dest {
        let warnings = core.warnings.clone();
        core.regs.write(op.destination, op.result, &warnings);
    }

    tracing::trace!(target: "loki::write", core = %core.id,
        pc = format_args!("{:#010x}", op.location), "retired");
}
