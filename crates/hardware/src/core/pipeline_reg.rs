//! Single-slot pipeline registers between adjacent stages.
//!
//! A stage writes its finished instruction downstream only when the slot is
//! empty; a full slot is the back-pressure signal. A register carries at
//! most one instruction, and instructions are mutated only while held here.

use crate::isa::DecodedOp;

/// The register between two adjacent pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct PipelineRegister {
    slot: Option<DecodedOp>,
}

impl PipelineRegister {
    /// Creates an empty register.
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Whether the upstream stage may write this cycle.
    pub const fn can_write(&self) -> bool {
        self.slot.is_none()
    }

    /// Whether an instruction is waiting for the downstream stage.
    pub const fn has_data(&self) -> bool {
        self.slot.is_some()
    }

    /// Hands an instruction downstream. The caller must have checked
    /// [`Self::can_write`]; a double write is a pipeline bug.
    pub fn write(&mut self, op: DecodedOp) {
        debug_assert!(self.slot.is_none(), "pipeline register overwritten");
        self.slot = Some(op);
    }

    /// Takes the waiting instruction, freeing the slot.
    pub const fn take(&mut self) -> Option<DecodedOp> {
        self.slot.take()
    }

    /// Peeks at the waiting instruction without consuming it.
    pub const fn peek(&self) -> Option<&DecodedOp> {
        self.slot.as_ref()
    }

    /// Discards any waiting instruction (packet abort). Returns whether
    /// anything was dropped.
    pub const fn discard(&mut self) -> bool {
        self.slot.take().is_some()
    }
}
