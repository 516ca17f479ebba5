//! The register file, with channel-end aliasing.
//!
//! Registers are plain 32-bit slots with three special ranges:
//! 1. **r0** reads as zero; writes are dropped silently.
//! 2. **r1** holds the memory address of the currently executing
//!    instruction packet; it is maintained by the fetch/decode path and
//!    software writes are dropped with a warning.
//! 3. **A contiguous high range** is aliased one-to-one onto the core's
//!    input channel ends. The register file itself only classifies those
//!    indices — the decode stage performs the (destructive, blocking) FIFO
//!    read.

use crate::common::constants::{REG_CURRENT_IPK, REG_ZERO};
use crate::common::{ChannelIndex, MemoryAddr, RegisterIndex, Warnings, Word};
use crate::config::CoreConfig;

/// A core's register file.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    regs: Vec<Word>,
    first_channel: RegisterIndex,
    num_channels: usize,
}

impl RegisterFile {
    /// Creates a register file sized by the core configuration, all zeros.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            regs: vec![0; config.registers],
            first_channel: config.first_channel_register as RegisterIndex,
            num_channels: config.input_channels,
        }
    }

    /// Reads a register. Channel-end indices must be resolved by the caller
    /// before getting here; this only serves physical slots.
    pub fn read(&self, reg: RegisterIndex) -> Word {
        if reg == REG_ZERO {
            return 0;
        }
        self.regs.get(reg as usize).copied().unwrap_or_else(|| {
            tracing::warn!(target: "loki::core", reg, "read of nonexistent register");
            0
        })
    }

    /// Writes a register from the pipeline.
    ///
    /// Writes to r0 are dropped silently; writes to r1 are dropped with a
    /// warning. Per the architecture, software changes the current-packet
    /// pointer only by fetching.
    pub fn write(&mut self, reg: RegisterIndex, value: Word, warnings: &Warnings) {
        if reg == REG_ZERO {
            return;
        }
        if reg == REG_CURRENT_IPK {
            warnings.reserved_register(reg);
            return;
        }
        if let Some(slot) = self.regs.get_mut(reg as usize) {
            tracing::trace!(target: "loki::core", reg, value = format_args!("{value:#x}"), "register write");
            *slot = value;
        } else {
            tracing::warn!(target: "loki::core", reg, "write to nonexistent register dropped");
        }
    }

    /// Updates r1 when a new packet begins. Internal to the core; not a
    /// software write.
    pub fn update_current_packet(&mut self, addr: MemoryAddr) {
        if let Some(slot) = self.regs.get_mut(REG_CURRENT_IPK as usize) {
            *slot = addr;
        }
    }

    /// Whether `reg` is aliased to an input channel end.
    pub fn is_channel_end(&self, reg: RegisterIndex) -> bool {
        let reg = reg as usize;
        let first = self.first_channel as usize;
        reg >= first && reg < first + self.num_channels
    }

    /// Maps a channel-end register index to its channel number.
    pub fn to_channel(&self, reg: RegisterIndex) -> ChannelIndex {
        debug_assert!(self.is_channel_end(reg));
        reg - self.first_channel
    }

    /// Maps a channel number back to its aliased register index.
    pub fn from_channel(&self, channel: ChannelIndex) -> RegisterIndex {
        self.first_channel + channel
    }

    /// Debug read without channel-end redirection, for traces and tests.
    pub fn read_debug(&self, reg: RegisterIndex) -> Word {
        self.read(reg)
    }
}
