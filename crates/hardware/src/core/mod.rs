//! A single Loki core: the four-stage pipeline and its local structures.
//!
//! This module wires together the per-core state. It implements:
//! 1. **Structures:** Register file, predicate register, scratchpad,
//!    control registers, channel map table, and the input channel ends.
//! 2. **Pipeline:** Fetch, Decode, Execute, and Writeback stages separated
//!    by single-slot pipeline registers, ticked in reverse order so state
//!    observed by a stage reflects the end of the previous cycle.
//! 3. **Network ports:** One data output (Execute's flits), one
//!    fetch-request output, and the input steering that feeds arriving
//!    flits to the instruction stores or the channel ends.

/// The channel map table.
pub mod channel_map;
/// Input channel-end FIFOs.
pub mod channel_ends;
/// Control registers.
pub mod cregs;
/// The decode stage.
pub mod decode;
/// The execute stage.
pub mod execute;
/// The fetch stage and instruction stores.
pub mod fetch;
/// Inter-stage pipeline registers.
pub mod pipeline_reg;
/// The predicate register.
pub mod predicate;
/// The register file.
pub mod registers;
/// The scratchpad.
pub mod scratchpad;
/// The writeback stage.
pub mod write;

use self::channel_ends::ChannelEndTable;
use self::channel_map::ChannelMapTable;
use self::cregs::ControlRegisters;
use self::decode::DecodeState;
use self::execute::syscall::SyscallState;
use self::execute::ExecuteState;
use self::fetch::FetchStage;
use self::pipeline_reg::PipelineRegister;
use self::predicate::PredicateRegister;
use self::registers::RegisterFile;
use self::scratchpad::Scratchpad;
use crate::common::constants::{CACHE_CHANNEL, FIFO_CHANNEL};
use crate::common::{ChannelIndex, ComponentId, Flit, SimError, Warnings};
use crate::config::Config;
use crate::isa::Instruction;
use crate::memory::MainMemory;
use crate::stats::Stats;

/// Number of network input channels that feed the instruction stores
/// rather than the data channel ends.
pub const INSTRUCTION_CHANNELS: u8 = 2;

/// One processing core.
pub struct Core {
    /// This core's identity within the chip.
    pub id: ComponentId,
    /// General-purpose registers.
    pub regs: RegisterFile,
    /// The predicate bit.
    pub predicate: PredicateRegister,
    /// Core-local scratchpad.
    pub scratchpad: Scratchpad,
    /// Control registers.
    pub cregs: ControlRegisters,
    /// The channel map table.
    pub cmt: ChannelMapTable,
    /// Input channel-end FIFOs (data channels).
    pub channel_ends: ChannelEndTable,
    /// The fetch stage with both instruction stores.
    pub fetch: FetchStage,
    /// Decode-stage state.
    pub decode: DecodeState,
    /// Execute-stage state (multiplier, forwarding).
    pub exec: ExecuteState,
    /// Host-side system call state.
    pub syscalls: SyscallState,

    /// Fetch to Decode pipeline register.
    pub fetch_to_decode: PipelineRegister,
    /// Decode to Execute pipeline register.
    pub decode_to_execute: PipelineRegister,
    /// Execute to Writeback pipeline register.
    pub execute_to_write: PipelineRegister,

    /// Outgoing data flit, drained by the tile's data crossbar.
    pub data_out: Option<Flit>,
    /// Outgoing fetch-request flit, drained by the tile's data crossbar.
    pub fetch_out: Option<Flit>,

    /// Soft-fault reporting configuration.
    pub warnings: Warnings,
    /// Print each executed instruction with its context.
    pub trace: bool,
    /// Exit code requested by a `syscall exit` on this core.
    pub exit_code: Option<u32>,

    cores_per_tile: u8,
}

impl Core {
    /// Builds a core from the chip configuration.
    pub fn new(id: ComponentId, config: &Config, warnings: Warnings) -> Self {
        let core_cfg = &config.core;
        Self {
            id,
            regs: RegisterFile::new(core_cfg),
            predicate: PredicateRegister::default(),
            scratchpad: Scratchpad::new(core_cfg.scratchpad_size),
            cregs: ControlRegisters::new(core_cfg.control_registers, id),
            cmt: ChannelMapTable::new(core_cfg.channel_map_size, core_cfg.max_credits),
            channel_ends: ChannelEndTable::new(core_cfg.input_channels, core_cfg.channel_end_depth),
            fetch: FetchStage::new(id, &core_cfg.stores, &config.tile),
            decode: DecodeState::default(),
            exec: ExecuteState::default(),
            syscalls: SyscallState::default(),
            fetch_to_decode: PipelineRegister::new(),
            decode_to_execute: PipelineRegister::new(),
            execute_to_write: PipelineRegister::new(),
            data_out: None,
            fetch_out: None,
            warnings,
            trace: false,
            exit_code: None,
            cores_per_tile: config.tile.cores as u8,
        }
    }

    /// Advances the core by one clock cycle. Stages run in reverse order so
    /// every stage observes the state left by the previous cycle, and an
    /// instruction advances at most one stage per cycle.
    ///
    /// # Errors
    ///
    /// Fatal conditions (unknown opcodes in a running binary, bad system
    /// calls) abort the simulation.
    pub fn tick(&mut self, mem: &mut MainMemory, stats: &mut Stats) -> Result<(), SimError> {
        write::writeback_stage(self, stats);
        execute::execute_stage(self, mem, stats)?;
        decode::decode_stage(self, stats)?;

        // The decode stage's stall reason takes priority: only report the
        // fetch-side cause when the rest of the pipeline is drained.
        let pipeline_busy = !self.decode.idle()
            || self.fetch_to_decode.has_data()
            || self.decode_to_execute.has_data()
            || self.execute_to_write.has_data();
        if let Some(reason) = self.fetch.tick_read(&mut self.fetch_to_decode, stats) {
            if !pipeline_busy && !self.is_idle() {
                stats.stall(self.id, reason);
            }
        }
        self.fetch.tick_write(&mut self.fetch_out, stats);
        Ok(())
    }

    /// Delivers an incoming flit: channels 0 and 1 feed the instruction
    /// stores, the rest feed the data channel ends.
    pub fn deliver(&mut self, flit: &Flit) {
        match flit.destination.channel() {
            FIFO_CHANNEL | CACHE_CHANNEL => {
                let flush = self.fetch.deliver_instruction(flit, &self.warnings);
                if flush {
                    self.flush_pipeline();
                }
            }
            channel => {
                self.channel_ends.write(channel - INSTRUCTION_CHANNELS, *flit);
            }
        }
    }

    /// Whether the named input channel can accept a flit this cycle.
    pub fn input_ready(&self, channel: ChannelIndex) -> bool {
        match channel {
            FIFO_CHANNEL => !self.fetch.fifo.is_full(),
            CACHE_CHANNEL => !self.fetch.cache.is_full(),
            _ => self.channel_ends.can_write(channel - INSTRUCTION_CHANNELS),
        }
    }

    /// Discards every in-flight instruction of the current packet
    /// (`nxipk`).
    pub fn flush_pipeline(&mut self) {
        let _ = self.fetch_to_decode.discard();
        let _ = self.decode_to_execute.discard();
        let _ = self.execute_to_write.discard();
        self.decode.cancel();
        self.exec.cancel();
    }

    /// Preloads a packet into this core's IPK cache (no network round
    /// trip).
    pub fn store_code(&mut self, code: &[Instruction], base: u32) {
        let warnings = self.warnings.clone();
        self.fetch.store_code(code, base, &warnings);
    }

    /// Whether the core has no work at all: nothing fetched, decoded, in
    /// flight, or waiting to leave.
    pub fn is_idle(&self) -> bool {
        self.fetch.idle()
            && !self.fetch_to_decode.has_data()
            && !self.decode_to_execute.has_data()
            && !self.execute_to_write.has_data()
            && self.decode.idle()
            && self.data_out.is_none()
            && self.fetch_out.is_none()
    }

    /// Number of cores on this core's tile (memory banks start at this
    /// position).
    pub const fn cores_per_tile(&self) -> u8 {
        self.cores_per_tile
    }
}
