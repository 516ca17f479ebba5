//! The execute stage.
//!
//! Accepts one operation per cycle from Decode. Operations that already
//! carry a result (fetches and the other early computations) pass straight
//! through. Everything else is evaluated here: ALU functions (multiplies
//! holding the stage an extra cycle), structure accesses, memory address
//! generation, and system calls. Operations that emit on the network have
//! their final destination resolved — the head flit's address picks the
//! bank within a memory group — and their flit written to the core's
//! output port.
//!
//! The stage blocks upstream while the writeback register is occupied or
//! the network side is not ready, and it publishes its result for the
//! decode stage's forwarding path.

/// The arithmetic/logic unit.
pub mod alu;
/// Host-backed system calls.
pub mod syscall;

use crate::common::{ChannelId, Flit, MemoryOpcode, RegisterIndex, SimError};
use crate::core::channel_map::ChannelView;
use crate::core::Core;
use crate::isa::{Computation, DecodedOp, Instruction, Opcode, Predicate};
use crate::memory::MainMemory;
use crate::stats::Stats;

/// Execute-stage state that persists across cycles.
#[derive(Clone, Debug, Default)]
pub struct ExecuteState {
    /// The multiplier is mid-operation.
    multiplier_busy: bool,
    /// Destination of the last executed instruction, for forwarding.
    last_dest: Option<RegisterIndex>,
    /// Result of the last executed instruction.
    pub last_result: u32,
    /// Whether the last instruction actually executed (a squashed producer
    /// must not forward).
    last_valid: bool,
}

impl ExecuteState {
    /// Whether a read of `reg` should take the forwarded result instead of
    /// the register file.
    pub fn forwards_to(&self, reg: RegisterIndex) -> bool {
        self.last_valid && self.last_dest == Some(reg)
    }

    /// Invalidates forwarding and any in-flight multiply (packet abort).
    pub const fn cancel(&mut self) {
        self.last_valid = false;
        self.multiplier_busy = false;
    }

    fn publish(&mut self, op: &DecodedOp) {
        self.last_dest = (op.has_dest && !op.indirect_dest).then_some(op.destination);
        self.last_result = op.result;
        self.last_valid = true;
    }
}

/// One cycle of the execute stage.
///
/// # Errors
///
/// Propagates invalid function codes and unknown system calls.
pub fn execute_stage(core: &mut Core, mem: &mut MainMemory, stats: &mut Stats) -> Result<(), SimError> {
    // Back-pressure: the writeback register must be free, and a sending op
    // needs the output buffer.
    if core.execute_to_write.has_data() {
        return Ok(());
    }
    let Some(waiting) = core.decode_to_execute.peek() else {
        return Ok(());
    };
    if waiting.sends_on_network() && core.data_out.is_some() {
        return Ok(());
    }

    // Multiplies occupy the unit for an extra cycle before the result
    // appears; the op stays upstream so Decode cannot issue past it.
    let extra = waiting.descriptor().map_or(0, |d| d.extra_latency);
    if extra > 0 && !waiting.has_result && !core.exec.multiplier_busy {
        core.exec.multiplier_busy = true;
        return Ok(());
    }
    core.exec.multiplier_busy = false;

    let Some(mut op) = core.decode_to_execute.take() else {
        return Ok(());
    };

    if op.has_result {
        // Computed early (in Decode) or forwarded for remote execution.
        finish(core, &mut op, stats);
        return Ok(());
    }

    if !op.will_execute(core.predicate.read()) {
        // Squashed: no side effects, and nothing may forward from it.
        op.prevent_forwarding();
        core.exec.last_valid = false;
        stats.instructions_squashed += 1;
        return Ok(());
    }

    let result = compute(core, mem, &op, stats)?;
    op.set_result(result);

    finish(core, &mut op, stats);
    Ok(())
}

/// Evaluates the op's computation and returns the result value.
fn compute(
    core: &mut Core,
    mem: &mut MainMemory,
    op: &DecodedOp,
    stats: &Stats,
) -> Result<u32, SimError> {
    let Some(desc) = op.descriptor() else {
        return Err(SimError::UnknownOpcode { opcode: op.encoded.opcode_bits(), encoded: op.encoded.raw() });
    };

    let op1 = op.operand1;
    let op2 = op.operand2;

    let result = match desc.computation {
        Computation::Alu(function) => alu::evaluate(function, op1, op2, core.predicate.read())?,
        Computation::Move => op1 as u32,
        Computation::Lli => (op1 as u32) & 0xFFFF,
        Computation::Lui => (op1 as u32) | ((op2 as u32) << 16),
        Computation::ScratchpadRead => core.scratchpad.read(op1 as u32),
        Computation::ScratchpadWrite => {
            core.scratchpad.write(op2 as u32, op1 as u32);
            0
        }
        Computation::CmtRead => core.cmt.read(op1 as u32),
        Computation::CmtWrite => {
            core.cmt.write(op2 as u32, op1 as u32);
            0
        }
        Computation::CregRead => core.cregs.read(op1 as u32),
        Computation::CregWrite => {
            core.cregs.write(op2 as u32, op1 as u32);
            0
        }
        Computation::MemoryAddress => {
            if op.memory_op.is_header() {
                (op1 as u32).wrapping_add(op2 as u32)
            } else {
                // Payload flit of a split store: carry the data through.
                op1 as u32
            }
        }
        Computation::IndirectRead => op1 as u32,
        Computation::IndirectWrite => op2 as u32,
        Computation::SendConfig => op1 as u32,
        Computation::Syscall => {
            syscall::execute(core, mem, op.immediate as u32, stats.cycles)?;
            0
        }
        Computation::RemoteNextIpk => Instruction::default()
            .with_opcode_bits(Opcode::NxIpk.to_bits())
            .with_predicate(Predicate::EndOfPacket)
            .raw(),
        // Early computations never reach this path.
        Computation::Fetch(_)
        | Computation::InBufferJump
        | Computation::NextIpk
        | Computation::RemoteExecute
        | Computation::TestChannel
        | Computation::SelectChannel
        | Computation::WaitChannelEnd => 0,
    };
    Ok(result)
}

/// Common completion path: predicate update, network emission, forwarding
/// publication, and hand-off to writeback.
fn finish(core: &mut Core, op: &mut DecodedOp, stats: &mut Stats) {
    if op.sets_predicate {
        let value = alu::predicate_outcome(op.function, op.operand1, op.operand2, op.result);
        core.predicate.write(value);
    }

    if op.sends_on_network() {
        send_output(core, op);
    }

    if core.trace {
        tracing::info!(target: "loki::trace", core = %core.id,
            pc = format_args!("{:#010x}", op.location),
            inst = %crate::isa::asm::disassemble(op.encoded),
            op1 = op.operand1, op2 = op.operand2,
            result = format_args!("{:#010x}", op.result),
            "executed");
    }

    if op.indirect_dest {
        core.exec.last_valid = false;
    } else {
        core.exec.publish(op);
    }

    core.cregs.instruction_executed();
    stats.instructions_executed += 1;
    core.execute_to_write.write(*op);
}

/// Builds and emits the op's flit, steering memory packets to the bank the
/// head address selects.
fn send_output(core: &mut Core, op: &DecodedOp) {
    let view = ChannelView::decode_entry(op.cmt_entry);
    let mut flit = match view {
        ChannelView::Null => return,
        ChannelView::Core { destination, acquired } => {
            let mut flit = Flit::core_data(op.result, destination, true);
            flit.acquired = acquired;
            flit.creditable = true;
            flit.source = ChannelId::new(core.id.tile, core.id.position, op.channel);
            flit
        }
        ChannelView::Memory(mem_view) => {
            let increment = if op.memory_op.is_address() || op.memory_op == MemoryOpcode::None {
                let inc = mem_view.bank_offset(op.result);
                core.cmt.entry_mut(op.channel).set_address_increment(inc);
                inc
            } else {
                core.cmt.entry(op.channel).address_increment()
            };
            let position = core.cores_per_tile() + mem_view.bank + increment;
            let destination = ChannelId::new(mem_view.tile, position, 0);
            // A plain message to a memory channel behaves as a word load.
            let memory_op = if op.memory_op == MemoryOpcode::None {
                MemoryOpcode::LoadW
            } else {
                op.memory_op
            };
            let mut flit = Flit::memory(
                op.result,
                destination,
                memory_op,
                mem_view.return_channel,
                op.end_of_network_packet,
            );
            flit.source = ChannelId::new(core.id.tile, core.id.position, op.channel);
            flit
        }
    };

    // `sendconfig` overrides the metadata bits directly from its second
    // operand: bit 0 is end-of-packet, bit 1 the acquired flag.
    if op.descriptor().map(|d| d.computation) == Some(Computation::SendConfig) {
        flit.end_of_packet = op.operand2 & 1 != 0;
        flit.acquired = op.operand2 & 2 != 0;
    }

    tracing::trace!(target: "loki::execute", core = %core.id, %flit, "network send");
    debug_assert!(core.data_out.is_none());
    core.data_out = Some(flit);
}
