//! The decode stage.
//!
//! For each instruction arriving from Fetch, this stage:
//! 1. Updates r1 on the first instruction of a new packet.
//! 2. In remote-execution mode, forwards the raw instruction to the mapped
//!    channel instead of decoding it.
//! 3. Decodes, reads the channel map table (once per network packet; body
//!    flits reuse the snapshot), and gathers operands — from registers,
//!    from channel-mapped FIFOs (blocking on empty), from immediates, or
//!    by forwarding from the instruction just executed.
//! 4. Runs early computations (fetches, jumps, channel management).
//! 5. Stalls network sends until credits and output-buffer space are both
//!    available, consuming a credit only once both hold.
//! 6. Splits store-class instructions into a head and a payload micro-op,
//!    each making its own pass through the stall checks.
//!
//! A single-instruction persistent packet parks here and reissues every
//! cycle without another fetch.

use crate::common::constants::{DEFAULT_TAG, NO_CHANNEL};
use crate::common::{ChannelIndex, MemoryAddr, RegisterIndex, SimError};
use crate::core::channel_map::{ChannelView, MemoryView};
use crate::core::Core;
use crate::isa::encoding::Predicate;
use crate::isa::{
    decode as isa_decode, Computation, DecodedOp, FetchKind, Instruction, InstructionSource,
    NetworkClass, Opcode, OperandSource,
};
use crate::stats::{StallReason, Stats};

/// Decode-stage state that persists across cycles.
#[derive(Clone, Debug, Default)]
pub struct DecodeState {
    /// An instruction that stalled mid-decode (waiting on operands,
    /// credits, or buffer space).
    pub in_progress: Option<DecodedOp>,
    /// The payload micro-op of a split store, awaiting issue.
    pub store_payload: Option<DecodedOp>,
    /// A single-instruction persistent packet, reissued every cycle.
    pub persistent: Option<DecodedOp>,
    /// The channel instructions are forwarded to while in remote-execution
    /// mode.
    pub remote_execute_channel: Option<ChannelIndex>,
    /// Channel map snapshot reused by body flits of the current packet.
    pub previous_cmt: u32,
    /// The next instruction starts a new instruction packet.
    pub starting_new_packet: bool,
    /// Only the first fetch of a packet takes effect; later ones are
    /// suppressed until the next packet starts.
    pub fetch_suppression: bool,
    /// Whether the previous packet issued a fetch (controls how FIFO
    /// packets interact with suppression).
    pub fetch_in_previous_packet: bool,
    /// Whether the next effective fetch should update the fetch-address
    /// control register.
    pub update_fetch_address: bool,
}

impl DecodeState {
    /// Clears all in-flight work (packet abort).
    pub fn cancel(&mut self) {
        self.in_progress = None;
        self.store_payload = None;
        self.persistent = None;
        self.starting_new_packet = true;
    }

    /// Whether the stage holds no work.
    pub const fn idle(&self) -> bool {
        self.in_progress.is_none() && self.store_payload.is_none() && self.persistent.is_none()
    }
}

/// Outcome of trying to gather one operand.
enum Gather {
    /// All requested operands are in place.
    Done,
    /// A channel end was empty; retry next cycle.
    Stalled(StallReason),
}

/// One cycle of the decode stage.
///
/// # Errors
///
/// Propagates unknown-opcode and invalid-function faults from the decoder.
pub fn decode_stage(core: &mut Core, stats: &mut Stats) -> Result<(), SimError> {
    // A split store's payload takes priority: memory is waiting for it.
    if let Some(payload) = core.decode.store_payload {
        if core.decode_to_execute.can_write() && core.data_out.is_none() {
            core.decode.store_payload = None;
            core.decode_to_execute.write(payload);
        }
        return Ok(());
    }

    // A parked persistent instruction reissues every cycle.
    if let Some(template) = core.decode.persistent {
        return reissue_persistent(core, template, stats);
    }

    let mut op = match core.decode.in_progress.take() {
        Some(op) => op,
        None => {
            let Some(raw) = core.fetch_to_decode.take() else {
                return Ok(());
            };
            begin_instruction(core, raw)?
        }
    };

    advance(core, &mut op, stats)
}

/// First contact with a new instruction: packet bookkeeping, then either
/// the remote-execution bypass or a full decode.
fn begin_instruction(core: &mut Core, raw: DecodedOp) -> Result<DecodedOp, SimError> {
    if core.decode.starting_new_packet && raw.location != DEFAULT_TAG {
        core.regs.update_current_packet(raw.location);
    }
    if core.decode.starting_new_packet {
        match raw.source {
            InstructionSource::Cache => {
                core.decode.fetch_in_previous_packet = core.decode.fetch_suppression;
                core.decode.fetch_suppression = false;
                core.decode.update_fetch_address = true;
            }
            InstructionSource::Fifo if !core.decode.fetch_in_previous_packet => {
                core.decode.fetch_suppression = false;
                core.decode.update_fetch_address = true;
            }
            _ => {}
        }
    }
    core.decode.starting_new_packet = raw.encoded.end_of_packet();

    if let Some(channel) = core.decode.remote_execute_channel {
        let mut op = remote_execute_op(core, raw.encoded, channel);
        op.location = raw.location;
        op.source = raw.source;
        if raw.encoded.end_of_packet() {
            tracing::debug!(target: "loki::decode", core = %core.id, "ending remote execution");
            core.decode.remote_execute_channel = None;
        }
        return Ok(op);
    }

    let mut op = isa_decode(raw.encoded, raw.location, raw.source)?;
    op.persistent = raw.persistent;
    Ok(op)
}

/// Re-encodes an instruction for remote execution: the payload is the raw
/// word, sent on the remembered channel, and nothing executes locally.
fn remote_execute_op(core: &Core, encoded: Instruction, channel: ChannelIndex) -> DecodedOp {
    let mut op = DecodedOp::from_fetch(encoded, 0, InstructionSource::Unknown);
    op.for_remote_execution = true;
    op.channel = channel;
    op.cmt_entry = core.decode.previous_cmt;
    op.predicate = Predicate::Always;
    op.end_of_network_packet = true;
    op.set_result(encoded.raw());
    op
}

/// Drives one instruction as far as it can go this cycle; leaves it in
/// `in_progress` when stalled.
fn advance(core: &mut Core, op: &mut DecodedOp, stats: &mut Stats) -> Result<(), SimError> {
    if !op.for_remote_execution {
        read_channel_map(core, op);

        if let Gather::Stalled(reason) = gather_operands(core, op) {
            stats.stall(core.id, reason);
            core.decode.in_progress = Some(*op);
            return Ok(());
        }

        if let Some(reason) = early_compute(core, op)? {
            stats.stall(core.id, reason);
            core.decode.in_progress = Some(*op);
            return Ok(());
        }
    }

    // Stall until the network is willing: a credit for creditable
    // channels, plus space in the output buffer. The credit is removed
    // only when everything else is also ready.
    let sends = op.sends_on_network();
    if sends {
        let entry = core.cmt.entry(op.channel);
        if entry.uses_credits() && !entry.can_send() {
            stats.stall(core.id, StallReason::Output);
            core.decode.in_progress = Some(*op);
            return Ok(());
        }
        if core.data_out.is_some() || !core.decode_to_execute.can_write() {
            stats.stall(core.id, StallReason::Output);
            core.decode.in_progress = Some(*op);
            return Ok(());
        }
    }

    if !core.decode_to_execute.can_write() {
        // Plain downstream back-pressure; hold the instruction.
        core.decode.in_progress = Some(*op);
        return Ok(());
    }

    if sends {
        core.cmt.entry_mut(op.channel).remove_credit();
    }

    // Memory packets: loads are single-flit; stores and atomics split
    // here, the head flit carrying the address and the payload the data.
    match op.descriptor().map(|d| d.network) {
        Some(NetworkClass::MemorySend { flits: 1, .. }) => op.end_of_network_packet = true,
        Some(NetworkClass::MemorySend { flits: 2, .. }) => split_store(core, op),
        _ => {}
    }

    if op.persistent {
        // Park a pristine copy: operands must be re-gathered on every
        // iteration, not baked in from the first one.
        let mut template = isa_decode(op.encoded, op.location, op.source)?;
        template.cmt_entry = op.cmt_entry;
        core.decode.persistent = Some(template);
    }

    stats.unstall(core.id);
    core.decode_to_execute.write(*op);
    Ok(())
}

/// Reissues the parked persistent instruction, gathering its operands
/// afresh each iteration (channel reads may block; register values may
/// have been updated by the previous iteration).
fn reissue_persistent(
    core: &mut Core,
    template: DecodedOp,
    stats: &mut Stats,
) -> Result<(), SimError> {
    let mut op = template;
    // Wait for every channel operand before consuming any: a reissue that
    // stalled halfway would otherwise lose a flit it already dequeued.
    if let Some(reg) = missing_channel_operand(core, &op) {
        stats.stall(core.id, channel_stall_reason(core, reg));
        return Ok(());
    }
    if let Gather::Stalled(reason) = gather_operands(core, &mut op) {
        stats.stall(core.id, reason);
        return Ok(());
    }
    if !core.decode_to_execute.can_write() {
        return Ok(());
    }
    if op.sends_on_network() {
        let entry = core.cmt.entry(op.channel);
        if (entry.uses_credits() && !entry.can_send()) || core.data_out.is_some() {
            stats.stall(core.id, StallReason::Output);
            return Ok(());
        }
        core.cmt.entry_mut(op.channel).remove_credit();
    }
    stats.unstall(core.id);
    core.decode_to_execute.write(op);
    Ok(())
}

/// Reads the channel map table, honouring the first-flit rule: only the
/// head flit of a network packet reads the table; body flits reuse the
/// snapshot.
fn read_channel_map(core: &mut Core, op: &mut DecodedOp) {
    if op.channel == NO_CHANNEL {
        return;
    }
    let first_flit =
        op.memory_op.is_header() || op.opcode == Some(Opcode::RmtExecute);
    if first_flit {
        op.cmt_entry = core.cmt.read(u32::from(op.channel));
        core.decode.previous_cmt = op.cmt_entry;
    } else {
        op.cmt_entry = core.decode.previous_cmt;
    }
}

/// Gathers any register operands still outstanding. Channel-end reads
/// consume a flit and stall when empty; forwarding resolves against the
/// instruction just executed.
fn gather_operands(core: &mut Core, op: &mut DecodedOp) -> Gather {
    // Indirect reads resolve in two steps: the named register's value is
    // itself a register index (possibly a channel end).
    if op.descriptor().map(|d| d.computation) == Some(Computation::IndirectRead) {
        if op.op2_source != OperandSource::Immediate {
            let index = read_register(core, op.source1);
            op.operand2 = index as i32;
            op.op2_source = OperandSource::Immediate;
        }
        let target = (op.operand2 as u32 & 0x1F) as RegisterIndex;
        return match read_operand(core, target) {
            Some(value) => {
                op.operand1 = value;
                op.op1_source = OperandSource::Immediate;
                Gather::Done
            }
            None => Gather::Stalled(channel_stall_reason(core, target)),
        };
    }

    // Indirect writes resolve the destination index here, so the
    // writeback stage can commit without another lookup.
    if op.indirect_dest && op.op1_source == OperandSource::Register {
        let index = read_register(core, op.source1);
        op.destination = (index & 0x1F) as RegisterIndex;
        op.op1_source = OperandSource::None;
    }

    if op.op1_source == OperandSource::Register {
        match read_operand(core, op.source1) {
            Some(value) => {
                op.operand1 = value;
                op.op1_source = OperandSource::Immediate;
            }
            None => return Gather::Stalled(channel_stall_reason(core, op.source1)),
        }
    }
    if op.op2_source == OperandSource::Register {
        match read_operand(core, op.source2) {
            Some(value) => {
                op.operand2 = value;
                op.op2_source = OperandSource::Immediate;
            }
            None => return Gather::Stalled(channel_stall_reason(core, op.source2)),
        }
    }
    Gather::Done
}

/// Reads one operand, blocking on empty channel ends (`None`), with
/// forwarding from the just-executed instruction taking precedence over
/// the register file.
fn read_operand(core: &mut Core, reg: RegisterIndex) -> Option<i32> {
    if core.regs.is_channel_end(reg) {
        let channel = core.regs.to_channel(reg);
        return core.channel_ends.read(channel).map(|w| w as i32);
    }
    // The physical read still happens; the forwarded value wins.
    let from_file = core.regs.read(reg) as i32;
    if core.exec.forwards_to(reg) {
        return Some(core.exec.last_result as i32);
    }
    Some(from_file)
}

/// The first register operand that names an empty channel end, if any.
fn missing_channel_operand(core: &Core, op: &DecodedOp) -> Option<RegisterIndex> {
    for (source, reg) in [(op.op1_source, op.source1), (op.op2_source, op.source2)] {
        if source == OperandSource::Register
            && core.regs.is_channel_end(reg)
            && !core.channel_ends.has_data(core.regs.to_channel(reg))
        {
            return Some(reg);
        }
    }
    None
}

/// A plain register read with no channel-end redirection (used for
/// indirect index resolution).
fn read_register(core: &Core, reg: RegisterIndex) -> u32 {
    if core.exec.forwards_to(reg) { core.exec.last_result } else { core.regs.read(reg) }
}

/// Attributes a channel-end stall to memory or core data, depending on
/// what the channel map says feeds that channel.
fn channel_stall_reason(core: &Core, reg: RegisterIndex) -> StallReason {
    if !core.regs.is_channel_end(reg) {
        return StallReason::CoreData;
    }
    let channel = core.regs.to_channel(reg) + crate::core::INSTRUCTION_CHANNELS;
    if core.cmt.connection_from_memory(channel) {
        StallReason::MemoryData
    } else {
        StallReason::CoreData
    }
}

/// Runs decode-stage computations: fetches, jumps, packet aborts, and the
/// channel-management group. Returns a stall reason if the op must wait.
///
/// # Errors
///
/// Propagates invalid-option faults.
fn early_compute(core: &mut Core, op: &mut DecodedOp) -> Result<Option<StallReason>, SimError> {
    let Some(desc) = op.descriptor() else { return Ok(None) };
    if !desc.early {
        return Ok(None);
    }

    // Early operations resolve their predicate here: the producer of the
    // predicate has already been through Execute by the time its
    // successor decodes, so the value is current.
    if !op.will_execute(core.predicate.read()) {
        op.set_result(0);
        op.prevent_forwarding();
        return Ok(None);
    }

    match desc.computation {
        Computation::Fetch(kind) => return Ok(fetch(core, op, kind)),
        Computation::InBufferJump => {
            core.fetch.jump(op.immediate);
            op.set_result(0);
        }
        Computation::NextIpk => {
            core.fetch.next_ipk();
            core.decode.cancel();
            let _ = core.fetch_to_decode.discard();
            op.set_result(0);
        }
        Computation::RemoteExecute => {
            core.decode.remote_execute_channel = Some(op.channel);
            core.decode.previous_cmt = op.cmt_entry;
            tracing::debug!(target: "loki::decode", core = %core.id, channel = op.channel,
                "beginning remote execution");
            op.set_result(0);
        }
        Computation::TestChannel => {
            let channel = op.immediate as u32 as ChannelIndex;
            op.set_result(u32::from(core.channel_ends.has_data(channel)));
        }
        Computation::SelectChannel => {
            match core.channel_ends.select(op.immediate as u32) {
                Some(channel) => op.set_result(u32::from(core.regs.from_channel(channel))),
                None => return Ok(Some(StallReason::CoreData)),
            }
        }
        Computation::WaitChannelEnd => {
            let entry = if op.channel == NO_CHANNEL {
                op.immediate as u32 as ChannelIndex
            } else {
                op.channel
            };
            if !core.cmt.entry(entry).credits_full() {
                return Ok(Some(StallReason::Output));
            }
            op.set_result(0);
        }
        _ => {}
    }
    Ok(None)
}

/// Handles the fetch family: computes the target address, consults the
/// suppression rules, and queues the tag check.
fn fetch(core: &mut Core, op: &mut DecodedOp, kind: FetchKind) -> Option<StallReason> {
    let address = fetch_address(core, op, kind);

    if core.decode.fetch_suppression {
        tracing::debug!(target: "loki::decode", core = %core.id,
            addr = format_args!("{address:#010x}"), "suppressing fetch");
    } else {
        if !core.fetch.can_check_tags() {
            return Some(StallReason::Fetch);
        }
        let view = match ChannelView::decode_entry(core.cmt.read(0)) {
            ChannelView::Memory(view) => view,
            _ => MemoryView::local_default(core.id.tile),
        };
        tracing::debug!(target: "loki::decode", core = %core.id,
            addr = format_args!("{address:#010x}"), "fetching");
        core.fetch.check_tags(address, kind, view);
    }
    core.decode.fetch_suppression = true;

    if core.decode.update_fetch_address {
        core.cregs.set_fetch_address(address);
    }
    let normal_fetch = op.source == InstructionSource::Cache
        || (!core.decode.fetch_in_previous_packet && op.source == InstructionSource::Fifo);
    if normal_fetch {
        core.decode.update_fetch_address = false;
    }

    op.set_result(address);
    None
}

/// The fetch target for each flavour: absolute from operands, or relative
/// to the current packet (`r1 + 4 * offset`), or predicate-selected.
fn fetch_address(core: &Core, op: &DecodedOp, kind: FetchKind) -> MemoryAddr {
    let pred = core.predicate.read();
    if kind.relative {
        let offset = if kind.predicated {
            if pred { op.operand1 } else { op.operand2 }
        } else {
            op.operand1
        };
        let base = core.regs.read(crate::common::constants::REG_CURRENT_IPK);
        base.wrapping_add((offset as u32).wrapping_mul(crate::common::constants::BYTES_PER_WORD))
    } else if kind.predicated {
        (if pred { op.operand1 } else { op.operand2 }) as u32
    } else {
        (op.operand1 as u32).wrapping_add(op.immediate as u32)
    }
}

/// Splits a store-class op: the incoming op becomes the head flit (address
/// computation) and a payload micro-op is queued to follow it.
fn split_store(core: &mut Core, op: &mut DecodedOp) {
    let data = op.operand1;

    let mut payload = *op;
    payload.memory_op = crate::common::MemoryOpcode::PayloadEop;
    payload.end_of_network_packet = true;
    payload.operand1 = data;
    payload.operand2 = 0;
    payload.has_dest = false;
    payload.indirect_dest = false;
    payload.sets_predicate = false;
    payload.persistent = false;

    // Head: address = base + offset.
    op.operand1 = op.operand2;
    op.operand2 = op.immediate;
    op.end_of_network_packet = false;

    core.decode.store_payload = Some(payload);
}
