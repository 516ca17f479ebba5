//! Instruction decoding: from encoded words to in-flight operations.
//!
//! This module defines [`DecodedOp`], the container for everything an
//! instruction accumulates as it moves down the pipeline — register
//! indices, gathered operand values, the channel map snapshot, the computed
//! result — and [`decode`], which populates the static part of that
//! container from an encoded instruction.
//!
//! Decoding here is purely structural. Operand *values* are gathered by the
//! decode stage, which also resolves channel-end reads and forwarding.

use super::descriptor::{descriptor, NetworkClass, OpDescriptor, OperandLayout};
use super::encoding::{Instruction, Predicate};
use super::opcodes::{Function, Opcode};
use crate::common::constants::NO_CHANNEL;
use crate::common::{ChannelIndex, MemoryAddr, MemoryOpcode, RegisterIndex, SimError};

/// Where an operand's value comes from.
///
/// Drives the operand multiplexers at the ALU inputs. `Channel` never
/// survives past the decode stage — reading a channel-mapped register
/// resolves it to a concrete value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperandSource {
    /// The instruction has no such operand.
    #[default]
    None,
    /// Read from the register file.
    Register,
    /// An immediate from the encoding.
    Immediate,
    /// Forwarded from the instruction currently in Execute.
    Bypass,
}

/// Which instruction store supplied an instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InstructionSource {
    /// The IPK FIFO.
    Fifo,
    /// The IPK cache.
    Cache,
    /// Not yet known (packet still arriving).
    #[default]
    Unknown,
}

/// An instruction in flight.
///
/// Created by [`decode`] (or by the fetch stage wrapping a raw word),
/// mutated only while owned by a pipeline register, destroyed after
/// writeback.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodedOp {
    /// The original encoded instruction.
    pub encoded: Instruction,
    /// The decoded opcode. `None` until [`decode`] has run (instructions
    /// forwarded verbatim in remote-execution mode are never decoded).
    pub opcode: Option<Opcode>,
    /// The ALU function, where one applies.
    pub function: Function,
    /// The execute-condition field.
    pub predicate: Predicate,
    /// Whether this op also writes the predicate register.
    pub sets_predicate: bool,

    /// Destination register, when `has_dest`.
    pub destination: RegisterIndex,
    /// Whether a register write happens at writeback.
    pub has_dest: bool,
    /// The destination is named indirectly (`iwtr`): `destination` holds
    /// the register whose *value* is the real index.
    pub indirect_dest: bool,
    /// First source register, when `op1_source == Register`.
    pub source1: RegisterIndex,
    /// Second source register, when `op2_source == Register`.
    pub source2: RegisterIndex,
    /// Sign-extended immediate.
    pub immediate: i32,
    /// Second immediate (predicated-fetch format only).
    pub immediate2: i32,
    /// Channel map table index for the outbound channel, or
    /// [`NO_CHANNEL`](crate::common::constants::NO_CHANNEL).
    pub channel: ChannelIndex,

    /// Source of the first operand.
    pub op1_source: OperandSource,
    /// Source of the second operand.
    pub op2_source: OperandSource,
    /// First operand value, once gathered.
    pub operand1: i32,
    /// Second operand value, once gathered.
    pub operand2: i32,

    /// The computed result. Valid only when `has_result`.
    pub result: u32,
    /// Whether `result` has been produced yet.
    pub has_result: bool,

    /// Snapshot of the channel map entry taken in Decode.
    pub cmt_entry: u32,
    /// Memory opcode this flit carries (headers and payloads).
    pub memory_op: MemoryOpcode,
    /// Whether the flit this op emits ends its network packet.
    pub end_of_network_packet: bool,

    /// Memory address this instruction was fetched from.
    pub location: MemoryAddr,
    /// Which instruction store supplied it.
    pub source: InstructionSource,

    /// Single-instruction persistent packet: reissue every cycle.
    pub persistent: bool,
    /// Being forwarded verbatim to another core (remote execution).
    pub for_remote_execution: bool,
}

impl DecodedOp {
    /// Wraps a fetched instruction before decoding, stamping its origin.
    pub fn from_fetch(encoded: Instruction, location: MemoryAddr, source: InstructionSource) -> Self {
        Self {
            encoded,
            predicate: encoded.predicate(),
            location,
            source,
            channel: NO_CHANNEL,
            ..Self::default()
        }
    }

    /// The behaviour descriptor, where the opcode is known.
    pub fn descriptor(&self) -> Option<OpDescriptor> {
        self.opcode.map(|op| descriptor(op, self.function))
    }

    /// Whether this instruction is the last of its packet.
    pub fn end_of_packet(&self) -> bool {
        self.predicate == Predicate::EndOfPacket
    }

    /// Whether this op will emit a flit: it must belong to a sending class
    /// and name a mapped output channel (memory sends encode the channel in
    /// their format, so presence of the field is enough).
    pub fn sends_on_network(&self) -> bool {
        if self.for_remote_execution {
            return true;
        }
        match self.descriptor() {
            Some(d) => d.network.may_send() && self.channel != NO_CHANNEL,
            None => false,
        }
    }

    /// Whether this op's predicate allows it to execute, given the current
    /// predicate register value.
    pub fn will_execute(&self, predicate_register: bool) -> bool {
        match self.predicate {
            Predicate::Always | Predicate::EndOfPacket => true,
            Predicate::IfP => predicate_register,
            Predicate::IfNotP => !predicate_register,
        }
    }

    /// Records the computed result.
    pub const fn set_result(&mut self, value: u32) {
        self.result = value;
        self.has_result = true;
    }

    /// Invalidates this op so no later instruction can take a bypass from
    /// it. Used for squashed instructions and for indirect writes.
    pub const fn prevent_forwarding(&mut self) {
        self.has_dest = false;
        self.destination = 0;
    }

    /// Re-encodes the instruction. The encoding is carried unchanged, so
    /// this is exact for any instruction that came off the wire.
    pub const fn to_instruction(&self) -> Instruction {
        self.encoded
    }
}

/// Decodes an encoded instruction into a [`DecodedOp`].
///
/// Extracts the fields the opcode's format defines and fills the static
/// portion of the op. Operand values are left for the decode stage.
///
/// # Errors
///
/// Returns [`SimError::UnknownOpcode`] for undefined opcode encodings and
/// [`SimError::InvalidFunction`] for undefined ALU function codes.
pub fn decode(
    encoded: Instruction,
    location: MemoryAddr,
    source: InstructionSource,
) -> Result<DecodedOp, SimError> {
    let opcode = encoded.opcode().ok_or(SimError::UnknownOpcode {
        opcode: encoded.opcode_bits(),
        encoded: encoded.raw(),
    })?;

    let function = match opcode {
        Opcode::Alu | Opcode::AluP => Function::from_bits(encoded.function_bits())
            .ok_or(SimError::InvalidFunction(encoded.function_bits()))?,
        _ => opcode.implied_function().unwrap_or_default(),
    };

    let desc = descriptor(opcode, function);
    let format = desc.format;

    let mut op = DecodedOp {
        encoded,
        opcode: Some(opcode),
        function,
        predicate: encoded.predicate(),
        sets_predicate: desc.writes_predicate,
        immediate: encoded.immediate(format),
        immediate2: if format == super::opcodes::Format::Pff { encoded.immediate2() } else { 0 },
        channel: match format {
            super::opcodes::Format::R0nc
            | super::opcodes::Format::R1nc
            | super::opcodes::Format::R2nc
            | super::opcodes::Format::Ff
            | super::opcodes::Format::Pff => NO_CHANNEL,
            _ => encoded.channel(),
        },
        location,
        source,
        memory_op: match desc.network {
            NetworkClass::MemorySend { op, .. } => op,
            _ => MemoryOpcode::None,
        },
        ..DecodedOp::default()
    };

    match desc.layout {
        OperandLayout::None => {}
        OperandLayout::NoDest1Src => {
            op.source1 = encoded.reg1();
            op.op1_source = OperandSource::Register;
        }
        OperandLayout::Dest1Src => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.source1 = encoded.reg2();
            op.op1_source = OperandSource::Register;
        }
        OperandLayout::NoDest2Src => {
            op.source1 = encoded.reg1();
            op.source2 = encoded.reg2();
            op.op1_source = OperandSource::Register;
            op.op2_source = OperandSource::Register;
        }
        OperandLayout::Dest2Src => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.source1 = encoded.reg2();
            op.source2 = encoded.reg3();
            op.op1_source = OperandSource::Register;
            op.op2_source = OperandSource::Register;
        }
        OperandLayout::NoDest1Imm => {
            op.operand1 = op.immediate;
            op.op1_source = OperandSource::Immediate;
        }
        OperandLayout::Dest1Imm => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.operand1 = op.immediate;
            op.op1_source = OperandSource::Immediate;
        }
        OperandLayout::NoDest1Src1Imm => {
            op.source1 = encoded.reg1();
            op.op1_source = OperandSource::Register;
            op.operand2 = op.immediate;
            op.op2_source = OperandSource::Immediate;
        }
        OperandLayout::Dest1Src1Imm => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.source1 = encoded.reg2();
            op.op1_source = OperandSource::Register;
            op.operand2 = op.immediate;
            op.op2_source = OperandSource::Immediate;
        }
        OperandLayout::NoDest2Src1Imm => {
            // Stores: reg1 is the data, reg2 the base; the offset rides in
            // `immediate`.
            op.source1 = encoded.reg1();
            op.source2 = encoded.reg2();
            op.op1_source = OperandSource::Register;
            op.op2_source = OperandSource::Register;
        }
        OperandLayout::NoDest2Imm => {
            op.operand1 = op.immediate;
            op.operand2 = op.immediate2;
            op.op1_source = OperandSource::Immediate;
            op.op2_source = OperandSource::Immediate;
        }
        OperandLayout::Dest1SrcShared1Imm => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.source1 = encoded.reg1();
            op.op1_source = OperandSource::Register;
            op.operand2 = op.immediate;
            op.op2_source = OperandSource::Immediate;
        }
        OperandLayout::DestIndirect1Src => {
            op.destination = encoded.reg1();
            op.has_dest = true;
            op.indirect_dest = true;
            op.source1 = encoded.reg1();
            op.source2 = encoded.reg2();
            op.op1_source = OperandSource::Register;
            op.op2_source = OperandSource::Register;
        }
    }

    Ok(op)
}
