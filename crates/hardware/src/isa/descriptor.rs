//! Static per-opcode behaviour descriptors.
//!
//! The original hardware model composes instruction behaviour from layered
//! templates (format, operand sources, computation, network access). Here
//! the same information is a table: every opcode maps to one
//! [`OpDescriptor`] enumerating which pipeline phases the instruction runs
//! and with which parameters. The descriptor is a pure function of the
//! opcode, so the set of micro-phases an instruction goes through is known
//! statically.

use super::opcodes::{Format, Function, Opcode};
use crate::common::MemoryOpcode;

/// How an instruction gathers its operands.
///
/// Mirrors the supported combinations of destination, source registers, and
/// immediates. `reg1` is the destination where one exists; sources shift
/// accordingly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandLayout {
    /// No operands at all.
    None,
    /// No destination; one source register (`reg1`).
    NoDest1Src,
    /// Destination `reg1`; one source register (`reg2`).
    Dest1Src,
    /// No destination; two source registers (`reg1`, `reg2`).
    NoDest2Src,
    /// Destination `reg1`; two source registers (`reg2`, `reg3`).
    Dest2Src,
    /// No destination; one immediate.
    NoDest1Imm,
    /// Destination `reg1`; one immediate.
    Dest1Imm,
    /// No destination; source register `reg1` plus an immediate.
    NoDest1Src1Imm,
    /// Destination `reg1`; source register `reg2` plus an immediate.
    Dest1Src1Imm,
    /// No destination; sources `reg1`, `reg2` plus an immediate.
    NoDest2Src1Imm,
    /// No destination; two immediates (predicated fetch).
    NoDest2Imm,
    /// Destination `reg1`, which is also read as the first source (`lui`).
    Dest1SrcShared1Imm,
    /// Indirect write: `reg1`'s *value* names the destination; `reg2` is
    /// the data.
    DestIndirect1Src,
}

impl OperandLayout {
    /// Whether this layout names a destination register.
    pub const fn has_dest(self) -> bool {
        matches!(
            self,
            Self::Dest1Src
                | Self::Dest2Src
                | Self::Dest1Imm
                | Self::Dest1Src1Imm
                | Self::Dest1SrcShared1Imm
        )
    }

    /// Number of register read ports this layout uses.
    pub const fn register_reads(self) -> usize {
        match self {
            Self::None | Self::NoDest1Imm | Self::Dest1Imm | Self::NoDest2Imm => 0,
            Self::NoDest1Src
            | Self::Dest1Src
            | Self::NoDest1Src1Imm
            | Self::Dest1Src1Imm
            | Self::Dest1SrcShared1Imm => 1,
            Self::NoDest2Src | Self::Dest2Src | Self::NoDest2Src1Imm | Self::DestIndirect1Src => 2,
        }
    }
}

/// What the instruction computes, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Computation {
    /// No computation; the result is the first operand.
    Move,
    /// An ALU function.
    Alu(Function),
    /// Load the low 16 bits of the immediate.
    Lli,
    /// Merge the immediate into the upper half of the destination.
    Lui,
    /// Read the scratchpad at the address in the first operand.
    ScratchpadRead,
    /// Write the second operand's address with the first operand's value.
    ScratchpadWrite,
    /// Read a channel map table entry.
    CmtRead,
    /// Write a channel map table entry.
    CmtWrite,
    /// Read a control register.
    CregRead,
    /// Write a control register.
    CregWrite,
    /// Compute a memory address (`base + offset`) for a memory packet.
    MemoryAddress,
    /// Indirect register read: the source's value names the register.
    IndirectRead,
    /// Indirect register write (destination resolved at writeback).
    IndirectWrite,
    /// Issue a fetch request.
    Fetch(FetchKind),
    /// Jump within the current instruction store.
    InBufferJump,
    /// Abandon the current instruction packet.
    NextIpk,
    /// Enter remote-execution mode.
    RemoteExecute,
    /// Send a `nxipk` command to a remote core.
    RemoteNextIpk,
    /// Test an input channel for data.
    TestChannel,
    /// Select a ready input channel from a bitmask.
    SelectChannel,
    /// Wait until an output channel's credits are all returned.
    WaitChannelEnd,
    /// Send a flit with caller-controlled metadata.
    SendConfig,
    /// Host system call.
    Syscall,
}

/// The flavours of fetch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchKind {
    /// Address is relative to the current packet (`r1 + 4 * immediate`).
    pub relative: bool,
    /// The packet re-executes until interrupted.
    pub persistent: bool,
    /// The packet is jumped to once fetched (`false` for prefetches).
    pub execute: bool,
    /// The address is chosen between two operands by the predicate.
    pub predicated: bool,
}

/// Network behaviour of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkClass {
    /// Never sends.
    None,
    /// Sends the result if the channel field names a mapped channel.
    CoreSend,
    /// Sends a memory request packet.
    MemorySend {
        /// Total flits in the request (1 for loads, 2 for stores/atomics).
        flits: u8,
        /// The head flit's memory opcode.
        op: MemoryOpcode,
    },
    /// Sends payload with explicit metadata (`sendconfig`).
    Config,
}

impl NetworkClass {
    /// Whether this class can put flits on the network at all.
    pub const fn may_send(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Everything a pipeline stage needs to know about an opcode.
#[derive(Clone, Copy, Debug)]
pub struct OpDescriptor {
    /// The encoding format.
    pub format: Format,
    /// Operand gathering.
    pub layout: OperandLayout,
    /// The computation performed.
    pub computation: Computation,
    /// Network behaviour.
    pub network: NetworkClass,
    /// Computation happens in Decode rather than Execute (fetches,
    /// channel management, jumps).
    pub early: bool,
    /// Reads the predicate register as an operand (not as a guard).
    pub reads_predicate: bool,
    /// Writes the predicate register from the result.
    pub writes_predicate: bool,
    /// Extra execute-stage cycles beyond the first.
    pub extra_latency: u8,
}

impl OpDescriptor {
    /// Whether the op may need CMT data: anything that can send, plus
    /// fetches (which address memory through CMT entry 0) and
    /// remote-execution setup.
    pub const fn reads_cmt(&self) -> bool {
        self.network.may_send()
            || matches!(self.computation, Computation::Fetch(_) | Computation::RemoteExecute)
    }
}

/// Returns the descriptor for an opcode.
///
/// For the register-register ALU group the function comes from the
/// encoding's function field; pass it in `function`. Other opcodes ignore
/// the argument.
pub const fn descriptor(opcode: Opcode, function: Function) -> OpDescriptor {
    use Computation as C;
    use NetworkClass as N;
    use OperandLayout as L;

    /// Shorthand constructor with the common defaults.
    const fn desc(
        format: Format,
        layout: OperandLayout,
        computation: Computation,
        network: NetworkClass,
    ) -> OpDescriptor {
        OpDescriptor {
            format,
            layout,
            computation,
            network,
            early: false,
            reads_predicate: false,
            writes_predicate: false,
            extra_latency: 0,
        }
    }

    const fn early(mut d: OpDescriptor) -> OpDescriptor {
        d.early = true;
        d
    }

    const fn sets_pred(mut d: OpDescriptor) -> OpDescriptor {
        d.writes_predicate = true;
        d
    }

    const fn reads_pred(mut d: OpDescriptor) -> OpDescriptor {
        d.reads_predicate = true;
        d
    }

    /// Shorthand for the fetch-kind field set.
    const fn fetch(relative: bool, persistent: bool, execute: bool, predicated: bool) -> FetchKind {
        FetchKind { relative, persistent, execute, predicated }
    }

    match opcode {
        Opcode::Alu => {
            let mut d = desc(Format::R3, L::Dest2Src, C::Alu(function), N::CoreSend);
            d.extra_latency = function.extra_latency();
            if matches!(function, Function::Psel) {
                d.reads_predicate = true;
            }
            d
        }
        Opcode::AluP => {
            let mut d = desc(Format::R3, L::Dest2Src, C::Alu(function), N::CoreSend);
            d.extra_latency = function.extra_latency();
            d.writes_predicate = true;
            d
        }

        Opcode::NorI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Nor), N::CoreSend),
        Opcode::NorIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Nor), N::CoreSend))
        }
        Opcode::AndI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::And), N::CoreSend),
        Opcode::AndIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::And), N::CoreSend))
        }
        Opcode::OrI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Or), N::CoreSend),
        Opcode::OrIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Or), N::CoreSend))
        }
        Opcode::XorI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Xor), N::CoreSend),
        Opcode::XorIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::Xor), N::CoreSend))
        }
        Opcode::SetEqI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetEq), N::CoreSend),
        Opcode::SetEqIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetEq), N::CoreSend))
        }
        Opcode::SetNeI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetNe), N::CoreSend),
        Opcode::SetNeIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetNe), N::CoreSend))
        }
        Opcode::SetLtI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetLt), N::CoreSend),
        Opcode::SetLtIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetLt), N::CoreSend))
        }
        Opcode::SetLtUI => {
            desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetLtU), N::CoreSend)
        }
        Opcode::SetLtUIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetLtU), N::CoreSend))
        }
        Opcode::SetGteI => {
            desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetGte), N::CoreSend)
        }
        Opcode::SetGteIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetGte), N::CoreSend))
        }
        Opcode::SetGteUI => {
            desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetGteU), N::CoreSend)
        }
        Opcode::SetGteUIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::SetGteU), N::CoreSend))
        }
        Opcode::AddUI => desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::AddU), N::CoreSend),
        Opcode::AddUIP => {
            sets_pred(desc(Format::R2, L::Dest1Src1Imm, C::Alu(Function::AddU), N::CoreSend))
        }

        Opcode::SllI => desc(Format::R2s, L::Dest1Src1Imm, C::Alu(Function::Sll), N::CoreSend),
        Opcode::SrlI => desc(Format::R2s, L::Dest1Src1Imm, C::Alu(Function::Srl), N::CoreSend),
        Opcode::SrlIP => {
            sets_pred(desc(Format::R2s, L::Dest1Src1Imm, C::Alu(Function::Srl), N::CoreSend))
        }
        Opcode::SraI => desc(Format::R2s, L::Dest1Src1Imm, C::Alu(Function::Sra), N::CoreSend),

        Opcode::Psel => {
            reads_pred(desc(Format::R3, L::Dest2Src, C::Alu(Function::Psel), N::CoreSend))
        }
        Opcode::MulHw => {
            let mut d = desc(Format::R3, L::Dest2Src, C::Alu(Function::MulHw), N::CoreSend);
            d.extra_latency = 1;
            d
        }
        Opcode::MulLw => {
            let mut d = desc(Format::R3, L::Dest2Src, C::Alu(Function::MulLw), N::CoreSend);
            d.extra_latency = 1;
            d
        }
        Opcode::MulHwU => {
            let mut d = desc(Format::R3, L::Dest2Src, C::Alu(Function::MulHwU), N::CoreSend);
            d.extra_latency = 1;
            d
        }
        Opcode::Clz => desc(Format::R2, L::Dest1Src, C::Alu(Function::Clz), N::CoreSend),

        Opcode::Lli => desc(Format::R1nc, L::Dest1Imm, C::Lli, N::None),
        Opcode::Lui => desc(Format::R1nc, L::Dest1SrcShared1Imm, C::Lui, N::None),

        Opcode::ScratchRd => desc(Format::R2, L::Dest1Src, C::ScratchpadRead, N::CoreSend),
        Opcode::ScratchRdI => desc(Format::R1, L::Dest1Imm, C::ScratchpadRead, N::CoreSend),
        Opcode::ScratchWr => desc(Format::R2nc, L::NoDest2Src, C::ScratchpadWrite, N::None),
        Opcode::ScratchWrI => desc(Format::R1nc, L::NoDest1Src1Imm, C::ScratchpadWrite, N::None),

        Opcode::GetChMap => desc(Format::R2, L::Dest1Src, C::CmtRead, N::CoreSend),
        Opcode::GetChMapI => desc(Format::R1, L::Dest1Imm, C::CmtRead, N::CoreSend),
        Opcode::SetChMap => desc(Format::R2nc, L::NoDest2Src, C::CmtWrite, N::None),
        Opcode::SetChMapI => desc(Format::R1nc, L::NoDest1Src1Imm, C::CmtWrite, N::None),

        Opcode::CRegRdI => desc(Format::R1, L::Dest1Imm, C::CregRead, N::CoreSend),
        Opcode::CRegWrI => desc(Format::R1nc, L::NoDest1Src1Imm, C::CregWrite, N::None),

        Opcode::LdW => desc(
            Format::R1,
            L::NoDest1Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 1, op: MemoryOpcode::LoadW },
        ),
        Opcode::LdHwU => desc(
            Format::R1,
            L::NoDest1Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 1, op: MemoryOpcode::LoadHw },
        ),
        Opcode::LdBU => desc(
            Format::R1,
            L::NoDest1Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 1, op: MemoryOpcode::LoadB },
        ),
        Opcode::LdL => desc(
            Format::R1,
            L::NoDest1Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 1, op: MemoryOpcode::LoadLinked },
        ),
        Opcode::StW => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::StoreW },
        ),
        Opcode::StHw => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::StoreHw },
        ),
        Opcode::StB => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::StoreB },
        ),
        Opcode::StC => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::StoreConditional },
        ),
        Opcode::LdAdd => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::LoadAndAdd },
        ),
        Opcode::LdOr => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::LoadAndOr },
        ),
        Opcode::LdAnd => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::LoadAndAnd },
        ),
        Opcode::LdXor => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::LoadAndXor },
        ),
        Opcode::Exchange => desc(
            Format::R2,
            L::NoDest2Src1Imm,
            C::MemoryAddress,
            N::MemorySend { flits: 2, op: MemoryOpcode::Exchange },
        ),

        Opcode::Fetch => early(desc(
            Format::R1nc,
            L::NoDest1Src,
            C::Fetch(fetch(false, false, true, false)),
            N::None,
        )),
        Opcode::FetchR => early(desc(
            Format::Ff,
            L::NoDest1Imm,
            C::Fetch(fetch(true, false, true, false)),
            N::None,
        )),
        Opcode::FetchPst => early(desc(
            Format::R1nc,
            L::NoDest1Src,
            C::Fetch(fetch(false, true, true, false)),
            N::None,
        )),
        Opcode::FetchPstR => early(desc(
            Format::Ff,
            L::NoDest1Imm,
            C::Fetch(fetch(true, true, true, false)),
            N::None,
        )),
        Opcode::Fill => early(desc(
            Format::R1nc,
            L::NoDest1Src,
            C::Fetch(fetch(false, false, false, false)),
            N::None,
        )),
        Opcode::FillR => early(desc(
            Format::Ff,
            L::NoDest1Imm,
            C::Fetch(fetch(true, false, false, false)),
            N::None,
        )),
        Opcode::PselFetch => reads_pred(early(desc(
            Format::R2nc,
            L::NoDest2Src,
            C::Fetch(fetch(false, false, true, true)),
            N::None,
        ))),
        Opcode::PselFetchR => reads_pred(early(desc(
            Format::Pff,
            L::NoDest2Imm,
            C::Fetch(fetch(true, false, true, true)),
            N::None,
        ))),

        Opcode::IbJmp => early(desc(Format::R0nc, L::NoDest1Imm, C::InBufferJump, N::None)),
        Opcode::NxIpk => early(desc(Format::R0nc, L::None, C::NextIpk, N::None)),
        Opcode::RmtExecute => early(desc(Format::R0, L::None, C::RemoteExecute, N::None)),
        Opcode::RmtNxIpk => desc(Format::R0, L::None, C::RemoteNextIpk, N::CoreSend),

        Opcode::TstChI => early(desc(Format::R1, L::Dest1Imm, C::TestChannel, N::CoreSend)),
        Opcode::TstChIP => {
            sets_pred(early(desc(Format::R1, L::Dest1Imm, C::TestChannel, N::CoreSend)))
        }
        Opcode::SelCh => early(desc(Format::R1nc, L::Dest1Imm, C::SelectChannel, N::None)),
        Opcode::Woche => early(desc(Format::R0, L::NoDest1Imm, C::WaitChannelEnd, N::None)),

        Opcode::SendConfig => desc(Format::R1, L::NoDest1Src1Imm, C::SendConfig, N::Config),
        Opcode::SysCall => desc(Format::R0nc, L::NoDest1Imm, C::Syscall, N::None),

        Opcode::IRdr => desc(Format::R2, L::Dest1Src, C::IndirectRead, N::CoreSend),
        Opcode::IWtr => desc(Format::R2, L::DestIndirect1Src, C::IndirectWrite, N::CoreSend),
    }
}
