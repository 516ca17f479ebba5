//! The instruction set: opcodes, ALU function codes, and encoding formats.
//!
//! This module is the single listing of every operation the architecture
//! defines. It provides:
//! 1. **`Opcode`:** All primary opcodes with their numeric encodings.
//!    Plain ALU operations share opcode 0 (opcode 1 for the
//!    predicate-setting `.p` twins) and select their computation with the
//!    four-bit function field.
//! 2. **`Function`:** The ALU function codes used by three-register
//!    operations.
//! 3. **`Format`:** The ten encoding formats; each opcode maps to exactly
//!    one.
//! 4. **Name tables:** Mnemonic to opcode and back, for the assembler and
//!    disassembler.

/// Primary opcodes.
///
/// The discriminants are the wire encodings of the 7-bit opcode field.
/// Opcodes 0 and 1 cover the whole register-register ALU group; the
/// function field picks the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Register-register ALU operation (function field selects which).
    Alu = 0,
    /// Register-register ALU operation that also sets the predicate.
    AluP = 1,
    /// Bitwise NOR with immediate.
    NorI = 2,
    /// `nori.p`: NOR-immediate, also sets the predicate.
    NorIP = 3,
    /// Select between two registers on the predicate.
    Psel = 4,
    /// Terminate the current instruction packet immediately.
    NxIpk = 5,
    /// Bitwise AND with immediate.
    AndI = 6,
    /// `andi.p`.
    AndIP = 7,
    /// Multiply, high word of the signed product.
    MulHw = 8,
    /// Bitwise OR with immediate.
    OrI = 10,
    /// `ori.p`.
    OrIP = 11,
    /// Multiply, low word of the product.
    MulLw = 12,
    /// Bitwise XOR with immediate.
    XorI = 14,
    /// `xori.p`.
    XorIP = 15,
    /// Multiply, high word of the unsigned product.
    MulHwU = 16,
    /// Set if equal, immediate.
    SetEqI = 18,
    /// `seteqi.p`.
    SetEqIP = 19,
    /// Set if not equal, immediate.
    SetNeI = 22,
    /// `setnei.p`.
    SetNeIP = 23,
    /// Set if less than, immediate.
    SetLtI = 26,
    /// `setlti.p`.
    SetLtIP = 27,
    /// Set if less than unsigned, immediate.
    SetLtUI = 30,
    /// `setltui.p`.
    SetLtUIP = 31,
    /// Store conditional.
    StC = 32,
    /// Set if greater than or equal, immediate.
    SetGteI = 34,
    /// `setgtei.p`.
    SetGteIP = 35,
    /// Atomic load-and-add.
    LdAdd = 36,
    /// Set if greater than or equal unsigned, immediate.
    SetGteUI = 38,
    /// `setgteui.p`.
    SetGteUIP = 39,
    /// Atomic load-and-or.
    LdOr = 40,
    /// Shift left logical by immediate.
    SllI = 42,
    /// Atomic load-and-and.
    LdAnd = 44,
    /// Shift right logical by immediate.
    SrlI = 46,
    /// `srli.p`.
    SrlIP = 47,
    /// Atomic load-and-xor.
    LdXor = 48,
    /// Shift right arithmetic by immediate.
    SraI = 50,
    /// Atomic exchange.
    Exchange = 52,
    /// Add unsigned with immediate.
    AddUI = 54,
    /// `addui.p`.
    AddUIP = 55,
    /// Count leading zeros.
    Clz = 62,
    /// Indirect register write: the first register names the destination.
    IWtr = 64,
    /// Send a next-instruction-packet command to a remote core.
    RmtNxIpk = 65,
    /// Load word.
    LdW = 66,
    /// Load linked.
    LdL = 67,
    /// Fetch from one of two register addresses, chosen by the predicate.
    PselFetch = 68,
    /// Enter remote-execution mode: forward the rest of the packet.
    RmtExecute = 69,
    /// Load half-word unsigned.
    LdHwU = 70,
    /// Send a flit with caller-supplied metadata.
    SendConfig = 71,
    /// Store word.
    StW = 72,
    /// System call.
    SysCall = 73,
    /// Load byte unsigned.
    LdBU = 74,
    /// Write the scratchpad, register-addressed.
    ScratchWr = 76,
    /// Jump by an instruction offset within the current packet.
    IbJmp = 77,
    /// Write the scratchpad, immediate-addressed.
    ScratchWrI = 78,
    /// Write a channel map table entry, register-addressed.
    SetChMap = 80,
    /// Wait until an output channel's credits are fully returned.
    Woche = 81,
    /// Write a channel map table entry, immediate-addressed.
    SetChMapI = 82,
    /// Store half-word.
    StHw = 84,
    /// Fetch a packet at an offset from the current packet.
    FetchR = 85,
    /// Fetch a packet at a register address.
    Fetch = 86,
    /// Store byte.
    StB = 88,
    /// Prefetch (no jump) at an offset from the current packet.
    FillR = 89,
    /// Persistent fetch at a register address.
    FetchPst = 90,
    /// Load upper immediate.
    Lui = 92,
    /// Persistent fetch at an offset from the current packet.
    FetchPstR = 93,
    /// Prefetch (no jump) at a register address.
    Fill = 94,
    /// Write a control register.
    CRegWrI = 95,
    /// Predicated fetch between two packet offsets.
    PselFetchR = 96,
    /// Select a ready input channel from a bitmask.
    SelCh = 97,
    /// Indirect register read.
    IRdr = 98,
    /// Read a control register.
    CRegRdI = 99,
    /// Test whether an input channel holds data.
    TstChI = 101,
    /// `tstchi.p`.
    TstChIP = 103,
    /// Read a channel map table entry, immediate-addressed.
    GetChMapI = 105,
    /// Read a channel map table entry, register-addressed.
    GetChMap = 106,
    /// Load lower immediate.
    Lli = 107,
    /// Read the scratchpad, immediate-addressed.
    ScratchRdI = 109,
    /// Read the scratchpad, register-addressed.
    ScratchRd = 110,
}

/// ALU function codes, selected by the four-bit function field of the
/// three-register format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Function {
    /// Bitwise NOR.
    Nor = 0,
    /// Bitwise AND.
    And = 1,
    /// Bitwise OR.
    #[default]
    Or = 2,
    /// Bitwise XOR.
    Xor = 3,
    /// Set if equal.
    SetEq = 4,
    /// Set if not equal.
    SetNe = 5,
    /// Set if less than (signed).
    SetLt = 6,
    /// Set if less than (unsigned).
    SetLtU = 7,
    /// Set if greater than or equal (signed).
    SetGte = 8,
    /// Set if greater than or equal (unsigned).
    SetGteU = 9,
    /// Shift left logical.
    Sll = 10,
    /// Shift right logical.
    Srl = 11,
    /// Shift right arithmetic.
    Sra = 12,
    /// Add (no overflow trap).
    AddU = 13,
    /// Subtract (no overflow trap).
    SubU = 14,
    /// Predicated select.
    Psel = 16,
    /// Multiply, high word signed.
    MulHw = 17,
    /// Multiply, low word.
    MulLw = 18,
    /// Multiply, high word unsigned.
    MulHwU = 19,
    /// Count leading zeros.
    Clz = 20,
    /// Remote next-instruction-packet (shares the ALU encoding space).
    RmtNxIpk = 31,
}

/// Instruction encoding formats.
///
/// Determines which bit ranges are register operands, which are the
/// immediate, and whether the outbound channel field exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Fetch format: 23-bit signed immediate.
    Ff,
    /// Predicated fetch format: two signed immediates (16 + 7 bits).
    Pff,
    /// Zero registers, channel field, 14-bit immediate.
    R0,
    /// Zero registers, no channel, 14-bit immediate.
    R0nc,
    /// One register, channel field, 14-bit immediate.
    R1,
    /// One register, no channel, 16-bit immediate.
    R1nc,
    /// Two registers, channel field, 9-bit immediate.
    R2,
    /// Two registers, no channel, 9-bit immediate.
    R2nc,
    /// Two registers, channel field, 5-bit shift amount.
    R2s,
    /// Three registers, channel field, function field.
    R3,
}

impl Function {
    /// Decodes a four/five-bit function code.
    pub const fn from_bits(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Nor,
            1 => Self::And,
            2 => Self::Or,
            3 => Self::Xor,
            4 => Self::SetEq,
            5 => Self::SetNe,
            6 => Self::SetLt,
            7 => Self::SetLtU,
            8 => Self::SetGte,
            9 => Self::SetGteU,
            10 => Self::Sll,
            11 => Self::Srl,
            12 => Self::Sra,
            13 => Self::AddU,
            14 => Self::SubU,
            16 => Self::Psel,
            17 => Self::MulHw,
            18 => Self::MulLw,
            19 => Self::MulHwU,
            20 => Self::Clz,
            31 => Self::RmtNxIpk,
            _ => return None,
        })
    }

    /// Extra execute-stage cycles this function needs beyond the first.
    /// Multiplies take one extra cycle; everything else completes in one.
    pub const fn extra_latency(self) -> u8 {
        match self {
            Self::MulHw | Self::MulLw | Self::MulHwU => 1,
            _ => 0,
        }
    }
}

impl Opcode {
    /// Decodes the 7-bit opcode field. Returns `None` for undefined
    /// encodings.
    pub const fn from_bits(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Alu,
            1 => Self::AluP,
            2 => Self::NorI,
            3 => Self::NorIP,
            4 => Self::Psel,
            5 => Self::NxIpk,
            6 => Self::AndI,
            7 => Self::AndIP,
            8 => Self::MulHw,
            10 => Self::OrI,
            11 => Self::OrIP,
            12 => Self::MulLw,
            14 => Self::XorI,
            15 => Self::XorIP,
            16 => Self::MulHwU,
            18 => Self::SetEqI,
            19 => Self::SetEqIP,
            22 => Self::SetNeI,
            23 => Self::SetNeIP,
            26 => Self::SetLtI,
            27 => Self::SetLtIP,
            30 => Self::SetLtUI,
            31 => Self::SetLtUIP,
            32 => Self::StC,
            34 => Self::SetGteI,
            35 => Self::SetGteIP,
            36 => Self::LdAdd,
            38 => Self::SetGteUI,
            39 => Self::SetGteUIP,
            40 => Self::LdOr,
            42 => Self::SllI,
            44 => Self::LdAnd,
            46 => Self::SrlI,
            47 => Self::SrlIP,
            48 => Self::LdXor,
            50 => Self::SraI,
            52 => Self::Exchange,
            54 => Self::AddUI,
            55 => Self::AddUIP,
            62 => Self::Clz,
            64 => Self::IWtr,
            65 => Self::RmtNxIpk,
            66 => Self::LdW,
            67 => Self::LdL,
            68 => Self::PselFetch,
            69 => Self::RmtExecute,
            70 => Self::LdHwU,
            71 => Self::SendConfig,
            72 => Self::StW,
            73 => Self::SysCall,
            74 => Self::LdBU,
            76 => Self::ScratchWr,
            77 => Self::IbJmp,
            78 => Self::ScratchWrI,
            80 => Self::SetChMap,
            81 => Self::Woche,
            82 => Self::SetChMapI,
            84 => Self::StHw,
            85 => Self::FetchR,
            86 => Self::Fetch,
            88 => Self::StB,
            89 => Self::FillR,
            90 => Self::FetchPst,
            92 => Self::Lui,
            93 => Self::FetchPstR,
            94 => Self::Fill,
            95 => Self::CRegWrI,
            96 => Self::PselFetchR,
            97 => Self::SelCh,
            98 => Self::IRdr,
            99 => Self::CRegRdI,
            101 => Self::TstChI,
            103 => Self::TstChIP,
            105 => Self::GetChMapI,
            106 => Self::GetChMap,
            107 => Self::Lli,
            109 => Self::ScratchRdI,
            110 => Self::ScratchRd,
            _ => return None,
        })
    }

    /// The wire encoding of this opcode.
    pub const fn to_bits(self) -> u8 {
        self as u8
    }

    /// The encoding format of this opcode.
    pub const fn format(self) -> Format {
        match self {
            Self::Alu
            | Self::AluP
            | Self::Psel
            | Self::MulHw
            | Self::MulLw
            | Self::MulHwU => Format::R3,

            Self::NorI
            | Self::NorIP
            | Self::AndI
            | Self::AndIP
            | Self::OrI
            | Self::OrIP
            | Self::XorI
            | Self::XorIP
            | Self::SetEqI
            | Self::SetEqIP
            | Self::SetNeI
            | Self::SetNeIP
            | Self::SetLtI
            | Self::SetLtIP
            | Self::SetLtUI
            | Self::SetLtUIP
            | Self::SetGteI
            | Self::SetGteIP
            | Self::SetGteUI
            | Self::SetGteUIP
            | Self::AddUI
            | Self::AddUIP
            | Self::Clz
            | Self::IWtr
            | Self::IRdr
            | Self::GetChMap
            | Self::ScratchRd
            | Self::StC
            | Self::LdAdd
            | Self::LdOr
            | Self::LdAnd
            | Self::LdXor
            | Self::Exchange
            | Self::StW
            | Self::StHw
            | Self::StB => Format::R2,

            Self::SllI | Self::SrlI | Self::SrlIP | Self::SraI => Format::R2s,

            Self::SetChMap | Self::ScratchWr | Self::PselFetch => Format::R2nc,

            Self::LdW
            | Self::LdL
            | Self::LdHwU
            | Self::LdBU
            | Self::SendConfig
            | Self::GetChMapI
            | Self::ScratchRdI
            | Self::CRegRdI
            | Self::TstChI
            | Self::TstChIP => Format::R1,

            Self::SelCh
            | Self::Fetch
            | Self::FetchPst
            | Self::Fill
            | Self::Lui
            | Self::Lli
            | Self::ScratchWrI
            | Self::SetChMapI
            | Self::CRegWrI => Format::R1nc,

            Self::FetchR | Self::FetchPstR | Self::FillR => Format::Ff,

            Self::PselFetchR => Format::Pff,

            Self::RmtNxIpk | Self::RmtExecute | Self::Woche => Format::R0,

            Self::NxIpk | Self::SysCall | Self::IbJmp => Format::R0nc,
        }
    }

    /// Whether this opcode also writes the predicate register.
    pub const fn sets_predicate(self) -> bool {
        matches!(
            self,
            Self::AluP
                | Self::NorIP
                | Self::AndIP
                | Self::OrIP
                | Self::XorIP
                | Self::SetEqIP
                | Self::SetNeIP
                | Self::SetLtIP
                | Self::SetLtUIP
                | Self::SetGteIP
                | Self::SetGteUIP
                | Self::SrlIP
                | Self::AddUIP
                | Self::TstChIP
        )
    }

    /// Whether this opcode's immediate is signed. Shift amounts are the
    /// only unsigned immediates.
    pub const fn signed_immediate(self) -> bool {
        !matches!(self, Self::SllI | Self::SrlI | Self::SrlIP | Self::SraI)
    }

    /// The ALU function an immediate-form opcode computes with, if it is an
    /// ALU operation at all. Register-register forms return `None` here and
    /// take their function from the encoding.
    pub const fn implied_function(self) -> Option<Function> {
        Some(match self {
            Self::NorI | Self::NorIP => Function::Nor,
            Self::AndI | Self::AndIP => Function::And,
            Self::OrI | Self::OrIP => Function::Or,
            Self::XorI | Self::XorIP => Function::Xor,
            Self::SetEqI | Self::SetEqIP => Function::SetEq,
            Self::SetNeI | Self::SetNeIP => Function::SetNe,
            Self::SetLtI | Self::SetLtIP => Function::SetLt,
            Self::SetLtUI | Self::SetLtUIP => Function::SetLtU,
            Self::SetGteI | Self::SetGteIP => Function::SetGte,
            Self::SetGteUI | Self::SetGteUIP => Function::SetGteU,
            Self::SllI => Function::Sll,
            Self::SrlI | Self::SrlIP => Function::Srl,
            Self::SraI => Function::Sra,
            Self::AddUI | Self::AddUIP => Function::AddU,
            Self::Psel => Function::Psel,
            Self::MulHw => Function::MulHw,
            Self::MulLw => Function::MulLw,
            Self::MulHwU => Function::MulHwU,
            Self::Clz => Function::Clz,
            _ => return None,
        })
    }

    /// Looks an opcode up by mnemonic. ALU register-register mnemonics
    /// (`addu`, `nor.p`, ...) resolve to [`Opcode::Alu`]/[`Opcode::AluP`]
    /// plus a function returned separately.
    pub fn from_name(name: &str) -> Option<(Self, Option<Function>)> {
        // Register-register ALU group: opcode 0, or 1 for the ".p" twin.
        let alu = |f: Function| Some((Self::Alu, Some(f)));
        let alu_p = |f: Function| Some((Self::AluP, Some(f)));

        match name {
            "nor" => alu(Function::Nor),
            "and" => alu(Function::And),
            "or" => alu(Function::Or),
            "xor" => alu(Function::Xor),
            "seteq" => alu(Function::SetEq),
            "setne" => alu(Function::SetNe),
            "setlt" => alu(Function::SetLt),
            "setltu" => alu(Function::SetLtU),
            "setgte" => alu(Function::SetGte),
            "setgteu" => alu(Function::SetGteU),
            "sll" => alu(Function::Sll),
            "srl" => alu(Function::Srl),
            "sra" => alu(Function::Sra),
            "addu" => alu(Function::AddU),
            "subu" => alu(Function::SubU),
            "nor.p" => alu_p(Function::Nor),
            "and.p" => alu_p(Function::And),
            "or.p" => alu_p(Function::Or),
            "xor.p" => alu_p(Function::Xor),
            "seteq.p" => alu_p(Function::SetEq),
            "setne.p" => alu_p(Function::SetNe),
            "setlt.p" => alu_p(Function::SetLt),
            "setltu.p" => alu_p(Function::SetLtU),
            "setgte.p" => alu_p(Function::SetGte),
            "setgteu.p" => alu_p(Function::SetGteU),
            "srl.p" => alu_p(Function::Srl),
            "addu.p" => alu_p(Function::AddU),
            "subu.p" => alu_p(Function::SubU),
            _ => Self::simple_from_name(name).map(|op| (op, op.implied_function())),
        }
    }

    fn simple_from_name(name: &str) -> Option<Self> {
        Some(match name {
            "nori" => Self::NorI,
            "nori.p" => Self::NorIP,
            "psel" => Self::Psel,
            "nxipk" => Self::NxIpk,
            "andi" => Self::AndI,
            "andi.p" => Self::AndIP,
            "mulhw" => Self::MulHw,
            "ori" => Self::OrI,
            "ori.p" => Self::OrIP,
            "mullw" => Self::MulLw,
            "xori" => Self::XorI,
            "xori.p" => Self::XorIP,
            "mulhwu" => Self::MulHwU,
            "seteqi" => Self::SetEqI,
            "seteqi.p" => Self::SetEqIP,
            "setnei" => Self::SetNeI,
            "setnei.p" => Self::SetNeIP,
            "setlti" => Self::SetLtI,
            "setlti.p" => Self::SetLtIP,
            "setltui" => Self::SetLtUI,
            "setltui.p" => Self::SetLtUIP,
            "stc" => Self::StC,
            "setgtei" => Self::SetGteI,
            "setgtei.p" => Self::SetGteIP,
            "ldadd" => Self::LdAdd,
            "setgteui" => Self::SetGteUI,
            "setgteui.p" => Self::SetGteUIP,
            "ldor" => Self::LdOr,
            "slli" => Self::SllI,
            "ldand" => Self::LdAnd,
            "srli" => Self::SrlI,
            "srli.p" => Self::SrlIP,
            "ldxor" => Self::LdXor,
            "srai" => Self::SraI,
            "exchange" => Self::Exchange,
            "addui" => Self::AddUI,
            "addui.p" => Self::AddUIP,
            "clz" => Self::Clz,
            "iwtr" => Self::IWtr,
            "rmtnxipk" => Self::RmtNxIpk,
            "ldw" => Self::LdW,
            "ldl" => Self::LdL,
            "psel.fetch" => Self::PselFetch,
            "rmtexecute" => Self::RmtExecute,
            "ldhwu" => Self::LdHwU,
            "sendconfig" => Self::SendConfig,
            "stw" => Self::StW,
            "syscall" => Self::SysCall,
            "ldbu" => Self::LdBU,
            "scratchwr" => Self::ScratchWr,
            "ibjmp" => Self::IbJmp,
            "scratchwri" => Self::ScratchWrI,
            "setchmap" => Self::SetChMap,
            "woche" => Self::Woche,
            "setchmapi" => Self::SetChMapI,
            "sthw" => Self::StHw,
            "fetchr" => Self::FetchR,
            "fetch" => Self::Fetch,
            "stb" => Self::StB,
            "fillr" => Self::FillR,
            "fetchpst" => Self::FetchPst,
            "lui" => Self::Lui,
            "fetchpstr" => Self::FetchPstR,
            "fill" => Self::Fill,
            "cregwri" => Self::CRegWrI,
            "psel.fetchr" => Self::PselFetchR,
            "selch" => Self::SelCh,
            "irdr" => Self::IRdr,
            "cregrdi" => Self::CRegRdI,
            "tstchi" => Self::TstChI,
            "tstchi.p" => Self::TstChIP,
            "getchmapi" => Self::GetChMapI,
            "getchmap" => Self::GetChMap,
            "lli" => Self::Lli,
            "scratchrdi" => Self::ScratchRdI,
            "scratchrd" => Self::ScratchRd,
            _ => return None,
        })
    }

    /// The canonical mnemonic. For the ALU group the function chooses the
    /// name.
    pub const fn name(self, function: Function) -> &'static str {
        match self {
            Self::Alu => Self::alu_name(function, false),
            Self::AluP => Self::alu_name(function, true),
            Self::NorI => "nori",
            Self::NorIP => "nori.p",
            Self::Psel => "psel",
            Self::NxIpk => "nxipk",
            Self::AndI => "andi",
            Self::AndIP => "andi.p",
            Self::MulHw => "mulhw",
            Self::OrI => "ori",
            Self::OrIP => "ori.p",
            Self::MulLw => "mullw",
            Self::XorI => "xori",
            Self::XorIP => "xori.p",
            Self::MulHwU => "mulhwu",
            Self::SetEqI => "seteqi",
            Self::SetEqIP => "seteqi.p",
            Self::SetNeI => "setnei",
            Self::SetNeIP => "setnei.p",
            Self::SetLtI => "setlti",
            Self::SetLtIP => "setlti.p",
            Self::SetLtUI => "setltui",
            Self::SetLtUIP => "setltui.p",
            Self::StC => "stc",
            Self::SetGteI => "setgtei",
            Self::SetGteIP => "setgtei.p",
            Self::LdAdd => "ldadd",
            Self::SetGteUI => "setgteui",
            Self::SetGteUIP => "setgteui.p",
            Self::LdOr => "ldor",
            Self::SllI => "slli",
            Self::LdAnd => "ldand",
            Self::SrlI => "srli",
            Self::SrlIP => "srli.p",
            Self::LdXor => "ldxor",
            Self::SraI => "srai",
            Self::Exchange => "exchange",
            Self::AddUI => "addui",
            Self::AddUIP => "addui.p",
            Self::Clz => "clz",
            Self::IWtr => "iwtr",
            Self::RmtNxIpk => "rmtnxipk",
            Self::LdW => "ldw",
            Self::LdL => "ldl",
            Self::PselFetch => "psel.fetch",
            Self::RmtExecute => "rmtexecute",
            Self::LdHwU => "ldhwu",
            Self::SendConfig => "sendconfig",
            Self::StW => "stw",
            Self::SysCall => "syscall",
            Self::LdBU => "ldbu",
            Self::ScratchWr => "scratchwr",
            Self::IbJmp => "ibjmp",
            Self::ScratchWrI => "scratchwri",
            Self::SetChMap => "setchmap",
            Self::Woche => "woche",
            Self::SetChMapI => "setchmapi",
            Self::StHw => "sthw",
            Self::FetchR => "fetchr",
            Self::Fetch => "fetch",
            Self::StB => "stb",
            Self::FillR => "fillr",
            Self::FetchPst => "fetchpst",
            Self::Lui => "lui",
            Self::FetchPstR => "fetchpstr",
            Self::Fill => "fill",
            Self::CRegWrI => "cregwri",
            Self::PselFetchR => "psel.fetchr",
            Self::SelCh => "selch",
            Self::IRdr => "irdr",
            Self::CRegRdI => "cregrdi",
            Self::TstChI => "tstchi",
            Self::TstChIP => "tstchi.p",
            Self::GetChMapI => "getchmapi",
            Self::GetChMap => "getchmap",
            Self::Lli => "lli",
            Self::ScratchRdI => "scratchrdi",
            Self::ScratchRd => "scratchrd",
        }
    }

    const fn alu_name(function: Function, sets_predicate: bool) -> &'static str {
        if sets_predicate {
            match function {
                Function::Nor => "nor.p",
                Function::And => "and.p",
                Function::Or => "or.p",
                Function::Xor => "xor.p",
                Function::SetEq => "seteq.p",
                Function::SetNe => "setne.p",
                Function::SetLt => "setlt.p",
                Function::SetLtU => "setltu.p",
                Function::SetGte => "setgte.p",
                Function::SetGteU => "setgteu.p",
                Function::Srl => "srl.p",
                Function::AddU => "addu.p",
                Function::SubU => "subu.p",
                _ => "alu.p",
            }
        } else {
            match function {
                Function::Nor => "nor",
                Function::And => "and",
                Function::Or => "or",
                Function::Xor => "xor",
                Function::SetEq => "seteq",
                Function::SetNe => "setne",
                Function::SetLt => "setlt",
                Function::SetLtU => "setltu",
                Function::SetGte => "setgte",
                Function::SetGteU => "setgteu",
                Function::Sll => "sll",
                Function::Srl => "srl",
                Function::Sra => "sra",
                Function::AddU => "addu",
                Function::SubU => "subu",
                Function::Psel => "psel",
                Function::MulHw => "mulhw",
                Function::MulLw => "mullw",
                Function::MulHwU => "mulhwu",
                Function::Clz => "clz",
                Function::RmtNxIpk => "rmtnxipk",
            }
        }
    }
}
