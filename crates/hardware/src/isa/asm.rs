//! Assembly text: parsing and printing.
//!
//! The human-readable form of an instruction is
//!
//! ```text
//! [predicate?]opcode[.p][.eop] rd rs rt immediate [-> channel]
//! ```
//!
//! Comments begin with `;`, `#`, or `%`. Immediates may be plain integers
//! (decimal or `0x` hex), `(tile,pos,ch)` component-address tuples,
//! `(mXXXXXXXX,ch)` multicast addresses, or load/store `offset(rN)`
//! notation. Label lines end in `:` and are resolved by an external
//! assembler; this parser only classifies them.
//!
//! This module provides:
//! 1. **`parse_line`:** A line classifier returning blank/label/instruction,
//!    with parse failures carrying file-position context at the caller.
//! 2. **`disassemble`:** The canonical printed form; parsing it back yields
//!    the identical encoding.

use super::descriptor::{descriptor, OperandLayout};
use super::encoding::{Instruction, Predicate};
use super::opcodes::{Format, Function, Opcode};
use crate::common::constants::NO_CHANNEL;
use crate::common::data::ChannelId;
use crate::common::TileId;

/// The classification of one line of assembly text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmLine {
    /// Blank, or nothing but a comment.
    Blank,
    /// A label definition (`name:`), left to the external linker.
    Label(String),
    /// An encoded instruction.
    Instruction(Instruction),
}

/// Parses one line of assembly.
///
/// # Errors
///
/// Returns a description of the problem (unknown mnemonic, malformed
/// operand). The caller attaches file/line context.
pub fn parse_line(line: &str) -> Result<AsmLine, String> {
    // Strip comments: everything from the first ';', '#' or '%'.
    let code = line
        .split(|c| c == ';' || c == '#' || c == '%')
        .next()
        .unwrap_or("")
        .trim();
    if code.is_empty() {
        return Ok(AsmLine::Blank);
    }
    if let Some(label) = code.strip_suffix(':') {
        if !label.contains(char::is_whitespace) {
            return Ok(AsmLine::Label(label.to_string()));
        }
    }

    // Split off the remote channel: "... -> ch".
    let (body, channel) = match code.split_once("->") {
        Some((body, ch)) => {
            let channel = parse_immediate(ch.trim())?;
            (body.trim(), Some(channel))
        }
        None => (code, None),
    };

    let mut words = body.split_whitespace();
    let mnemonic = words.next().ok_or_else(|| "empty instruction".to_string())?;
    let (opcode, function, predicate) = parse_mnemonic(mnemonic)?;

    let mut inst = Instruction::default()
        .with_opcode_bits(opcode.to_bits())
        .with_predicate(predicate);
    if matches!(opcode, Opcode::Alu | Opcode::AluP) {
        inst = inst.with_function_bits(function.unwrap_or_default() as u8);
    }

    let format = opcode.format();
    if let Some(ch) = channel {
        inst = inst.with_channel(ch as u8);
    } else if has_channel_field(format) {
        inst = inst.with_channel(NO_CHANNEL);
    }

    // Gather the operand fields. Registers fill reg slots in order;
    // anything else is an immediate.
    let mut regs: Vec<u8> = Vec::new();
    let mut immediates: Vec<i32> = Vec::new();
    for word in words {
        match parse_field(word)? {
            Field::Register(r) => regs.push(r),
            Field::Immediate(v) => immediates.push(v),
            Field::Offset { offset, base } => {
                immediates.push(offset);
                regs.push(base);
            }
        }
    }

    let expected_regs = register_fields(opcode);
    if regs.len() != expected_regs {
        return Err(format!(
            "{mnemonic} expects {expected_regs} register operand(s), found {}",
            regs.len()
        ));
    }
    for (slot, reg) in regs.iter().enumerate() {
        inst = match slot {
            0 => inst.with_reg1(*reg),
            1 => inst.with_reg2(*reg),
            _ => inst.with_reg3(*reg),
        };
    }

    match format {
        Format::Pff => {
            if immediates.len() != 2 {
                return Err(format!("{mnemonic} expects two immediates"));
            }
            inst = inst.with_immediate(format, immediates[0]).with_immediate2(immediates[1]);
        }
        Format::R3 => {
            if !immediates.is_empty() {
                return Err(format!("{mnemonic} takes no immediate"));
            }
        }
        _ => {
            if immediates.len() > 1 {
                return Err(format!("{mnemonic} takes at most one immediate"));
            }
            if let Some(&imm) = immediates.first() {
                inst = inst.with_immediate(format, imm);
            }
        }
    }

    Ok(AsmLine::Instruction(inst))
}

/// Prints the canonical textual form of an instruction.
pub fn disassemble(inst: Instruction) -> String {
    let Some(opcode) = inst.opcode() else {
        return format!(".word {:#010x}", inst.raw());
    };
    let function = match opcode {
        Opcode::Alu | Opcode::AluP => {
            Function::from_bits(inst.function_bits()).unwrap_or_default()
        }
        _ => opcode.implied_function().unwrap_or_default(),
    };

    let mut out = String::new();
    match inst.predicate() {
        Predicate::IfP => out.push_str("p?"),
        Predicate::IfNotP => out.push_str("!p?"),
        Predicate::Always | Predicate::EndOfPacket => {}
    }
    out.push_str(opcode.name(function));
    if inst.predicate() == Predicate::EndOfPacket {
        out.push_str(".eop");
    }

    let format = opcode.format();
    let desc = descriptor(opcode, function);
    let fields = [inst.reg1(), inst.reg2(), inst.reg3()];
    for reg in &fields[..desc.layout.register_fields_used()] {
        out.push_str(&format!(" r{reg}"));
    }

    match format {
        Format::R3 => {}
        Format::Pff => {
            out.push_str(&format!(" {} {}", inst.immediate(format), inst.immediate2()));
        }
        _ => out.push_str(&format!(" {}", inst.immediate(format))),
    }

    if has_channel_field(format) && inst.channel() != NO_CHANNEL {
        out.push_str(&format!(" -> {}", inst.channel()));
    }
    out
}

impl OperandLayout {
    /// Number of `regN` encoding fields this layout occupies (destination
    /// included), which is what the printed form shows.
    const fn register_fields_used(self) -> usize {
        match self {
            Self::None | Self::NoDest1Imm | Self::NoDest2Imm => 0,
            Self::NoDest1Src
            | Self::Dest1Imm
            | Self::Dest1SrcShared1Imm
            | Self::NoDest1Src1Imm => 1,
            Self::Dest1Src
            | Self::NoDest2Src
            | Self::Dest1Src1Imm
            | Self::NoDest2Src1Imm
            | Self::DestIndirect1Src => 2,
            Self::Dest2Src => 3,
        }
    }
}

/// One parsed operand field.
enum Field {
    Register(u8),
    Immediate(i32),
    Offset { offset: i32, base: u8 },
}

fn parse_mnemonic(word: &str) -> Result<(Opcode, Option<Function>, Predicate), String> {
    // Predicate prefix: "p?", "!p?", "ifp?", "if!p?".
    let (predicate, rest) = if let Some(rest) = word.strip_prefix("p?") {
        (Predicate::IfP, rest)
    } else if let Some(rest) = word.strip_prefix("!p?") {
        (Predicate::IfNotP, rest)
    } else if let Some(rest) = word.strip_prefix("ifp?") {
        (Predicate::IfP, rest)
    } else if let Some(rest) = word.strip_prefix("if!p?") {
        (Predicate::IfNotP, rest)
    } else {
        (Predicate::Always, word)
    };

    // ".eop" marks the end of the packet and is not part of the mnemonic.
    let (rest, predicate) = match rest.strip_suffix(".eop") {
        Some(stripped) => (stripped, Predicate::EndOfPacket),
        None => (rest, predicate),
    };

    let (opcode, function) =
        Opcode::from_name(rest).ok_or_else(|| format!("unknown operation: {rest}"))?;
    Ok((opcode, function, predicate))
}

/// Number of register operands the printed form of this opcode carries.
fn register_fields(opcode: Opcode) -> usize {
    descriptor(opcode, Function::default()).layout.register_fields_used()
}

const fn has_channel_field(format: Format) -> bool {
    matches!(format, Format::R0 | Format::R1 | Format::R2 | Format::R2s | Format::R3)
}

fn parse_field(word: &str) -> Result<Field, String> {
    if let Some(reg) = word.strip_prefix('r') {
        if let Ok(index) = reg.parse::<u8>() {
            return Ok(Field::Register(index));
        }
    }

    // Load/store notation: "offset(rN)".
    if let Some((offset, rest)) = word.split_once('(') {
        if !word.starts_with('(') {
            let base = rest
                .strip_suffix(')')
                .and_then(|r| r.strip_prefix('r'))
                .and_then(|r| r.parse::<u8>().ok())
                .ok_or_else(|| format!("malformed operand: {word}"))?;
            let offset = parse_number(offset)?;
            return Ok(Field::Offset { offset, base });
        }
    }

    parse_immediate(word).map(Field::Immediate)
}

/// Parses the immediate notations: integers, `(tile,pos,ch)` tuples, and
/// `(mXXXXXXXX,ch)` multicast addresses.
fn parse_immediate(word: &str) -> Result<i32, String> {
    if let Some(tuple) = word.strip_prefix('(').and_then(|w| w.strip_suffix(')')) {
        let parts: Vec<&str> = tuple.split(',').map(str::trim).collect();
        return match parts.as_slice() {
            [mask, channel] => {
                let mask = mask
                    .strip_prefix('m')
                    .ok_or_else(|| format!("expected multicast mask in {word}"))?;
                let mut bits: u8 = 0;
                for (i, c) in mask.chars().rev().enumerate() {
                    match c {
                        '1' => bits |= 1 << i,
                        '0' => {}
                        _ => return Err(format!("bad multicast mask: {word}")),
                    }
                }
                let channel = parse_number(channel)?;
                Ok(ChannelId::multicast(bits, channel as u8).encoded() as i32)
            }
            [tile_x, tile_y, pos, channel] => {
                let tile = TileId::new(parse_number(tile_x)? as u8, parse_number(tile_y)? as u8);
                Ok(ChannelId::new(tile, parse_number(pos)? as u8, parse_number(channel)? as u8)
                    .encoded() as i32)
            }
            [tile, pos, channel] => {
                let tile = TileId::from_flat(parse_number(tile)? as u32);
                Ok(ChannelId::new(tile, parse_number(pos)? as u8, parse_number(channel)? as u8)
                    .encoded() as i32)
            }
            _ => Err(format!("bad tuple: {word}")),
        };
    }
    parse_number(word)
}

fn parse_number(word: &str) -> Result<i32, String> {
    let word = word.trim();
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| format!("bad number: {word}"))?;
    let value = if negative { -magnitude } else { magnitude };
    Ok(value as i32)
}
