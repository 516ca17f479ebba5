//! Round-trip laws for the instruction set.
//!
//! 1. `assemble(disassemble(I)) == I` for every legal encoded instruction.
//! 2. `ChannelId` encode/decode is the identity on its fields.
//! 3. Channel map entries round-trip through their packed encoding.

use proptest::prelude::*;

use loki_core::common::{ChannelId, TileId};
use loki_core::core::channel_map::{ChannelMapTable, MemoryView};
use loki_core::isa::asm::{disassemble, parse_line, AsmLine};
use loki_core::isa::{Format, Function, Instruction, Opcode, Predicate};

/// Every defined opcode encoding.
fn all_opcodes() -> Vec<Opcode> {
    (0..=127u8).filter_map(Opcode::from_bits).collect()
}

/// ALU functions legal for the predicate-setting twin (opcode 1).
const ALU_P_FUNCTIONS: [Function; 13] = [
    Function::Nor,
    Function::And,
    Function::Or,
    Function::Xor,
    Function::SetEq,
    Function::SetNe,
    Function::SetLt,
    Function::SetLtU,
    Function::SetGte,
    Function::SetGteU,
    Function::Srl,
    Function::AddU,
    Function::SubU,
];

/// ALU functions legal for the plain register-register group (opcode 0).
const ALU_FUNCTIONS: [Function; 15] = [
    Function::Nor,
    Function::And,
    Function::Or,
    Function::Xor,
    Function::SetEq,
    Function::SetNe,
    Function::SetLt,
    Function::SetLtU,
    Function::SetGte,
    Function::SetGteU,
    Function::Sll,
    Function::Srl,
    Function::Sra,
    Function::AddU,
    Function::SubU,
];

/// Builds a legal instruction from free choices of its fields, setting
/// only the fields the opcode's format actually encodes.
fn build_instruction(
    opcode: Opcode,
    function_index: usize,
    regs: (u8, u8, u8),
    imm: i32,
    imm2: i32,
    channel: u8,
    predicate_bits: u32,
) -> Instruction {
    let format = opcode.format();
    let mut inst = Instruction::default()
        .with_opcode_bits(opcode.to_bits())
        .with_predicate(Predicate::from_bits(predicate_bits));

    match opcode {
        Opcode::Alu => {
            inst = inst.with_function_bits(ALU_FUNCTIONS[function_index % 15] as u8);
        }
        Opcode::AluP => {
            inst = inst.with_function_bits(ALU_P_FUNCTIONS[function_index % 13] as u8);
        }
        _ => {}
    }

    let (r1, r2, r3) = (regs.0 & 0x1F, regs.1 & 0x1F, regs.2 & 0x1F);
    match format {
        Format::R3 => {
            inst = inst.with_reg1(r1).with_reg2(r2).with_reg3(r3).with_channel(channel);
        }
        Format::R2 | Format::R2s => {
            inst = inst
                .with_reg1(r1)
                .with_reg2(r2)
                .with_channel(channel)
                .with_immediate(format, imm);
        }
        Format::R2nc => {
            inst = inst.with_reg1(r1).with_reg2(r2).with_immediate(format, imm);
        }
        Format::R1 => {
            inst = inst.with_reg1(r1).with_channel(channel).with_immediate(format, imm);
        }
        Format::R1nc => {
            inst = inst.with_reg1(r1).with_immediate(format, imm);
        }
        Format::R0 => {
            inst = inst.with_channel(channel).with_immediate(format, imm);
        }
        Format::R0nc | Format::Ff => {
            inst = inst.with_immediate(format, imm);
        }
        Format::Pff => {
            inst = inst.with_immediate(format, imm).with_immediate2(imm2);
        }
    }
    inst
}

proptest! {
    #[test]
    fn assemble_of_disassemble_is_identity(
        opcode_index in 0usize..80,
        function_index in 0usize..15,
        regs in (0u8..32, 0u8..32, 0u8..32),
        imm in any::<i32>(),
        imm2 in any::<i32>(),
        channel in 0u8..16,
        predicate_bits in 0u32..4,
    ) {
        let opcodes = all_opcodes();
        let opcode = opcodes[opcode_index % opcodes.len()];
        let inst = build_instruction(
            opcode, function_index, regs, imm, imm2, channel, predicate_bits,
        );

        let text = disassemble(inst);
        match parse_line(&text) {
            Ok(AsmLine::Instruction(parsed)) => {
                prop_assert_eq!(parsed.raw(), inst.raw(), "text was {}", text);
            }
            other => prop_assert!(false, "{} failed to re-parse: {:?}", text, other),
        }
    }

    #[test]
    fn channel_id_round_trips(
        x in 0u8..16, y in 0u8..16, position in 0u8..=255, channel in 0u8..16,
    ) {
        let id = ChannelId::new(TileId::new(x, y), position, channel);
        let back = ChannelId::from_encoded(id.encoded());
        prop_assert_eq!(back.tile(), TileId::new(x, y));
        prop_assert_eq!(back.position(), position);
        prop_assert_eq!(back.channel(), channel);
        prop_assert!(!back.is_multicast());
    }

    #[test]
    fn multicast_channel_id_round_trips(mask in any::<u8>(), channel in 0u8..16) {
        let id = ChannelId::multicast(mask, channel);
        let back = ChannelId::from_encoded(id.encoded());
        prop_assert!(back.is_multicast());
        prop_assert_eq!(back.position(), mask);
        prop_assert_eq!(back.channel(), channel);
    }

    #[test]
    fn cmt_entries_round_trip(
        entry in 0u32..16,
        x in 0u8..16, y in 0u8..16,
        position in 0u8..=255,
        channel in 0u8..16,
        bank in 0u8..8,
        group_shift in 0u32..4,
        return_channel in 0u8..8,
        line_shift in 2u32..8,
        scratchpad in any::<bool>(),
        memory_view in any::<bool>(),
    ) {
        let mut cmt = ChannelMapTable::new(16, 4);
        let encoded = if memory_view {
            MemoryView {
                tile: TileId::new(x, y),
                bank,
                group_size: 1 << group_shift,
                return_channel,
                line_bytes: 1 << line_shift,
                scratchpad,
            }
            .encode()
        } else {
            ChannelId::new(TileId::new(x, y), position, channel).encoded()
        };
        cmt.write(entry, encoded);
        prop_assert_eq!(cmt.read(entry), encoded);
    }
}

#[test]
fn every_opcode_disassembles_to_a_known_mnemonic() {
    for opcode in all_opcodes() {
        if matches!(opcode, Opcode::Alu | Opcode::AluP) {
            continue;
        }
        let inst = Instruction::default().with_opcode_bits(opcode.to_bits());
        let text = disassemble(inst);
        assert!(
            !text.starts_with(".word"),
            "{opcode:?} fell back to a raw word: {text}"
        );
    }
}
