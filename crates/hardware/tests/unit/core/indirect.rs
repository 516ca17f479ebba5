//! Indirect register access and structure read/write instructions.

use pretty_assertions::assert_eq;

use loki_core::common::{ChannelId, TileId};
use loki_core::core::cregs::CREG_INSTRUCTION_COUNT;

use crate::common::harness::TestContext;

#[test]
fn iwtr_writes_the_register_the_pointer_names() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 7); // Pointer: write into r7.
    ctx.set_reg(0, 4, 55);
    ctx.load_program(0, 0x100, "iwtr.eop r3 r4");
    ctx.run(30);
    assert_eq!(ctx.reg(0, 7), 55);
}

#[test]
fn iwtr_result_is_not_forwarded() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 7);
    ctx.set_reg(0, 4, 55);
    ctx.set_reg(0, 7, 1);
    // An indirect write never feeds the bypass: the adjacent consumer of
    // r7 reads the register file's old value. One instruction later the
    // commit is visible.
    ctx.load_program(
        0,
        0x100,
        "iwtr r3 r4\n\
         addui r8 r7 0\n\
         or r0 r0 r0\n\
         addui.eop r9 r7 0",
    );
    ctx.run(40);
    assert_eq!(ctx.reg(0, 8), 1);
    assert_eq!(ctx.reg(0, 9), 55);
}

#[test]
fn irdr_reads_the_register_the_pointer_names() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 9); // Pointer: read r9.
    ctx.set_reg(0, 9, 99);
    ctx.load_program(0, 0x100, "irdr.eop r5 r3");
    ctx.run(30);
    assert_eq!(ctx.reg(0, 5), 99);
}

#[test]
fn setchmap_and_getchmap_round_trip_through_the_pipeline() {
    let mut ctx = TestContext::new();
    let encoded = ChannelId::new(TileId::new(0, 0), 3, 5).encoded();
    ctx.set_reg(0, 3, encoded);
    ctx.set_reg(0, 4, 6); // Table entry 6.
    ctx.load_program(
        0,
        0x100,
        "setchmap r3 r4\n\
         getchmap.eop r5 r4",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 5), encoded);
    assert_eq!(ctx.core(0).cmt.read(6), encoded);
}

#[test]
fn control_registers_read_back_and_count_instructions() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 0xFEED);
    ctx.load_program(
        0,
        0x100,
        "cregwri r3 5\n\
         cregrdi.eop r6 5",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 6), 0xFEED);
    // Both instructions were counted by the executed-instruction register.
    assert_eq!(ctx.core(0).cregs.read(CREG_INSTRUCTION_COUNT), 2);
}

#[test]
fn scratchpad_indexes_by_register_too() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 77); // Value.
    ctx.set_reg(0, 4, 12); // Address.
    ctx.load_program(
        0,
        0x100,
        "scratchwr r3 r4\n\
         scratchrd.eop r6 r4",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 6), 77);
}
