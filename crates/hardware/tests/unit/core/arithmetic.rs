//! Arithmetic and predicate behaviour through the full pipeline.
//!
//! Covers the add / set-predicate / predicated-select sequence, result
//! forwarding between adjacent instructions, and squashing of instructions
//! whose predicate is false.

use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

#[test]
fn add_sets_predicate_then_psel_selects() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 5);
    ctx.set_reg(0, 4, 7);
    ctx.load_program(
        0,
        0x100,
        "addu r5 r3 r4 -> 0\n\
         setgtei.p r0 r5 10\n\
         psel.eop r6 r3 r4",
    );
    ctx.run(30);

    // 5 + 7 = 12; 12 >= 10 so the predicate is set; psel picks the first
    // operand while the predicate holds.
    assert_eq!(ctx.reg(0, 5), 12);
    assert_eq!(ctx.reg(0, 6), 5);
    assert!(ctx.core(0).predicate.read());
}

#[test]
fn forwarding_supplies_the_previous_result() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 1);
    // Each instruction consumes the one before it with no gaps.
    ctx.load_program(
        0,
        0x100,
        "addui r4 r3 1\n\
         addui r5 r4 1\n\
         addui.eop r6 r5 1",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 4), 2);
    assert_eq!(ctx.reg(0, 5), 3);
    assert_eq!(ctx.reg(0, 6), 4);
}

#[test]
fn false_predicate_squashes_all_side_effects() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 10);
    // Predicate starts clear: the p? instruction must not write, and the
    // !p? one must.
    ctx.load_program(
        0,
        0x100,
        "p?addui r4 r3 1\n\
         !p?addui.eop r5 r3 2",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 4), 0);
    assert_eq!(ctx.reg(0, 5), 12);
}

#[test]
fn squashed_producer_does_not_forward() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 4, 100);
    // The squashed instruction names r4; its consumer must fall back to
    // the register file's value.
    ctx.load_program(
        0,
        0x100,
        "p?addui r4 r4 1\n\
         addui.eop r5 r4 0",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 5), 100);
}

#[test]
fn subtract_borrow_drives_the_predicate() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 1);
    ctx.set_reg(0, 4, 2);
    ctx.load_program(0, 0x100, "subu.p r5 r3 r4\npsel.eop r6 r3 r4");
    ctx.run(30);
    // 1 - 2 borrows, so the predicate is set and psel picks operand 1.
    assert_eq!(ctx.reg(0, 6), 1);
}

#[test]
fn multiply_takes_an_extra_cycle_but_completes() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 6);
    ctx.set_reg(0, 4, 7);
    ctx.load_program(0, 0x100, "mullw.eop r5 r3 r4");
    ctx.run(30);
    assert_eq!(ctx.reg(0, 5), 42);
}

#[test]
fn lui_and_lli_compose_a_full_word() {
    let mut ctx = TestContext::new();
    ctx.load_program(
        0,
        0x100,
        "lli r7 0x1234\n\
         lui.eop r7 0xABCD",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 7), 0xABCD_1234);
}

#[test]
fn scratchpad_read_back() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 3, 99);
    ctx.load_program(
        0,
        0x100,
        "scratchwri r3 17\n\
         scratchrdi.eop r6 17",
    );
    ctx.run(30);
    assert_eq!(ctx.reg(0, 6), 99);
}
