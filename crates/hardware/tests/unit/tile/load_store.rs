//! Load/store round trips through a memory bank.

use pretty_assertions::assert_eq;

use loki_core::common::TileId;
use loki_core::core::channel_map::MemoryView;

use crate::common::harness::TestContext;

/// A memory view of bank 0 answering on input channel 4 (register r18).
fn bank_view() -> MemoryView {
    MemoryView {
        tile: TileId::new(0, 0),
        bank: 0,
        group_size: 1,
        return_channel: 4,
        line_bytes: 32,
        scratchpad: false,
    }
}

#[test]
fn store_then_load_returns_the_value() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(2, bank_view().encode());
    ctx.set_reg(0, 3, 5);
    ctx.set_reg(0, 4, 0x100);
    // Store r3 at r4+16, load it back, and consume the response from the
    // channel-mapped register.
    ctx.load_program(
        0,
        0x400,
        "stw r3 r4 16 -> 2\n\
         ldw r4 16 -> 2\n\
         addu.eop r7 r18 r0",
    );
    ctx.run(120);

    assert_eq!(ctx.reg(0, 7), 5);
    assert_eq!(ctx.sim.chip.memory.read_word(0x110, &ctx.sim.chip.warnings.clone()), 5);
}

#[test]
fn byte_and_halfword_loads_zero_extend() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(2, bank_view().encode());
    let warnings = ctx.sim.chip.warnings.clone();
    ctx.sim.chip.memory.write_word(0x200, 0xFFFF_FFEE, &warnings);
    ctx.set_reg(0, 4, 0x200);
    ctx.load_program(
        0,
        0x400,
        "ldbu r4 0 -> 2\n\
         addu r8 r18 r0\n\
         ldhwu r4 0 -> 2\n\
         addu.eop r9 r18 r0",
    );
    ctx.run(150);
    assert_eq!(ctx.reg(0, 8), 0xEE);
    assert_eq!(ctx.reg(0, 9), 0xFFEE);
}

#[test]
fn atomic_add_returns_the_old_value_and_updates_memory() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(2, bank_view().encode());
    let warnings = ctx.sim.chip.warnings.clone();
    ctx.sim.chip.memory.write_word(0x300, 40, &warnings);
    ctx.set_reg(0, 3, 2);
    ctx.set_reg(0, 4, 0x300);
    ctx.load_program(
        0,
        0x400,
        "ldadd r3 r4 0 -> 2\n\
         addu.eop r8 r18 r0",
    );
    ctx.run(120);
    assert_eq!(ctx.reg(0, 8), 40);
    assert_eq!(ctx.sim.chip.memory.read_word(0x300, &warnings), 42);
}

// With a group of four banks and 32-byte lines, addresses one line apart
// go to adjacent banks, wrapping around the group.
#[rstest::rstest]
#[case(0x000, 0)]
#[case(0x020, 1)]
#[case(0x040, 2)]
#[case(0x060, 3)]
#[case(0x080, 0)]
#[case(0x0A8, 1)]
fn bank_groups_stripe_by_address(#[case] address: u32, #[case] bank: u8) {
    let view = MemoryView { group_size: 4, ..bank_view() };
    assert_eq!(view.bank_offset(address), bank);
}
