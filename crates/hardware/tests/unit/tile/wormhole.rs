//! Wormhole serialisation: competing multi-flit packets never interleave.

use pretty_assertions::assert_eq;

use loki_core::common::TileId;
use loki_core::core::channel_map::MemoryView;

use crate::common::harness::TestContext;

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
fn simultaneous_stores_to_one_bank_both_land() {
    let mut ctx = TestContext::new();
    // Two cores issue two-flit store packets to the same bank in the same
    // cycle. If the crossbar interleaved them, each head would pair with
    // the wrong payload and the wrong values would land.
    for (core, value, address) in [(0usize, 0xAAu32, 0x100u32), (1, 0xBB, 0x200)] {
        ctx.core(core).cmt.write(2, bank_view().encode());
        ctx.set_reg(core, 3, value);
        ctx.set_reg(core, 4, address);
        ctx.load_program(core, 0x400 + core as u32 * 0x40, "stw.eop r3 r4 0 -> 2");
    }
    ctx.run(150);

    let warnings = ctx.sim.chip.warnings.clone();
    assert_eq!(ctx.sim.chip.memory.read_word(0x100, &warnings), 0xAA);
    assert_eq!(ctx.sim.chip.memory.read_word(0x200, &warnings), 0xBB);
}

#[test]
fn many_competing_stores_serialise_cleanly() {
    let mut ctx = TestContext::new();
    let cores = ctx.config.tile.cores.min(4);
    for core in 0..cores {
        ctx.core(core).cmt.write(2, bank_view().encode());
        ctx.set_reg(core, 3, 0x1000 + core as u32);
        ctx.set_reg(core, 4, 0x500 + core as u32 * 4);
        ctx.load_program(core, 0x800 + core as u32 * 0x40, "stw.eop r3 r4 0 -> 2");
    }
    ctx.run(300);

    let warnings = ctx.sim.chip.warnings.clone();
    for core in 0..cores {
        assert_eq!(
            ctx.sim.chip.memory.read_word(0x500 + core as u32 * 4, &warnings),
            0x1000 + core as u32,
            "core {core}'s store was corrupted"
        );
    }
}
