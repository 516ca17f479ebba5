//! Fetching instruction packets from memory banks: misses, multi-line
//! continuation, prefetch, and persistence breaking.

use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

/// Places an assembled program into background memory at `base`.
fn place_in_memory(ctx: &mut TestContext, base: u32, program: &str) {
    let code = TestContext::assemble(program);
    let warnings = ctx.sim.chip.warnings.clone();
    for (i, inst) in code.iter().enumerate() {
        ctx.sim.chip.memory.write_word(base + i as u32 * 4, inst.raw(), &warnings);
    }
}

#[test]
fn a_missed_fetch_streams_the_packet_from_a_bank() {
    let mut ctx = TestContext::new();
    place_in_memory(
        &mut ctx,
        0x40,
        "addui r3 r0 11\n\
         addui.eop r4 r3 1",
    );
    // Boot: fetch the packet 16 instructions past this one-instruction
    // packet at address 0 (CMT entry 0 is unset, so the fetch uses the
    // default local memory view).
    ctx.load_program(0, 0, "fetchr.eop 16");
    ctx.run(100);

    assert_eq!(ctx.reg(0, 3), 11);
    assert_eq!(ctx.reg(0, 4), 12);
    assert!(ctx.sim.chip.stats.fetches_sent >= 1);
}

#[test]
fn long_packets_continue_across_cache_lines() {
    let mut ctx = TestContext::new();
    // Ten instructions starting at 0x40 cross the 32-byte line boundary
    // at 0x60: the fetch stage must issue a continuation request.
    let mut program = String::new();
    for _ in 0..9 {
        program.push_str("addui r3 r3 1\n");
    }
    program.push_str("addui.eop r3 r3 1\n");
    place_in_memory(&mut ctx, 0x40, &program);
    ctx.load_program(0, 0, "fetchr.eop 16");
    ctx.run(200);

    assert_eq!(ctx.reg(0, 3), 10);
    // One initial request plus at least one line continuation.
    assert!(
        ctx.sim.chip.stats.fetches_sent >= 2,
        "no continuation request was sent"
    );
}

#[test]
fn fill_prefetches_without_executing() {
    let mut ctx = TestContext::new();
    place_in_memory(&mut ctx, 0x80, "addui.eop r5 r0 3");
    ctx.set_reg(0, 10, 0x80);
    // fill brings the packet in but must not run it.
    ctx.load_program(0, 0, "fill.eop r10");
    ctx.run(100);
    assert_eq!(ctx.reg(0, 5), 0, "prefetched packet must not execute");

    // A later fetch of the same address hits the cache without another
    // memory request.
    let requests_before = ctx.sim.chip.stats.fetches_sent;
    let hits_before = ctx.sim.chip.stats.tag_hits;
    ctx.core(0).fetch.check_tags(
        0x80,
        loki_core::isa::FetchKind {
            relative: false,
            persistent: false,
            execute: true,
            predicated: false,
        },
        loki_core::core::channel_map::MemoryView::local_default(
            loki_core::common::TileId::new(0, 0),
        ),
    );
    ctx.run(60);
    assert_eq!(ctx.reg(0, 5), 3);
    assert_eq!(ctx.sim.chip.stats.fetches_sent, requests_before);
    assert!(ctx.sim.chip.stats.tag_hits > hits_before);
}

#[test]
fn a_fetch_can_return_into_the_instruction_fifo() {
    let mut ctx = TestContext::new();
    place_in_memory(&mut ctx, 0x40, "addui.eop r6 r0 21");
    // CMT entry 0 routes fetches to bank 0 with responses into the FIFO
    // (return channel 0) instead of the cache.
    let view = loki_core::core::channel_map::MemoryView {
        tile: loki_core::common::TileId::new(0, 0),
        bank: 0,
        group_size: 1,
        return_channel: 0,
        line_bytes: 32,
        scratchpad: false,
    };
    ctx.core(0).cmt.write(0, view.encode());
    ctx.load_program(0, 0, "fetchr.eop 16");
    ctx.run(100);

    assert_eq!(ctx.reg(0, 6), 21);
}

#[test]
fn a_new_fetch_breaks_persistent_mode() {
    let mut ctx = TestContext::new();
    // The persistent loop immediately fetches a finisher packet, which
    // must take over after the current iteration.
    ctx.load_program(0, 0, "fetchpstr.eop 4");
    ctx.load_program(
        0,
        0x10,
        "addui r3 r3 1\n\
         fetch.eop r10",
    );
    ctx.load_program(0, 0x40, "addui.eop r4 r0 9");
    ctx.set_reg(0, 10, 0x40);
    ctx.run(120);

    assert_eq!(ctx.reg(0, 4), 9, "the fetched packet never ran");
    assert_eq!(ctx.reg(0, 3), 1, "the persistent loop kept iterating");
    assert!(ctx.core(0).is_idle());
}
