//! Instruction-packet execution from a preloaded cache.

use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

#[test]
fn preloaded_packet_runs_to_its_end_marker() {
    let mut ctx = TestContext::new();
    ctx.load_program(
        0,
        0,
        "addui r3 r0 1\n\
         addui r4 r0 2\n\
         addu.eop r5 r3 r4",
    );
    ctx.run(30);

    assert_eq!(ctx.reg(0, 3), 1);
    assert_eq!(ctx.reg(0, 4), 2);
    assert_eq!(ctx.reg(0, 5), 3);

    // All three instructions were read: the pointers meet, the store is
    // empty, and the last read carried the end-of-packet marker.
    let cache = &ctx.core(0).fetch.cache;
    assert!(cache.finished_packet_read());
    assert!(cache.pointers_match());
    assert!(cache.is_empty());
}

#[test]
fn r1_tracks_the_current_packet_address() {
    let mut ctx = TestContext::new();
    ctx.load_program(0, 0x240, "addui.eop r3 r0 1");
    ctx.run(20);
    assert_eq!(ctx.reg(0, 1), 0x240);
}

#[test]
fn ibjmp_skips_within_the_packet() {
    let mut ctx = TestContext::new();
    // The jump hops over the instruction that would clobber r3.
    ctx.load_program(
        0,
        0x100,
        "addui r3 r0 5\n\
         ibjmp 2\n\
         addui r3 r0 99\n\
         addui.eop r4 r3 1",
    );
    ctx.run(40);
    assert_eq!(ctx.reg(0, 3), 5);
    assert_eq!(ctx.reg(0, 4), 6);
}

#[test]
fn predicated_ibjmp_implements_loops() {
    let mut ctx = TestContext::new();
    ctx.load_program(
        0,
        0x100,
        "addui r3 r0 10\n\
         addui r4 r0 0\n\
         addui r4 r4 1\n\
         setlt.p r0 r4 r3\n\
         p?ibjmp -2\n\
         addui.eop r5 r4 100",
    );
    ctx.run(300);
    assert_eq!(ctx.reg(0, 4), 10);
    assert_eq!(ctx.reg(0, 5), 110);
}

#[test]
fn core_goes_idle_after_its_packet() {
    let mut ctx = TestContext::new();
    ctx.load_program(0, 0, "addui.eop r3 r0 1");
    ctx.run(30);
    assert!(ctx.core(0).is_idle());
}
