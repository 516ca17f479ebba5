//! Channel management: core-to-core sends, channel tests and selection,
//! and waiting on returned credits.

use pretty_assertions::assert_eq;

use loki_core::common::{ChannelId, Flit, TileId};

use crate::common::harness::TestContext;

/// A unicast mapping to `position`'s input channel `channel`.
fn core_input(position: u8, channel: u8) -> ChannelId {
    ChannelId::new(TileId::new(0, 0), position, channel)
}

#[test]
fn core_to_core_send_and_blocking_receive() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(1, core_input(1, 4).encoded());
    ctx.set_reg(0, 3, 1234);
    ctx.load_program(0, 0x100, "addui.eop r0 r3 0 -> 1");
    // The receiver starts first and blocks on its empty channel register.
    ctx.load_program(1, 0x200, "addu.eop r9 r18 r0");
    ctx.run(60);

    assert_eq!(ctx.reg(1, 9), 1234);
    assert!(ctx.core(0).is_idle());
    assert!(ctx.core(1).is_idle());
}

#[test]
fn tstchi_reports_channel_occupancy_without_consuming() {
    let mut ctx = TestContext::new();
    // Channel end 2 (network channel 4) holds one flit; channel end 3 is
    // empty.
    ctx.core(0).deliver(&Flit::core_data(7, core_input(0, 4), true));
    ctx.load_program(
        0,
        0x100,
        "tstchi r5 2\n\
         tstchi.eop r6 3",
    );
    ctx.run(40);

    assert_eq!(ctx.reg(0, 5), 1);
    assert_eq!(ctx.reg(0, 6), 0);
    // The test is non-destructive: the flit is still there.
    assert!(ctx.core(0).channel_ends.has_data(2));
}

#[test]
fn tstchi_p_latches_the_occupancy_into_the_predicate() {
    let mut ctx = TestContext::new();
    ctx.core(0).deliver(&Flit::core_data(7, core_input(0, 4), true));
    ctx.load_program(0, 0x100, "tstchi.p.eop r5 2");
    ctx.run(40);
    assert!(ctx.core(0).predicate.read());
}

#[test]
fn selch_picks_a_ready_channel_as_a_register_index() {
    let mut ctx = TestContext::new();
    // Only channel end 1 (network channel 3) has data.
    ctx.core(0).deliver(&Flit::core_data(5, core_input(0, 3), true));
    ctx.load_program(0, 0x100, "selch.eop r5 6");
    ctx.run(40);

    // Channel end 1 aliases r17: the result is usable with irdr.
    assert_eq!(ctx.reg(0, 5), 17);
}

#[test]
fn woche_waits_until_every_credit_returns() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(1, core_input(1, 4).encoded());
    ctx.set_reg(0, 3, 9);
    ctx.load_program(
        0,
        0x100,
        "addui r0 r3 0 -> 1\n\
         woche.eop 1",
    );
    ctx.run(60);

    // The flit is unconsumed: a credit is outstanding and woche blocks.
    assert!(!ctx.core(0).is_idle());

    let _ = ctx.core(1).channel_ends.read(2);
    ctx.run(30);
    assert!(ctx.core(0).is_idle());
}

#[test]
fn flits_between_one_pair_arrive_in_emission_order() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(1, core_input(1, 4).encoded());
    // Three sends in program order; the receiver drains them in order.
    ctx.load_program(
        0,
        0x100,
        "addui r0 r0 11 -> 1\n\
         addui r0 r0 22 -> 1\n\
         addui.eop r0 r0 33 -> 1",
    );
    ctx.run(80);

    let ends = &mut ctx.core(1).channel_ends;
    assert_eq!(ends.read(2), Some(11));
    assert_eq!(ends.read(2), Some(22));
    assert_eq!(ends.read(2), Some(33));
}

#[test]
fn sendconfig_controls_the_flit_metadata() {
    let mut ctx = TestContext::new();
    ctx.core(0).cmt.write(1, core_input(1, 4).encoded());
    ctx.set_reg(0, 3, 0x55);
    // Metadata bit 0 marks end-of-packet.
    ctx.load_program(0, 0x100, "sendconfig.eop r3 1 -> 1");
    ctx.run(60);

    let flit = ctx.core(1).channel_ends.peek(2).copied();
    assert_eq!(flit.map(|f| f.payload), Some(0x55));
    assert_eq!(flit.map(|f| f.end_of_packet), Some(true));
}
