//! Remote execution and remote packet control.

use pretty_assertions::assert_eq;

use loki_core::common::constants::FIFO_CHANNEL;
use loki_core::common::{ChannelId, TileId};

use crate::common::harness::TestContext;

/// A unicast mapping to another core's instruction FIFO.
fn fifo_of(position: u8) -> ChannelId {
    ChannelId::new(TileId::new(0, 0), position, FIFO_CHANNEL)
}

#[test]
fn rmtexecute_runs_the_rest_of_the_packet_remotely() {
    let mut ctx = TestContext::new();
    ctx.core(1).cmt.write(5, fifo_of(0).encoded());
    // Everything after rmtexecute is forwarded, not executed locally; the
    // receiver runs it from its FIFO.
    ctx.load_program(
        1,
        0x100,
        "rmtexecute -> 5\n\
         addui.eop r9 r0 42",
    );
    ctx.run(80);

    assert_eq!(ctx.reg(0, 9), 42, "receiver never executed the forwarded code");
    assert_eq!(ctx.reg(1, 9), 0, "sender must not execute forwarded code");
}

#[test]
fn rmtnxipk_cancels_a_remote_persistent_loop() {
    let mut ctx = TestContext::new();
    // Core 0 runs a persistent loop.
    ctx.load_program(0, 0, "fetchpstr.eop 4");
    ctx.load_program(
        0,
        0x10,
        "addui r3 r3 1\n\
         or r0 r0 r0\n\
         or.eop r0 r0 r0",
    );
    ctx.run(60);
    assert!(ctx.reg(0, 3) >= 1);

    // Core 1 sends the remote next-packet command.
    ctx.core(1).cmt.write(5, fifo_of(0).encoded());
    ctx.load_program(1, 0x100, "rmtnxipk.eop -> 5");
    ctx.run(30);

    let stopped_at = ctx.reg(0, 3);
    ctx.run(60);
    assert_eq!(ctx.reg(0, 3), stopped_at, "loop survived rmtnxipk");
}
