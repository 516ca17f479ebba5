//! Multicast delivery and its credit accounting.
//!
//! A multicast send consumes one credit and one output slot; the crossbar
//! duplicates the flit to every selected core, and each receiver returns a
//! credit when it consumes its copy.

use pretty_assertions::assert_eq;

use loki_core::common::ChannelId;

use crate::common::harness::TestContext;

#[test]
fn multicast_reaches_every_selected_core() {
    let mut ctx = TestContext::new();
    // Sender at position 1, receivers at positions 0 and 2, channel 4
    // (channel end 2 on each receiver).
    ctx.core(1).cmt.write(3, ChannelId::multicast(0b101, 4).encoded());
    ctx.set_reg(1, 7, 0xAB);
    ctx.load_program(1, 0x100, "or.eop r0 r7 r0 -> 3");
    ctx.run(40);

    for receiver in [0usize, 2] {
        let payload = ctx.core(receiver).channel_ends.peek(2).map(|f| f.payload);
        assert_eq!(payload, Some(0xAB), "receiver {receiver}");
    }
    // The unselected core saw nothing.
    assert!(!ctx.core(1).channel_ends.has_data(2));
}

#[test]
fn multicast_consumes_one_credit_and_both_receivers_return_one() {
    let mut ctx = TestContext::new();
    let max_credits = ctx.config.core.max_credits;
    ctx.core(1).cmt.write(3, ChannelId::multicast(0b101, 4).encoded());
    ctx.set_reg(1, 7, 1);
    ctx.load_program(1, 0x100, "or.eop r0 r7 r0 -> 3");
    ctx.run(40);

    // Sent but unconsumed: exactly one credit is outstanding.
    assert_eq!(
        ctx.core(1).cmt.entry(3).credits_available(),
        max_credits - 1
    );
    assert_eq!(ctx.sim.chip.stats.credits_delivered, 0);

    // Each receiver consumes its copy; each consumption returns a credit.
    for receiver in [0usize, 2] {
        let _ = ctx.core(receiver).channel_ends.read(2);
    }
    ctx.run(10);
    assert_eq!(ctx.sim.chip.stats.credits_delivered, 2);
    // The counter saturates at its configured maximum.
    assert_eq!(ctx.core(1).cmt.entry(3).credits_available(), max_credits);
}

#[test]
fn exhausted_credits_stall_the_sender_until_consumption() {
    let mut ctx = TestContext::new();
    let max_credits = ctx.config.core.max_credits as u32;
    ctx.core(1).cmt.write(3, ChannelId::multicast(0b001, 4).encoded());
    ctx.set_reg(1, 7, 7);
    // One more send than there are credits.
    let sends = max_credits + 1;
    let mut program = String::new();
    for i in 0..sends {
        let marker = if i + 1 == sends { ".eop" } else { "" };
        program.push_str(&format!("addui{marker} r7 r7 1 -> 3\n"));
    }
    ctx.load_program(1, 0x100, &program);
    ctx.run(60);

    // The final send is stuck waiting for a credit; the receiver's buffer
    // holds the earlier flits.
    assert_eq!(ctx.core(1).cmt.entry(3).credits_available(), 0);

    // Consuming one flit frees one credit and unblocks the last send.
    let _ = ctx.core(0).channel_ends.read(2);
    ctx.run(30);
    assert!(ctx.core(1).is_idle());
}
