//! Persistent packets: repetition until an external `nxipk`.

use loki_core::common::constants::FIFO_CHANNEL;
use loki_core::common::{ChannelId, Flit, TileId};
use loki_core::isa::{Instruction, Opcode};

use crate::common::harness::TestContext;

/// Preloads a boot packet that persistently fetches a three-instruction
/// loop, also preloaded, which increments r3 once per iteration.
fn start_looping(ctx: &mut TestContext) {
    // Boot packet at address 0: fetch the loop at 0x10 persistently.
    ctx.load_program(0, 0, "fetchpstr.eop 4");
    // The loop body: one increment plus two fillers.
    ctx.load_program(
        0,
        0x10,
        "addui r3 r3 1\n\
         or r0 r0 r0\n\
         or.eop r0 r0 r0",
    );
}

fn inject_nxipk(ctx: &mut TestContext) {
    let nxipk = Instruction::default().with_opcode_bits(Opcode::NxIpk.to_bits());
    let dest = ChannelId::new(TileId::new(0, 0), 0, FIFO_CHANNEL);
    ctx.core(0).deliver(&Flit::core_data(nxipk.raw(), dest, true));
}

#[test]
fn persistent_packet_repeats_until_nxipk() {
    let mut ctx = TestContext::new();
    start_looping(&mut ctx);
    ctx.run(100);

    let iterations = ctx.reg(0, 3);
    assert!(iterations >= 2, "loop never repeated (r3 = {iterations})");

    inject_nxipk(&mut ctx);
    ctx.run(5);
    let after_cancel = ctx.reg(0, 3);

    // The packet must stop issuing: no further increments, ever.
    ctx.run(50);
    assert_eq!(ctx.reg(0, 3), after_cancel);
}

#[test]
fn nxipk_clears_the_pipeline_registers() {
    let mut ctx = TestContext::new();
    start_looping(&mut ctx);
    ctx.run(60);

    inject_nxipk(&mut ctx);
    let core = ctx.core(0);
    assert!(!core.fetch_to_decode.has_data());
    assert!(!core.decode_to_execute.has_data());
    assert!(!core.execute_to_write.has_data());
    assert!(core.decode.idle());
}

#[test]
fn repeated_iterations_are_identical() {
    let mut ctx = TestContext::new();
    start_looping(&mut ctx);

    // Sample r3 over a window: it must increase monotonically by the
    // loop's fixed period.
    ctx.run(40);
    let a = ctx.reg(0, 3);
    ctx.run(30);
    let b = ctx.reg(0, 3);
    ctx.run(30);
    let c = ctx.reg(0, 3);
    assert!(a < b && b < c);
    assert_eq!(c - b, b - a, "iteration rate drifted");
}
