//! Clean termination and stall attribution.

use pretty_assertions::assert_eq;

use loki_core::stats::StallReason;
use loki_core::tile::chip::StopReason;
use loki_core::Config;

use crate::common::harness::TestContext;

#[test]
fn an_empty_chip_stops_on_the_idle_timeout() {
    let mut config = Config::default();
    config.idle_timeout = 10;
    let mut ctx = TestContext::with_config(config);
    ctx.run(100);

    assert_eq!(ctx.sim.chip.stopped(), Some(StopReason::IdleTimeout));
    assert!(ctx.sim.chip.stats.cycles <= 15, "timeout fired late");
    assert_eq!(ctx.sim.exit_code(), 0);
}

#[test]
fn a_finished_program_leaves_the_chip_idle() {
    let mut config = Config::default();
    config.idle_timeout = 20;
    let mut ctx = TestContext::with_config(config);
    ctx.load_program(0, 0x100, "addui.eop r3 r0 1");
    ctx.run(200);

    assert_eq!(ctx.sim.chip.stopped(), Some(StopReason::IdleTimeout));
    assert_eq!(ctx.reg(0, 3), 1);
}

#[test]
fn waiting_on_an_empty_channel_is_attributed_to_data() {
    let mut ctx = TestContext::new();
    // r18 aliases channel end 2, which nothing feeds: the consumer stalls
    // forever on core data.
    ctx.load_program(0, 0x100, "addu.eop r7 r18 r0");
    ctx.run(50);

    let core_id = ctx.core(0).id;
    // Close the open interval so the time is visible, then check it.
    ctx.sim.chip.stats.unstall(core_id);
    assert!(
        ctx.sim.chip.stats.stall_time(core_id, StallReason::CoreData) > 20,
        "channel-end wait was not attributed"
    );
    assert_eq!(ctx.reg(0, 7), 0);
}

#[test]
fn summary_reports_cycles_and_instructions() {
    let mut ctx = TestContext::new();
    ctx.load_program(0, 0x100, "addui r3 r0 1\naddui.eop r4 r3 1");
    ctx.run(30);

    let summary = ctx.sim.stats().summary();
    assert!(summary.contains("instructions executed: 2"), "summary was:\n{summary}");
    assert!(summary.contains("cycles:"));
}
