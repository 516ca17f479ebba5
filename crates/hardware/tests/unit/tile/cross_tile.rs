//! Traffic between tiles: the mesh is a hop count, but ordering and
//! delivery still hold.

use pretty_assertions::assert_eq;

use loki_core::common::{ChannelId, TileId};
use loki_core::Config;

use crate::common::harness::TestContext;

fn two_tile_config() -> Config {
    let mut config = Config::default();
    config.tile_columns = 2;
    config.idle_timeout = 300;
    config
}

#[test]
fn a_send_crosses_to_the_neighbouring_tile() {
    let mut ctx = TestContext::with_config(two_tile_config());
    // Core 0 of tile (0,0) sends to core 0 of tile (1,0), channel 4.
    let dest = ChannelId::new(TileId::new(1, 0), 0, 4);
    ctx.core(0).cmt.write(1, dest.encoded().into());
    ctx.set_reg(0, 3, 0x77);
    ctx.load_program(0, 0x100, "addui.eop r0 r3 0 -> 1");
    // The receiver blocks on the channel until the flit crosses the mesh.
    let receiver = &mut ctx.sim.chip.tiles[1].cores[0];
    receiver.store_code(&TestContext::assemble("addu.eop r9 r18 r0"), 0x200);
    ctx.run(120);

    assert_eq!(ctx.sim.chip.tiles[1].cores[0].regs.read_debug(9), 0x77);
}

#[test]
fn credits_find_their_way_back_across_tiles() {
    let mut ctx = TestContext::with_config(two_tile_config());
    let max_credits = ctx.config.core.max_credits;
    let dest = ChannelId::new(TileId::new(1, 0), 0, 4);
    ctx.core(0).cmt.write(1, dest.encoded().into());
    ctx.set_reg(0, 3, 5);
    ctx.load_program(0, 0x100, "addui.eop r0 r3 0 -> 1");
    // The receiver consumes the flit, which must return a credit across
    // the mesh.
    let receiver = &mut ctx.sim.chip.tiles[1].cores[0];
    receiver.store_code(&TestContext::assemble("addu.eop r9 r18 r0"), 0x200);
    ctx.run(150);

    assert_eq!(ctx.core(0).cmt.entry(1).credits_available(), max_credits);
}

#[test]
fn hop_latency_delays_delivery() {
    let mut slow = two_tile_config();
    slow.hop_latency = 40;
    let mut ctx = TestContext::with_config(slow);
    let dest = ChannelId::new(TileId::new(1, 0), 0, 4);
    ctx.core(0).cmt.write(1, dest.encoded().into());
    ctx.set_reg(0, 3, 1);
    ctx.load_program(0, 0x100, "addui.eop r0 r3 0 -> 1");
    ctx.run(20);
    // Twenty cycles is not enough for a 40-cycle hop.
    assert!(!ctx.sim.chip.tiles[1].cores[0].channel_ends.has_data(2));
    ctx.run(60);
    assert!(ctx.sim.chip.tiles[1].cores[0].channel_ends.has_data(2));
}
