//! The chip: a rectangular grid of compute tiles.
//!
//! The chip owns the tiles, the background memory, and the global clock.
//! Inter-tile traffic reuses the local protocol; the mesh is abstracted to
//! a hop count, each hop adding the configured latency. The chip also
//! watches for chip-wide idleness and ends the simulation cleanly after
//! the configured timeout.

use crate::common::{CycleCount, Flit, SimError, TileId, Warnings};
use crate::config::Config;
use crate::core::Core;
use crate::memory::MainMemory;
use crate::stats::Stats;
use crate::tile::Tile;

/// Why the chip stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A core executed `syscall exit` with this status.
    Exit(u32),
    /// Every component sat idle for the configured number of cycles.
    IdleTimeout,
}

/// The whole modelled chip.
pub struct Chip {
    /// The compute tiles, row-major.
    pub tiles: Vec<Tile>,
    /// The background memory image.
    pub memory: MainMemory,
    /// Chip-wide statistics.
    pub stats: Stats,
    /// Soft-fault configuration.
    pub warnings: Warnings,

    columns: usize,
    hop_latency: CycleCount,
    idle_timeout: CycleCount,
    /// Inter-tile flits in flight: (delivery cycle, flit).
    in_flight: Vec<(CycleCount, Flit)>,
    idle_cycles: CycleCount,
    stopped: Option<StopReason>,
}

impl Chip {
    /// Builds the chip described by `config`.
    pub fn new(config: &Config, warnings: Warnings) -> Self {
        let mut tiles = Vec::new();
        for y in 0..config.tile_rows {
            for x in 0..config.tile_columns {
                tiles.push(Tile::new(TileId::new(x as u8, y as u8), config, &warnings));
            }
        }
        Self {
            tiles,
            memory: MainMemory::new(),
            stats: Stats::new(),
            warnings,
            columns: config.tile_columns.max(1),
            hop_latency: config.hop_latency,
            idle_timeout: config.idle_timeout,
            in_flight: Vec::new(),
            idle_cycles: 0,
            stopped: None,
        }
    }

    /// Borrows a tile by grid position.
    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        let index = id.y as usize * self.columns + id.x as usize;
        self.tiles.get_mut(index)
    }

    /// Borrows a core by (tile, position).
    pub fn core_mut(&mut self, tile: TileId, position: u8) -> Option<&mut Core> {
        self.tile_mut(tile)?.cores.get_mut(position as usize)
    }

    /// Advances the chip by one cycle.
    ///
    /// # Errors
    ///
    /// Propagates fatal faults from any core.
    pub fn tick(&mut self) -> Result<(), SimError> {
        if self.stopped.is_some() {
            return Ok(());
        }
        self.stats.cycles += 1;
        let now = self.stats.cycles;

        // Negative edge: arbitrate everywhere.
        for tile in &mut self.tiles {
            tile.negedge(&mut self.stats);
        }

        // Matured inter-tile flits land on their destination tile.
        let columns = self.columns;
        let mut landed = Vec::new();
        self.in_flight.retain(|&(ready, flit)| {
            if ready <= now {
                landed.push(flit);
                false
            } else {
                true
            }
        });
        for flit in landed {
            let dest = flit.destination.tile();
            let index = dest.y as usize * columns + dest.x as usize;
            if let Some(tile) = self.tiles.get_mut(index) {
                tile.accept_external(flit);
            } else {
                tracing::warn!(target: "loki::network", destination = %flit.destination,
                    "flit addressed off the edge of the chip dropped");
            }
        }

        // Positive edge: move data, tick components.
        for tile in &mut self.tiles {
            tile.posedge(&mut self.memory, &mut self.stats, now)?;
        }

        // Collect newly departing inter-tile traffic.
        for index in 0..self.tiles.len() {
            let source = self.tiles[index].id;
            let outbox = std::mem::take(&mut self.tiles[index].outbox);
            for flit in outbox {
                let hops = source.hops_to(flit.destination.tile()).max(1);
                let latency = CycleCount::from(hops) * self.hop_latency.max(1);
                self.in_flight.push((now + latency, flit));
            }
        }

        // Exit and idle detection.
        if let Some(code) = self.tiles.iter().find_map(Tile::exit_code) {
            self.stopped = Some(StopReason::Exit(code));
            return Ok(());
        }
        if self.tiles.iter().all(Tile::idle) && self.in_flight.is_empty() {
            self.idle_cycles += 1;
            if self.idle_cycles >= self.idle_timeout {
                tracing::info!(target: "loki::sim", cycles = self.stats.cycles,
                    "every core idle for {} cycles; stopping (idle timeout)", self.idle_timeout);
                self.stopped = Some(StopReason::IdleTimeout);
            }
        } else {
            self.idle_cycles = 0;
        }
        Ok(())
    }

    /// Why (and whether) the chip has stopped.
    pub const fn stopped(&self) -> Option<StopReason> {
        self.stopped
    }
}
