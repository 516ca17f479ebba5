//! Compute tiles: cores, memory banks, and the local networks.
//!
//! A tile owns its cores and banks as peers and wires them through a data
//! crossbar and a credit network. Components never hold references to each
//! other; all interaction is flits moving between ports, indexed by
//! component position.
//!
//! Per-cycle protocol (driven by the chip):
//! 1. **Negative edge:** The crossbar arbiters run over the head flits of
//!    every producer port.
//! 2. **Positive edge:** Granted flits move to consumers that assert
//!    ready; credits produced by consumed flits are carried back; banks
//!    and cores tick.

/// The chip: a grid of tiles plus the background memory.
pub mod chip;
/// Memory banks.
pub mod memory_bank;

use self::memory_bank::MemoryBank;
use crate::common::{
    ChannelId, ComponentId, CreditFlit, CycleCount, Flit, SimError, TileId, Warnings,
};
use crate::config::Config;
use crate::core::Core;
use crate::memory::MainMemory;
use crate::network::{CreditNetwork, Crossbar};
use crate::stats::Stats;

/// One compute tile.
pub struct Tile {
    /// Grid position.
    pub id: TileId,
    /// The tile's cores.
    pub cores: Vec<Core>,
    /// The tile's memory banks.
    pub banks: Vec<MemoryBank>,

    data_xbar: Crossbar,
    credits: CreditNetwork,

    /// Soft-fault reporting shared by this tile's banks.
    warnings: Warnings,
    /// Outputs each producer port is mid-packet towards: the request must
    /// stay asserted between flits so the wormhole grant survives.
    held_outputs: Vec<u32>,
    /// Flits arriving from other tiles, waiting for their consumer.
    external_in: Vec<Flit>,
    /// Flits leaving for other tiles, drained by the chip.
    pub outbox: Vec<Flit>,
}

impl Tile {
    /// Builds a tile and its components.
    pub fn new(id: TileId, config: &Config, warnings: &Warnings) -> Self {
        let cores = (0..config.tile.cores)
            .map(|p| Core::new(ComponentId::new(id, p as u8), config, warnings.clone()))
            .collect();
        let banks = (0..config.tile.banks)
            .map(|b| {
                MemoryBank::new(
                    ComponentId::new(id, (config.tile.cores + b) as u8),
                    &config.tile,
                )
            })
            .collect();

        // Producer ports: two per core (data, fetch) then one per bank.
        let inputs = config.tile.cores * 2 + config.tile.banks;
        // Consumer ports: one per component, plus the off-tile port.
        let outputs = config.tile.cores + config.tile.banks + 1;

        Self {
            id,
            cores,
            banks,
            data_xbar: Crossbar::new(inputs, outputs, config.tile.link_bandwidth),
            credits: CreditNetwork::new(),
            warnings: warnings.clone(),
            held_outputs: vec![0; inputs],
            external_in: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// The off-tile consumer port index.
    fn off_tile_port(&self) -> usize {
        self.cores.len() + self.banks.len()
    }

    /// Negative-edge work: crossbar arbitration over every producer port's
    /// head flit.
    pub fn negedge(&mut self, stats: &mut Stats) {
        self.data_xbar.begin_cycle();
        let wants: Vec<u32> =
            (0..self.input_ports()).map(|i| self.port_wants(i)).collect();
        stats.arbitrations += self.data_xbar.arbitrate(&wants);
    }

    /// Positive-edge work: flit movement, credits, then component ticks.
    ///
    /// # Errors
    ///
    /// Propagates fatal faults from the cores.
    pub fn posedge(
        &mut self,
        mem: &mut MainMemory,
        stats: &mut Stats,
        now: CycleCount,
    ) -> Result<(), SimError> {
        self.deliver_external(stats);
        self.deliver_granted(stats);
        self.carry_credits(stats);

        for bank in &mut self.banks {
            bank.tick(mem, &self.warnings, now);
        }
        for core in &mut self.cores {
            core.tick(mem, stats)?;
        }
        Ok(())
    }

    /// Accepts a flit routed in from another tile.
    pub fn accept_external(&mut self, flit: Flit) {
        self.external_in.push(flit);
    }

    /// Delivers a credit to the core's channel map table.
    pub fn accept_credit(&mut self, credit: &CreditFlit) {
        let position = credit.destination.position() as usize;
        if let Some(core) = self.cores.get_mut(position) {
            core.cmt.credit_arrived(credit.destination.channel());
        }
    }

    /// Whether every component is idle and nothing is queued.
    pub fn idle(&self) -> bool {
        self.cores.iter().all(Core::is_idle)
            && self.banks.iter().all(MemoryBank::idle)
            && self.external_in.is_empty()
            && self.outbox.is_empty()
            && self.credits.is_empty()
    }

    /// The first exit code any core has requested.
    pub fn exit_code(&self) -> Option<u32> {
        self.cores.iter().find_map(|c| c.exit_code)
    }

    // ── Flit movement ────────────────────────────────────────────────────

    fn deliver_external(&mut self, stats: &mut Stats) {
        let mut remaining = Vec::new();
        let pending = std::mem::take(&mut self.external_in);
        for flit in pending {
            if self.try_deliver_local(&flit) {
                stats.flits_delivered += 1;
            } else {
                remaining.push(flit);
            }
        }
        self.external_in = remaining;
    }

    fn deliver_granted(&mut self, stats: &mut Stats) {
        for output in 0..self.data_xbar.outputs() {
            let Some(input) = self.data_xbar.granted(output) else { continue };
            let Some(flit) = self.input_flit(input) else { continue };

            let ready = if output == self.off_tile_port() {
                true
            } else {
                self.consumer_ready(output, &flit)
            };
            if !ready {
                self.data_xbar.not_ready(output);
                continue;
            }

            // Multicast flits end every constituent packet: each receiver
            // sees a complete single-flit packet.
            if output == self.off_tile_port() {
                self.outbox.push(flit);
            } else {
                self.deliver_to_component(output, &flit);
            }
            stats.flits_delivered += 1;

            let consumed = self.data_xbar.deliver(output, flit.end_of_packet);
            if consumed {
                self.consume_input(input);
                // Mid-packet sources keep requesting their outputs so the
                // wormhole grant holds across flit gaps.
                self.held_outputs[input] =
                    if flit.end_of_packet { 0 } else { self.want_mask(Some(flit)) };
            }
        }
    }

    fn carry_credits(&mut self, stats: &mut Stats) {
        for core in &mut self.cores {
            while let Some(credit) = core.channel_ends.take_credit() {
                self.credits.send(credit);
            }
        }
        let local = self.id;
        let delivered: Vec<CreditFlit> = self.credits.deliver().collect();
        for credit in delivered {
            stats.credits_delivered += 1;
            if credit.destination.tile() == local {
                self.accept_credit(&credit);
            } else {
                // Cross-tile credits ride the outbox as zero-payload flits;
                // the chip routes them by destination.
                let mut flit = Flit::core_data(0, credit.destination, true);
                flit.creditable = false;
                flit.memory_op = crate::common::MemoryOpcode::None;
                flit.source = ChannelId::null();
                self.outbox.push(credit_flit_marker(flit));
            }
        }
    }

    // ── Port plumbing ────────────────────────────────────────────────────

    fn input_ports(&self) -> usize {
        self.cores.len() * 2 + self.banks.len()
    }

    /// The head flit offered by producer port `index`.
    fn input_flit(&self, index: usize) -> Option<Flit> {
        let cores = self.cores.len();
        if index < cores * 2 {
            let core = &self.cores[index / 2];
            if index % 2 == 0 { core.data_out } else { core.fetch_out }
        } else {
            self.banks[index - cores * 2].response_out
        }
    }

    fn consume_input(&mut self, index: usize) {
        let cores = self.cores.len();
        if index < cores * 2 {
            let core = &mut self.cores[index / 2];
            if index % 2 == 0 {
                core.data_out = None;
            } else {
                core.fetch_out = None;
            }
        } else {
            self.banks[index - cores * 2].response_out = None;
        }
    }

    /// The output-port bitmask a producer port requests: its head flit's
    /// destination, or the held mask while mid-packet with no flit ready.
    fn port_wants(&self, index: usize) -> u32 {
        match self.input_flit(index) {
            Some(flit) => self.want_mask(Some(flit)),
            None => self.held_outputs[index],
        }
    }

    /// The output-port bitmask a flit's destination expands to.
    fn want_mask(&self, flit: Option<Flit>) -> u32 {
        let Some(flit) = flit else { return 0 };
        let dest = flit.destination;
        if dest.is_null() {
            return 0;
        }
        if dest.is_multicast() {
            // Position is a bitmask over this tile's cores.
            return u32::from(dest.position()) & ((1 << self.cores.len()) - 1);
        }
        if dest.tile() != self.id {
            return 1 << self.off_tile_port();
        }
        let position = usize::from(dest.position());
        if position >= self.off_tile_port() {
            tracing::warn!(target: "loki::network", destination = %dest,
                "flit addressed to a nonexistent component dropped");
            return 0;
        }
        1 << position
    }

    fn consumer_ready(&self, output: usize, flit: &Flit) -> bool {
        let cores = self.cores.len();
        if output < cores {
            self.cores[output].input_ready(flit.destination.channel())
        } else {
            self.banks[output - cores].request_ready()
        }
    }

    fn deliver_to_component(&mut self, output: usize, flit: &Flit) {
        let cores = self.cores.len();
        if output < cores {
            self.cores[output].deliver(flit);
        } else {
            self.banks[output - cores].push_request(*flit);
        }
    }

    /// Attempts direct local delivery of an externally routed flit.
    fn try_deliver_local(&mut self, flit: &Flit) -> bool {
        if is_credit_marker(flit) {
            self.accept_credit(&CreditFlit { destination: flit.destination });
            return true;
        }
        let position = flit.destination.position() as usize;
        let cores = self.cores.len();
        if position < cores {
            if self.cores[position].input_ready(flit.destination.channel()) {
                self.cores[position].deliver(flit);
                return true;
            }
        } else if let Some(bank) = self.banks.get_mut(position - cores) {
            if bank.request_ready() {
                bank.push_request(*flit);
                return true;
            }
        }
        false
    }
}

/// Marks a flit as carrying a cross-tile credit rather than data.
fn credit_flit_marker(mut flit: Flit) -> Flit {
    flit.return_channel = 0xF;
    flit
}

/// Whether a routed flit is a credit marker.
fn is_credit_marker(flit: &Flit) -> bool {
    flit.return_channel == 0xF && flit.source.is_null()
}
