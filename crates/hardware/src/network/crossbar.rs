//! The tile-local data crossbar.
//!
//! A full crossbar between the tile's producer ports (core data outputs,
//! core fetch outputs, memory response outputs) and its consumer ports
//! (core input channels, bank request inputs, plus one off-tile port).
//! It implements:
//! 1. **Routing:** Each input's head flit names the output (or, for
//!    multicast, the set of outputs) it wants.
//! 2. **Arbitration:** One [`ClockedArbiter`] per output, strict
//!    round-robin, with wormhole grant holding.
//! 3. **Multicast accounting:** A flit may be read once per target output
//!    but is consumed from its source only by the final read.
//! 4. **Bandwidth caps:** One [`BandwidthMonitor`] per output link.
//!
//! The tile drives a cycle as: `begin_cycle` then `arbitrate` on the
//! negative edge, then (on the positive edge) for each output either
//! `deliver` or `not_ready` after checking the consumer's flow control.

use super::arbiter::ClockedArbiter;
use super::bandwidth::BandwidthMonitor;

/// The crossbar state: arbiters and per-input multicast progress.
#[derive(Clone, Debug)]
pub struct Crossbar {
    arbiters: Vec<ClockedArbiter>,
    links: Vec<BandwidthMonitor>,
    /// Outputs each input's head flit wants this cycle.
    wants: Vec<u32>,
    /// Outputs already served for each input's current head flit.
    served: Vec<u32>,
}

impl Crossbar {
    /// Creates a crossbar with `inputs` producer ports and `outputs`
    /// consumer ports.
    pub fn new(inputs: usize, outputs: usize, link_bandwidth: usize) -> Self {
        Self {
            arbiters: (0..outputs).map(|_| ClockedArbiter::new()).collect(),
            links: (0..outputs).map(|_| BandwidthMonitor::new(link_bandwidth)).collect(),
            wants: vec![0; inputs],
            served: vec![0; inputs],
        }
    }

    /// Number of consumer ports.
    pub fn outputs(&self) -> usize {
        self.arbiters.len()
    }

    /// Starts a new cycle (resets the bandwidth monitors).
    pub fn begin_cycle(&mut self) {
        for link in &mut self.links {
            link.new_cycle();
        }
    }

    /// Negative-edge arbitration. `wants[i]` is the bitmask of outputs
    /// input `i`'s head flit is requesting (0 when the input is empty).
    /// Returns the number of arbitration decisions taken.
    pub fn arbitrate(&mut self, wants: &[u32]) -> u64 {
        self.wants.copy_from_slice(wants);
        let mut decisions = 0;
        let mut requests = vec![false; wants.len()];
        for (output, arbiter) in self.arbiters.iter_mut().enumerate() {
            for (input, request) in requests.iter_mut().enumerate() {
                let outstanding = self.wants[input] & !self.served[input];
                *request = outstanding & (1 << output) != 0;
            }
            arbiter.arbitrate(&requests);
            decisions += 1;
        }
        decisions
    }

    /// The input granted to `output` this cycle, if any, respecting the
    /// link's bandwidth cap.
    pub fn granted(&self, output: usize) -> Option<usize> {
        if !self.links[output].available() {
            return None;
        }
        let input = self.arbiters[output].selection()?;
        // The grant may be stale if the flit was consumed via another
        // output; only report it while the request is outstanding.
        (self.wants[input] & !self.served[input] & (1 << output) != 0).then_some(input)
    }

    /// Positive-edge delivery of the granted flit through `output`.
    /// Returns `true` when every output the flit wanted has now read it:
    /// the caller consumes it from the source.
    pub fn deliver(&mut self, output: usize, end_of_packet: bool) -> bool {
        let Some(input) = self.arbiters[output].selection() else {
            return false;
        };
        self.links[output].record();
        self.served[input] |= 1 << output;
        self.arbiters[output].flit_delivered(end_of_packet);

        let done = self.served[input] & self.wants[input] == self.wants[input];
        if done {
            self.served[input] = 0;
        }
        done
    }

    /// Positive-edge outcome when the consumer could not accept the flit.
    pub fn not_ready(&mut self, output: usize) {
        self.arbiters[output].destination_not_ready();
    }
}
