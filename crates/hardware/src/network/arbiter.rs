//! The clocked output arbiter.
//!
//! One arbiter guards each crossbar output. Requests are granted in strict
//! round-robin order starting after the last granted input, and a grant is
//! held for the rest of the packet (wormhole routing): only a flit with
//! the end-of-packet marker releases it.
//!
//! The state machine mirrors the network's clocking discipline:
//!
//! ```text
//! NoRequests -> HaveRequests -> WaitingToGrant -> Granted
//! ```
//!
//! Arbitration happens on the negative clock edge; the grant becomes
//! visible (and data moves) on the positive edge, but only once the
//! destination signals ready — until then the arbiter waits in
//! `WaitingToGrant` without re-arbitrating.

/// Arbiter states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArbiterState {
    /// No input wants this output.
    #[default]
    NoRequests,
    /// Requests are pending; arbitrate at the next negative edge.
    HaveRequests,
    /// An input has been chosen but the destination is not yet ready.
    WaitingToGrant,
    /// The grant is live; flits of the granted packet are flowing.
    Granted,
}

/// A round-robin, wormhole-holding arbiter for one output.
#[derive(Clone, Debug, Default)]
pub struct ClockedArbiter {
    state: ArbiterState,
    /// The input currently selected, when in `WaitingToGrant`/`Granted`.
    selection: Option<usize>,
    /// Round-robin pointer: arbitration starts after this input.
    last_grant: usize,
}

impl ClockedArbiter {
    /// Creates an idle arbiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state, for inspection.
    pub const fn state(&self) -> ArbiterState {
        self.state
    }

    /// The granted input, if a grant is live or pending.
    pub const fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Negative-edge arbitration. `requests[i]` is true when input `i`
    /// wants this output this cycle.
    ///
    /// A live wormhole grant is never re-arbitrated; a withdrawn request
    /// releases the grant.
    pub fn arbitrate(&mut self, requests: &[bool]) {
        match self.state {
            ArbiterState::Granted | ArbiterState::WaitingToGrant => {
                // Hold for the packet, unless the request disappeared.
                if let Some(input) = self.selection {
                    if !requests.get(input).copied().unwrap_or(false) {
                        self.release();
                        self.arbitrate_new(requests);
                    }
                }
            }
            ArbiterState::NoRequests | ArbiterState::HaveRequests => {
                self.arbitrate_new(requests);
            }
        }
    }

    fn arbitrate_new(&mut self, requests: &[bool]) {
        if requests.iter().all(|r| !r) {
            self.state = ArbiterState::NoRequests;
            self.selection = None;
            return;
        }
        self.state = ArbiterState::HaveRequests;

        let n = requests.len();
        for offset in 1..=n {
            let input = (self.last_grant + offset) % n;
            if requests[input] {
                self.selection = Some(input);
                self.last_grant = input;
                self.state = ArbiterState::WaitingToGrant;
                return;
            }
        }
    }

    /// Positive-edge outcome: a flit of the granted packet was delivered.
    /// An end-of-packet flit releases the grant for re-arbitration.
    pub fn flit_delivered(&mut self, end_of_packet: bool) {
        self.state = ArbiterState::Granted;
        if end_of_packet {
            self.release();
        }
    }

    /// Positive-edge outcome: the destination was not ready; the grant is
    /// held but nothing moved.
    pub const fn destination_not_ready(&mut self) {
        self.state = ArbiterState::WaitingToGrant;
    }

    fn release(&mut self) {
        self.state = ArbiterState::NoRequests;
        self.selection = None;
    }
}
