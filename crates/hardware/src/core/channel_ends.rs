//! Input channel ends: the register-mapped network input FIFOs.
//!
//! Each core owns a small bank of FIFOs, one per input channel, fed by the
//! tile's data crossbar through the core's input steering. Reads are
//! destructive; a read of an empty channel stalls the decode stage.
//! Consuming a flit from a creditable sender queues one credit flit for the
//! credit network to carry back.
//!
//! The table also backs the channel-management instructions: `tstchi`
//! (non-blocking test), `selch` (round-robin select among ready channels),
//! and the input side of `woche`.

use std::collections::VecDeque;

use crate::common::{ChannelIndex, CreditFlit, Flit, Word};

/// The bank of input channel-end FIFOs.
#[derive(Clone, Debug)]
pub struct ChannelEndTable {
    fifos: Vec<VecDeque<Flit>>,
    depth: usize,
    pending_credits: VecDeque<CreditFlit>,
    last_selected: usize,
}

impl ChannelEndTable {
    /// Creates `channels` FIFOs of `depth` flits each.
    pub fn new(channels: usize, depth: usize) -> Self {
        Self {
            fifos: vec![VecDeque::with_capacity(depth); channels.max(1)],
            depth,
            pending_credits: VecDeque::new(),
            last_selected: 0,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.fifos.len()
    }

    /// Whether `channel` can accept another flit. This is the ready signal
    /// the crossbar observes.
    pub fn can_write(&self, channel: ChannelIndex) -> bool {
        self.fifos
            .get(channel as usize)
            .is_some_and(|f| f.len() < self.depth)
    }

    /// Delivers a flit into a channel FIFO.
    pub fn write(&mut self, channel: ChannelIndex, flit: Flit) {
        if let Some(fifo) = self.fifos.get_mut(channel as usize) {
            debug_assert!(fifo.len() < self.depth, "channel end overflow");
            tracing::trace!(target: "loki::core", channel, %flit, "channel end received flit");
            fifo.push_back(flit);
        }
    }

    /// Whether `channel` holds at least one flit (`tstchi`).
    pub fn has_data(&self, channel: ChannelIndex) -> bool {
        self.fifos.get(channel as usize).is_some_and(|f| !f.is_empty())
    }

    /// Consumes the head flit of `channel`, queuing a credit if the sender
    /// asked for one. Returns `None` when the channel is empty; the caller
    /// stalls.
    pub fn read(&mut self, channel: ChannelIndex) -> Option<Word> {
        let flit = self.fifos.get_mut(channel as usize)?.pop_front()?;
        if flit.creditable && !flit.source.is_null() {
            self.pending_credits.push_back(CreditFlit { destination: flit.source });
        }
        Some(flit.payload)
    }

    /// Peeks the head flit of `channel` without consuming.
    pub fn peek(&self, channel: ChannelIndex) -> Option<&Flit> {
        self.fifos.get(channel as usize)?.front()
    }

    /// Chooses a ready channel from `bitmask` in round-robin order starting
    /// after the last selection (`selch`). Returns `None` when no selected
    /// channel has data; the caller stalls until one does.
    pub fn select(&mut self, bitmask: u32) -> Option<ChannelIndex> {
        let n = self.fifos.len();
        for offset in 1..=n {
            let channel = (self.last_selected + offset) % n;
            if (bitmask >> channel) & 1 != 0 && !self.fifos[channel].is_empty() {
                self.last_selected = channel;
                return Some(channel as ChannelIndex);
            }
        }
        None
    }

    /// Drains the credits owed to senders. Called by the tile's credit
    /// network each cycle; credits never stall the pipeline.
    pub fn take_credit(&mut self) -> Option<CreditFlit> {
        self.pending_credits.pop_front()
    }
}
