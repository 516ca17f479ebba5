//! The channel map table and credit-based flow control.
//!
//! Every instruction that emits on the network names a small table index
//! rather than a full destination; the channel map table (CMT) translates.
//! Each entry is one of:
//! 1. **Null** — no destination; sends are dropped.
//! 2. **Core view** — a `ChannelId` (possibly multicast) plus an
//!    `acquired` bit and a credit counter. Core-bound channels are
//!    credit-controlled: a flit may only leave while credits remain, and
//!    each consumed flit returns one credit.
//! 3. **Memory view** — a tile, a base bank, a power-of-two group size, the
//!    return channel on this core, the line size, and a scratchpad-style
//!    flag. The head flit's address picks one bank in the group
//!    (`(address / line_size) % group_size`); body flits reuse the choice.
//!    Local memory traffic is governed by the tile's ready/valid network,
//!    not credits.
//!
//! Entries round-trip through a packed 32-bit encoding (`setchmap` writes
//! it, `getchmap` reads it back).

use crate::common::{ChannelId, ChannelIndex, MemoryAddr, TileId, Word};

/// Bit 31 distinguishes memory views from core views.
const MEMORY_VIEW_BIT: u32 = 1 << 31;
/// The encoding of a null entry.
const NULL_ENCODING: u32 = 0xFFFF_FFFF;

/// A memory-view entry, unpacked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryView {
    /// The tile holding the banks.
    pub tile: TileId,
    /// Base bank position within the tile (bank 0 = first memory
    /// component).
    pub bank: u8,
    /// Power-of-two number of banks striped across.
    pub group_size: u8,
    /// The channel on this core that responses return to.
    pub return_channel: ChannelIndex,
    /// Line length in bytes, the striping granularity.
    pub line_bytes: u32,
    /// Bank behaves as scratchpad (no tag checks) rather than cache.
    pub scratchpad: bool,
}

impl MemoryView {
    /// The default instruction-fetch view when CMT entry 0 has not been
    /// configured: bank 0 on the local tile, no striping, responses into
    /// the IPK cache.
    pub const fn local_default(tile: TileId) -> Self {
        Self {
            tile,
            bank: 0,
            group_size: 1,
            return_channel: crate::common::constants::CACHE_CHANNEL,
            line_bytes: 32,
            scratchpad: false,
        }
    }

    /// Which bank within the group serves `address`.
    pub const fn bank_offset(&self, address: MemoryAddr) -> u8 {
        if self.group_size <= 1 {
            return 0;
        }
        ((address / self.line_bytes) % self.group_size as u32) as u8
    }

    /// Packs into the 32-bit entry encoding.
    ///
    /// Layout: bit 31 set; bit 28 scratchpad; bits 24-27 log2 line bytes;
    /// bits 16-23 tile; bits 8-15 bank; bits 4-7 log2 group size; bits 0-3
    /// return channel.
    pub const fn encode(&self) -> u32 {
        MEMORY_VIEW_BIT
            | ((self.scratchpad as u32) << 28)
            | ((self.line_bytes.trailing_zeros() & 0xF) << 24)
            | (self.tile.flatten() << 16)
            | ((self.bank as u32) << 8)
            | (((self.group_size as u32).trailing_zeros() & 0xF) << 4)
            | (self.return_channel as u32 & 0xF)
    }

    /// Unpacks from the 32-bit entry encoding.
    pub const fn decode(encoded: u32) -> Self {
        Self {
            tile: TileId::from_flat((encoded >> 16) & 0xFF),
            bank: ((encoded >> 8) & 0xFF) as u8,
            group_size: (1u32 << ((encoded >> 4) & 0xF)) as u8,
            return_channel: (encoded & 0xF) as u8,
            line_bytes: 1 << ((encoded >> 24) & 0xF),
            scratchpad: (encoded >> 28) & 1 != 0,
        }
    }
}

/// The decoded view of one CMT entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelView {
    /// No destination.
    Null,
    /// A core destination (possibly multicast).
    Core {
        /// Where flits go.
        destination: ChannelId,
        /// Whether a network path has been reserved.
        acquired: bool,
    },
    /// A memory destination.
    Memory(MemoryView),
}

impl ChannelView {
    /// Decodes a packed 32-bit entry value into its view, without going
    /// through a table.
    pub const fn decode_entry(encoded: u32) -> Self {
        if encoded == NULL_ENCODING {
            Self::Null
        } else if encoded & MEMORY_VIEW_BIT != 0 {
            Self::Memory(MemoryView::decode(encoded))
        } else {
            Self::Core {
                destination: ChannelId::from_encoded(encoded & !(1 << 29)),
                acquired: (encoded >> 29) & 1 != 0,
            }
        }
    }
}

/// One entry of the channel map table: the view plus flow-control state.
#[derive(Clone, Copy, Debug)]
pub struct ChannelMapEntry {
    view: ChannelView,
    credits: usize,
    max_credits: usize,
    /// Bank offset latched by the last head flit, reused by payloads.
    address_increment: u8,
}

impl ChannelMapEntry {
    fn new(max_credits: usize) -> Self {
        Self {
            view: ChannelView::Null,
            credits: max_credits,
            max_credits,
            address_increment: 0,
        }
    }

    /// The decoded view.
    pub const fn view(&self) -> ChannelView {
        self.view
    }

    /// The destination, if the entry maps one.
    pub fn destination(&self) -> Option<ChannelId> {
        match self.view {
            ChannelView::Null => None,
            ChannelView::Core { destination, .. } => Some(destination),
            ChannelView::Memory(view) => {
                Some(ChannelId::new(view.tile, view.bank, view.return_channel))
            }
        }
    }

    /// Whether this entry's flow control is credit-based. Core views are;
    /// memory views use the tile's ready/valid signalling instead.
    pub const fn uses_credits(&self) -> bool {
        matches!(self.view, ChannelView::Core { .. })
    }

    /// Whether a flit may be sent now.
    pub const fn can_send(&self) -> bool {
        match self.view {
            ChannelView::Null => false,
            ChannelView::Core { .. } => self.credits > 0,
            ChannelView::Memory(_) => true,
        }
    }

    /// Credits currently available.
    pub const fn credits_available(&self) -> usize {
        self.credits
    }

    /// Whether every credit has been returned (`woche`'s condition).
    pub const fn credits_full(&self) -> bool {
        !self.uses_credits() || self.credits == self.max_credits
    }

    /// Consumes one credit for a departing flit.
    pub fn remove_credit(&mut self) {
        if self.uses_credits() {
            debug_assert!(self.credits > 0, "send without credit");
            self.credits = self.credits.saturating_sub(1);
        }
    }

    /// Returns one credit from a consumed flit.
    pub fn add_credit(&mut self) {
        if self.uses_credits() && self.credits < self.max_credits {
            self.credits += 1;
        }
    }

    /// Latches the bank offset chosen by a head flit.
    pub const fn set_address_increment(&mut self, increment: u8) {
        self.address_increment = increment;
    }

    /// The bank offset body flits should reuse.
    pub const fn address_increment(&self) -> u8 {
        self.address_increment
    }

    /// Re-encodes the entry to its packed form.
    pub fn encode(&self) -> u32 {
        match self.view {
            ChannelView::Null => NULL_ENCODING,
            ChannelView::Core { destination, acquired } => {
                destination.encoded() | ((acquired as u32) << 29)
            }
            ChannelView::Memory(view) => view.encode(),
        }
    }

    fn write(&mut self, encoded: u32) {
        self.view = ChannelView::decode_entry(encoded);
        // A remapped channel starts with a full complement of credits and
        // no latched bank choice.
        self.credits = self.max_credits;
        self.address_increment = 0;
    }
}

/// The per-core channel map table.
#[derive(Clone, Debug)]
pub struct ChannelMapTable {
    entries: Vec<ChannelMapEntry>,
}

impl ChannelMapTable {
    /// Creates a table of `size` null entries.
    pub fn new(size: usize, max_credits: usize) -> Self {
        Self { entries: vec![ChannelMapEntry::new(max_credits); size.max(1)] }
    }

    /// Writes an entry from its packed encoding (`setchmap`).
    pub fn write(&mut self, index: u32, encoded: Word) {
        let len = self.entries.len();
        let entry = &mut self.entries[index as usize % len];
        entry.write(encoded);
        tracing::debug!(target: "loki::core", index, encoded = format_args!("{encoded:#010x}"),
            view = ?entry.view(), "channel map write");
    }

    /// Reads an entry back to its packed encoding (`getchmap`).
    pub fn read(&self, index: u32) -> Word {
        self.entries[index as usize % self.entries.len()].encode()
    }

    /// Borrows an entry.
    pub fn entry(&self, index: ChannelIndex) -> &ChannelMapEntry {
        &self.entries[index as usize % self.entries.len()]
    }

    /// Mutably borrows an entry.
    pub fn entry_mut(&mut self, index: ChannelIndex) -> &mut ChannelMapEntry {
        let len = self.entries.len();
        &mut self.entries[index as usize % len]
    }

    /// Credits one entry on credit-flit arrival. Credit flits are
    /// addressed by the sender's table index, carried in the data flit's
    /// source field.
    pub fn credit_arrived(&mut self, entry_index: ChannelIndex) {
        self.entry_mut(entry_index).add_credit();
    }

    /// Whether the named input channel is fed by a memory bank, according
    /// to the return channels of the memory views in this table. Used to
    /// attribute stalls on empty channel ends.
    pub fn connection_from_memory(&self, channel: ChannelIndex) -> bool {
        self.entries.iter().any(|entry| match entry.view {
            ChannelView::Memory(view) => view.return_channel == channel,
            _ => false,
        })
    }
}
