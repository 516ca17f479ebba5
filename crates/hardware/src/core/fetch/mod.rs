//! The fetch stage: instruction supply for one core.
//!
//! Fetch runs two cooperating tasks:
//! 1. **Read loop** — supplies one instruction per cycle to Decode from the
//!    currently active instruction store, switching between queued packets
//!    (FIFO packets win over a persistent restart, which wins over cache
//!    packets) and handling end-of-packet and persistent semantics.
//! 2. **Write loop** — services fetch requests: runs tag checks on both
//!    stores, emits a request flit to the right memory bank on a miss,
//!    tracks the arriving packet, and issues continuation requests at every
//!    cache-line boundary of a multi-line packet.
//!
//! At most one fetch is in flight, and each instruction store tracks at
//! most one *pending* packet (plus the *current* one being executed).

/// The instruction packet cache.
pub mod ipk_cache;
/// The instruction packet FIFO.
pub mod ipk_fifo;

use std::collections::VecDeque;

use self::ipk_cache::IpkCache;
use self::ipk_fifo::{FifoWrite, IpkFifo};
use crate::common::constants::{
    BYTES_PER_WORD, CACHE_CHANNEL, DEFAULT_TAG, FIFO_CHANNEL, NOT_IN_CACHE,
};
use crate::common::{
    CacheIndex, ChannelId, ComponentId, Flit, JumpOffset, MemoryAddr, MemoryOpcode, Warnings,
};
use crate::config::TileConfig;
use crate::core::pipeline_reg::PipelineRegister;
use crate::isa::{DecodedOp, FetchKind, Instruction, InstructionSource};
use crate::stats::{StallReason, Stats};

use crate::core::channel_map::MemoryView;

/// Everything known about one instruction packet in (or heading to) an
/// instruction store.
#[derive(Clone, Copy, Debug)]
pub struct PacketInfo {
    /// The packet's memory address; [`DEFAULT_TAG`] when the slot is free.
    pub mem_addr: MemoryAddr,
    /// Which store holds (or will hold) it.
    pub source: InstructionSource,
    /// Position of its first instruction, or [`NOT_IN_CACHE`].
    pub index: CacheIndex,
    /// Whether the whole packet has arrived.
    pub in_cache: bool,
    /// Whether the packet should execute once present (prefetches clear
    /// this).
    pub execute: bool,
    /// Whether the packet restarts on every end-of-packet.
    pub persistent: bool,
}

impl Default for PacketInfo {
    fn default() -> Self {
        Self {
            mem_addr: DEFAULT_TAG,
            source: InstructionSource::Unknown,
            index: NOT_IN_CACHE,
            in_cache: false,
            execute: true,
            persistent: false,
        }
    }
}

impl PacketInfo {
    /// Whether this slot describes a packet at all.
    pub fn active(&self) -> bool {
        self.mem_addr != DEFAULT_TAG || self.index != NOT_IN_CACHE
    }

    /// Whether the packet is still streaming in from memory.
    pub fn arriving(&self) -> bool {
        self.active() && !self.in_cache
    }

    /// Clears the slot.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A queued fetch request, waiting for the write loop.
#[derive(Clone, Copy, Debug)]
pub struct FetchRequest {
    /// The packet address.
    pub address: MemoryAddr,
    /// The fetch flavour (persistent / prefetch / ...).
    pub kind: FetchKind,
    /// The memory view of CMT entry 0, routing the request.
    pub view: MemoryView,
}

/// The fetch currently streaming in from memory.
#[derive(Clone, Copy, Debug)]
struct ActiveFetch {
    /// Address of the next instruction expected.
    address: MemoryAddr,
    view: MemoryView,
    complete: bool,
}

/// Read-loop states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadState {
    /// No packet currently executing; choose the next one.
    Ready,
    /// Mid-packet: read one instruction per cycle.
    Read,
}

/// Write-loop states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteState {
    /// No outstanding fetch.
    Ready,
    /// Waiting for a requested packet to stream in.
    Receive,
    /// A cache-line boundary was crossed; request the next line.
    Continue,
}

/// The fetch stage.
#[derive(Clone, Debug)]
pub struct FetchStage {
    id: ComponentId,
    /// This core's L0 instruction cache.
    pub cache: IpkCache,
    /// This core's instruction FIFO.
    pub fifo: IpkFifo,

    current: PacketInfo,
    fifo_pending: PacketInfo,
    cache_pending: PacketInfo,

    fetch_buffer: VecDeque<FetchRequest>,
    fetch_buffer_size: usize,

    read_state: ReadState,
    write_state: WriteState,
    active_fetch: Option<ActiveFetch>,

    /// Set when the last instruction handed to Decode ended its packet.
    last_read_was_eop: bool,

    line_bytes: u32,
    cores_per_tile: u8,
}

impl FetchStage {
    /// Creates the stage for core `id`.
    pub fn new(
        id: ComponentId,
        stores: &crate::config::InstructionStoreConfig,
        tile: &TileConfig,
    ) -> Self {
        Self {
            id,
            cache: IpkCache::new(stores),
            fifo: IpkFifo::new(stores.fifo_size),
            current: PacketInfo::default(),
            fifo_pending: PacketInfo::default(),
            cache_pending: PacketInfo::default(),
            fetch_buffer: VecDeque::new(),
            fetch_buffer_size: stores.fetch_buffer.max(1),
            read_state: ReadState::Ready,
            write_state: WriteState::Ready,
            active_fetch: None,
            last_read_was_eop: false,
            line_bytes: tile.line_bytes.max(BYTES_PER_WORD),
            cores_per_tile: tile.cores as u8,
        }
    }

    // ── Read loop ────────────────────────────────────────────────────────

    /// One cycle of the read loop: supply at most one instruction to the
    /// decode pipeline register. Returns the stall cause, if stalled.
    pub fn tick_read(
        &mut self,
        to_decode: &mut PipelineRegister,
        stats: &mut Stats,
    ) -> Option<StallReason> {
        if self.read_state == ReadState::Ready && !self.choose_next_packet() {
            return Some(StallReason::Instructions);
        }

        // Mid-packet: read one instruction this cycle if possible.
        if self.source_is_empty() {
            return Some(StallReason::Instructions);
        }
        if !to_decode.can_write() {
            // Downstream back-pressure; not a fetch-side stall.
            return None;
        }

        let (inst, addr) = self.read_current();
        let mut op = DecodedOp::from_fetch(inst, self.stamp_address(addr), self.current.source);

        if inst.raw() == 0 {
            tracing::warn!(target: "loki::fetch", core = %self.id,
                addr = format_args!("{addr:#010x}"), "probable junk instruction read");
        }

        self.last_read_was_eop = inst.end_of_packet();
        if inst.end_of_packet() {
            // A single-instruction persistent packet carries its
            // persistence itself and frees the packet slot.
            if self.current.persistent && self.current.mem_addr == addr {
                op.persistent = true;
                self.current.persistent = false;
            }
            self.read_state = ReadState::Ready;
        }

        tracing::trace!(target: "loki::fetch", core = %self.id, source = ?self.current.source,
            addr = format_args!("{addr:#010x}"), "issued instruction");
        stats.unstall(self.id);
        to_decode.write(op);
        None
    }

    /// Picks the next packet in priority order: FIFO packets beat a
    /// persistent restart, which beats cache packets. Returns whether a
    /// packet is now current (and positioned for reading).
    fn choose_next_packet(&mut self) -> bool {
        if self.fifo_pending.active() && self.fifo_pending.execute {
            return self.switch_to_packet(true);
        }
        if self.current.persistent {
            match self.current.source {
                InstructionSource::Fifo => self.fifo.start_new_packet(self.current.index),
                InstructionSource::Cache => self.cache.start_new_packet(self.current.index),
                InstructionSource::Unknown => return false,
            }
            tracing::debug!(target: "loki::fetch", core = %self.id,
                addr = format_args!("{:#010x}", self.current.mem_addr),
                "restarted persistent packet");
            self.read_state = ReadState::Read;
            return true;
        }
        if self.cache_pending.active() && self.cache_pending.execute {
            return self.switch_to_packet(false);
        }
        false
    }

    fn switch_to_packet(&mut self, from_fifo: bool) -> bool {
        let packet = if from_fifo { &mut self.fifo_pending } else { &mut self.cache_pending };
        if packet.index == NOT_IN_CACHE {
            // We know the packet is coming but not where it will land yet.
            return false;
        }
        self.current = *packet;
        packet.reset();
        match self.current.source {
            InstructionSource::Fifo => self.fifo.start_new_packet(self.current.index),
            InstructionSource::Cache => self.cache.start_new_packet(self.current.index),
            InstructionSource::Unknown => return false,
        }
        tracing::debug!(target: "loki::fetch", core = %self.id, source = ?self.current.source,
            index = self.current.index,
            addr = format_args!("{:#010x}", self.current.mem_addr), "switched to pending packet");
        self.read_state = ReadState::Read;
        true
    }

    fn source_is_empty(&self) -> bool {
        match self.current.source {
            InstructionSource::Fifo => self.fifo.is_empty(),
            InstructionSource::Cache => self.cache.is_empty(),
            InstructionSource::Unknown => true,
        }
    }

    fn read_current(&mut self) -> (Instruction, MemoryAddr) {
        match self.current.source {
            InstructionSource::Fifo => self.fifo.read(),
            InstructionSource::Cache | InstructionSource::Unknown => self.cache.read(),
        }
    }

    /// The address to stamp on an issued instruction. FIFO packets are
    /// treated as interrupts: the program counter they expose is the cache
    /// packet that would otherwise run (low bit set when it was fetched
    /// persistently), so software can context-switch back to it.
    fn stamp_address(&self, addr: MemoryAddr) -> MemoryAddr {
        match self.current.source {
            InstructionSource::Fifo => {
                if self.cache_pending.active() {
                    let mut address = self.cache_pending.mem_addr;
                    if self.cache_pending.persistent {
                        address |= 1;
                    }
                    address
                } else {
                    DEFAULT_TAG
                }
            }
            _ => addr,
        }
    }

    // ── Write loop ───────────────────────────────────────────────────────

    /// One cycle of the write loop: make progress on the queued fetch.
    /// `request_out` is the core's fetch-request output port; the tile
    /// network drains it.
    pub fn tick_write(&mut self, request_out: &mut Option<Flit>, stats: &mut Stats) {
        match self.write_state {
            WriteState::Ready => {
                if self.fetch_buffer.is_empty()
                    || !self.room_to_fetch()
                    || self.fifo_pending.active()
                    || self.cache_pending.active()
                    || request_out.is_some()
                {
                    return;
                }
                let Some(fetch) = self.fetch_buffer.pop_front() else { return };

                let cached = self.check_cache(&fetch, stats);
                if !cached {
                    self.send_request(fetch.address, fetch.view, request_out, stats);
                    self.active_fetch = Some(ActiveFetch {
                        address: fetch.address,
                        view: fetch.view,
                        complete: false,
                    });
                    self.write_state = WriteState::Receive;
                }
            }
            WriteState::Receive => {
                let Some(af) = self.active_fetch else {
                    self.write_state = WriteState::Ready;
                    return;
                };
                if af.complete {
                    self.active_fetch = None;
                    self.write_state = WriteState::Ready;
                } else if af.address % self.line_bytes == 0 {
                    // The last instruction filled a cache line; ask for the
                    // next one (possibly from a different bank).
                    self.write_state = WriteState::Continue;
                }
            }
            WriteState::Continue => {
                if !self.cache.room_to_fetch() || request_out.is_some() {
                    return;
                }
                if let Some(af) = self.active_fetch {
                    tracing::debug!(target: "loki::fetch", core = %self.id,
                        addr = format_args!("{:#010x}", af.address),
                        "requesting packet continuation");
                    self.send_request(af.address, af.view, request_out, stats);
                    self.write_state = WriteState::Receive;
                }
            }
        }
    }

    /// Runs the tag check for a fetch request and records where the packet
    /// is (or will arrive). Returns whether it was already present.
    fn check_cache(&mut self, fetch: &FetchRequest, stats: &mut Stats) -> bool {
        stats.tag_checks += 1;

        // Probe both stores so each pays its lookup cost.
        let fifo_pos = self.fifo.lookup(fetch.address);
        let cache_pos = self.cache.lookup(fetch.address);

        let (source, index) = if let Some(pos) = fifo_pos {
            (InstructionSource::Fifo, pos)
        } else if let Some(pos) = cache_pos {
            (InstructionSource::Cache, pos)
        } else if fetch.view.return_channel == FIFO_CHANNEL {
            (InstructionSource::Fifo, NOT_IN_CACHE)
        } else {
            (InstructionSource::Cache, NOT_IN_CACHE)
        };

        let packet = match source {
            InstructionSource::Fifo => &mut self.fifo_pending,
            _ => &mut self.cache_pending,
        };
        packet.source = source;
        packet.index = index;
        packet.mem_addr = fetch.address;
        packet.in_cache = index != NOT_IN_CACHE;
        packet.execute = fetch.kind.execute;
        packet.persistent = fetch.kind.persistent;

        let found = packet.in_cache;
        if found {
            stats.tag_hits += 1;
            if !packet.execute {
                // Prefetch of something already present: nothing to do.
                packet.reset();
            }
        }
        tracing::debug!(target: "loki::fetch", core = %self.id,
            addr = format_args!("{:#010x}", fetch.address), found, "tag check");
        found
    }

    /// Emits one `IpkRead` request flit to the bank serving `address`.
    fn send_request(
        &self,
        address: MemoryAddr,
        view: MemoryView,
        request_out: &mut Option<Flit>,
        stats: &mut Stats,
    ) {
        let bank = view.bank + view.bank_offset(address);
        let destination = ChannelId::new(view.tile, self.cores_per_tile + bank, 0);
        let return_channel =
            if view.return_channel == FIFO_CHANNEL { FIFO_CHANNEL } else { CACHE_CHANNEL };
        let mut flit =
            Flit::memory(address, destination, MemoryOpcode::IpkRead, return_channel, true);
        flit.source = ChannelId::new(self.id.tile, self.id.position, return_channel);
        debug_assert!(request_out.is_none());
        *request_out = Some(flit);
        stats.fetches_sent += 1;
    }

    // ── Interface to the decode stage and the core ───────────────────────

    /// Whether another fetch request can be queued.
    pub fn can_check_tags(&self) -> bool {
        self.fetch_buffer.len() < self.fetch_buffer_size
    }

    /// Queues a fetch request (the tags are checked at the write loop's
    /// next opportunity). A new fetch breaks persistent mode.
    pub fn check_tags(&mut self, address: MemoryAddr, kind: FetchKind, view: MemoryView) {
        self.fetch_buffer.push_back(FetchRequest { address, kind, view });

        if self.current.persistent {
            self.current.persistent = false;
            // If the last instruction also ended the packet, the next
            // iteration must not start.
            if self.last_read_was_eop {
                self.read_state = ReadState::Ready;
            }
        }
    }

    /// Fetch gating for the write loop: room in the cache for a full
    /// packet, and no packet half-arrived.
    pub fn room_to_fetch(&self) -> bool {
        self.cache.room_to_fetch() && (!self.current.active() || self.current.in_cache)
    }

    /// Applies an in-buffer jump to the current source.
    pub fn jump(&mut self, offset: JumpOffset) {
        match self.current.source {
            InstructionSource::Fifo => self.fifo.jump(offset),
            InstructionSource::Cache => self.cache.jump(offset),
            InstructionSource::Unknown => {}
        }
        // The packet may have ended since the jump instruction was read.
        self.read_state = ReadState::Read;
    }

    /// Aborts the current packet (`nxipk`): clears persistence, suppresses
    /// execution of anything still arriving, and cancels the read.
    pub fn next_ipk(&mut self) {
        self.current.persistent = false;
        if self.current.arriving() {
            self.current.execute = false;
        }
        match self.current.source {
            InstructionSource::Fifo => self.fifo.cancel_packet(),
            InstructionSource::Cache => self.cache.cancel_packet(),
            InstructionSource::Unknown => {}
        }
        self.read_state = ReadState::Ready;
    }

    /// Delivers an instruction flit from the network into the right store.
    /// Returns `true` when the flit was a `nxipk` command, which the core
    /// must follow with a pipeline flush.
    pub fn deliver_instruction(&mut self, flit: &Flit, warnings: &Warnings) -> bool {
        let inst = Instruction::new(flit.payload);
        match flit.destination.channel() {
            FIFO_CHANNEL => self.deliver_to_fifo(inst, warnings),
            CACHE_CHANNEL => {
                self.deliver_to_cache(inst, warnings);
                false
            }
            channel => {
                tracing::error!(target: "loki::fetch", core = %self.id, channel,
                    "instruction flit on a non-instruction channel");
                false
            }
        }
    }

    fn deliver_to_fifo(&mut self, inst: Instruction, warnings: &Warnings) -> bool {
        self.note_arrival(FIFO_CHANNEL, inst);
        let packet_addr = if self.fifo_pending.active() && !self.fifo_pending.in_cache {
            self.fifo_pending.mem_addr
        } else {
            0
        };
        match self.fifo.write(inst, packet_addr, warnings) {
            FifoWrite::NextIpk => {
                self.next_ipk();
                true
            }
            FifoWrite::StartedPacket(index) => {
                self.packet_arriving(InstructionSource::Fifo, index);
                if inst.end_of_packet() {
                    self.packet_finished_arriving(InstructionSource::Fifo);
                }
                false
            }
            FifoWrite::Stored { finished_packet } => {
                if finished_packet {
                    self.packet_finished_arriving(InstructionSource::Fifo);
                }
                false
            }
        }
    }

    fn deliver_to_cache(&mut self, inst: Instruction, warnings: &Warnings) {
        self.note_arrival(CACHE_CHANNEL, inst);
        let packet = self.arriving_cache_packet();
        // A packet with no recorded address was probably pushed by another
        // core rather than fetched. Mid-packet instructions take their
        // addresses from the cache's own tracking.
        let addr = if packet.mem_addr == DEFAULT_TAG { 0 } else { packet.mem_addr };
        let write = self.cache.write(inst, addr, warnings);
        if write.started_packet {
            self.packet_arriving(InstructionSource::Cache, write.index);
        }
        if write.finished_packet {
            self.packet_finished_arriving(InstructionSource::Cache);
        }
    }

    fn arriving_cache_packet(&mut self) -> &mut PacketInfo {
        if self.current.active()
            && !self.current.in_cache
            && self.current.source == InstructionSource::Cache
        {
            &mut self.current
        } else {
            &mut self.cache_pending
        }
    }

    /// Advances the active fetch as instructions arrive on its return
    /// channel, so line continuations know where they are.
    fn note_arrival(&mut self, channel: u8, inst: Instruction) {
        if let Some(af) = &mut self.active_fetch {
            let fetch_channel =
                if af.view.return_channel == FIFO_CHANNEL { FIFO_CHANNEL } else { CACHE_CHANNEL };
            if fetch_channel == channel {
                af.address = af.address.wrapping_add(BYTES_PER_WORD);
                af.complete = inst.end_of_packet();
            }
        }
    }

    /// Records where an arriving packet's first instruction landed.
    fn packet_arriving(&mut self, source: InstructionSource, index: CacheIndex) {
        let packet = match source {
            InstructionSource::Fifo => &mut self.fifo_pending,
            _ => {
                if self.current.active()
                    && !self.current.in_cache
                    && self.current.source == InstructionSource::Cache
                {
                    &mut self.current
                } else {
                    &mut self.cache_pending
                }
            }
        };
        packet.source = source;
        packet.index = index;
        if packet.mem_addr == DEFAULT_TAG {
            packet.mem_addr = 0;
        }
    }

    /// Marks the first incomplete packet from `source` as fully arrived.
    fn packet_finished_arriving(&mut self, source: InstructionSource) {
        let packet = if self.current.active()
            && !self.current.in_cache
            && self.current.source == source
        {
            &mut self.current
        } else {
            match source {
                InstructionSource::Fifo => &mut self.fifo_pending,
                _ => &mut self.cache_pending,
            }
        };
        packet.in_cache = true;
        if !packet.execute {
            packet.reset();
        }
    }

    /// Preloads instructions into the cache at startup, with no network
    /// round-trip. Packets are addressed from `base`.
    pub fn store_code(&mut self, code: &[Instruction], base: MemoryAddr, warnings: &Warnings) {
        let mut addr = base;
        for inst in code {
            let write = self.cache.write(*inst, addr, warnings);
            if write.started_packet {
                let packet = &mut self.cache_pending;
                if !packet.active() {
                    packet.source = InstructionSource::Cache;
                    packet.index = write.index;
                    packet.mem_addr = addr;
                    packet.execute = true;
                }
            }
            if write.finished_packet {
                self.cache_pending.in_cache = true;
            }
            addr = addr.wrapping_add(BYTES_PER_WORD);
        }
    }

    /// The memory address of the instruction most recently read, from the
    /// current source.
    pub fn current_instruction_address(&self) -> MemoryAddr {
        match self.current.source {
            InstructionSource::Fifo => self.fifo.memory_address(),
            _ => self.cache.memory_address(),
        }
    }

    /// Whether the fetch stage has nothing in flight and nothing queued.
    pub fn idle(&self) -> bool {
        self.read_state == ReadState::Ready
            && self.write_state == WriteState::Ready
            && self.fetch_buffer.is_empty()
            && !self.fifo_pending.active()
            && !self.cache_pending.active()
            && !self.current.persistent
    }

    /// Test and debugger access to the current packet description.
    pub const fn current_packet(&self) -> &PacketInfo {
        &self.current
    }
}
