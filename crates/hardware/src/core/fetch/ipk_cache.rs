//! The instruction packet cache (L0 instruction store).
//!
//! An append-and-read-pointer structure with tag lookup. Two organizations
//! are supported:
//! 1. **Fully associative** — `tags` tags, each guarding a block of
//!    `size / tags` slots; every packet's first instruction is aligned to a
//!    block boundary, so the write pointer skips forward after an
//!    end-of-packet.
//! 2. **Direct mapped** — one tag per slot; a packet's position is derived
//!    from its address (`(address / 4) % size`), and only that slot is
//!    probed on lookup.
//!
//! Only the first instruction of each packet carries a real tag; all other
//! slots carry the sentinel. Fill tracking distinguishes "pointers equal
//! because empty" from "pointers equal because full" by remembering whether
//! the last operation was a read or a write.

use crate::common::constants::{BYTES_PER_WORD, DEFAULT_TAG, MAX_IPK_SIZE, NOT_IN_CACHE};
use crate::common::{CacheIndex, JumpOffset, MemoryAddr, Warnings};
use crate::config::{CacheOrganization, InstructionStoreConfig};
use crate::isa::Instruction;

/// Result of one cache write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheWrite {
    /// Slot the instruction landed in.
    pub index: CacheIndex,
    /// Set when this instruction began a new packet.
    pub started_packet: bool,
    /// Set when this instruction completed its packet.
    pub finished_packet: bool,
}

/// The IPK cache.
#[derive(Clone, Debug)]
pub struct IpkCache {
    organization: CacheOrganization,
    data: Vec<Instruction>,
    /// One tag per slot. In the fully-associative organization only
    /// block-aligned slots ever hold a real tag.
    tags: Vec<MemoryAddr>,
    /// Per-slot fetch addresses, kept for r1 maintenance and debug.
    locations: Vec<MemoryAddr>,
    /// Slots guarded per tag (fully-associative block size).
    alignment: usize,

    read_ptr: usize,
    write_ptr: usize,
    fill_count: usize,
    last_op_was_read: bool,

    /// Signed jump to apply on the next read, relative to the instruction
    /// just read.
    jump_amount: JumpOffset,
    /// Whether the last write completed a packet (next write starts one).
    finished_packet_write: bool,
    /// Whether the last read was an end-of-packet instruction.
    finished_packet_read: bool,
    /// Address of the next mid-packet write; only the first instruction of
    /// a packet supplies its address, the rest follow on from it.
    next_write_addr: MemoryAddr,
}

impl IpkCache {
    /// Creates an empty cache from the store configuration.
    pub fn new(config: &InstructionStoreConfig) -> Self {
        let size = config.cache_size.max(MAX_IPK_SIZE);
        let tags = match config.organization {
            CacheOrganization::FullyAssociative => config.cache_tags.max(1),
            CacheOrganization::DirectMapped => size,
        };
        Self {
            organization: config.organization,
            data: vec![Instruction::default(); size],
            tags: vec![DEFAULT_TAG; size],
            locations: vec![DEFAULT_TAG; size],
            alignment: (size / tags).max(1),
            read_ptr: 0,
            write_ptr: 0,
            fill_count: 0,
            last_op_was_read: true,
            jump_amount: 0,
            finished_packet_write: true,
            finished_packet_read: false,
            next_write_addr: 0,
        }
    }

    /// Capacity in instructions.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Finds the packet tagged `address`, if cached. Direct-mapped probes a
    /// single slot; fully-associative scans the tag array.
    pub fn lookup(&self, address: MemoryAddr) -> Option<CacheIndex> {
        match self.organization {
            CacheOrganization::DirectMapped => {
                let expected = (address / BYTES_PER_WORD) as usize % self.size();
                (self.tags[expected] == address).then_some(expected)
            }
            CacheOrganization::FullyAssociative => (0..self.size())
                .step_by(self.alignment)
                .find(|&slot| self.tags[slot] == address),
        }
    }

    /// Writes one arriving instruction.
    ///
    /// The first instruction after an end-of-packet begins a new packet: it
    /// lands at a tag-aligned position (or the address-derived position
    /// when direct-mapped) and takes `address` as its tag; mid-packet
    /// instructions ignore the argument and follow on from the packet's
    /// base. Overflow overwrites the oldest instructions; the overwritten
    /// packet's tag is invalidated and a warning fires.
    pub fn write(
        &mut self,
        inst: Instruction,
        address: MemoryAddr,
        warnings: &Warnings,
    ) -> CacheWrite {
        let started_packet = self.finished_packet_write;
        let address = if started_packet { address } else { self.next_write_addr };
        self.next_write_addr = address.wrapping_add(BYTES_PER_WORD);
        if started_packet {
            match self.organization {
                CacheOrganization::DirectMapped => {
                    self.write_ptr = (address / BYTES_PER_WORD) as usize % self.size();
                }
                CacheOrganization::FullyAssociative => {
                    let misalignment = self.write_ptr % self.alignment;
                    if misalignment != 0 {
                        self.write_ptr =
                            (self.write_ptr + self.alignment - misalignment) % self.size();
                    }
                }
            }
        }

        if self.fill_count == self.size() {
            warnings.store_overflow("ipk-cache");
            // The slot we are about to reuse belonged to the oldest packet.
            self.read_ptr = (self.write_ptr + 1) % self.size();
            self.fill_count -= 1;
        }

        let index = self.write_ptr;
        self.data[index] = inst;
        self.locations[index] = address;
        self.tags[index] = if started_packet { address } else { DEFAULT_TAG };

        self.write_ptr = (index + 1) % self.size();
        self.fill_count += 1;
        self.last_op_was_read = false;
        self.finished_packet_write = inst.end_of_packet();

        CacheWrite { index, started_packet, finished_packet: inst.end_of_packet() }
    }

    /// Reads the next instruction, applying any pending jump first.
    /// Returns the instruction and the address it was fetched from.
    pub fn read(&mut self) -> (Instruction, MemoryAddr) {
        if self.jump_amount != 0 {
            // Relative to the instruction just read, which is one behind
            // the read pointer.
            let base = self.read_ptr as i64 - 1 + i64::from(self.jump_amount);
            self.read_ptr = base.rem_euclid(self.size() as i64) as usize;
            self.jump_amount = 0;
            self.recompute_fill();
        }

        let index = self.read_ptr;
        let inst = self.data[index];
        self.read_ptr = (index + 1) % self.size();
        self.fill_count = self.fill_count.saturating_sub(1);
        self.last_op_was_read = true;
        self.finished_packet_read = inst.end_of_packet();
        (inst, self.locations[index])
    }

    /// Positions the read pointer at the start of a packet.
    pub fn start_new_packet(&mut self, index: CacheIndex) {
        self.read_ptr = index % self.size();
        self.last_op_was_read = true;
        self.recompute_fill();
    }

    /// Queues an in-buffer jump, applied at the next read.
    pub const fn jump(&mut self, offset: JumpOffset) {
        self.jump_amount = offset;
    }

    /// Stops reading the current packet (`nxipk`). The stored instructions
    /// stay valid for later tag hits.
    pub fn cancel_packet(&mut self) {
        self.finished_packet_read = true;
        self.read_ptr = self.write_ptr;
        self.recompute_fill();
    }

    /// Remaining free slots.
    pub fn remaining_space(&self) -> usize {
        self.size() - self.fill_count
    }

    /// Whether a fetch of a maximum-size packet would fit.
    pub fn room_to_fetch(&self) -> bool {
        self.remaining_space() >= MAX_IPK_SIZE
    }

    /// Whether there is nothing left to read.
    pub fn is_empty(&self) -> bool {
        self.fill_count == 0
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.fill_count == self.size()
    }

    /// Whether the last read ended a packet.
    pub const fn finished_packet_read(&self) -> bool {
        self.finished_packet_read
    }

    /// The fetch address of the instruction at the read pointer's last
    /// position (the one most recently read).
    pub fn memory_address(&self) -> MemoryAddr {
        let last = (self.read_ptr + self.size() - 1) % self.size();
        self.locations[last]
    }

    /// Whether the read and write pointers coincide.
    pub fn pointers_match(&self) -> bool {
        self.read_ptr == self.write_ptr
    }

    /// Preloads a packet at startup with no network round-trip.
    /// Instructions are addressed from `base`.
    pub fn store_code(&mut self, code: &[Instruction], base: MemoryAddr, warnings: &Warnings) {
        if code.len() > self.size() {
            tracing::error!(target: "loki::core",
                count = code.len(), capacity = self.size(),
                "preloaded code exceeds instruction cache capacity");
        }
        for (i, inst) in code.iter().take(self.size()).enumerate() {
            let _ = self.write(*inst, base + i as u32 * BYTES_PER_WORD, warnings);
        }
    }

    /// Recomputes the fill count from the pointers, using the last
    /// operation to break the tie when they coincide.
    fn recompute_fill(&mut self) {
        self.fill_count = if self.write_ptr == self.read_ptr {
            if self.last_op_was_read { 0 } else { self.size() }
        } else {
            (self.write_ptr + self.size() - self.read_ptr) % self.size()
        };
    }
}

/// Convenience for tests and the fetch stage: the sentinel for "not found".
pub const fn not_cached() -> CacheIndex {
    NOT_IN_CACHE
}
