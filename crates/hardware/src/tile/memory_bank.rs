//! Memory banks: the request/response front-end onto background memory.
//!
//! Banks expose only their network interface; the data lives in the chip's
//! [`MainMemory`](crate::memory::MainMemory). A bank accepts one request
//! packet at a time on its input channel and answers on the return channel
//! the head flit names:
//! 1. **`IpkRead`** streams instructions, one per cycle, until the end of
//!    the packet or the end of the cache line, whichever comes first (the
//!    fetcher re-requests at line boundaries).
//! 2. **Loads** answer with one flit; **stores** absorb a head + payload
//!    pair and answer nothing.
//! 3. **Atomics** read-modify-write and answer with the old value;
//!    `ldl`/`stc` use a per-bank reservation.
//!
//! Every response is delayed by the configured access latency.

use std::collections::VecDeque;

use crate::common::constants::BYTES_PER_WORD;
use crate::common::{
    ChannelId, ComponentId, CycleCount, Flit, MemoryAddr, MemoryOpcode, Warnings,
};
use crate::config::TileConfig;
use crate::isa::Instruction;
use crate::memory::MainMemory;

/// Flits a bank can queue on its request input.
const REQUEST_QUEUE_DEPTH: usize = 4;

/// An instruction stream in progress.
#[derive(Clone, Copy, Debug)]
struct IpkStream {
    /// Next address to read.
    address: MemoryAddr,
    /// Where instructions are delivered.
    return_to: ChannelId,
}

/// A store or atomic waiting for its payload flit.
#[derive(Clone, Copy, Debug)]
struct PendingWrite {
    op: MemoryOpcode,
    address: MemoryAddr,
    return_to: ChannelId,
}

/// One memory bank.
#[derive(Debug)]
pub struct MemoryBank {
    /// This bank's identity within the chip.
    pub id: ComponentId,
    requests: VecDeque<Flit>,
    pending_write: Option<PendingWrite>,
    stream: Option<IpkStream>,
    /// Responses waiting out the access latency.
    responses: VecDeque<(CycleCount, Flit)>,
    /// The response currently offered to the crossbar.
    pub response_out: Option<Flit>,
    reservation: Option<MemoryAddr>,
    latency: CycleCount,
    line_bytes: u32,
}

impl MemoryBank {
    /// Creates a bank.
    pub fn new(id: ComponentId, config: &TileConfig) -> Self {
        Self {
            id,
            requests: VecDeque::new(),
            pending_write: None,
            stream: None,
            responses: VecDeque::new(),
            response_out: None,
            reservation: None,
            latency: config.memory_latency,
            line_bytes: config.line_bytes.max(BYTES_PER_WORD),
        }
    }

    /// Whether the request input can accept another flit.
    pub fn request_ready(&self) -> bool {
        self.requests.len() < REQUEST_QUEUE_DEPTH
    }

    /// Accepts a request flit from the crossbar.
    pub fn push_request(&mut self, flit: Flit) {
        debug_assert!(self.request_ready());
        self.requests.push_back(flit);
    }

    /// One cycle of bank work.
    pub fn tick(&mut self, mem: &mut MainMemory, warnings: &Warnings, now: CycleCount) {
        // Move a matured response onto the output port.
        if self.response_out.is_none() {
            if let Some(&(ready, flit)) = self.responses.front() {
                if ready <= now {
                    self.response_out = Some(flit);
                    let _ = self.responses.pop_front();
                }
            }
        }

        // An instruction stream emits one word per cycle.
        if let Some(stream) = self.stream {
            self.step_stream(stream, mem, warnings, now);
            return;
        }

        // Otherwise start on the next request.
        let Some(flit) = self.requests.pop_front() else { return };
        self.handle_request(&flit, mem, warnings, now);
    }

    /// Whether the bank has nothing queued or in flight.
    pub fn idle(&self) -> bool {
        self.requests.is_empty()
            && self.stream.is_none()
            && self.responses.is_empty()
            && self.response_out.is_none()
            && self.pending_write.is_none()
    }

    fn step_stream(
        &mut self,
        stream: IpkStream,
        mem: &MainMemory,
        warnings: &Warnings,
        now: CycleCount,
    ) {
        let word = mem.read_word(stream.address, warnings);
        let inst = Instruction::new(word);
        let next = stream.address.wrapping_add(BYTES_PER_WORD);

        // The stream ends at the packet's end-of-packet marker or at the
        // cache-line boundary; the fetch stage requests the next line.
        let line_end = next % self.line_bytes == 0;
        let done = inst.end_of_packet() || line_end;

        let flit = Flit::core_data(word, stream.return_to, done);
        self.responses.push_back((now + self.latency, flit));

        self.stream = if done { None } else { Some(IpkStream { address: next, ..stream }) };
    }

    fn handle_request(
        &mut self,
        flit: &Flit,
        mem: &mut MainMemory,
        warnings: &Warnings,
        now: CycleCount,
    ) {
        let return_to =
            ChannelId::new(flit.source.tile(), flit.source.position(), flit.return_channel);
        let address = flit.payload;

        match flit.memory_op {
            MemoryOpcode::IpkRead => {
                self.stream = Some(IpkStream { address, return_to });
            }

            MemoryOpcode::LoadW => {
                let value = mem.read_word(address, warnings);
                self.respond(value, return_to, now);
            }
            MemoryOpcode::LoadHw => {
                let value = u32::from(mem.read_halfword(address, warnings));
                self.respond(value, return_to, now);
            }
            MemoryOpcode::LoadB => {
                let value = u32::from(mem.read_byte(address, warnings));
                self.respond(value, return_to, now);
            }
            MemoryOpcode::LoadLinked => {
                self.reservation = Some(address & !3);
                let value = mem.read_word(address, warnings);
                self.respond(value, return_to, now);
            }

            MemoryOpcode::StoreW
            | MemoryOpcode::StoreHw
            | MemoryOpcode::StoreB
            | MemoryOpcode::StoreConditional
            | MemoryOpcode::LoadAndAdd
            | MemoryOpcode::LoadAndOr
            | MemoryOpcode::LoadAndAnd
            | MemoryOpcode::LoadAndXor
            | MemoryOpcode::Exchange => {
                self.pending_write =
                    Some(PendingWrite { op: flit.memory_op, address, return_to });
            }

            MemoryOpcode::Payload | MemoryOpcode::PayloadEop => {
                let Some(pending) = self.pending_write.take() else {
                    tracing::error!(target: "loki::memory", bank = %self.id,
                        "payload flit with no pending request");
                    return;
                };
                self.complete_write(pending, flit.payload, mem, warnings, now);
            }

            MemoryOpcode::None => {
                tracing::error!(target: "loki::memory", bank = %self.id,
                    "non-memory flit reached a memory bank");
            }
        }
    }

    fn complete_write(
        &mut self,
        pending: PendingWrite,
        data: u32,
        mem: &mut MainMemory,
        warnings: &Warnings,
        now: CycleCount,
    ) {
        let addr = pending.address;
        match pending.op {
            MemoryOpcode::StoreW => {
                mem.write_word(addr, data, warnings);
                self.invalidate_reservation(addr);
            }
            MemoryOpcode::StoreHw => {
                mem.write_halfword(addr, data as u16, warnings);
                self.invalidate_reservation(addr);
            }
            MemoryOpcode::StoreB => {
                mem.write_byte(addr, data as u8, warnings);
                self.invalidate_reservation(addr);
            }
            MemoryOpcode::StoreConditional => {
                let success = self.reservation == Some(addr & !3);
                if success {
                    mem.write_word(addr, data, warnings);
                }
                self.reservation = None;
                self.respond(u32::from(success), pending.return_to, now);
            }
            MemoryOpcode::LoadAndAdd
            | MemoryOpcode::LoadAndOr
            | MemoryOpcode::LoadAndAnd
            | MemoryOpcode::LoadAndXor
            | MemoryOpcode::Exchange => {
                let old = mem.read_word(addr, warnings);
                let new = match pending.op {
                    MemoryOpcode::LoadAndAdd => old.wrapping_add(data),
                    MemoryOpcode::LoadAndOr => old | data,
                    MemoryOpcode::LoadAndAnd => old & data,
                    MemoryOpcode::LoadAndXor => old ^ data,
                    _ => data,
                };
                mem.write_word(addr, new, warnings);
                self.invalidate_reservation(addr);
                self.respond(old, pending.return_to, now);
            }
            _ => {}
        }
    }

    fn invalidate_reservation(&mut self, addr: MemoryAddr) {
        if self.reservation == Some(addr & !3) {
            self.reservation = None;
        }
    }

    fn respond(&mut self, value: u32, return_to: ChannelId, now: CycleCount) {
        let flit = Flit::core_data(value, return_to, true);
        self.responses.push_back((now + self.latency, flit));
    }
}
