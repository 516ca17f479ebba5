//! Architectural constants.
//!
//! Values here are fixed by the instruction set or the network encoding, not
//! by configuration. Anything tunable lives in [`crate::config`].

/// Bytes per architectural word.
pub const BYTES_PER_WORD: u32 = 4;

/// Maximum length of an instruction packet, in instructions.
///
/// A fetch may only be issued when the cache has room for a packet of this
/// size, so it bounds the refill reservation.
pub const MAX_IPK_SIZE: usize = 8;

/// Sentinel tag meaning "this slot holds no packet start".
///
/// Only the first instruction of each packet carries a real tag; every other
/// slot carries this value.
pub const DEFAULT_TAG: u32 = 0xFFFF_FFFF;

/// Sentinel cache index meaning "not present in any instruction store".
pub const NOT_IN_CACHE: usize = usize::MAX;

/// Encoded channel field meaning "no output channel".
///
/// The channel field is 4 bits; 15 is reserved as the null channel.
pub const NO_CHANNEL: u8 = 15;

/// The input channel that delivers instructions to the IPK FIFO.
pub const FIFO_CHANNEL: u8 = 0;
/// The input channel that delivers instructions to the IPK cache.
pub const CACHE_CHANNEL: u8 = 1;

/// Register holding the constant zero.
pub const REG_ZERO: u8 = 0;
/// Register holding the address of the currently executing packet.
pub const REG_CURRENT_IPK: u8 = 1;

/// System-call result registers, per the compiler ABI.
pub const SYSCALL_RESULT1: u8 = 11;
/// Second system-call result register (used by wide results).
pub const SYSCALL_RESULT2: u8 = 12;
/// First system-call argument register.
pub const SYSCALL_ARG1: u8 = 13;
/// Second system-call argument register.
pub const SYSCALL_ARG2: u8 = 14;
/// Third system-call argument register.
pub const SYSCALL_ARG3: u8 = 15;
