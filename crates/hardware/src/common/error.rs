//! Fatal errors and maskable warnings.
//!
//! This module defines the simulator's error handling. It provides:
//! 1. **`SimError`:** Conditions that end the simulation — unknown opcodes,
//!    malformed input files, invalid internal options.
//! 2. **`Warning` / `Warnings`:** Soft faults with stable names that can be
//!    silenced individually (`-Wname=off`). Warnings report and recover;
//!    they never stop execution.

use std::fmt;

use thiserror::Error;

use super::{MemoryAddr, RegisterIndex};

/// Fatal simulation errors.
///
/// Anything that reaches this enum is surfaced to the user and ends the
/// run. Soft faults (misalignment, out-of-bounds data accesses) go through
/// [`Warnings`] instead.
#[derive(Debug, Error)]
pub enum SimError {
    /// An instruction word decoded to an opcode the ISA does not define.
    ///
    /// At parse time this carries file/line context via [`SimError::Parse`];
    /// during execution of a loaded binary it is an assertion failure.
    #[error("unknown opcode {opcode} in instruction {encoded:#010x}")]
    UnknownOpcode {
        /// The 7-bit opcode field.
        opcode: u8,
        /// The whole encoded instruction.
        encoded: u32,
    },

    /// An ALU function code outside the defined set.
    #[error("invalid ALU function code {0}")]
    InvalidFunction(u8),

    /// A decoder or network component reached an enum value it has no case
    /// for. Equivalent to the original's invalid-option assertion.
    #[error("invalid option for {context}: {value}")]
    InvalidOption {
        /// What was being selected.
        context: &'static str,
        /// The offending value.
        value: u32,
    },

    /// A malformed line in an assembly or loader file.
    #[error("{file}:{line}: {message}")]
    Parse {
        /// The file being read.
        file: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// An input file could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An ELF binary could not be parsed.
    #[error("malformed ELF {path}: {message}")]
    Elf {
        /// The path that failed.
        path: String,
        /// Parser detail.
        message: String,
    },

    /// An unknown system call number.
    #[error("unknown system call {0}")]
    UnknownSyscall(u32),
}

/// Names for every soft-fault class the simulator can report.
///
/// Each variant has a stable textual name used on the command line to
/// silence it (`-Wname=off`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A data access fell outside the loaded memory image.
    OutOfBounds,
    /// A write targeted a read-only range; the write is dropped.
    ReadOnly,
    /// A misaligned access was rounded down to an aligned boundary.
    Alignment,
    /// Software wrote to a reserved register (r1; writes to r0 are silent).
    ReservedRegister,
    /// An instruction store overflowed and overwrote live instructions.
    StoreOverflow,
    /// An unrecognised command-line argument or loader directive.
    UnknownArgument,
}

impl Warning {
    /// All warning kinds, for `--list`-style output and name lookup.
    pub const ALL: [Self; 6] = [
        Self::OutOfBounds,
        Self::ReadOnly,
        Self::Alignment,
        Self::ReservedRegister,
        Self::StoreOverflow,
        Self::UnknownArgument,
    ];

    /// The stable command-line name of this warning.
    pub const fn name(self) -> &'static str {
        match self {
            Self::OutOfBounds => "out-of-bounds",
            Self::ReadOnly => "read-only",
            Self::Alignment => "alignment",
            Self::ReservedRegister => "reserved-reg",
            Self::StoreOverflow => "store-overflow",
            Self::UnknownArgument => "unknown-arg",
        }
    }

    /// Looks a warning up by its command-line name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|w| w.name() == name)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of enabled warnings.
///
/// All warnings start enabled except [`Warning::ReadOnly`], which matches
/// the original default of only reporting read-only violations on request.
#[derive(Clone, Debug)]
pub struct Warnings {
    enabled: [bool; Warning::ALL.len()],
}

impl Default for Warnings {
    fn default() -> Self {
        let mut enabled = [true; Warning::ALL.len()];
        enabled[Warning::ReadOnly as usize] = false;
        Self { enabled }
    }
}

impl Warnings {
    /// Enables or disables one warning by kind.
    pub const fn set(&mut self, warning: Warning, on: bool) {
        self.enabled[warning as usize] = on;
    }

    /// Enables or disables one warning by its command-line name.
    ///
    /// Returns `false` if the name is unknown.
    pub fn set_by_name(&mut self, name: &str, on: bool) -> bool {
        match Warning::from_name(name) {
            Some(w) => {
                self.set(w, on);
                true
            }
            None => false,
        }
    }

    /// Whether the given warning should be reported.
    pub const fn is_enabled(&self, warning: Warning) -> bool {
        self.enabled[warning as usize]
    }

    /// Reports an out-of-bounds access if enabled.
    pub fn out_of_bounds(&self, addr: MemoryAddr) {
        if self.is_enabled(Warning::OutOfBounds) {
            tracing::warn!(target: "loki::memory", addr = format_args!("{addr:#010x}"),
                "access outside loaded memory [-Wout-of-bounds]");
        }
    }

    /// Reports a dropped write to a read-only range if enabled.
    pub fn read_only(&self, addr: MemoryAddr) {
        if self.is_enabled(Warning::ReadOnly) {
            tracing::warn!(target: "loki::memory", addr = format_args!("{addr:#010x}"),
                "write to read-only memory dropped [-Wread-only]");
        }
    }

    /// Reports a misaligned access (rounded down) if enabled.
    pub fn alignment(&self, addr: MemoryAddr, align: u32) {
        if self.is_enabled(Warning::Alignment) {
            tracing::warn!(target: "loki::memory", addr = format_args!("{addr:#010x}"), align,
                "misaligned access rounded down [-Walignment]");
        }
    }

    /// Reports a software write to a reserved register if enabled.
    pub fn reserved_register(&self, reg: RegisterIndex) {
        if self.is_enabled(Warning::ReservedRegister) {
            tracing::warn!(target: "loki::core", reg,
                "write to reserved register dropped [-Wreserved-reg]");
        }
    }

    /// Reports an instruction-store overwrite if enabled.
    pub fn store_overflow(&self, component: &str) {
        if self.is_enabled(Warning::StoreOverflow) {
            tracing::warn!(target: "loki::core", component,
                "instruction store overflow: old packet overwritten [-Wstore-overflow]");
        }
    }

    /// Reports an unrecognised argument or directive if enabled.
    pub fn unknown_argument(&self, arg: &str) {
        if self.is_enabled(Warning::UnknownArgument) {
            tracing::warn!(target: "loki::cli", arg, "unrecognised argument [-Wunknown-arg]");
        }
    }
}
