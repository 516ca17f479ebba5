//! Program loading: ELF binaries, loader scripts, assembly and data files.
//!
//! This module fills the chip before the clock starts. It provides:
//! 1. **ELF loading:** Standard 32-bit little-endian ELF files; sections
//!    with the alloc flag and real contents land at their virtual
//!    addresses, and sections without the write flag become read-only.
//! 2. **Loader scripts:** Plain-text files with the directives
//!    `directory <path>`, `loader <file>` (recursive include),
//!    `parameter <name> <value>`, `<memory-id> <core-id> <elf-file>`, and
//!    `<component-id> <data-file>`. Lines starting with `#` or `%` are
//!    comments.
//! 3. **Assembly files:** `.s`/`.loki` files assemble line-by-line and are
//!    preloaded into a core's instruction cache.
//! 4. **Data files:** One word per line (decimal or hex), loaded into
//!    memory.

use std::fs;
use std::path::{Path, PathBuf};

use object::{Object as _, ObjectSection as _, SectionFlags, SectionKind};

use crate::common::constants::{BYTES_PER_WORD, CACHE_CHANNEL};
use crate::common::{MemoryAddr, SimError};
use crate::config::Config;
use crate::core::channel_map::MemoryView;
use crate::isa::asm::{parse_line, AsmLine};
use crate::isa::{Instruction, Opcode, Predicate};
use crate::tile::chip::Chip;

/// ELF section flag: occupies memory during execution.
const SHF_ALLOC: u64 = 0x2;
/// ELF section flag: writable.
const SHF_WRITE: u64 = 0x1;

/// One instruction a loader script gives the simulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Override a named parameter.
    Parameter {
        /// The parameter's command-line name.
        name: String,
        /// The value text.
        value: String,
    },
    /// Load an ELF into the memory reachable from a core, and point that
    /// core at the entry point.
    LoadElf {
        /// Memory bank index serving the core's fetches.
        memory: u32,
        /// Core position (chip-wide, row-major by tile).
        core: u32,
        /// The ELF file.
        path: PathBuf,
    },
    /// Load a raw file into a component: assembly for cores, data words
    /// for memory.
    LoadFile {
        /// Chip-wide component index.
        component: u32,
        /// The file.
        path: PathBuf,
    },
}

/// Reads a loader script, resolving `directory` and recursive `loader`
/// directives.
///
/// A path that is not a `.txt` script is treated as a single ELF to load
/// for core 0.
///
/// # Errors
///
/// I/O failures and malformed directives are fatal.
pub fn read_script(path: &Path) -> Result<Vec<Directive>, SimError> {
    if path.extension().is_none_or(|e| e != "txt") {
        return Ok(vec![Directive::LoadElf { memory: 0, core: 0, path: path.to_path_buf() }]);
    }

    let text = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut directory = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
    let mut directives = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
            continue;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let parse_error = |message: String| SimError::Parse {
            file: path.display().to_string(),
            line: number + 1,
            message,
        };

        match words.as_slice() {
            ["directory", dir] => directory = directory.join(dir),
            ["loader", file] => {
                directives.extend(read_script(&directory.join(file))?);
            }
            ["parameter", name, value] => directives.push(Directive::Parameter {
                name: (*name).to_string(),
                value: (*value).to_string(),
            }),
            [memory, core, file] => {
                let memory = memory
                    .parse()
                    .map_err(|_| parse_error(format!("bad memory id: {memory}")))?;
                let core =
                    core.parse().map_err(|_| parse_error(format!("bad core id: {core}")))?;
                directives.push(Directive::LoadElf { memory, core, path: directory.join(file) });
            }
            [component, file] => {
                let component = component
                    .parse()
                    .map_err(|_| parse_error(format!("bad component id: {component}")))?;
                directives.push(Directive::LoadFile { component, path: directory.join(file) });
            }
            _ => return Err(parse_error(format!("unrecognised directive: {line}"))),
        }
    }
    Ok(directives)
}

/// Applies every `parameter` directive to the configuration. Must run
/// before the chip is built.
pub fn apply_parameters(config: &mut Config, directives: &[Directive]) {
    for directive in directives {
        if let Directive::Parameter { name, value } = directive {
            if let Err(message) = config.set_parameter(name, value) {
                tracing::warn!(target: "loki::loader", %message, "ignoring parameter directive");
            }
        }
    }
}

/// Applies every load directive to the constructed chip.
///
/// # Errors
///
/// File and format problems are fatal at load time.
pub fn load_programs(chip: &mut Chip, config: &Config, directives: &[Directive]) -> Result<(), SimError> {
    for directive in directives {
        match directive {
            Directive::Parameter { .. } => {}
            Directive::LoadElf { memory, core, path } => {
                load_elf_for_core(chip, config, *memory, *core, path)?;
            }
            Directive::LoadFile { component, path } => {
                load_component_file(chip, config, *component, path)?;
            }
        }
    }
    Ok(())
}

/// Loads an ELF image into background memory. Returns the entry point.
///
/// # Errors
///
/// Unreadable files and malformed ELF structures are fatal.
pub fn load_elf(chip: &mut Chip, path: &Path) -> Result<MemoryAddr, SimError> {
    let bytes = fs::read(path).map_err(|source| SimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file = object::File::parse(&*bytes).map_err(|e| SimError::Elf {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    for section in file.sections() {
        let SectionFlags::Elf { sh_flags } = section.flags() else { continue };
        if sh_flags & SHF_ALLOC == 0 || section.kind() == SectionKind::UninitializedData {
            continue;
        }
        let Ok(data) = section.data() else { continue };
        let address = section.address() as u32;
        let read_only = sh_flags & SHF_WRITE == 0;
        tracing::debug!(target: "loki::loader",
            section = section.name().unwrap_or("?"),
            address = format_args!("{address:#010x}"), bytes = data.len(), read_only,
            "loading ELF section");
        chip.memory.load(address, data, read_only);
    }

    Ok(file.entry() as u32)
}

/// Loads an ELF and points a core's fetch path at its entry: CMT entry 0
/// gets a memory view of the serving bank, and a three-instruction boot
/// packet (build the entry address, fetch it) is preloaded.
fn load_elf_for_core(
    chip: &mut Chip,
    config: &Config,
    memory: u32,
    core_index: u32,
    path: &Path,
) -> Result<(), SimError> {
    let entry = load_elf(chip, path)?;

    let (tile, position) = chip_core_position(config, core_index);
    let view = MemoryView {
        tile,
        bank: memory as u8 % config.tile.banks.max(1) as u8,
        group_size: 1,
        return_channel: CACHE_CHANNEL,
        line_bytes: config.tile.line_bytes,
        scratchpad: false,
    };
    let Some(core) = chip.core_mut(tile, position) else {
        return Err(SimError::InvalidOption { context: "core id", value: core_index });
    };
    core.cmt.write(0, view.encode());
    core.store_code(&boot_packet(entry), 0);
    Ok(())
}

/// The preloaded boot packet: build the entry address in r10, then fetch
/// the packet it names.
fn boot_packet(entry: MemoryAddr) -> [Instruction; 3] {
    let lli = Instruction::default()
        .with_opcode_bits(Opcode::Lli.to_bits())
        .with_reg1(10)
        .with_immediate(crate::isa::Format::R1nc, (entry & 0xFFFF) as i32);
    let lui = Instruction::default()
        .with_opcode_bits(Opcode::Lui.to_bits())
        .with_reg1(10)
        .with_immediate(crate::isa::Format::R1nc, (entry >> 16) as i32);
    let fetch = Instruction::default()
        .with_opcode_bits(Opcode::Fetch.to_bits())
        .with_reg1(10)
        .with_predicate(Predicate::EndOfPacket);
    [lli, lui, fetch]
}

/// Loads a raw file into a component: `.s`/`.loki` assembly preloads a
/// core's instruction cache; anything else is words into memory from
/// address zero upward (banks interleave by line in hardware; the flat
/// image ignores that).
fn load_component_file(
    chip: &mut Chip,
    config: &Config,
    component: u32,
    path: &Path,
) -> Result<(), SimError> {
    let assembly =
        path.extension().is_some_and(|e| e == "s" || e == "loki" || e == "asm");
    if assembly {
        let code = load_assembly(path)?;
        let (tile, position) = chip_core_position(config, component);
        let Some(core) = chip.core_mut(tile, position) else {
            return Err(SimError::InvalidOption { context: "component id", value: component });
        };
        core.store_code(&code, 0);
    } else {
        let words = load_data_words(path)?;
        for (i, word) in words.iter().enumerate() {
            let warnings = chip.warnings.clone();
            chip.memory.write_word(i as u32 * BYTES_PER_WORD, *word, &warnings);
        }
    }
    Ok(())
}

/// Assembles a text file into instructions, skipping blanks and labels.
///
/// # Errors
///
/// Malformed lines are fatal, with file and line context.
pub fn load_assembly(path: &Path) -> Result<Vec<Instruction>, SimError> {
    let text = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut code = Vec::new();
    for (number, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(AsmLine::Instruction(inst)) => code.push(inst),
            Ok(AsmLine::Blank | AsmLine::Label(_)) => {}
            Err(message) => {
                return Err(SimError::Parse {
                    file: path.display().to_string(),
                    line: number + 1,
                    message,
                });
            }
        }
    }
    Ok(code)
}

/// Reads a data file: one word per line, decimal or `0x` hex, `#`/`%`
/// comments allowed.
///
/// # Errors
///
/// Malformed lines are fatal, with file and line context.
pub fn load_data_words(path: &Path) -> Result<Vec<u32>, SimError> {
    let text = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut words = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
            continue;
        }
        let parsed = if let Some(hex) = line.strip_prefix("0x") {
            u32::from_str_radix(hex, 16)
        } else {
            line.parse()
        };
        match parsed {
            Ok(word) => words.push(word),
            Err(_) => {
                return Err(SimError::Parse {
                    file: path.display().to_string(),
                    line: number + 1,
                    message: format!("bad data word: {line}"),
                });
            }
        }
    }
    Ok(words)
}

/// Maps a chip-wide core index to (tile, position).
fn chip_core_position(config: &Config, index: u32) -> (crate::common::TileId, u8) {
    let per_tile = config.tile.cores.max(1) as u32;
    let tile_index = index / per_tile;
    let position = (index % per_tile) as u8;
    let columns = config.tile_columns.max(1) as u32;
    let tile = crate::common::TileId::new(
        (tile_index % columns) as u8,
        (tile_index / columns) as u8,
    );
    (tile, position)
}
