//! Configuration system for the simulator.
//!
//! This module defines every tunable parameter of the modelled hardware. It
//! provides:
//! 1. **Defaults:** Baseline hardware constants (tile grid, store sizes,
//!    FIFO depths, credit limits).
//! 2. **Structures:** Hierarchical config for the chip, tiles, cores, the
//!    instruction stores, and the on-tile network.
//! 3. **Named overrides:** A string-keyed path (`set_parameter`,
//!    `list_parameters`) backing `-Pname=value` and `--list-parameters`.
//!
//! Construct with [`Config::default()`] and apply overrides before building
//! the chip; every component takes its slice of the config by reference at
//! construction and never consults globals afterwards.

use serde::Deserialize;

/// Default configuration constants.
///
/// These values define the baseline hardware when not overridden on the
/// command line or in a loader script.
mod defaults {
    /// Compute-tile columns in the chip grid.
    pub const TILE_COLUMNS: usize = 1;

    /// Compute-tile rows in the chip grid.
    pub const TILE_ROWS: usize = 1;

    /// Cores per compute tile.
    pub const CORES_PER_TILE: usize = 8;

    /// Memory banks per compute tile.
    pub const BANKS_PER_TILE: usize = 8;

    /// Physical registers per core.
    ///
    /// Indices 0 and 1 are reserved; a contiguous range is aliased to the
    /// input channel ends.
    pub const REGISTERS: usize = 32;

    /// Input channel ends per core (register-mapped network inputs).
    pub const INPUT_CHANNELS: usize = 6;

    /// First register index aliased to an input channel end.
    pub const FIRST_CHANNEL_REGISTER: usize = 16;

    /// Depth of each input channel-end FIFO, in flits.
    pub const CHANNEL_END_DEPTH: usize = 4;

    /// IPK cache capacity, in instructions.
    pub const IPK_CACHE_SIZE: usize = 64;

    /// Tags in the fully-associative IPK cache.
    pub const IPK_CACHE_TAGS: usize = 8;

    /// IPK FIFO capacity, in instructions.
    pub const IPK_FIFO_SIZE: usize = 24;

    /// Pending fetch requests a core can queue.
    pub const FETCH_BUFFER_SIZE: usize = 1;

    /// Entries in the channel map table.
    pub const CHANNEL_MAP_SIZE: usize = 16;

    /// Maximum credits per creditable channel map entry. Matches the
    /// consumer-side buffer depth.
    pub const MAX_CREDITS: usize = 4;

    /// Scratchpad capacity, in words.
    pub const SCRATCHPAD_SIZE: usize = 256;

    /// Control registers per core.
    pub const CONTROL_REGISTERS: usize = 16;

    /// Memory bank cache-line length, in bytes. Instruction fetch issues a
    /// continuation request at every multiple of this.
    pub const CACHE_LINE_BYTES: u32 = 32;

    /// Cycles between a memory bank accepting a request and the first
    /// response flit.
    pub const MEMORY_LATENCY: u64 = 2;

    /// Maximum flits per cycle across one network link (0 = uncapped).
    pub const LINK_BANDWIDTH: usize = 1;

    /// Extra cycles per hop for flits that leave their source tile.
    pub const HOP_LATENCY: u64 = 1;

    /// Cycles of chip-wide idleness before the simulation stops itself.
    pub const IDLE_TIMEOUT: u64 = 100;
}

/// Organization of the IPK cache tag array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheOrganization {
    /// One tag per possible packet start; packet starts align to
    /// `size / tags` boundaries.
    #[default]
    FullyAssociative,
    /// One tag per slot; position derived from the address.
    DirectMapped,
}

/// Parameters of one core's instruction stores.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstructionStoreConfig {
    /// IPK cache capacity, in instructions.
    pub cache_size: usize,
    /// Number of cache tags (fully-associative organization only).
    pub cache_tags: usize,
    /// Tag array organization.
    pub organization: CacheOrganization,
    /// IPK FIFO capacity, in instructions.
    pub fifo_size: usize,
    /// Pending fetch requests the fetch stage can queue.
    pub fetch_buffer: usize,
}

impl Default for InstructionStoreConfig {
    fn default() -> Self {
        Self {
            cache_size: defaults::IPK_CACHE_SIZE,
            cache_tags: defaults::IPK_CACHE_TAGS,
            organization: CacheOrganization::default(),
            fifo_size: defaults::IPK_FIFO_SIZE,
            fetch_buffer: defaults::FETCH_BUFFER_SIZE,
        }
    }
}

/// Parameters of one core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Physical registers.
    pub registers: usize,
    /// Register-mapped input channel ends.
    pub input_channels: usize,
    /// First register index aliased to a channel end.
    pub first_channel_register: usize,
    /// Depth of each input channel-end FIFO.
    pub channel_end_depth: usize,
    /// Channel map table entries.
    pub channel_map_size: usize,
    /// Maximum credits per creditable channel.
    pub max_credits: usize,
    /// Scratchpad words.
    pub scratchpad_size: usize,
    /// Control registers.
    pub control_registers: usize,
    /// Instruction store parameters.
    pub stores: InstructionStoreConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            registers: defaults::REGISTERS,
            input_channels: defaults::INPUT_CHANNELS,
            first_channel_register: defaults::FIRST_CHANNEL_REGISTER,
            channel_end_depth: defaults::CHANNEL_END_DEPTH,
            channel_map_size: defaults::CHANNEL_MAP_SIZE,
            max_credits: defaults::MAX_CREDITS,
            scratchpad_size: defaults::SCRATCHPAD_SIZE,
            control_registers: defaults::CONTROL_REGISTERS,
            stores: InstructionStoreConfig::default(),
        }
    }
}

/// Parameters of the tile-local network and memory system.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Cores per tile.
    pub cores: usize,
    /// Memory banks per tile.
    pub banks: usize,
    /// Bank cache-line length in bytes.
    pub line_bytes: u32,
    /// Bank response latency in cycles.
    pub memory_latency: u64,
    /// Flits per cycle per link (0 = uncapped).
    pub link_bandwidth: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES_PER_TILE,
            banks: defaults::BANKS_PER_TILE,
            line_bytes: defaults::CACHE_LINE_BYTES,
            memory_latency: defaults::MEMORY_LATENCY,
            link_bandwidth: defaults::LINK_BANDWIDTH,
        }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compute-tile columns.
    pub tile_columns: usize,
    /// Compute-tile rows.
    pub tile_rows: usize,
    /// Per-tile parameters.
    pub tile: TileConfig,
    /// Per-core parameters.
    pub core: CoreConfig,
    /// Extra latency per inter-tile hop.
    pub hop_latency: u64,
    /// Idle-timeout threshold, in cycles.
    pub idle_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_columns: defaults::TILE_COLUMNS,
            tile_rows: defaults::TILE_ROWS,
            tile: TileConfig::default(),
            core: CoreConfig::default(),
            hop_latency: defaults::HOP_LATENCY,
            idle_timeout: defaults::IDLE_TIMEOUT,
        }
    }
}

/// One row of the parameter table: name, description, current value.
pub struct ParameterInfo {
    /// The name accepted by `-Pname=value`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// The current value, rendered as text.
    pub value: String,
}

impl Config {
    /// Sets a parameter by its command-line name.
    ///
    /// # Errors
    ///
    /// Returns a message naming the problem if the parameter is unknown or
    /// the value fails to parse.
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), String> {
        fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("invalid value '{value}' for parameter {name}"))
        }

        match name {
            "tile-columns" => self.tile_columns = parse(name, value)?,
            "tile-rows" => self.tile_rows = parse(name, value)?,
            "cores-per-tile" => self.tile.cores = parse(name, value)?,
            "banks-per-tile" => self.tile.banks = parse(name, value)?,
            "line-bytes" => self.tile.line_bytes = parse(name, value)?,
            "memory-latency" => self.tile.memory_latency = parse(name, value)?,
            "link-bandwidth" => self.tile.link_bandwidth = parse(name, value)?,
            "registers" => self.core.registers = parse(name, value)?,
            "input-channels" => self.core.input_channels = parse(name, value)?,
            "channel-end-depth" => self.core.channel_end_depth = parse(name, value)?,
            "channel-map-size" => self.core.channel_map_size = parse(name, value)?,
            "max-credits" => self.core.max_credits = parse(name, value)?,
            "scratchpad-size" => self.core.scratchpad_size = parse(name, value)?,
            "ipk-cache-size" => self.core.stores.cache_size = parse(name, value)?,
            "ipk-cache-tags" => self.core.stores.cache_tags = parse(name, value)?,
            "ipk-cache-organization" => {
                self.core.stores.organization = match value {
                    "fully-associative" => CacheOrganization::FullyAssociative,
                    "direct-mapped" => CacheOrganization::DirectMapped,
                    other => {
                        return Err(format!(
                            "invalid value '{other}' for parameter {name} \
                             (expected fully-associative or direct-mapped)"
                        ));
                    }
                };
            }
            "ipk-fifo-size" => self.core.stores.fifo_size = parse(name, value)?,
            "fetch-buffer" => self.core.stores.fetch_buffer = parse(name, value)?,
            "hop-latency" => self.hop_latency = parse(name, value)?,
            "idle-timeout" => self.idle_timeout = parse(name, value)?,
            _ => return Err(format!("unknown parameter: {name}")),
        }
        Ok(())
    }

    /// Lists every parameter with its description and current value, for
    /// `--list-parameters`.
    pub fn list_parameters(&self) -> Vec<ParameterInfo> {
        macro_rules! row {
            ($name:literal, $desc:literal, $value:expr) => {
                ParameterInfo {
                    name: $name,
                    description: $desc,
                    value: format!("{}", $value),
                }
            };
        }

        vec![
            row!("tile-columns", "compute-tile columns in the grid", self.tile_columns),
            row!("tile-rows", "compute-tile rows in the grid", self.tile_rows),
            row!("cores-per-tile", "cores per compute tile", self.tile.cores),
            row!("banks-per-tile", "memory banks per compute tile", self.tile.banks),
            row!("line-bytes", "memory cache-line length (bytes)", self.tile.line_bytes),
            row!("memory-latency", "bank response latency (cycles)", self.tile.memory_latency),
            row!("link-bandwidth", "flits/cycle per network link (0 = uncapped)", self.tile.link_bandwidth),
            row!("registers", "physical registers per core", self.core.registers),
            row!("input-channels", "register-mapped input channels per core", self.core.input_channels),
            row!("channel-end-depth", "input channel FIFO depth (flits)", self.core.channel_end_depth),
            row!("channel-map-size", "channel map table entries", self.core.channel_map_size),
            row!("max-credits", "credits per creditable channel", self.core.max_credits),
            row!("scratchpad-size", "scratchpad words per core", self.core.scratchpad_size),
            row!("ipk-cache-size", "IPK cache capacity (instructions)", self.core.stores.cache_size),
            row!("ipk-cache-tags", "IPK cache tag count", self.core.stores.cache_tags),
            row!(
                "ipk-cache-organization",
                "IPK cache organization (fully-associative | direct-mapped)",
                match self.core.stores.organization {
                    CacheOrganization::FullyAssociative => "fully-associative",
                    CacheOrganization::DirectMapped => "direct-mapped",
                }
            ),
            row!("ipk-fifo-size", "IPK FIFO capacity (instructions)", self.core.stores.fifo_size),
            row!("fetch-buffer", "queued fetch requests per core", self.core.stores.fetch_buffer),
            row!("hop-latency", "extra cycles per inter-tile hop", self.hop_latency),
            row!("idle-timeout", "idle cycles before clean termination", self.idle_timeout),
        ]
    }
}
