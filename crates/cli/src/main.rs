//! Loki cycle-accurate simulator CLI.
//!
//! This binary is the single entry point for simulation runs. It performs:
//! 1. **Configuration:** Builds the default parameter set, applies loader
//!    scripts (`--run` / `--settings`) and `-P name=value` overrides, and
//!    answers `--list-parameters`.
//! 2. **Loading:** Reads ELF binaries, assembly, and data files into the
//!    chip as the scripts direct; a bare positional argument is an ELF for
//!    core 0.
//! 3. **Execution:** Drives the clock until the program exits or the chip
//!    idles out, then prints the optional summary and propagates the
//!    program's exit code.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use loki_core::common::Warnings;
use loki_core::sim::loader;
use loki_core::tile::chip::StopReason;
use loki_core::{Config, Simulator};

/// Cycle cap for runs that never exit or idle out.
const DEFAULT_MAX_CYCLES: u64 = 1_000_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "lokisim",
    version,
    about = "Cycle-accurate simulator for the Loki tiled many-core architecture",
    long_about = "Run a program compiled for the Loki architecture.\n\nExamples:\n  lokisim app.elf\n  lokisim --run setup.txt --summary\n  lokisim -Pcores-per-tile=4 app.elf -- --args arg1 arg2"
)]
struct Cli {
    /// ELF binary to execute on core 0 (or use --run for full control).
    binary: Option<PathBuf>,

    /// Load the named loader script; may be repeated.
    #[arg(long, value_name = "FILE")]
    run: Vec<PathBuf>,

    /// Like --run, but suppresses the default settings script.
    #[arg(long, value_name = "FILE")]
    settings: Vec<PathBuf>,

    /// Print each executed instruction and its register context.
    #[arg(long)]
    trace: bool,

    /// Print a one-line-per-metric summary at the end.
    #[arg(long)]
    summary: bool,

    /// Suppress all output except program I/O and fatal errors.
    #[arg(long)]
    silent: bool,

    /// Increase verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override a simulator parameter (repeatable).
    #[arg(short = 'P', value_name = "NAME=VALUE")]
    parameter: Vec<String>,

    /// Dump all parameters with their current values and exit.
    #[arg(long)]
    list_parameters: bool,

    /// Enable or disable a named warning (NAME=on|off; repeatable).
    #[arg(short = 'W', value_name = "NAME[=on|off]")]
    warning: Vec<String>,

    /// Write the per-stall log (cycle, core, reason, duration) here.
    #[arg(long, value_name = "FILE")]
    stalltrace: Option<PathBuf>,

    /// Enter the interactive debugger before executing (unavailable).
    #[arg(long)]
    debug: bool,

    /// Emit a binary energy-event trace (unavailable).
    #[arg(long, value_name = "FILE")]
    energytrace: Option<PathBuf>,

    /// Emit Callgrind-format per-function counts (unavailable).
    #[arg(long, value_name = "FILE")]
    callgrind: Option<PathBuf>,

    /// Stop after this many cycles even without an exit.
    #[arg(long, value_name = "CYCLES", default_value_t = DEFAULT_MAX_CYCLES)]
    max_cycles: u64,

    /// Arguments for the simulated program.
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    install_subscriber(&cli);

    let mut config = Config::default();
    let mut warnings = Warnings::default();

    for spec in &cli.warning {
        let (name, state) = spec.split_once('=').unwrap_or((spec.as_str(), "on"));
        if !warnings.set_by_name(name, state != "off") {
            eprintln!("warning: unknown warning name '{name}'");
        }
    }

    // Scripts first (parameters may appear inside), then explicit -P
    // overrides on top.
    let mut directives = Vec::new();
    for script in cli.settings.iter().chain(&cli.run) {
        match loader::read_script(script) {
            Ok(more) => directives.extend(more),
            Err(e) => fail(&e.to_string()),
        }
    }
    if let Some(binary) = &cli.binary {
        match loader::read_script(binary) {
            Ok(more) => directives.extend(more),
            Err(e) => fail(&e.to_string()),
        }
    }
    loader::apply_parameters(&mut config, &directives);

    for spec in &cli.parameter {
        let Some((name, value)) = spec.split_once('=') else {
            fail(&format!("expected NAME=VALUE in -P{spec}"));
        };
        if let Err(message) = config.set_parameter(name, value) {
            fail(&message);
        }
    }

    if cli.list_parameters {
        for row in config.list_parameters() {
            println!("{:<24} {:<12} {}", row.name, row.value, row.description);
        }
        return;
    }

    if cli.debug {
        eprintln!("note: the interactive debugger is not available in this build");
    }
    if cli.energytrace.is_some() {
        eprintln!("note: energy tracing is not available in this build");
    }
    if cli.callgrind.is_some() {
        eprintln!("note: callgrind output is not available in this build");
    }
    if directives.is_empty() {
        fail("nothing to simulate: give an ELF binary or --run <script>");
    }
    if !cli.args.is_empty() {
        tracing::debug!(target: "loki::cli", args = ?cli.args, "program arguments recorded");
    }

    let mut sim = Simulator::new(&config, warnings);
    if cli.stalltrace.is_some() {
        sim.chip.stats.enable_stall_log();
    }
    for core in sim.chip.tiles.iter_mut().flat_map(|t| t.cores.iter_mut()) {
        core.trace = cli.trace;
    }

    if let Err(e) = loader::load_programs(&mut sim.chip, &config, &directives) {
        fail(&e.to_string());
    }

    let outcome = match sim.run(cli.max_cycles) {
        Ok(reason) => reason,
        Err(e) => fail(&e.to_string()),
    };

    if !cli.silent {
        match outcome {
            StopReason::Exit(code) => {
                eprintln!("simulation ended with exit code {code} after {} cycles", sim.stats().cycles);
            }
            StopReason::IdleTimeout => {
                eprintln!("simulation stopped: idle timeout after {} cycles", sim.stats().cycles);
            }
        }
    }

    if let Some(path) = &cli.stalltrace {
        write_stall_trace(path, sim.stats());
    }
    if cli.summary && !cli.silent {
        print!("{}", sim.stats().summary());
    }

    process::exit(sim.exit_code() as i32);
}

/// Routes log output by the verbosity flags: errors only under --silent,
/// warnings by default, then info/debug/trace for -v/-vv/-vvv.
fn install_subscriber(cli: &Cli) {
    let level = if cli.silent {
        LevelFilter::ERROR
    } else {
        match cli.verbose {
            // Instruction tracing rides the info level; let it through.
            0 if cli.trace => LevelFilter::INFO,
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_stall_trace(path: &std::path::Path, stats: &loki_core::stats::Stats) {
    use std::io::Write as _;
    let mut out = String::from("cycle,core,reason,duration\n");
    for record in &stats.stall_log {
        out.push_str(&format!(
            "{},{},{},{}\n",
            record.start,
            record.core,
            record.reason.name(),
            record.duration
        ));
    }
    match std::fs::File::create(path).and_then(|mut f| f.write_all(out.as_bytes())) {
        Ok(()) => {}
        Err(e) => eprintln!("unable to write stall trace: {e}"),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}
