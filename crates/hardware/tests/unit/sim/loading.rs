//! Loader scripts applied to a real chip.

use std::fs;
use std::io::Write as _;

use pretty_assertions::assert_eq;

use loki_core::common::Warnings;
use loki_core::sim::loader;
use loki_core::{Config, Simulator};

#[test]
fn assembly_file_directive_preloads_a_core() {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let program = dir.path().join("boot.s");
    match fs::write(&program, "; test program\naddui.eop r9 r0 7\n") {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }
    let script = dir.path().join("loader.txt");
    let mut file = match fs::File::create(&script) {
        Ok(f) => f,
        Err(e) => panic!("{e}"),
    };
    let _ = writeln!(file, "parameter idle-timeout 20");
    let _ = writeln!(file, "0 boot.s");
    drop(file);

    let directives = match loader::read_script(&script) {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let mut config = Config::default();
    loader::apply_parameters(&mut config, &directives);
    assert_eq!(config.idle_timeout, 20);

    let mut sim = Simulator::new(&config, Warnings::default());
    match loader::load_programs(&mut sim.chip, &config, &directives) {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }
    for _ in 0..60 {
        match sim.tick() {
            Ok(()) => {}
            Err(e) => panic!("{e}"),
        }
    }
    assert_eq!(sim.chip.tiles[0].cores[0].regs.read_debug(9), 7);
}

#[test]
fn data_file_directive_fills_memory() {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let data = dir.path().join("table.data");
    match fs::write(&data, "0x11\n0x22\n0x33\n") {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }
    let script = dir.path().join("loader.txt");
    match fs::write(&script, "9 table.data\n") {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }

    let directives = match loader::read_script(&script) {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let config = Config::default();
    let mut sim = Simulator::new(&config, Warnings::default());
    match loader::load_programs(&mut sim.chip, &config, &directives) {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }

    let warnings = Warnings::default();
    assert_eq!(sim.chip.memory.read_word(0, &warnings), 0x11);
    assert_eq!(sim.chip.memory.read_word(4, &warnings), 0x22);
    assert_eq!(sim.chip.memory.read_word(8, &warnings), 0x33);
}
