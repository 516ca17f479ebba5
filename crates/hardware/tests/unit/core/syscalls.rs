//! Host-backed system calls driven from simulated programs.

use pretty_assertions::assert_eq;

use loki_core::tile::chip::StopReason;

use crate::common::harness::TestContext;

#[test]
fn sys_exit_stops_the_chip_with_its_status() {
    let mut ctx = TestContext::new();
    ctx.set_reg(0, 13, 42); // arg1 = exit status
    ctx.load_program(0, 0x100, "syscall.eop 1");
    ctx.run(50);

    assert_eq!(ctx.sim.chip.stopped(), Some(StopReason::Exit(42)));
    assert_eq!(ctx.sim.exit_code(), 42);
}

#[test]
fn sys_current_cycle_reads_the_clock_into_both_results() {
    let mut ctx = TestContext::new();
    ctx.load_program(0, 0x100, "syscall.eop 0x20");
    ctx.run(50);

    // Low word in r12, high word in r11; the clock is well under 2^32.
    assert_eq!(ctx.reg(0, 11), 0);
    let low = ctx.reg(0, 12);
    assert!(low > 0 && low < 50, "cycle readback was {low}");
}

#[test]
fn open_write_close_round_trips_through_the_host() {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let path = dir.path().join("out.txt");
    let path_str = match path.to_str() {
        Some(s) => s.to_string(),
        None => panic!("non-utf8 temp path"),
    };

    let mut ctx = TestContext::new();
    let warnings = ctx.sim.chip.warnings.clone();
    // The filename lives in simulated memory at 0x500, the payload at
    // 0x600.
    for (i, byte) in path_str.bytes().chain([0]).enumerate() {
        ctx.sim.chip.memory.write_byte(0x500 + i as u32, byte, &warnings);
    }
    for (i, byte) in b"loki".iter().enumerate() {
        ctx.sim.chip.memory.write_byte(0x600 + i as u32, *byte, &warnings);
    }

    ctx.set_reg(0, 13, 0x500); // path
    ctx.set_reg(0, 14, 0x0201); // O_WRONLY | O_CREAT, toolchain layout
    ctx.set_reg(0, 15, 0o644);
    ctx.load_program(
        0,
        0x100,
        "syscall 2\n\
         addu r13 r11 r0\n\
         lli r14 0x600\n\
         lli r15 4\n\
         syscall 5\n\
         addu r8 r11 r0\n\
         syscall.eop 3",
    );
    ctx.run(100);

    // write() reported four bytes, and the file holds them.
    assert_eq!(ctx.reg(0, 8), 4);
    assert_eq!(std::fs::read(&path).ok(), Some(b"loki".to_vec()));
}

#[test]
fn sys_read_pulls_file_contents_into_memory() {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("{e}"),
    };
    let path = dir.path().join("in.txt");
    match std::fs::write(&path, b"data") {
        Ok(()) => {}
        Err(e) => panic!("{e}"),
    }
    let path_str = match path.to_str() {
        Some(s) => s.to_string(),
        None => panic!("non-utf8 temp path"),
    };

    let mut ctx = TestContext::new();
    let warnings = ctx.sim.chip.warnings.clone();
    for (i, byte) in path_str.bytes().chain([0]).enumerate() {
        ctx.sim.chip.memory.write_byte(0x500 + i as u32, byte, &warnings);
    }

    ctx.set_reg(0, 13, 0x500); // path
    ctx.set_reg(0, 14, 0); // O_RDONLY
    ctx.set_reg(0, 15, 0);
    ctx.load_program(
        0,
        0x100,
        "syscall 2\n\
         addu r13 r11 r0\n\
         lli r14 0x700\n\
         lli r15 4\n\
         syscall 4\n\
         addu.eop r8 r11 r0",
    );
    ctx.run(100);

    assert_eq!(ctx.reg(0, 8), 4);
    assert_eq!(ctx.sim.chip.memory.read_byte(0x700, &warnings), b'd');
    assert_eq!(ctx.sim.chip.memory.read_byte(0x703, &warnings), b'a');
}
