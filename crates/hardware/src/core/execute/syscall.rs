//! Host-backed system calls.
//!
//! System calls complete instantaneously and never block other cores.
//! Arguments and results use fixed register positions from the compiler
//! ABI (args in r13-r15, results in r11-r12). File flags arrive in the
//! BSD-style layout the toolchain's C library uses and are converted to
//! the host's POSIX flags at this boundary.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};

use crate::common::constants::{
    SYSCALL_ARG1, SYSCALL_ARG2, SYSCALL_ARG3, SYSCALL_RESULT1, SYSCALL_RESULT2,
};
use crate::common::{CycleCount, SimError};
use crate::core::Core;
use crate::memory::MainMemory;

/// `exit(code)`.
pub const SYS_EXIT: u32 = 0x01;
/// `open(path, flags, mode)`.
pub const SYS_OPEN: u32 = 0x02;
/// `close(fd)`.
pub const SYS_CLOSE: u32 = 0x03;
/// `read(fd, buf, len)`.
pub const SYS_READ: u32 = 0x04;
/// `write(fd, buf, len)`.
pub const SYS_WRITE: u32 = 0x05;
/// `lseek(fd, offset, whence)`.
pub const SYS_SEEK: u32 = 0x06;
/// Legacy: the flattened tile id (control register 1 replaces this).
pub const SYS_TILE_ID: u32 = 0x10;
/// Legacy: the core's position on its tile.
pub const SYS_POSITION: u32 = 0x11;
/// The current cycle count, split across both result registers.
pub const SYS_CURRENT_CYCLE: u32 = 0x20;

/// Host-side file state for one core's system calls.
#[derive(Debug, Default)]
pub struct SyscallState {
    files: HashMap<i32, File>,
    next_fd: i32,
}

/// Executes one system call.
///
/// # Errors
///
/// Unknown call numbers are fatal.
pub fn execute(
    core: &mut Core,
    mem: &mut MainMemory,
    code: u32,
    cycle: CycleCount,
) -> Result<(), SimError> {
    match code {
        SYS_EXIT => {
            let status = core.regs.read(SYSCALL_ARG1);
            tracing::info!(target: "loki::syscall", core = %core.id, status, cycle,
                "simulation ended with exit");
            core.exit_code = Some(status);
        }

        SYS_OPEN => {
            let path = read_string(core, mem, core.regs.read(SYSCALL_ARG1));
            let flags = convert_open_flags(core.regs.read(SYSCALL_ARG2));
            let fd = open_file(&mut core.syscalls, &path, flags);
            if fd < 0 {
                tracing::error!(target: "loki::syscall", path, "problem opening file");
            }
            write_result(core, fd as u32);
        }

        SYS_CLOSE => {
            let fd = core.regs.read(SYSCALL_ARG1) as i32;
            // The simulated program must not close the host's stdio.
            let result = if fd <= 2 {
                0
            } else if core.syscalls.files.remove(&fd).is_some() {
                0
            } else {
                -1i32 as u32 as i32
            };
            write_result(core, result as u32);
        }

        SYS_READ => {
            let fd = core.regs.read(SYSCALL_ARG1) as i32;
            let start = core.regs.read(SYSCALL_ARG2);
            let len = core.regs.read(SYSCALL_ARG3) as usize;
            let mut buf = vec![0u8; len];
            let count = match fd {
                0 => std::io::stdin().read(&mut buf).map_or(-1, |n| n as i64),
                _ => core
                    .syscalls
                    .files
                    .get_mut(&fd)
                    .map_or(-1, |f| f.read(&mut buf).map_or(-1, |n| n as i64)),
            };
            if count > 0 {
                let warnings = core.warnings.clone();
                for (i, byte) in buf.iter().take(count as usize).enumerate() {
                    mem.write_byte(start.wrapping_add(i as u32), *byte, &warnings);
                }
            }
            write_result(core, count as u32);
        }

        SYS_WRITE => {
            let fd = core.regs.read(SYSCALL_ARG1) as i32;
            let start = core.regs.read(SYSCALL_ARG2);
            let len = core.regs.read(SYSCALL_ARG3) as usize;
            let warnings = core.warnings.clone();
            let buf: Vec<u8> =
                (0..len).map(|i| mem.read_byte(start.wrapping_add(i as u32), &warnings)).collect();
            let count = match fd {
                1 => std::io::stdout().write(&buf).map_or(-1, |n| n as i64),
                2 => std::io::stderr().write(&buf).map_or(-1, |n| n as i64),
                _ => core
                    .syscalls
                    .files
                    .get_mut(&fd)
                    .map_or(-1, |f| f.write(&buf).map_or(-1, |n| n as i64)),
            };
            write_result(core, count as u32);
        }

        SYS_SEEK => {
            let fd = core.regs.read(SYSCALL_ARG1) as i32;
            let offset = core.regs.read(SYSCALL_ARG2) as i32;
            let whence = core.regs.read(SYSCALL_ARG3);
            let from = match whence {
                0 => SeekFrom::Start(offset as u64),
                1 => SeekFrom::Current(i64::from(offset)),
                _ => SeekFrom::End(i64::from(offset)),
            };
            let result = core
                .syscalls
                .files
                .get_mut(&fd)
                .map_or(-1i64, |f| f.seek(from).map_or(-1, |p| p as i64));
            write_result(core, result as u32);
        }

        SYS_TILE_ID => {
            tracing::warn!(target: "loki::syscall",
                "syscall 0x10 (tile id) is deprecated; use control register 1");
            write_result(core, core.id.tile.flatten());
        }

        SYS_POSITION => {
            tracing::warn!(target: "loki::syscall",
                "syscall 0x11 (core position) is deprecated; use control register 1");
            write_result(core, u32::from(core.id.position));
        }

        SYS_CURRENT_CYCLE => {
            let warnings = core.warnings.clone();
            core.regs.write(SYSCALL_RESULT1, (cycle >> 32) as u32, &warnings);
            core.regs.write(SYSCALL_RESULT2, cycle as u32, &warnings);
        }

        other => return Err(SimError::UnknownSyscall(other)),
    }
    Ok(())
}

fn write_result(core: &mut Core, value: u32) {
    let warnings = core.warnings.clone();
    core.regs.write(SYSCALL_RESULT1, value, &warnings);
}

/// Reads a NUL-terminated string from simulated memory.
fn read_string(core: &Core, mem: &MainMemory, start: u32) -> String {
    let mut out = Vec::new();
    for i in 0..1024 {
        let byte = mem.read_byte(start.wrapping_add(i), &core.warnings);
        if byte == 0 {
            break;
        }
        out.push(byte);
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Host open flags derived from the BSD-style bits the toolchain uses.
struct OpenFlags {
    read: bool,
    write: bool,
    append: bool,
    create: bool,
    truncate: bool,
    exclusive: bool,
}

/// Converts the C library's flag layout onto the host's POSIX flags
/// (`libc` supplies the canonical values), then to intent bits.
fn convert_open_flags(target: u32) -> OpenFlags {
    let mut host = 0i32;
    if target & 0x0001 != 0 {
        host |= libc::O_WRONLY;
    }
    if target & 0x0002 != 0 {
        host |= libc::O_RDWR;
    }
    if target & 0x0008 != 0 {
        host |= libc::O_APPEND;
    }
    if target & 0x0200 != 0 {
        host |= libc::O_CREAT;
    }
    if target & 0x0400 != 0 {
        host |= libc::O_TRUNC;
    }
    if target & 0x0800 != 0 {
        host |= libc::O_EXCL;
    }

    let wronly = host & libc::O_WRONLY != 0;
    let rdwr = host & libc::O_RDWR != 0;
    OpenFlags {
        read: !wronly,
        write: wronly || rdwr || host & libc::O_APPEND != 0,
        append: host & libc::O_APPEND != 0,
        create: host & libc::O_CREAT != 0,
        truncate: host & libc::O_TRUNC != 0,
        exclusive: host & libc::O_EXCL != 0,
    }
}

fn open_file(state: &mut SyscallState, path: &str, flags: OpenFlags) -> i32 {
    let mut options = OpenOptions::new();
    let _ = options
        .read(flags.read)
        .write(flags.write)
        .append(flags.append)
        .truncate(flags.truncate);
    if flags.exclusive {
        let _ = options.create_new(flags.create);
    } else {
        let _ = options.create(flags.create);
    }
    match options.open(path) {
        Ok(file) => {
            // Descriptors 0-2 belong to the host's stdio.
            if state.next_fd < 3 {
                state.next_fd = 3;
            }
            let fd = state.next_fd;
            state.next_fd += 1;
            let _ = state.files.insert(fd, file);
            fd
        }
        Err(_) => -1,
    }
}
