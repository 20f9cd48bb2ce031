//! Linux perf events as a cycle counter
//!
//! Targets without a user-readable timestamp counter count cycles through a
//! `PERF_COUNT_HW_CPU_CYCLES` event opened for this process.

use crate::engines::{CpuError, CpuResult};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

const PERF_TYPE_HARDWARE: u32 = 0;
const PERF_COUNT_HW_CPU_CYCLES: u64 = 0;

// Bits of the attribute flags word
const FLAG_DISABLED: u64 = 1 << 0;
const FLAG_EXCLUDE_KERNEL: u64 = 1 << 5;
const FLAG_EXCLUDE_HV: u64 = 1 << 6;

#[cfg(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc64"
))]
const IOC_NONE: u64 = 1 << 29;
#[cfg(not(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc64"
)))]
const IOC_NONE: u64 = 0;

const fn perf_ioctl(nr: u64) -> u64 {
    IOC_NONE | ((b'$' as u64) << 8) | nr
}

const IOC_ENABLE: u64 = perf_ioctl(0);
const IOC_DISABLE: u64 = perf_ioctl(1);
const IOC_RESET: u64 = perf_ioctl(3);

/// First published layout of `struct perf_event_attr`, accepted by every kernel since
#[repr(C)]
#[derive(Debug, Default)]
struct PerfEventAttr {
    kind: u32,
    size: u32,
    config: u64,
    sample_period: u64,
    sample_type: u64,
    read_format: u64,
    flags: u64,
    wakeup_events: u32,
    bp_type: u32,
    config1: u64,
}

/// Map a failed call's errno onto the crate's error kinds
pub fn errno_error(errno: i32, call: &str) -> CpuError {
    let detail = format!("{call}: {}", io::Error::from_raw_os_error(errno));
    match errno {
        libc::ENOENT | libc::EOPNOTSUPP | libc::ENODEV => CpuError::UnsupportedHardware(detail),
        libc::EACCES | libc::EPERM | libc::ENOSYS => CpuError::UnsupportedSoftware(detail),
        _ => CpuError::SystemFailure(detail),
    }
}

fn last_error(call: &str) -> CpuError {
    errno_error(io::Error::last_os_error().raw_os_error().unwrap_or(0), call)
}

/// Hardware cycle event owned by this process
#[derive(Debug)]
pub struct PerfCounter {
    fd: OwnedFd,
}

impl PerfCounter {
    /// Open a disabled user-space cycle event on any CPU
    pub fn open() -> CpuResult<Self> {
        let attr = PerfEventAttr {
            kind: PERF_TYPE_HARDWARE,
            size: mem::size_of::<PerfEventAttr>() as u32,
            config: PERF_COUNT_HW_CPU_CYCLES,
            flags: FLAG_DISABLED | FLAG_EXCLUDE_KERNEL | FLAG_EXCLUDE_HV,
            ..PerfEventAttr::default()
        };
        // SAFETY: attr is a live, fully initialized attribute block of the size it declares
        let fd = unsafe {
            libc::syscall(
                libc::SYS_perf_event_open,
                &attr as *const PerfEventAttr,
                0 as libc::pid_t,
                -1 as libc::c_int,
                -1 as libc::c_int,
                0 as libc::c_ulong,
            )
        };
        if fd < 0 {
            return Err(last_error("perf_event_open"));
        }
        // SAFETY: the kernel returned a new descriptor nothing else owns
        let fd = unsafe { OwnedFd::from_raw_fd(fd as RawFd) };
        Ok(Self { fd })
    }

    /// Open, zero and enable a counter
    pub fn start() -> CpuResult<Self> {
        let counter = Self::open()?;
        counter.ioctl(IOC_RESET, "PERF_EVENT_IOC_RESET")?;
        counter.ioctl(IOC_ENABLE, "PERF_EVENT_IOC_ENABLE")?;
        Ok(counter)
    }

    fn ioctl(&self, request: u64, call: &str) -> CpuResult<()> {
        // SAFETY: perf ioctls without an argument on a descriptor we own
        let result = unsafe { libc::ioctl(self.fd.as_raw_fd(), request as _, 0) };
        if result < 0 {
            return Err(last_error(call));
        }
        Ok(())
    }

    /// Cycles counted so far
    pub fn read(&self) -> CpuResult<u64> {
        let mut value = 0u64;
        // SAFETY: value is a writable 8-byte buffer
        let read = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut value as *mut u64 as *mut libc::c_void,
                mem::size_of::<u64>(),
            )
        };
        if read < 0 {
            return Err(last_error("read"));
        }
        if read as usize != mem::size_of::<u64>() {
            return Err(CpuError::SystemFailure(format!("short read of {read} bytes from cycle event")));
        }
        Ok(value)
    }

    /// Disable the event, read it and close the descriptor
    pub fn stop(self) -> CpuResult<u64> {
        self.ioctl(IOC_DISABLE, "PERF_EVENT_IOC_DISABLE")?;
        let cycles = self.read()?;
        let fd = self.fd.into_raw_fd();
        // SAFETY: fd was released from its owner above and is closed exactly once
        if unsafe { libc::close(fd) } != 0 {
            return Err(last_error("close"));
        }
        Ok(cycles)
    }
}

/// Whether a cycle event can be opened and actually counts
pub fn cycle_counter_available() -> bool {
    let measured = PerfCounter::start().and_then(|counter| {
        let mut sum = 0u64;
        for i in 0..4096u64 {
            sum = sum.wrapping_add(i.rotate_left(7));
        }
        std::hint::black_box(sum);
        counter.stop()
    });
    match measured {
        Ok(cycles) => cycles != 0,
        Err(err) => {
            log::debug!("Kernel cycle counter unavailable: {}", err);
            false
        }
    }
}
