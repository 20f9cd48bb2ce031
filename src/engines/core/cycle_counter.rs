//! Processor cycle counter
//!
//! A measurement starts with [`acquire_cycle_counter`], which hands out a
//! state token, and ends with [`release_cycle_counter`], which consumes the
//! token and returns the cycles elapsed in between.

use crate::engines::core::context;
use crate::engines::core::description::CpuDescription;
#[cfg(target_os = "linux")]
use crate::engines::core::perf_event::PerfCounter;
use crate::engines::{CpuError, CpuResult};
use crate::modules::feature::{generic, x86};
use std::cell::Cell;
use std::marker::PhantomData;

#[derive(Debug)]
enum Reading {
    /// Timestamp counter value at acquire time
    Timestamp(u64),
    /// Kernel cycle event, zeroed at acquire time
    #[cfg(target_os = "linux")]
    #[cfg_attr(any(target_arch = "x86", target_arch = "x86_64"), allow(dead_code))]
    Kernel(PerfCounter),
}

/// Start of a cycle measurement
///
/// Tokens are single use: releasing one consumes it. A token backed by a
/// kernel cycle event owns that event and closes it when dropped.
#[derive(Debug)]
pub struct CycleCounterState {
    reading: Reading,
    _not_sync: PhantomData<Cell<()>>,
}

impl CycleCounterState {
    /// Rebuild a token from a saved counter reading
    pub fn from_raw(start: u64) -> CpuResult<Self> {
        if start == 0 {
            return Err(CpuError::InvalidState("cycle counter state is zero".to_string()));
        }
        Ok(Self::new(Reading::Timestamp(start)))
    }

    fn new(reading: Reading) -> Self {
        Self {
            reading,
            _not_sync: PhantomData,
        }
    }

    /// Counter reading taken at acquire time
    ///
    /// Kernel-backed tokens start from zero.
    pub fn start(&self) -> u64 {
        match self.reading {
            Reading::Timestamp(start) => start,
            #[cfg(target_os = "linux")]
            Reading::Kernel(_) => 0,
        }
    }

    /// Give up the token, returning its raw reading
    pub fn into_raw(self) -> u64 {
        self.start()
    }
}

/// Start measuring cycles on the processor running this process
pub fn acquire_cycle_counter() -> CpuResult<CycleCounterState> {
    acquire_with(context::cpu_description())
}

/// Finish a measurement and return the elapsed cycles
pub fn release_cycle_counter(state: CycleCounterState) -> CpuResult<u64> {
    release_with(context::cpu_description(), state)
}

/// Start measuring cycles, using `description` to choose the counter
pub fn acquire_with(description: &CpuDescription) -> CpuResult<CycleCounterState> {
    if !description.is_supported(generic::system::CYCLE_COUNTER) {
        return Err(CpuError::UnsupportedHardware(
            "processor has no cycle counter".to_string(),
        ));
    }
    start_reading().map(CycleCounterState::new)
}

/// Finish a measurement started with [`acquire_with`]
pub fn release_with(description: &CpuDescription, state: CycleCounterState) -> CpuResult<u64> {
    if let Reading::Timestamp(0) = state.reading {
        return Err(CpuError::InvalidState("cycle counter state is zero".to_string()));
    }
    if !description.is_supported(generic::system::CYCLE_COUNTER) {
        return Err(CpuError::UnsupportedHardware(
            "processor has no cycle counter".to_string(),
        ));
    }
    match state.reading {
        Reading::Timestamp(start) => {
            let end = read_end(description.is_supported(x86::isa::RDTSCP))?;
            Ok(end.wrapping_sub(start))
        }
        #[cfg(target_os = "linux")]
        Reading::Kernel(counter) => counter.stop(),
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod tsc {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::{__cpuid, __rdtscp, _rdtsc};
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::{__cpuid, __rdtscp, _rdtsc};

    /// RDTSC after CPUID, so earlier instructions retire first
    pub fn serialized() -> u64 {
        // SAFETY: callers check the cycle counter feature, which implies CPUID and RDTSC
        unsafe {
            __cpuid(0);
            _rdtsc()
        }
    }

    /// RDTSCP, which waits for earlier instructions to execute
    pub fn ordered() -> u64 {
        let mut aux = 0u32;
        // SAFETY: callers check RDTSCP support
        unsafe { __rdtscp(&mut aux) }
    }

    pub fn plain() -> u64 {
        // SAFETY: callers check the cycle counter feature
        unsafe { _rdtsc() }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const ACQUIRE_ATTEMPTS: usize = 16;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn start_reading() -> CpuResult<Reading> {
    // Zero marks an invalid token, so never hand it out
    (0..ACQUIRE_ATTEMPTS)
        .map(|_| tsc::serialized())
        .find(|&value| value != 0)
        .map(Reading::Timestamp)
        .ok_or_else(|| CpuError::SystemFailure("cycle counter reads zero".to_string()))
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn read_end(has_rdtscp: bool) -> CpuResult<u64> {
    Ok(if has_rdtscp { tsc::ordered() } else { tsc::plain() })
}

#[cfg(all(target_os = "linux", not(any(target_arch = "x86", target_arch = "x86_64"))))]
fn start_reading() -> CpuResult<Reading> {
    PerfCounter::start().map(Reading::Kernel)
}

#[cfg(not(any(target_os = "linux", target_arch = "x86", target_arch = "x86_64")))]
fn start_reading() -> CpuResult<Reading> {
    Err(CpuError::UnsupportedSoftware(
        "no user-space cycle counter on this target".to_string(),
    ))
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn read_end(_has_rdtscp: bool) -> CpuResult<u64> {
    Err(CpuError::UnsupportedSoftware(
        "no timestamp counter on this target".to_string(),
    ))
}
