//! High-resolution monotonic timer
//!
//! Ticks are nanoseconds since the first timer call in this process.

use crate::engines::{CpuError, CpuResult};
use std::sync::OnceLock;
use std::time::Instant;

/// Ticks per second
pub const TIMER_FREQUENCY: u64 = 1_000_000_000;

const DEFAULT_ITERATIONS: usize = 128;
const MAX_ITERATIONS: usize = 1024;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Current timer value
pub fn timer_ticks() -> CpuResult<u64> {
    let anchor = *ANCHOR.get_or_init(Instant::now);
    Ok(u64::try_from(anchor.elapsed().as_nanos()).unwrap_or(u64::MAX))
}

/// Number of timer ticks per second
pub fn timer_frequency() -> CpuResult<u64> {
    Ok(TIMER_FREQUENCY)
}

/// Smallest observable difference between two timer readings, in nanoseconds
pub fn timer_accuracy() -> CpuResult<u64> {
    measure_accuracy(timer_ticks)
}

/// Smallest nonzero step of `read` over a batch of consecutive readings
///
/// When the first batch never advances, keeps reading until the first step
/// or until the iteration limit is reached.
pub fn measure_accuracy<F>(mut read: F) -> CpuResult<u64>
where
    F: FnMut() -> CpuResult<u64>,
{
    let mut start = read()?;
    let mut best: Option<u64> = None;

    for _ in 0..DEFAULT_ITERATIONS {
        let end = read()?;
        if end != start {
            let step = end.wrapping_sub(start);
            best = Some(best.map_or(step, |b| b.min(step)));
            start = end;
        }
    }
    if let Some(best) = best {
        return Ok(best);
    }

    for _ in DEFAULT_ITERATIONS..MAX_ITERATIONS {
        let end = read()?;
        if end != start {
            return Ok(end.wrapping_sub(start));
        }
    }
    Err(CpuError::UnsupportedHardware("timer does not advance".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_are_monotonic() {
        let a = timer_ticks().unwrap();
        let b = timer_ticks().unwrap();
        assert!(b >= a);
        assert_eq!(timer_frequency().unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_host_accuracy() {
        let accuracy = timer_accuracy().unwrap();
        assert!(accuracy > 0);
        // Anything coarser than a second is not a usable timer
        assert!(accuracy < TIMER_FREQUENCY);
    }

    #[test]
    fn test_accuracy_picks_smallest_step() {
        let mut readings = [0u64, 10, 10, 13, 30, 31, 50].into_iter().chain(std::iter::repeat(50));
        let accuracy = measure_accuracy(|| Ok(readings.next().unwrap_or(50))).unwrap();
        assert_eq!(accuracy, 1);
    }

    #[test]
    fn test_slow_timer() {
        // Advances only after the first batch
        let mut calls = 0u64;
        let accuracy = measure_accuracy(|| {
            calls += 1;
            Ok(if calls > 500 { 7 } else { 0 })
        })
        .unwrap();
        assert_eq!(accuracy, 7);
    }

    #[test]
    fn test_stuck_timer() {
        let err = measure_accuracy(|| Ok(42)).unwrap_err();
        assert!(matches!(err, CpuError::UnsupportedHardware(_)));
    }

    #[test]
    fn test_read_error_propagates() {
        let err = measure_accuracy(|| Err(CpuError::SystemFailure("clock".into()))).unwrap_err();
        assert_eq!(err, CpuError::SystemFailure("clock".into()));
    }
}
