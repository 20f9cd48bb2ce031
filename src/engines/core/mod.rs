//! Core runtime: detection context, timers and dispatched kernels

pub mod config;
pub mod context;
pub mod cycle_counter;
pub mod description;
#[cfg(target_os = "linux")]
pub mod perf_event;
pub mod simd;
pub mod timer;

pub use config::DetectionConfig;
pub use context::{
    cache_info, cpu_architecture, cpu_description, cpu_microarchitecture, cpu_name, cpu_vendor,
    detection_failures, global, install_probe, is_supported, logical_cores, CpuContext,
};
pub use cycle_counter::{acquire_cycle_counter, release_cycle_counter, CycleCounterState};
pub use description::{CpuDescription, CpuReport, DetectionFailure};
pub use timer::{timer_accuracy, timer_frequency, timer_ticks};

/// Initialize the core runtime
///
/// Runs detection now instead of on the first query.
pub fn initialize() {
    let description = cpu_description();
    log::debug!(
        "Core runtime initialized with {} detection failure(s)",
        description.detection_failures().len()
    );
}
