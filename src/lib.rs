//! CPU capability detection and feature-based dispatch
//!
//! Detects the processor this process runs on once, then answers feature
//! queries from the stored description:
//!
//! ```no_run
//! use cpu_capabilities::{is_supported, features::x86};
//!
//! if is_supported(x86::simd::AVX2) && is_supported(x86::system::YMM) {
//!     // AVX2 code path
//! }
//! ```

pub mod engines;
pub mod modules;

pub use modules::feature as features;

pub use engines::core::{
    acquire_cycle_counter, cache_info, cpu_architecture, cpu_description, cpu_microarchitecture,
    cpu_name, cpu_vendor, detection_failures, install_probe, is_supported, logical_cores,
    release_cycle_counter, timer_accuracy, timer_frequency, timer_ticks, CpuContext, CpuDescription,
    CpuReport, CycleCounterState, DetectionConfig,
};
pub use engines::dispatch::{dispatch_list, select_function, Dispatcher, FunctionDescriptor};
pub use engines::probe::{PlatformProbe, ProbeSnapshot};
pub use engines::{CpuError, CpuResult};
pub use modules::feature::{
    defined_isa_features, defined_simd_features, defined_system_features, describe, is_defined,
    short_id, Feature, FeatureKind,
};
pub use modules::{version, Architecture, CacheInfo, CacheLevel, FeatureSet, LibraryVersion, Microarchitecture, Vendor};

/// Initialize the library
///
/// Detection otherwise runs lazily on the first query; calling this moves
/// the cost to a known point and logs the detected processor.
pub fn initialize() {
    engines::core::initialize();
    log::info!("cpu_capabilities {} initialized", version());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        initialize();
        assert_eq!(cpu_architecture(), cpu_description().architecture());
    }
}
