//! Detected processor description

use crate::engines::core::config::DetectionConfig;
use crate::engines::probe::{PlatformProbe, ProbeQuery};
use crate::engines::{CpuError, CpuResult};
use crate::modules::arch::{Architecture, Microarchitecture, Vendor};
use crate::modules::cache::CacheInfo;
use crate::modules::feature::{defined_features, Feature, FeatureKind};
use crate::modules::feature_set::FeatureSet;
use crate::modules::version::{version, LibraryVersion};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

/// A probe query that failed during detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionFailure {
    pub query: ProbeQuery,
    pub error: CpuError,
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.query, self.error)
    }
}

/// Everything known about the processor, fixed after detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDescription {
    architecture: Architecture,
    vendor: Vendor,
    microarchitecture: Microarchitecture,
    isa: FeatureSet,
    simd: FeatureSet,
    system: FeatureSet,
    logical_cores: u32,
    cache: CacheInfo,
    name: Option<String>,
    failures: Vec<DetectionFailure>,
}

impl CpuDescription {
    /// Query `probe` once for every fact
    ///
    /// A failed query leaves the fact unknown (or the mask empty) and is
    /// recorded in [`CpuDescription::detection_failures`]. Features listed in
    /// `config.disabled_features` are removed from the masks.
    pub fn detect(probe: &dyn PlatformProbe, config: &DetectionConfig) -> Self {
        let mut failures = Vec::new();

        let architecture = recorded(&mut failures, ProbeQuery::Architecture, probe.architecture_id())
            .map(Architecture::from_id)
            .unwrap_or_default();
        let vendor = recorded(&mut failures, ProbeQuery::Vendor, probe.vendor_id())
            .map(Vendor::from_id)
            .unwrap_or_default();
        let microarchitecture = recorded(&mut failures, ProbeQuery::Microarchitecture, probe.microarchitecture_id())
            .map(Microarchitecture::from_id)
            .unwrap_or_default();
        let mut isa = recorded(&mut failures, ProbeQuery::IsaFeatures, probe.isa_features())
            .map(FeatureSet::from_bits)
            .unwrap_or_default();
        let mut simd = recorded(&mut failures, ProbeQuery::SimdFeatures, probe.simd_features())
            .map(FeatureSet::from_bits)
            .unwrap_or_default();
        let mut system = recorded(&mut failures, ProbeQuery::SystemFeatures, probe.system_features())
            .map(FeatureSet::from_bits)
            .unwrap_or_default();
        let logical_cores = recorded(&mut failures, ProbeQuery::LogicalCores, probe.logical_cores())
            .filter(|&count| count > 0)
            .unwrap_or(1);
        let cache = recorded(&mut failures, ProbeQuery::CacheInfo, probe.cache_info()).unwrap_or_default();
        let name = recorded(&mut failures, ProbeQuery::CpuName, probe.cpu_name()).flatten();

        for id in config.disabled_features.iter().unique() {
            let mut matched = false;
            for (kind, mask) in [
                (FeatureKind::Isa, &mut isa),
                (FeatureKind::Simd, &mut simd),
                (FeatureKind::System, &mut system),
            ] {
                if let Some(feature) = Feature::from_short_id(kind, architecture, id) {
                    log::debug!("Disabling {} feature {}", kind, feature);
                    mask.remove(feature);
                    matched = true;
                }
            }
            if !matched {
                log::warn!("Ignoring unknown feature id {:?} for {}", id, architecture);
            }
        }

        let description = Self {
            architecture,
            vendor,
            microarchitecture,
            isa,
            simd,
            system,
            logical_cores,
            cache,
            name,
            failures,
        };
        if config.log_summary {
            log::info!("{}", description.summary());
        }
        description
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn microarchitecture(&self) -> Microarchitecture {
        self.microarchitecture
    }

    /// Detected mask for `kind`
    pub fn features(&self, kind: FeatureKind) -> FeatureSet {
        match kind {
            FeatureKind::Isa => self.isa,
            FeatureKind::Simd => self.simd,
            FeatureKind::System => self.system,
        }
    }

    pub fn isa_features(&self) -> FeatureSet {
        self.isa
    }

    pub fn simd_features(&self) -> FeatureSet {
        self.simd
    }

    pub fn system_features(&self) -> FeatureSet {
        self.system
    }

    /// Whether the processor supports `feature`
    ///
    /// Features of another concrete architecture are never supported.
    /// Generic features match any architecture.
    #[inline]
    pub fn is_supported(&self, feature: Feature) -> bool {
        let arch = feature.architecture();
        (arch == Architecture::Unknown || arch == self.architecture) && self.features(feature.kind()).contains(feature)
    }

    /// Defined features of `kind` that are supported, in code order
    pub fn supported_features(&self, kind: FeatureKind) -> impl Iterator<Item = Feature> + '_ {
        defined_features(kind, self.architecture).filter(move |feature| self.is_supported(*feature))
    }

    pub fn logical_cores(&self) -> u32 {
        self.logical_cores
    }

    pub fn cache(&self) -> &CacheInfo {
        &self.cache
    }

    /// Processor name reported by the platform
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Probe queries that failed while building this description
    pub fn detection_failures(&self) -> &[DetectionFailure] {
        &self.failures
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "CPU detected - architecture: {}, vendor: {}, microarchitecture: {}, isa: {:#x}, simd: {:#x}, system: {:#x}",
            self.architecture, self.vendor, self.microarchitecture, self.isa, self.simd, self.system
        )
    }

    /// Serializable snapshot for diagnostics
    pub fn report(&self) -> CpuReport {
        let ids = |kind| self.supported_features(kind).map(|f| f.short_id()).collect();
        CpuReport {
            library_version: version(),
            architecture: self.architecture,
            vendor: self.vendor,
            microarchitecture: self.microarchitecture,
            name: self.name.clone(),
            logical_cores: self.logical_cores,
            cache: self.cache,
            isa_mask: self.isa,
            simd_mask: self.simd,
            system_mask: self.system,
            isa_features: ids(FeatureKind::Isa),
            simd_features: ids(FeatureKind::Simd),
            system_features: ids(FeatureKind::System),
            failures: self.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

fn recorded<T>(failures: &mut Vec<DetectionFailure>, query: ProbeQuery, result: CpuResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("Failed to detect {}: {}", query, error);
            failures.push(DetectionFailure { query, error });
            None
        }
    }
}

/// Diagnostic snapshot of a [`CpuDescription`]
#[derive(Debug, Clone, Serialize)]
pub struct CpuReport {
    pub library_version: LibraryVersion,
    pub architecture: Architecture,
    pub vendor: Vendor,
    pub microarchitecture: Microarchitecture,
    pub name: Option<String>,
    pub logical_cores: u32,
    pub cache: CacheInfo,
    pub isa_mask: FeatureSet,
    pub simd_mask: FeatureSet,
    pub system_mask: FeatureSet,
    pub isa_features: Vec<&'static str>,
    pub simd_features: Vec<&'static str>,
    pub system_features: Vec<&'static str>,
    pub failures: Vec<String>,
}

impl fmt::Display for CpuReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Library: {}", self.library_version)?;
        writeln!(f, "Architecture: {}", self.architecture)?;
        writeln!(f, "Vendor: {}", self.vendor.describe())?;
        writeln!(f, "Microarchitecture: {}", self.microarchitecture.describe())?;
        if let Some(name) = &self.name {
            writeln!(f, "Name: {}", name)?;
        }
        writeln!(f, "Logical cores: {}", self.logical_cores)?;
        for (level, size) in (1..=3).filter_map(|level| self.cache.data_cache_size(level).map(|size| (level, size))) {
            writeln!(f, "L{} data cache: {} KB", level, size / 1024)?;
        }
        writeln!(f, "ISA features: {}", self.isa_features.join(" "))?;
        writeln!(f, "SIMD features: {}", self.simd_features.join(" "))?;
        write!(f, "System features: {}", self.system_features.join(" "))?;
        for failure in &self.failures {
            write!(f, "\nDetection failure: {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::probe::ProbeSnapshot;
    use crate::modules::feature::{arm, generic, x86};

    fn quiet() -> DetectionConfig {
        DetectionConfig {
            log_summary: false,
            ..DetectionConfig::default()
        }
    }

    fn haswell_probe() -> ProbeSnapshot {
        ProbeSnapshot::new(Architecture::X86)
            .with_vendor(Vendor::Intel)
            .with_microarchitecture(Microarchitecture::Haswell)
            .with_features([
                x86::isa::CPUID,
                x86::simd::SSE,
                x86::simd::SSE2,
                x86::simd::AVX,
                x86::simd::AVX2,
                x86::system::XMM,
                x86::system::YMM,
                generic::system::CYCLE_COUNTER,
            ])
            .with_logical_cores(8)
    }

    #[test]
    fn test_detect_x86() {
        let description = CpuDescription::detect(&haswell_probe(), &quiet());
        assert_eq!(description.architecture(), Architecture::X86);
        assert_eq!(description.vendor(), Vendor::Intel);
        assert_eq!(description.microarchitecture(), Microarchitecture::Haswell);
        assert!(description.is_supported(x86::simd::SSE));
        assert!(description.is_supported(x86::simd::AVX2));
        assert!(!description.is_supported(x86::simd::AVX512F));
        assert!(description.is_supported(generic::system::CYCLE_COUNTER));
        // NEON shares a code with an unset x86 bit, but is never supported on x86
        assert!(!description.is_supported(arm::simd::NEON));
        assert!(description.detection_failures().is_empty());
        assert_eq!(description.logical_cores(), 8);
    }

    #[test]
    fn test_architecture_mismatch() {
        // Same code as a set x86 bit, different architecture
        let probe = ProbeSnapshot::new(Architecture::Arm).with_simd(FeatureSet::from_bits(1 << 7));
        let description = CpuDescription::detect(&probe, &quiet());
        assert!(!description.is_supported(x86::simd::SSE));
        assert!(!description.is_supported(arm::simd::NEON));
        assert_eq!(description.supported_features(FeatureKind::Simd).count(), 0);
    }

    #[test]
    fn test_empty_probe() {
        let description = CpuDescription::detect(&ProbeSnapshot::empty(), &quiet());
        assert_eq!(description.architecture(), Architecture::Unknown);
        for kind in FeatureKind::ALL {
            for arch in Architecture::ALL {
                assert!(defined_features(kind, arch).all(|f| !description.is_supported(f)));
            }
        }
    }

    #[test]
    fn test_failures_are_recorded() {
        let probe = haswell_probe()
            .with_failure(ProbeQuery::Vendor, CpuError::SystemFailure("denied".into()))
            .with_failure(ProbeQuery::SimdFeatures, CpuError::UnsupportedSoftware("no cpuid".into()));
        let description = CpuDescription::detect(&probe, &quiet());

        assert_eq!(description.vendor(), Vendor::Unknown);
        assert!(description.simd_features().is_empty());
        assert!(description.is_supported(x86::isa::CPUID));
        let queries: Vec<_> = description.detection_failures().iter().map(|f| f.query).collect();
        assert_eq!(queries, vec![ProbeQuery::Vendor, ProbeQuery::SimdFeatures]);
    }

    #[test]
    fn test_unknown_ids_map_to_unknown() {
        struct RawProbe;
        impl PlatformProbe for RawProbe {
            fn architecture_id(&self) -> CpuResult<u32> {
                Ok(99)
            }
            fn vendor_id(&self) -> CpuResult<u32> {
                Ok(1000)
            }
            fn microarchitecture_id(&self) -> CpuResult<u32> {
                Ok(0xDEAD_BEEF)
            }
            fn isa_features(&self) -> CpuResult<u64> {
                Ok(u64::MAX)
            }
            fn simd_features(&self) -> CpuResult<u64> {
                Ok(0)
            }
            fn system_features(&self) -> CpuResult<u64> {
                Ok(0)
            }
        }
        let description = CpuDescription::detect(&RawProbe, &quiet());
        assert_eq!(description.architecture(), Architecture::Unknown);
        assert_eq!(description.vendor(), Vendor::Unknown);
        assert_eq!(description.microarchitecture(), Microarchitecture::Unknown);
        // Default trait methods
        assert!(description.logical_cores() >= 1);
        assert_eq!(description.name(), None);
    }

    #[test]
    fn test_disabled_features() {
        let config = DetectionConfig {
            disabled_features: vec!["avx2".into(), "YMM".into(), "NoSuchFeature".into()],
            ..quiet()
        };
        let description = CpuDescription::detect(&haswell_probe(), &config);
        assert!(!description.is_supported(x86::simd::AVX2));
        assert!(!description.is_supported(x86::system::YMM));
        assert!(description.is_supported(x86::simd::AVX));
    }

    #[test]
    fn test_supported_features_and_report() {
        let description = CpuDescription::detect(&haswell_probe().with_cpu_name("Test CPU"), &quiet());
        let simd: Vec<_> = description.supported_features(FeatureKind::Simd).collect();
        assert_eq!(simd, vec![x86::simd::SSE, x86::simd::SSE2, x86::simd::AVX, x86::simd::AVX2]);

        let report = description.report();
        assert_eq!(report.simd_features, vec!["SSE", "SSE2", "AVX", "AVX2"]);
        assert_eq!(report.system_features, vec!["CycleCounter", "XMM", "YMM"]);
        let text = report.to_string();
        assert!(text.contains("Name: Test CPU"));
        assert!(text.contains("SIMD features: SSE SSE2 AVX AVX2"));
        assert!(description.summary().starts_with("CPU detected - architecture: x86"));
    }
}
