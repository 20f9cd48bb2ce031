//! Platform probes
//!
//! A [`PlatformProbe`] answers the raw questions detection needs: numeric ids
//! for the processor identity and one bitmask per feature kind. Every query
//! can fail on its own; detection turns failures into unknown values.

pub mod arm;
pub mod linux;
pub mod mips;
pub mod x86;

use crate::engines::core::config::DetectionConfig;
use crate::engines::{CpuError, CpuResult};
use crate::modules::arch::{Architecture, Microarchitecture, Vendor};
use crate::modules::cache::CacheInfo;
use crate::modules::feature::{generic, Feature, FeatureKind};
use crate::modules::feature_set::FeatureSet;
use std::fmt;
use std::sync::OnceLock;

/// Source of raw processor facts
pub trait PlatformProbe: Send + Sync {
    fn architecture_id(&self) -> CpuResult<u32>;

    fn vendor_id(&self) -> CpuResult<u32>;

    fn microarchitecture_id(&self) -> CpuResult<u32>;

    /// Mask of supported ISA feature codes
    fn isa_features(&self) -> CpuResult<u64>;

    /// Mask of supported SIMD feature codes
    fn simd_features(&self) -> CpuResult<u64>;

    /// Mask of supported system feature codes
    fn system_features(&self) -> CpuResult<u64>;

    /// Number of logical processors
    fn logical_cores(&self) -> CpuResult<u32> {
        Ok(num_cpus::get() as u32)
    }

    fn cache_info(&self) -> CpuResult<CacheInfo> {
        Ok(CacheInfo::default())
    }

    /// Marketing name of the processor, when the platform reports one
    fn cpu_name(&self) -> CpuResult<Option<String>> {
        Ok(None)
    }
}

/// Names one query of a [`PlatformProbe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeQuery {
    Architecture,
    Vendor,
    Microarchitecture,
    IsaFeatures,
    SimdFeatures,
    SystemFeatures,
    LogicalCores,
    CacheInfo,
    CpuName,
}

impl ProbeQuery {
    pub const ALL: [ProbeQuery; 9] = [
        ProbeQuery::Architecture,
        ProbeQuery::Vendor,
        ProbeQuery::Microarchitecture,
        ProbeQuery::IsaFeatures,
        ProbeQuery::SimdFeatures,
        ProbeQuery::SystemFeatures,
        ProbeQuery::LogicalCores,
        ProbeQuery::CacheInfo,
        ProbeQuery::CpuName,
    ];

    /// Query answering the mask of `kind`
    pub const fn for_kind(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Isa => ProbeQuery::IsaFeatures,
            FeatureKind::Simd => ProbeQuery::SimdFeatures,
            FeatureKind::System => ProbeQuery::SystemFeatures,
        }
    }
}

impl fmt::Display for ProbeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeQuery::Architecture => "architecture",
            ProbeQuery::Vendor => "vendor",
            ProbeQuery::Microarchitecture => "microarchitecture",
            ProbeQuery::IsaFeatures => "ISA features",
            ProbeQuery::SimdFeatures => "SIMD features",
            ProbeQuery::SystemFeatures => "system features",
            ProbeQuery::LogicalCores => "logical cores",
            ProbeQuery::CacheInfo => "cache info",
            ProbeQuery::CpuName => "CPU name",
        };
        f.write_str(name)
    }
}

/// A probe with fixed answers
///
/// Used for overrides and tests, and as the cached form of the host probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSnapshot {
    architecture: CpuResult<u32>,
    vendor: CpuResult<u32>,
    microarchitecture: CpuResult<u32>,
    isa: CpuResult<u64>,
    simd: CpuResult<u64>,
    system: CpuResult<u64>,
    logical_cores: CpuResult<u32>,
    cache: CpuResult<CacheInfo>,
    cpu_name: CpuResult<Option<String>>,
}

impl ProbeSnapshot {
    /// Snapshot of an unidentified single-core processor of `architecture`
    /// with no features
    pub fn new(architecture: Architecture) -> Self {
        Self {
            architecture: Ok(architecture.id()),
            vendor: Ok(Vendor::Unknown.id()),
            microarchitecture: Ok(Microarchitecture::Unknown.id()),
            isa: Ok(0),
            simd: Ok(0),
            system: Ok(0),
            logical_cores: Ok(1),
            cache: Ok(CacheInfo::default()),
            cpu_name: Ok(None),
        }
    }

    /// Snapshot with every query answered as unknown
    pub fn empty() -> Self {
        Self::new(Architecture::Unknown)
    }

    /// Record every answer of `probe`
    pub fn capture(probe: &dyn PlatformProbe) -> Self {
        Self {
            architecture: probe.architecture_id(),
            vendor: probe.vendor_id(),
            microarchitecture: probe.microarchitecture_id(),
            isa: probe.isa_features(),
            simd: probe.simd_features(),
            system: probe.system_features(),
            logical_cores: probe.logical_cores(),
            cache: probe.cache_info(),
            cpu_name: probe.cpu_name(),
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Ok(architecture.id());
        self
    }

    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = Ok(vendor.id());
        self
    }

    pub fn with_microarchitecture(mut self, microarchitecture: Microarchitecture) -> Self {
        self.microarchitecture = Ok(microarchitecture.id());
        self
    }

    pub fn with_isa(mut self, isa: FeatureSet) -> Self {
        self.isa = Ok(isa.bits());
        self
    }

    pub fn with_simd(mut self, simd: FeatureSet) -> Self {
        self.simd = Ok(simd.bits());
        self
    }

    pub fn with_system(mut self, system: FeatureSet) -> Self {
        self.system = Ok(system.bits());
        self
    }

    /// Add features to the masks of their kinds
    ///
    /// A mask that currently holds a failure is replaced.
    pub fn with_features<I: IntoIterator<Item = Feature>>(mut self, features: I) -> Self {
        for feature in features {
            let slot = match feature.kind() {
                FeatureKind::Isa => &mut self.isa,
                FeatureKind::Simd => &mut self.simd,
                FeatureKind::System => &mut self.system,
            };
            let bits = slot.as_ref().copied().unwrap_or(0);
            *slot = Ok(bits | feature.mask());
        }
        self
    }

    pub fn with_logical_cores(mut self, cores: u32) -> Self {
        self.logical_cores = Ok(cores);
        self
    }

    pub fn with_cache(mut self, cache: CacheInfo) -> Self {
        self.cache = Ok(cache);
        self
    }

    pub fn with_cpu_name(mut self, name: impl Into<String>) -> Self {
        self.cpu_name = Ok(Some(name.into()));
        self
    }

    /// Make `query` fail with `error`
    pub fn with_failure(mut self, query: ProbeQuery, error: CpuError) -> Self {
        match query {
            ProbeQuery::Architecture => self.architecture = Err(error),
            ProbeQuery::Vendor => self.vendor = Err(error),
            ProbeQuery::Microarchitecture => self.microarchitecture = Err(error),
            ProbeQuery::IsaFeatures => self.isa = Err(error),
            ProbeQuery::SimdFeatures => self.simd = Err(error),
            ProbeQuery::SystemFeatures => self.system = Err(error),
            ProbeQuery::LogicalCores => self.logical_cores = Err(error),
            ProbeQuery::CacheInfo => self.cache = Err(error),
            ProbeQuery::CpuName => self.cpu_name = Err(error),
        }
        self
    }
}

impl Default for ProbeSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl PlatformProbe for ProbeSnapshot {
    fn architecture_id(&self) -> CpuResult<u32> {
        self.architecture.clone()
    }

    fn vendor_id(&self) -> CpuResult<u32> {
        self.vendor.clone()
    }

    fn microarchitecture_id(&self) -> CpuResult<u32> {
        self.microarchitecture.clone()
    }

    fn isa_features(&self) -> CpuResult<u64> {
        self.isa.clone()
    }

    fn simd_features(&self) -> CpuResult<u64> {
        self.simd.clone()
    }

    fn system_features(&self) -> CpuResult<u64> {
        self.system.clone()
    }

    fn logical_cores(&self) -> CpuResult<u32> {
        self.logical_cores.clone()
    }

    fn cache_info(&self) -> CpuResult<CacheInfo> {
        self.cache.clone()
    }

    fn cpu_name(&self) -> CpuResult<Option<String>> {
        self.cpu_name.clone()
    }
}

/// Probe of the processor running this process
///
/// The hardware is examined on the first query; later queries reuse the
/// answers.
#[derive(Debug, Default)]
pub struct HostProbe {
    config: DetectionConfig,
    snapshot: OnceLock<ProbeSnapshot>,
}

impl HostProbe {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            snapshot: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Answers of the host, examining the hardware on first use
    pub fn snapshot(&self) -> &ProbeSnapshot {
        self.snapshot.get_or_init(|| probe_host(&self.config))
    }
}

impl PlatformProbe for HostProbe {
    fn architecture_id(&self) -> CpuResult<u32> {
        self.snapshot().architecture_id()
    }

    fn vendor_id(&self) -> CpuResult<u32> {
        self.snapshot().vendor_id()
    }

    fn microarchitecture_id(&self) -> CpuResult<u32> {
        self.snapshot().microarchitecture_id()
    }

    fn isa_features(&self) -> CpuResult<u64> {
        self.snapshot().isa_features()
    }

    fn simd_features(&self) -> CpuResult<u64> {
        self.snapshot().simd_features()
    }

    fn system_features(&self) -> CpuResult<u64> {
        self.snapshot().system_features()
    }

    fn logical_cores(&self) -> CpuResult<u32> {
        self.snapshot().logical_cores()
    }

    fn cache_info(&self) -> CpuResult<CacheInfo> {
        self.snapshot().cache_info()
    }

    fn cpu_name(&self) -> CpuResult<Option<String>> {
        self.snapshot().cpu_name()
    }
}

/// Processor facts produced by an architecture decoder
struct HostFacts {
    vendor: Vendor,
    microarchitecture: Microarchitecture,
    isa: FeatureSet,
    simd: FeatureSet,
    system: FeatureSet,
    cache: CacheInfo,
    name: Option<String>,
}

fn probe_host(config: &DetectionConfig) -> ProbeSnapshot {
    let architecture = Architecture::host();
    log::debug!("Probing host processor ({})", architecture);

    let logical_cores = linux::count_logical_cores(&config.sysfs_cpu_dir).unwrap_or_else(|err| {
        log::debug!("Falling back to num_cpus for the core count: {}", err);
        num_cpus::get() as u32
    });
    let snapshot = ProbeSnapshot::new(architecture).with_logical_cores(logical_cores);

    match decode_host(config, logical_cores) {
        Ok(facts) => {
            log::debug!(
                "Decoded {} {} with masks isa={:#x} simd={:#x} system={:#x}",
                facts.vendor,
                facts.microarchitecture,
                facts.isa,
                facts.simd,
                facts.system
            );
            let snapshot = snapshot
                .with_vendor(facts.vendor)
                .with_microarchitecture(facts.microarchitecture)
                .with_isa(facts.isa)
                .with_simd(facts.simd)
                .with_system(facts.system | target_system_features(logical_cores) | kernel_cycle_counter())
                .with_cache(facts.cache);
            match facts.name {
                Some(name) => snapshot.with_cpu_name(name),
                None => snapshot,
            }
        }
        Err(err) => [
            ProbeQuery::Vendor,
            ProbeQuery::Microarchitecture,
            ProbeQuery::IsaFeatures,
            ProbeQuery::SimdFeatures,
            ProbeQuery::SystemFeatures,
            ProbeQuery::CacheInfo,
            ProbeQuery::CpuName,
        ]
        .into_iter()
        .fold(snapshot, |snapshot, query| snapshot.with_failure(query, err.clone())),
    }
}

/// System features implied by the compilation target and the core count
fn target_system_features(logical_cores: u32) -> FeatureSet {
    let mut system = FeatureSet::EMPTY;
    if cfg!(target_pointer_width = "64") {
        system.insert(generic::system::ADDRESS_SPACE_64BIT);
        system.insert(generic::system::GP_REGISTERS_64BIT);
    }
    if logical_cores == 1 {
        system.insert(generic::system::SINGLE_THREADED);
    }
    system
}

/// Cycle counter offered through Linux perf events
///
/// x86 reads its timestamp counter directly and never needs this.
#[cfg(all(target_os = "linux", not(any(target_arch = "x86", target_arch = "x86_64"))))]
fn kernel_cycle_counter() -> FeatureSet {
    if crate::engines::core::perf_event::cycle_counter_available() {
        FeatureSet::EMPTY
            .with(generic::system::CYCLE_COUNTER)
            .with(generic::system::CYCLE_COUNTER_64BIT)
    } else {
        FeatureSet::EMPTY
    }
}

#[cfg(not(all(target_os = "linux", not(any(target_arch = "x86", target_arch = "x86_64")))))]
fn kernel_cycle_counter() -> FeatureSet {
    FeatureSet::EMPTY
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn decode_host(_config: &DetectionConfig, _logical_cores: u32) -> CpuResult<HostFacts> {
    let decoded = x86::decode(&x86::HostCpuid, cfg!(target_arch = "x86_64"));
    Ok(HostFacts {
        vendor: decoded.vendor,
        microarchitecture: decoded.microarchitecture,
        isa: decoded.isa,
        simd: decoded.simd,
        system: decoded.system,
        cache: decoded.cache,
        name: decoded.brand,
    })
}

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
fn decode_host(config: &DetectionConfig, logical_cores: u32) -> CpuResult<HostFacts> {
    let info = linux::ProcCpuInfo::read(&config.cpuinfo_path)?;
    let decoded = arm::decode(&info, logical_cores);
    Ok(HostFacts {
        vendor: decoded.vendor,
        microarchitecture: decoded.microarchitecture,
        isa: decoded.isa,
        simd: decoded.simd,
        system: decoded.system,
        cache: decoded.cache,
        name: info.model_name().map(str::to_string),
    })
}

#[cfg(any(target_arch = "mips", target_arch = "mips64"))]
fn decode_host(config: &DetectionConfig, _logical_cores: u32) -> CpuResult<HostFacts> {
    let info = linux::ProcCpuInfo::read(&config.cpuinfo_path)?;
    let decoded = mips::decode(&info);
    Ok(HostFacts {
        vendor: decoded.vendor,
        microarchitecture: decoded.microarchitecture,
        isa: decoded.isa,
        simd: decoded.simd,
        system: decoded.system,
        cache: decoded.cache,
        name: Some(decoded.name),
    })
}

#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "arm",
    target_arch = "aarch64",
    target_arch = "mips",
    target_arch = "mips64"
)))]
fn decode_host(config: &DetectionConfig, _logical_cores: u32) -> CpuResult<HostFacts> {
    // No feature decoder for this architecture
    let name = linux::ProcCpuInfo::read(&config.cpuinfo_path)
        .ok()
        .and_then(|info| info.model_name().map(str::to_string));
    Ok(HostFacts {
        vendor: Vendor::Unknown,
        microarchitecture: Microarchitecture::Unknown,
        isa: FeatureSet::EMPTY,
        simd: FeatureSet::EMPTY,
        system: FeatureSet::EMPTY,
        cache: CacheInfo::default(),
        name,
    })
}
