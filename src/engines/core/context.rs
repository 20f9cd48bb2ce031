//! Process-wide processor context
//!
//! The first query runs detection; every later query reads the stored
//! description. A probe installed with [`install_probe`] before that first
//! query replaces the host probe.

use crate::engines::core::config::DetectionConfig;
use crate::engines::core::description::{CpuDescription, DetectionFailure};
use crate::engines::probe::{HostProbe, PlatformProbe};
use crate::engines::{CpuError, CpuResult};
use crate::modules::arch::{Architecture, Microarchitecture, Vendor};
use crate::modules::cache::CacheInfo;
use crate::modules::feature::Feature;
use parking_lot::Mutex;
use std::sync::OnceLock;

static PROBE_OVERRIDE: Mutex<ProbeSlot> = parking_lot::const_mutex(ProbeSlot::new());
static GLOBAL: OnceLock<CpuContext> = OnceLock::new();

/// A probe together with the description detected from it
pub struct CpuContext {
    probe: Box<dyn PlatformProbe>,
    config: DetectionConfig,
    description: OnceLock<CpuDescription>,
}

impl CpuContext {
    pub fn new(probe: Box<dyn PlatformProbe>, config: DetectionConfig) -> Self {
        Self {
            probe,
            config,
            description: OnceLock::new(),
        }
    }

    /// Context backed by the host processor
    pub fn host(config: DetectionConfig) -> Self {
        let probe = HostProbe::new(config.clone());
        Self::new(Box::new(probe), config)
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detected description; the first caller runs detection and concurrent
    /// callers wait for it
    pub fn description(&self) -> &CpuDescription {
        self.description
            .get_or_init(|| CpuDescription::detect(self.probe.as_ref(), &self.config))
    }

    #[inline]
    pub fn is_supported(&self, feature: Feature) -> bool {
        self.description().is_supported(feature)
    }
}

impl std::fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuContext")
            .field("config", &self.config)
            .field("description", &self.description.get())
            .finish_non_exhaustive()
    }
}

/// Installed probe waiting for the global context
///
/// Sealed under the same lock that hands the probe to the context, so an
/// install either reaches detection or fails.
struct ProbeSlot {
    probe: Option<Box<dyn PlatformProbe>>,
    sealed: bool,
}

impl ProbeSlot {
    const fn new() -> Self {
        Self {
            probe: None,
            sealed: false,
        }
    }

    fn install(&mut self, probe: Box<dyn PlatformProbe>) -> CpuResult<()> {
        if self.sealed {
            return Err(CpuError::InvalidState(
                "processor context is already initialized".to_string(),
            ));
        }
        self.probe = Some(probe);
        Ok(())
    }

    fn seal(&mut self) -> Option<Box<dyn PlatformProbe>> {
        self.sealed = true;
        self.probe.take()
    }
}

/// Replace the host probe for this process
///
/// Fails with `InvalidState` once the global context exists.
pub fn install_probe(probe: Box<dyn PlatformProbe>) -> CpuResult<()> {
    PROBE_OVERRIDE.lock().install(probe)
}

/// The process-wide context, created on first use
///
/// Configuration comes from [`DetectionConfig::from_env`].
pub fn global() -> &'static CpuContext {
    GLOBAL.get_or_init(|| {
        let config = DetectionConfig::from_env();
        let installed = PROBE_OVERRIDE.lock().seal();
        match installed {
            Some(probe) => {
                log::debug!("Using installed platform probe");
                CpuContext::new(probe, config)
            }
            None => CpuContext::host(config),
        }
    })
}

/// Description of the processor running this process
pub fn cpu_description() -> &'static CpuDescription {
    global().description()
}

pub fn cpu_architecture() -> Architecture {
    cpu_description().architecture()
}

pub fn cpu_vendor() -> Vendor {
    cpu_description().vendor()
}

pub fn cpu_microarchitecture() -> Microarchitecture {
    cpu_description().microarchitecture()
}

/// Whether the processor running this process supports `feature`
#[inline]
pub fn is_supported(feature: Feature) -> bool {
    cpu_description().is_supported(feature)
}

pub fn logical_cores() -> u32 {
    cpu_description().logical_cores()
}

pub fn cache_info() -> &'static CacheInfo {
    cpu_description().cache()
}

pub fn cpu_name() -> Option<&'static str> {
    cpu_description().name()
}

/// Probe queries that failed during global detection
pub fn detection_failures() -> &'static [DetectionFailure] {
    cpu_description().detection_failures()
}
