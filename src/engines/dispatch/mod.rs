//! Runtime function dispatch
//!
//! A dispatch table lists implementations of one operation, each tagged with
//! the microarchitecture it is tuned for and the features it needs. Selection
//! walks the detected microarchitecture's preference list and picks the first
//! implementation the processor can run. The table ends with a default
//! implementation that needs nothing, so selection always succeeds on a well
//! formed table.

mod lists;

pub use lists::{dispatch_list, dispatch_list_for, DispatchAbi};

use crate::engines::core::context;
use crate::engines::core::description::CpuDescription;
use crate::engines::{CpuError, CpuResult};
use crate::modules::arch::{Architecture, Microarchitecture};
use crate::modules::feature::{Feature, FeatureKind};
use crate::modules::feature_set::FeatureSet;
use std::sync::OnceLock;

/// One implementation in a dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDescriptor<F> {
    pub function: F,
    /// Microarchitecture the implementation is tuned for; `Unknown` for generic code
    pub microarchitecture: Microarchitecture,
    /// Architecture of the required features; `Unknown` when only generic features are required
    pub architecture: Architecture,
    pub isa: FeatureSet,
    pub simd: FeatureSet,
    pub system: FeatureSet,
}

impl<F> FunctionDescriptor<F> {
    /// Implementation tuned for `microarchitecture`, with no requirements yet
    pub const fn new(function: F, microarchitecture: Microarchitecture) -> Self {
        Self {
            function,
            microarchitecture,
            architecture: Architecture::Unknown,
            isa: FeatureSet::EMPTY,
            simd: FeatureSet::EMPTY,
            system: FeatureSet::EMPTY,
        }
    }

    /// Generic implementation that terminates a dispatch table
    pub const fn default_implementation(function: F) -> Self {
        Self::new(function, Microarchitecture::Unknown)
    }

    /// Add `feature` to the requirements
    ///
    /// Panics if `feature` belongs to a different architecture than the
    /// features already required. In a `const` table this fails the build.
    pub const fn requires(mut self, feature: Feature) -> Self {
        let arch = feature.architecture().id();
        if arch != Architecture::Unknown.id() {
            if self.architecture.id() == Architecture::Unknown.id() {
                self.architecture = feature.architecture();
            } else if self.architecture.id() != arch {
                panic!("dispatch entry requires features of two architectures");
            }
        }
        match feature.kind() {
            FeatureKind::Isa => self.isa = self.isa.with(feature),
            FeatureKind::Simd => self.simd = self.simd.with(feature),
            FeatureKind::System => self.system = self.system.with(feature),
        }
        self
    }

    /// Generic and requiring nothing
    pub fn is_default(&self) -> bool {
        self.microarchitecture == Microarchitecture::Unknown
            && self.isa.is_empty()
            && self.simd.is_empty()
            && self.system.is_empty()
    }

    /// Whether the processor in `description` has every required feature
    ///
    /// Features of another architecture are never satisfied, whatever bits
    /// the description carries.
    pub fn is_satisfied_by(&self, description: &CpuDescription) -> bool {
        (self.architecture == Architecture::Unknown || self.architecture == description.architecture())
            && description.isa_features().is_superset_of(self.isa)
            && description.simd_features().is_superset_of(self.simd)
            && description.system_features().is_superset_of(self.system)
    }
}

/// Pick the implementation for `description` from `table`
///
/// Uses the host ABI's preference list for the detected microarchitecture.
pub fn select_function<'t, F>(
    table: &'t [FunctionDescriptor<F>],
    description: &CpuDescription,
) -> CpuResult<&'t FunctionDescriptor<F>> {
    select_function_with(table, description, dispatch_list(description.microarchitecture()))
}

/// Pick the implementation for `description` using an explicit preference list
///
/// Entries after the first default implementation are never considered.
pub fn select_function_with<'t, F>(
    table: &'t [FunctionDescriptor<F>],
    description: &CpuDescription,
    preferences: &[Microarchitecture],
) -> CpuResult<&'t FunctionDescriptor<F>> {
    let end = table
        .iter()
        .position(FunctionDescriptor::is_default)
        .ok_or_else(|| CpuError::InvalidArgument("dispatch table has no default implementation".to_string()))?;
    let candidates = &table[..=end];

    preferences
        .iter()
        .find_map(|&target| {
            candidates
                .iter()
                .find(|d| d.microarchitecture == target && d.is_satisfied_by(description))
        })
        // The preference list may omit Unknown; the default always runs
        .or(candidates.last())
        .ok_or_else(|| CpuError::InvalidArgument("empty dispatch table".to_string()))
}

/// A dispatch table together with its cached selection
///
/// The first successful [`Dispatcher::get`] selects against the process-wide
/// description; later calls return the same function.
pub struct Dispatcher<F: 'static> {
    table: &'static [FunctionDescriptor<F>],
    selected: OnceLock<F>,
}

impl<F: Copy + Send + Sync + 'static> Dispatcher<F> {
    pub const fn new(table: &'static [FunctionDescriptor<F>]) -> Self {
        Self {
            table,
            selected: OnceLock::new(),
        }
    }

    pub fn table(&self) -> &'static [FunctionDescriptor<F>] {
        self.table
    }

    /// Select for an explicit description, bypassing the cache
    pub fn resolve(&self, description: &CpuDescription) -> CpuResult<F> {
        select_function(self.table, description).map(|d| d.function)
    }

    /// Function selected for the processor running this process
    pub fn get(&self) -> CpuResult<F> {
        if let Some(&function) = self.selected.get() {
            return Ok(function);
        }
        let description = context::cpu_description();
        let descriptor = select_function(self.table, description)?;
        log::debug!(
            "Dispatch selected implementation for {} on {} (isa {:#x}, simd {:#x}, system {:#x})",
            descriptor.microarchitecture,
            descriptor.architecture,
            descriptor.isa,
            descriptor.simd,
            descriptor.system
        );
        Ok(*self.selected.get_or_init(|| descriptor.function))
    }
}

impl<F: 'static> std::fmt::Debug for Dispatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entries", &self.table.len())
            .field("selected", &self.selected.get().is_some())
            .finish()
    }
}
