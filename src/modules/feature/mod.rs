//! Feature registry
//!
//! Every CPU feature is identified by its kind, a code in `0..64` and the
//! architecture that gives the code its meaning. Named constants for each
//! architecture live in the submodules; the static tables behind them answer
//! which codes are defined and what they are called.

use crate::modules::arch::Architecture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Highest code that fits in a 64-bit feature mask
pub const MAX_FEATURE_CODE: u32 = 63;

/// Declares named feature constants together with their string table.
macro_rules! feature_table {
    ($kind:ident, $arch:ident; $( $(#[$attr:meta])* $name:ident = $code:literal => $id:literal, $desc:literal; )*) => {
        $(
            $(#[$attr])*
            pub const $name: $crate::modules::feature::Feature = $crate::modules::feature::Feature::new(
                $crate::modules::feature::FeatureKind::$kind,
                $crate::modules::arch::Architecture::$arch,
                $code,
            );
        )*

        pub(crate) static TABLE: &[$crate::modules::feature::FeatureEntry] = &[
            $(
                $crate::modules::feature::FeatureEntry { code: $code, id: $id, description: $desc },
            )*
        ];
    };
}

pub mod arm;
pub mod generic;
pub mod ia64;
pub mod iter;
pub mod mips;
pub mod x86;

pub use iter::{defined_features, defined_isa_features, defined_simd_features, defined_system_features, DefinedFeatures};

/// Category of a CPU feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Non-SIMD instruction set extension
    Isa,
    /// SIMD instruction set extension
    Simd,
    /// Non-ISA feature: OS register state support, counters, address width
    System,
}

impl FeatureKind {
    /// All feature kinds
    pub const ALL: [FeatureKind; 3] = [FeatureKind::Isa, FeatureKind::Simd, FeatureKind::System];
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::Isa => "ISA",
            FeatureKind::Simd => "SIMD",
            FeatureKind::System => "system",
        };
        f.write_str(name)
    }
}

/// One row of a feature string table
#[derive(Debug, Clone, Copy)]
pub(crate) struct FeatureEntry {
    pub code: u8,
    pub id: &'static str,
    pub description: &'static str,
}

/// A CPU feature of one kind, scoped to an architecture
///
/// Values come from the named constants, from [`Feature::lookup`] or from
/// iterating the defined features, so the code is always one the registry
/// knows about.
#[derive(Debug, Clone, Copy)]
pub struct Feature {
    kind: FeatureKind,
    architecture: Architecture,
    code: u8,
}

impl Feature {
    pub(crate) const fn new(kind: FeatureKind, architecture: Architecture, code: u8) -> Self {
        Self { kind, architecture, code }
    }

    /// Look up a defined feature by code
    ///
    /// Codes missing from the architecture's own table fall back to the
    /// generic table, in which case the returned feature is generic.
    pub fn lookup(kind: FeatureKind, architecture: Architecture, code: u32) -> Option<Self> {
        find_entry(kind, architecture, code).map(|(owner, entry)| Feature::new(kind, owner, entry.code))
    }

    /// Look up a defined feature by its short identifier
    pub fn from_short_id(kind: FeatureKind, architecture: Architecture, id: &str) -> Option<Self> {
        let own = table(kind, architecture).iter().map(|e| (architecture, e));
        let generic = table(kind, Architecture::Unknown).iter().map(|e| (Architecture::Unknown, e));
        own.chain(generic)
            .find(|(_, entry)| entry.id.eq_ignore_ascii_case(id))
            .map(|(owner, entry)| Feature::new(kind, owner, entry.code))
    }

    /// Feature kind
    #[inline]
    pub const fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Architecture that defines this feature; `Unknown` for generic features
    #[inline]
    pub const fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Feature code, the bit index in the feature mask
    #[inline]
    pub const fn code(&self) -> u32 {
        self.code as u32
    }

    /// Single-bit mask for this feature
    #[inline]
    pub const fn mask(&self) -> u64 {
        1u64 << self.code
    }

    /// Stable identifier, e.g. `AVX2`
    pub fn short_id(&self) -> &'static str {
        short_id(self.kind, self.code(), self.architecture).unwrap_or("Unknown")
    }

    /// Human-readable description, e.g. `AVX 2 instruction set`
    pub fn describe(&self) -> &'static str {
        describe(self.kind, self.code(), self.architecture).unwrap_or("Unknown feature")
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.code == other.code && self.architecture == other.architecture
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.code() ^ self.architecture.id());
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

/// Table of features of `kind` declared by `architecture` itself
pub(crate) fn table(kind: FeatureKind, architecture: Architecture) -> &'static [FeatureEntry] {
    match (kind, architecture) {
        (FeatureKind::System, Architecture::Unknown) => generic::system::TABLE,
        (FeatureKind::Isa, Architecture::X86) => x86::isa::TABLE,
        (FeatureKind::Simd, Architecture::X86) => x86::simd::TABLE,
        (FeatureKind::System, Architecture::X86) => x86::system::TABLE,
        (FeatureKind::Isa, Architecture::Arm) => arm::isa::TABLE,
        (FeatureKind::Simd, Architecture::Arm) => arm::simd::TABLE,
        (FeatureKind::System, Architecture::Arm) => arm::system::TABLE,
        (FeatureKind::Isa, Architecture::Mips) => mips::isa::TABLE,
        (FeatureKind::Simd, Architecture::Mips) => mips::simd::TABLE,
        (FeatureKind::Isa, Architecture::Ia64) => ia64::isa::TABLE,
        _ => &[],
    }
}

fn find_entry(kind: FeatureKind, architecture: Architecture, code: u32) -> Option<(Architecture, &'static FeatureEntry)> {
    if code > MAX_FEATURE_CODE {
        return None;
    }
    let lookup = |arch| {
        table(kind, arch)
            .iter()
            .find(|entry| u32::from(entry.code) == code)
            .map(|entry| (arch, entry))
    };
    lookup(architecture).or_else(|| {
        if architecture == Architecture::Unknown {
            None
        } else {
            lookup(Architecture::Unknown)
        }
    })
}

/// Whether `code` names a feature of `kind` under `architecture`
pub fn is_defined(kind: FeatureKind, code: u32, architecture: Architecture) -> bool {
    find_entry(kind, architecture, code).is_some()
}

/// Human-readable description of a feature code
pub fn describe(kind: FeatureKind, code: u32, architecture: Architecture) -> Option<&'static str> {
    find_entry(kind, architecture, code).map(|(_, entry)| entry.description)
}

/// Stable identifier of a feature code
pub fn short_id(kind: FeatureKind, code: u32, architecture: Architecture) -> Option<&'static str> {
    find_entry(kind, architecture, code).map(|(_, entry)| entry.id)
}
