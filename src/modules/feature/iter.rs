//! Enumeration of defined features
//!
//! One iterator serves all three feature kinds. It walks codes `0..=63`
//! in ascending order and yields only the codes the registry defines for
//! the requested architecture.

use super::{find_entry, Feature, FeatureKind, MAX_FEATURE_CODE};
use crate::engines::{CpuError, CpuResult};
use crate::modules::arch::Architecture;
use std::iter::FusedIterator;

/// Lazy, forward-only sequence of the features defined for an architecture
#[derive(Debug, Clone)]
pub struct DefinedFeatures {
    kind: FeatureKind,
    architecture: Architecture,
    next_code: u32,
}

impl DefinedFeatures {
    /// Start a fresh traversal
    pub fn new(kind: FeatureKind, architecture: Architecture) -> Self {
        Self {
            kind,
            architecture,
            next_code: 0,
        }
    }

    /// Feature kind being enumerated
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Architecture being enumerated
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Whether another defined feature remains
    pub fn has_next(&self) -> bool {
        self.clone().next().is_some()
    }

    /// Like `next`, but reports exhaustion as an error
    pub fn try_next(&mut self) -> CpuResult<Feature> {
        self.next().ok_or(CpuError::Exhausted)
    }
}

impl Iterator for DefinedFeatures {
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        while self.next_code <= MAX_FEATURE_CODE {
            let code = self.next_code;
            self.next_code += 1;
            if let Some((owner, entry)) = find_entry(self.kind, self.architecture, code) {
                return Some(Feature::new(self.kind, owner, entry.code));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (MAX_FEATURE_CODE + 1).saturating_sub(self.next_code) as usize;
        (0, Some(remaining))
    }
}

impl FusedIterator for DefinedFeatures {}

/// Features of `kind` defined for `architecture`
pub fn defined_features(kind: FeatureKind, architecture: Architecture) -> DefinedFeatures {
    DefinedFeatures::new(kind, architecture)
}

/// ISA features defined for `architecture`
pub fn defined_isa_features(architecture: Architecture) -> DefinedFeatures {
    DefinedFeatures::new(FeatureKind::Isa, architecture)
}

/// SIMD features defined for `architecture`
pub fn defined_simd_features(architecture: Architecture) -> DefinedFeatures {
    DefinedFeatures::new(FeatureKind::Simd, architecture)
}

/// System features defined for `architecture`, generic ones included
pub fn defined_system_features(architecture: Architecture) -> DefinedFeatures {
    DefinedFeatures::new(FeatureKind::System, architecture)
}
