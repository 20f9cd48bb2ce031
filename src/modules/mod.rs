//! Capability data model
//!
//! Value types describing a processor: its identity, the feature registry
//! and the bitmasks that record which features are present.

pub mod arch;
pub mod cache;
pub mod feature;
pub mod feature_set;
pub mod version;

pub use arch::{Architecture, Microarchitecture, Vendor};
pub use cache::{CacheInfo, CacheLevel};
pub use feature::{Feature, FeatureKind};
pub use feature_set::FeatureSet;
pub use version::{version, LibraryVersion};
