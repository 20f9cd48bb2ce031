//! Library version information

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of this release line
pub const RELEASE_NAME: &str = "Initial";

/// Version of the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryVersion {
    /// Releases with the same major version are API-compatible
    pub major: u32,
    /// New features and major bug fixes
    pub minor: u32,
    /// Minor bug fixes
    pub patch: u32,
    /// Build number within a patch level
    pub build: u32,
    /// Human-readable release name
    pub release_name: String,
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{} ({})",
            self.major, self.minor, self.patch, self.build, self.release_name
        )
    }
}

fn parse_component(value: &str) -> u32 {
    value.parse().unwrap_or(0)
}

/// Version of the running library, taken from the package manifest
pub fn version() -> LibraryVersion {
    LibraryVersion {
        major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
        minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
        patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
        build: option_env!("CPU_CAPS_BUILD_NUMBER").map(parse_component).unwrap_or(0),
        release_name: RELEASE_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        let v = version();
        assert_eq!(
            format!("{}.{}.{}", v.major, v.minor, v.patch),
            env!("CARGO_PKG_VERSION")
        );
        assert_eq!(v.release_name, RELEASE_NAME);
    }

    #[test]
    fn test_display_format() {
        let v = LibraryVersion {
            major: 1,
            minor: 2,
            patch: 3,
            build: 4,
            release_name: "Test".to_string(),
        };
        assert_eq!(v.to_string(), "1.2.3.4 (Test)");
    }
}
