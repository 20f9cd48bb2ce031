//! Detection settings

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable overriding [`DetectionConfig::cpuinfo_path`]
pub const ENV_CPUINFO: &str = "CPU_CAPS_CPUINFO";
/// Environment variable overriding [`DetectionConfig::sysfs_cpu_dir`]
pub const ENV_SYSFS_CPU: &str = "CPU_CAPS_SYSFS_CPU";
/// Environment variable listing short ids to mask out, comma separated
pub const ENV_DISABLE: &str = "CPU_CAPS_DISABLE";

/// Settings for processor detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Location of the kernel's cpuinfo file
    pub cpuinfo_path: PathBuf,
    /// Directory holding one `cpuN` entry per logical processor
    pub sysfs_cpu_dir: PathBuf,
    /// Short ids of features reported as unsupported even when present
    pub disabled_features: Vec<String>,
    /// Log a one-line summary after detection
    pub log_summary: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
            sysfs_cpu_dir: PathBuf::from("/sys/devices/system/cpu"),
            disabled_features: Vec::new(),
            log_summary: true,
        }
    }
}

impl DetectionConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from `lookup`, which maps a variable name to its value
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CPUINFO).filter(|v| !v.is_empty()) {
            self.cpuinfo_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_SYSFS_CPU).filter(|v| !v.is_empty()) {
            self.sysfs_cpu_dir = PathBuf::from(path);
        }
        if let Some(list) = lookup(ENV_DISABLE) {
            self.disabled_features.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            );
        }
        self
    }

    pub fn with_disabled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_features.extend(ids.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert!(config.disabled_features.is_empty());
        assert!(config.log_summary);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_CPUINFO, "/tmp/cpuinfo"),
            (ENV_DISABLE, "AVX2, FMA3,,NEON "),
        ]
        .into_iter()
        .collect();
        let config = DetectionConfig::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.cpuinfo_path, PathBuf::from("/tmp/cpuinfo"));
        assert_eq!(config.sysfs_cpu_dir, PathBuf::from("/sys/devices/system/cpu"));
        assert_eq!(config.disabled_features, vec!["AVX2", "FMA3", "NEON"]);
    }

    #[test]
    fn test_with_disabled() {
        let config = DetectionConfig::default()
            .with_disabled(["AVX512F"])
            .with_overrides(|key| (key == ENV_DISABLE).then(|| "YMM".to_string()));
        assert_eq!(config.disabled_features, vec!["AVX512F", "YMM"]);
    }
}
