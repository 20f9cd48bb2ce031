//! Linux system files: `/proc/cpuinfo` and the sysfs CPU directory

use crate::engines::{CpuError, CpuResult};
use std::fs;
use std::path::Path;

/// Key/value lines of `/proc/cpuinfo`, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcCpuInfo {
    entries: Vec<(String, String)>,
}

impl ProcCpuInfo {
    /// Parse the text of a cpuinfo file
    ///
    /// Lines without a colon, and lines with an empty key, are skipped. Keys
    /// and values are trimmed.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    /// Read and parse the file at `path`
    pub fn read(path: &Path) -> CpuResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CpuError::SystemFailure(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self::parse(&text))
    }

    /// First value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `key`, one per processor block
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Number of `processor` entries
    ///
    /// Older ARM kernels also print a `Processor` line holding the model
    /// name; only numeric values count.
    pub fn processor_count(&self) -> usize {
        self.get_all("processor").filter(|v| is_index(v)).count()
    }

    /// Processor model name, under whichever key the kernel uses
    pub fn model_name(&self) -> Option<&str> {
        ["model name", "Processor", "cpu model", "cpu"]
            .iter()
            .find_map(|key| self.get_all(key).find(|name| !name.is_empty() && !is_index(name)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Count `cpuN` entries in the sysfs CPU directory
pub fn count_logical_cores(sysfs_cpu_dir: &Path) -> CpuResult<u32> {
    let entries = fs::read_dir(sysfs_cpu_dir)
        .map_err(|e| CpuError::SystemFailure(format!("cannot list {}: {}", sysfs_cpu_dir.display(), e)))?;

    let mut count = 0u32;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if is_cpu_entry(&name.to_string_lossy()) {
            count += 1;
        }
    }

    if count == 0 {
        return Err(CpuError::SystemFailure(format!(
            "no processors listed in {}",
            sysfs_cpu_dir.display()
        )));
    }
    Ok(count)
}

fn is_index(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_cpu_entry(name: &str) -> bool {
    name.strip_prefix("cpu")
        .map(is_index)
        .unwrap_or(false)
}
