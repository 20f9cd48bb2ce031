//! MIPS detection from the fields of `/proc/cpuinfo`
//!
//! Standard extensions come from the `isa` and `ASEs implemented` lines.
//! Ingenic chips do not list their media extensions there, so the
//! `system type` and `cpu model` lines identify them instead.

use crate::engines::probe::linux::ProcCpuInfo;
use crate::modules::arch::{Microarchitecture, Vendor};
use crate::modules::cache::{CacheInfo, CacheLevel};
use crate::modules::feature::mips;
use crate::modules::feature_set::FeatureSet;

const KB: u32 = 1024;

/// Ingenic system-on-chip named by the `system type` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngenicSoc {
    Jz4720,
    Jz4725B,
    Jz4730,
    Jz4740,
    Jz4750,
    Jz4755,
    Jz4760,
    Jz4770,
    Jz4780,
}

impl IngenicSoc {
    pub fn parse(value: &str) -> Option<Self> {
        let soc = match value.trim() {
            "JZ4720" => IngenicSoc::Jz4720,
            "JZ4725B" => IngenicSoc::Jz4725B,
            "JZ4730" => IngenicSoc::Jz4730,
            // JZ4732 is a JZ4740 in a different package
            "JZ4732" | "JZ4740" => IngenicSoc::Jz4740,
            "JZ4750" => IngenicSoc::Jz4750,
            "JZ4755" => IngenicSoc::Jz4755,
            "JZ4760" => IngenicSoc::Jz4760,
            "JZ4770" => IngenicSoc::Jz4770,
            "JZ4780" => IngenicSoc::Jz4780,
            _ => return None,
        };
        Some(soc)
    }

    pub const fn name(self) -> &'static str {
        match self {
            IngenicSoc::Jz4720 => "Ingenic JZ4720",
            IngenicSoc::Jz4725B => "Ingenic JZ4725B",
            IngenicSoc::Jz4730 => "Ingenic JZ4730",
            IngenicSoc::Jz4740 => "Ingenic JZ4740",
            IngenicSoc::Jz4750 => "Ingenic JZ4750",
            IngenicSoc::Jz4755 => "Ingenic JZ4755",
            IngenicSoc::Jz4760 => "Ingenic JZ4760",
            IngenicSoc::Jz4770 => "Ingenic JZ4770",
            IngenicSoc::Jz4780 => "Ingenic JZ4780",
        }
    }

    /// Media extensions, which the kernel does not report
    fn simd(self) -> FeatureSet {
        match self {
            IngenicSoc::Jz4730 => FeatureSet::EMPTY,
            IngenicSoc::Jz4720 | IngenicSoc::Jz4725B | IngenicSoc::Jz4740 => FeatureSet::EMPTY.with(mips::simd::MXU),
            _ => FeatureSet::EMPTY.with(mips::simd::MXU).with(mips::simd::MXU2),
        }
    }

    fn cache(self) -> CacheInfo {
        let split = |l1: u32, l2: u32| CacheInfo {
            l1i: CacheLevel::new(l1 * KB, 0, 0),
            l1d: CacheLevel::new(l1 * KB, 0, 0),
            l2: CacheLevel::new(l2 * KB, 0, 0),
            l3: CacheLevel::default(),
        };
        match self {
            IngenicSoc::Jz4770 => split(16, 256),
            IngenicSoc::Jz4780 => split(32, 512),
            _ => split(16, 0),
        }
    }
}

/// Core named by the `cpu model` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    IngenicJzRisc,
    Mips24K,
    Mips34K,
    Mips74K,
}

/// Parse a `cpu model` value such as `MIPS 24Kc V7.4` or `Ingenic JZRISC V4.15`
///
/// Core variant letters after the family (`24Kc`, `74Kf`, `34Kec`) are ignored.
pub fn parse_cpu_model(value: &str) -> Option<CpuModel> {
    let mut words = value.split_whitespace();
    match (words.next()?, words.next()?) {
        ("Ingenic", "JZRISC") => Some(CpuModel::IngenicJzRisc),
        ("MIPS", core) => match core.trim_end_matches(['c', 'e', 'f']) {
            "24K" => Some(CpuModel::Mips24K),
            "34K" => Some(CpuModel::Mips34K),
            "74K" => Some(CpuModel::Mips74K),
            _ => None,
        },
        _ => None,
    }
}

/// Everything `/proc/cpuinfo` tells about a MIPS processor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MipsDecode {
    pub vendor: Vendor,
    pub microarchitecture: Microarchitecture,
    pub isa: FeatureSet,
    pub simd: FeatureSet,
    pub system: FeatureSet,
    pub cache: CacheInfo,
    pub name: String,
}

/// Decode a MIPS processor described by `info`
pub fn decode(info: &ProcCpuInfo) -> MipsDecode {
    let soc = info.get("system type").and_then(IngenicSoc::parse);
    let model_line = info.get("cpu model");
    let model = model_line.and_then(parse_cpu_model);

    let (vendor, microarchitecture) = decode_microarchitecture(soc, model);
    let mut decoded = MipsDecode {
        vendor,
        microarchitecture,
        ..MipsDecode::default()
    };

    if let Some(isa) = info.get("isa") {
        decode_isa_levels(&mut decoded.isa, isa);
    }
    if let Some(ases) = info.get("ASEs implemented") {
        decode_ases(&mut decoded, ases);
    }
    // The kernel appends the FPU revision to the model when one is present
    if model_line.is_some_and(|line| line.contains("FPU V")) {
        decoded.isa.insert(mips::isa::FPU);
    }
    if let Some(soc) = soc {
        decoded.simd = decoded.simd | soc.simd();
    }

    decoded.cache = match (microarchitecture, soc) {
        (Microarchitecture::Mips24K | Microarchitecture::Mips34K | Microarchitecture::Mips74K, _) => CacheInfo {
            l1i: CacheLevel::new(64 * KB, 32, 4),
            l1d: CacheLevel::new(64 * KB, 32, 4),
            ..CacheInfo::default()
        },
        (_, Some(soc)) => soc.cache(),
        _ => CacheInfo::default(),
    };

    decoded.name = match (soc, model_line) {
        (Some(soc), _) => soc.name().to_string(),
        (None, Some(line)) if !line.is_empty() => line.to_string(),
        _ if decoded.isa.contains(mips::isa::R2) => "MIPS32 R2 compatible".to_string(),
        _ => "MIPS32 R1 compatible".to_string(),
    };
    decoded
}

/// Identify vendor and microarchitecture; a known Ingenic chip wins over the core name
pub fn decode_microarchitecture(soc: Option<IngenicSoc>, model: Option<CpuModel>) -> (Vendor, Microarchitecture) {
    if soc.is_some() {
        return (Vendor::Ingenic, Microarchitecture::XBurst);
    }
    match model {
        Some(CpuModel::IngenicJzRisc) => (Vendor::Ingenic, Microarchitecture::XBurst),
        Some(CpuModel::Mips24K) => (Vendor::Mips, Microarchitecture::Mips24K),
        Some(CpuModel::Mips34K) => (Vendor::Mips, Microarchitecture::Mips34K),
        Some(CpuModel::Mips74K) => (Vendor::Mips, Microarchitecture::Mips74K),
        None => (Vendor::Unknown, Microarchitecture::Unknown),
    }
}

fn decode_isa_levels(isa: &mut FeatureSet, line: &str) {
    for level in line.split_whitespace() {
        let feature = match level {
            "mips1" => mips::isa::MIPS_I,
            "mips2" => mips::isa::MIPS_II,
            "mips3" => mips::isa::MIPS_III,
            "mips4" => mips::isa::MIPS_IV,
            "mips5" => mips::isa::MIPS_V,
            "mips32r1" | "mips64r1" => mips::isa::R1,
            "mips32r2" | "mips64r2" => mips::isa::R2,
            _ => continue,
        };
        isa.insert(feature);
    }
}

fn decode_ases(decoded: &mut MipsDecode, line: &str) {
    let MipsDecode { isa, simd, .. } = decoded;
    for ase in line.split_whitespace() {
        match ase {
            "mips16" => isa.insert(mips::isa::MIPS16),
            "micromips" => isa.insert(mips::isa::MICRO_MIPS),
            "smartmips" => isa.insert(mips::isa::SMART_MIPS),
            "mt" => isa.insert(mips::isa::MT),
            "vz" => isa.insert(mips::isa::VZ),
            "mdmx" => simd.insert(mips::simd::MDMX),
            "mips3d" => {
                simd.insert(mips::simd::MIPS3D);
                simd.insert(mips::simd::PAIRED_SINGLE);
            }
            "dsp" => simd.insert(mips::simd::DSP),
            "dsp2" => {
                simd.insert(mips::simd::DSP);
                simd.insert(mips::simd::DSP2);
            }
            "mxu" => simd.insert(mips::simd::MXU),
            _ => {}
        }
    }
}
