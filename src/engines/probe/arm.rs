//! ARM detection from the fields of `/proc/cpuinfo`

use crate::engines::probe::linux::ProcCpuInfo;
use crate::modules::arch::{Microarchitecture, Vendor};
use crate::modules::cache::{CacheInfo, CacheLevel};
use crate::modules::feature::{arm, generic};
use crate::modules::feature_set::FeatureSet;
use std::collections::HashSet;

/// Parsed `CPU architecture` field, e.g. `7`, `5TEJ` or `AArch64`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchitectureVersion {
    pub version: u32,
    pub thumb: bool,
    pub jazelle: bool,
    pub dsp: bool,
}

impl ArchitectureVersion {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("AArch64") {
            return Some(Self {
                version: 8,
                ..Self::default()
            });
        }
        let digits = value.bytes().take_while(|b| b.is_ascii_digit()).count();
        let version = value[..digits].parse().ok()?;
        let mut parsed = Self {
            version,
            ..Self::default()
        };
        for suffix in value[digits..].chars() {
            match suffix {
                'T' => parsed.thumb = true,
                'J' => parsed.jazelle = true,
                'E' => parsed.dsp = true,
                _ => {}
            }
        }
        Some(parsed)
    }
}

/// Parse a `CPU part` value: `0x` followed by one to three hex digits
pub fn parse_part(value: &str) -> Option<u32> {
    let digits = value.trim().strip_prefix("0x").or_else(|| value.trim().strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 3 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Parse a `CPU implementer` value into its ASCII code, e.g. `0x41` to `A`
pub fn parse_implementer(value: &str) -> Option<u8> {
    let digits = value.trim().strip_prefix("0x").or_else(|| value.trim().strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Everything `/proc/cpuinfo` tells about an ARM processor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArmDecode {
    pub vendor: Vendor,
    pub microarchitecture: Microarchitecture,
    pub isa: FeatureSet,
    pub simd: FeatureSet,
    pub system: FeatureSet,
    pub cache: CacheInfo,
}

/// Decode an ARM processor described by `info`
///
/// `logical_cores` only feeds the shared cache estimate.
pub fn decode(info: &ProcCpuInfo, logical_cores: u32) -> ArmDecode {
    let words: HashSet<&str> = info
        .get("Features")
        .map(|line| line.split_whitespace().collect())
        .unwrap_or_default();
    let implementer = info
        .get("CPU implementer")
        .or_else(|| info.get("CPU implementor"))
        .and_then(parse_implementer);
    let part = info.get("CPU part").and_then(parse_part);
    let architecture = info.get("CPU architecture").and_then(ArchitectureVersion::parse);

    let (vendor, microarchitecture) = decode_microarchitecture(implementer, part, words.contains("vfpv4"));

    let mut decoded = ArmDecode {
        vendor,
        microarchitecture,
        ..ArmDecode::default()
    };
    decode_features(&mut decoded, architecture, &words);
    decoded.cache = decode_cache(info, microarchitecture, logical_cores);
    decoded
}

/// Identify vendor and microarchitecture from implementer and part numbers
pub fn decode_microarchitecture(
    implementer: Option<u8>,
    part: Option<u32>,
    has_vfpv4: bool,
) -> (Vendor, Microarchitecture) {
    use Microarchitecture as M;

    let part = part.unwrap_or(0);
    match implementer {
        Some(b'A') => {
            let micro = match part {
                0xB56 | 0xB02 | 0xB36 | 0xB76 => M::Arm11,
                0xC05 => M::CortexA5,
                0xC07 => M::CortexA7,
                0xC08 => M::CortexA8,
                0xC09 => M::CortexA9,
                0xC0F => M::CortexA15,
                _ => match part & 0xF00 {
                    0x700 => M::Arm7,
                    0x900 => M::Arm9,
                    _ => M::Unknown,
                },
            };
            (Vendor::Arm, micro)
        }
        Some(b'D') => (Vendor::Dec, M::StrongArm),
        Some(b'M') => (Vendor::Motorola, M::Unknown),
        Some(b'T') => match part {
            // OMAP ARM926 cores report TI as implementer
            0x925 => (Vendor::Arm, M::Arm9),
            _ => (Vendor::Ti, M::Unknown),
        },
        Some(b'Q') => match part {
            // Snapdragon S4 Play is a Cortex-A5 behind a Qualcomm part number
            0x00F if has_vfpv4 => (Vendor::Arm, M::CortexA5),
            0x00F | 0x02D => (Vendor::Qualcomm, M::Scorpion),
            0x04D | 0x06F => (Vendor::Qualcomm, M::Krait),
            _ => (Vendor::Qualcomm, M::Unknown),
        },
        Some(b'V') => match part {
            0x693 | 0x131 | 0x301 | 0x331 | 0x531 | 0x571 => (Vendor::Marvell, M::Pj1),
            0x581 => (Vendor::Marvell, M::Pj4),
            _ => (Vendor::Marvell, M::Unknown),
        },
        Some(b'i') => match part {
            0xB11 => (Vendor::Intel, M::StrongArm),
            _ if matches!(part & 0xF00, 0x200 | 0x400 | 0x600) => (Vendor::Intel, M::XScale),
            _ => (Vendor::Intel, M::Unknown),
        },
        _ => (Vendor::Unknown, M::Unknown),
    }
}

fn decode_features(decoded: &mut ArmDecode, architecture: Option<ArchitectureVersion>, words: &HashSet<&str>) {
    let ArmDecode {
        microarchitecture,
        isa,
        simd,
        system,
        ..
    } = decoded;

    if let Some(arch) = architecture {
        if arch.thumb {
            isa.insert(arm::isa::THUMB);
        }
        if arch.jazelle {
            isa.insert(arm::isa::JAZELLE);
        }
        if arch.version >= 4 {
            isa.insert(arm::isa::V4);
        }
        if arch.version >= 5 {
            isa.insert(arm::isa::V5);
            if arch.dsp {
                isa.insert(arm::isa::V5E);
            }
        }
        if arch.version >= 6 {
            isa.insert(arm::isa::V6);
        }
        // ARM11 kernels report architecture 7 for ARMv6 cores
        if arch.version >= 7 && *microarchitecture != Microarchitecture::Arm11 {
            isa.insert(arm::isa::V5E);
            isa.insert(arm::isa::V6K);
            isa.insert(arm::isa::V7);
            isa.insert(arm::isa::THUMB);
            isa.insert(arm::isa::THUMB2);
        }
    }

    let vfp3 = [arm::isa::VFP, arm::isa::VFP2, arm::isa::VFP3];

    if words.contains("thumb") {
        isa.insert(arm::isa::THUMB);
    }
    if words.contains("fpa") {
        isa.insert(arm::isa::FPA);
        system.insert(arm::system::FPA);
    }
    if words.contains("vfp") {
        isa.insert(arm::isa::VFP);
        system.insert(arm::system::S32);
    }
    if words.contains("edsp") {
        isa.insert(arm::isa::V5E);
    }
    if words.contains("java") {
        isa.insert(arm::isa::JAZELLE);
    }
    if words.contains("iwmmxt") {
        simd.insert(arm::simd::WMMX);
        system.insert(arm::system::WMMX);
    }
    if words.contains("thumbee") {
        isa.insert(arm::isa::THUMB_EE);
    }
    if words.contains("neon") || words.contains("asimd") {
        simd.insert(arm::simd::NEON);
        vfp3.iter().for_each(|&f| isa.insert(f));
        isa.insert(arm::isa::VFP_D32);
        system.insert(arm::system::S32);
        system.insert(arm::system::D32);
    }
    if words.contains("vfpv3") {
        vfp3.iter().for_each(|&f| isa.insert(f));
        system.insert(arm::system::S32);
    }
    if words.contains("vfpv3d16") {
        vfp3.iter().for_each(|&f| isa.insert(f));
        isa.remove(arm::isa::VFP_D32);
        system.insert(arm::system::S32);
        system.remove(arm::system::D32);
    }
    if words.contains("vfpv4") || words.contains("fp") {
        vfp3.iter().for_each(|&f| isa.insert(f));
        isa.insert(arm::isa::VFP3_HP);
        isa.insert(arm::isa::VFP4);
        system.insert(arm::system::S32);
    }
    if words.contains("fphp") {
        isa.insert(arm::isa::VFP3_HP);
    }
    if words.contains("asimdhp") {
        simd.insert(arm::simd::NEON_HP);
    }
    if words.contains("idiva") {
        isa.insert(arm::isa::DIV);
    }

    if isa.contains(arm::isa::V6) {
        system.insert(generic::system::MISALIGNED_ACCESS);
    }
}

fn cache_field(info: &ProcCpuInfo, key: &str) -> Option<u32> {
    info.get(key).and_then(|value| value.trim().parse().ok())
}

fn decode_cache(info: &ProcCpuInfo, microarchitecture: Microarchitecture, logical_cores: u32) -> CacheInfo {
    // Pre-v7 kernels export L1 geometry directly
    let reported_l1 = |prefix: &str| {
        cache_field(info, &format!("{prefix} size")).map(|size| {
            CacheLevel::new(
                size,
                cache_field(info, &format!("{prefix} line length")).unwrap_or(0),
                cache_field(info, &format!("{prefix} assoc")).unwrap_or(0),
            )
        })
    };
    if let (Some(l1i), Some(l1d)) = (reported_l1("I"), reported_l1("D")) {
        return CacheInfo {
            l1i,
            l1d,
            ..CacheInfo::default()
        };
    }
    typical_cache(microarchitecture, logical_cores)
}

/// Typical cache configuration of a core, used when the kernel reports none
pub fn typical_cache(microarchitecture: Microarchitecture, logical_cores: u32) -> CacheInfo {
    use Microarchitecture as M;

    const KB: u32 = 1024;
    let split = |l1: u32, line: u32, l2: CacheLevel| CacheInfo {
        l1i: CacheLevel::new(l1 * KB, line, 0),
        l1d: CacheLevel::new(l1 * KB, line, 0),
        l2,
        l3: CacheLevel::default(),
    };

    match microarchitecture {
        M::CortexA5 => split(32, 32, CacheLevel::new(256 * KB, 32, 0)),
        M::CortexA7 => split(32, 64, CacheLevel::new(512 * KB, 64, 0)),
        M::CortexA8 => split(32, 64, CacheLevel::new(256 * KB, 64, 0)),
        M::CortexA9 if logical_cores >= 2 => split(32, 32, CacheLevel::new(1024 * KB, 32, 16)),
        M::CortexA9 => split(32, 32, CacheLevel::new(512 * KB, 32, 8)),
        M::CortexA15 => split(64, 64, CacheLevel::new(1024 * KB, 64, 0)),
        M::Arm11 => split(16, 32, CacheLevel::new(128 * KB, 32, 0)),
        M::Arm9 => split(16, 32, CacheLevel::default()),
        M::Scorpion if logical_cores >= 2 => split(32, 32, CacheLevel::new(512 * KB, 32, 0)),
        M::Scorpion => split(32, 32, CacheLevel::new(256 * KB, 32, 0)),
        M::Krait => {
            let l2 = if logical_cores >= 4 {
                CacheLevel::new(2048 * KB, 0, 16)
            } else {
                CacheLevel::new(1024 * KB, 0, 8)
            };
            CacheInfo {
                l1i: CacheLevel::new(16 * KB, 0, 4),
                l1d: CacheLevel::new(16 * KB, 0, 4),
                l2,
                l3: CacheLevel::default(),
            }
        }
        // Kirkwood 88F6281
        M::Pj1 => split(16, 0, CacheLevel::new(256 * KB, 0, 0)),
        // Armada 510
        M::Pj4 => split(32, 32, CacheLevel::new(512 * KB, 32, 0)),
        _ => CacheInfo::default(),
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    /// Pandaboard (OMAP4430, dual Cortex-A9)
    pub const CORTEX_A9: &str = "Processor\t: ARMv7 Processor rev 10 (v7l)\n\
processor\t: 0\n\
BogoMIPS\t: 1592.52\n\
processor\t: 1\n\
BogoMIPS\t: 1592.52\n\
Features\t: swp half thumb fastmult vfp edsp thumbee neon vfpv3 tls\n\
CPU implementer\t: 0x41\n\
CPU architecture: 7\n\
CPU variant\t: 0x1\n\
CPU part\t: 0xc09\n\
CPU revision\t: 0\n";

    /// Raspberry Pi (BCM2835, ARM1176)
    pub const ARM11: &str = "Processor\t: ARMv6-compatible processor rev 7 (v6l)\n\
BogoMIPS\t: 697.95\n\
Features\t: swp half thumb fastmult vfp edsp java tls\n\
CPU implementer\t: 0x41\n\
CPU architecture: 7\n\
CPU variant\t: 0x0\n\
CPU part\t: 0xb76\n\
CPU revision\t: 7\n";

    /// Kirkwood SheevaPlug with kernel-reported caches
    pub const KIRKWOOD: &str = "Processor\t: Feroceon 88FR131 rev 1 (v5l)\n\
Features\t: swp half thumb fastmult edsp\n\
CPU implementer\t: 0x56\n\
CPU architecture: 5TE\n\
CPU variant\t: 0x2\n\
CPU part\t: 0x131\n\
I size\t\t: 16384\n\
I assoc\t\t: 4\n\
I line length\t: 32\n\
D size\t\t: 16384\n\
D assoc\t\t: 4\n\
D line length\t: 32\n";
}
