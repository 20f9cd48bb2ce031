//! x86 and x86-64 detection through CPUID
//!
//! Decoding works against any [`CpuidSource`], so it can be driven by the
//! host processor or by recorded register dumps.

use crate::modules::arch::{Microarchitecture, Vendor};
use crate::modules::cache::{CacheInfo, CacheLevel, FULLY_ASSOCIATIVE};
use crate::modules::feature::{generic, x86};
use crate::modules::feature_set::FeatureSet;

/// Register values returned by one CPUID query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuidRegisters {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidRegisters {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }
}

/// Something that answers CPUID queries
pub trait CpuidSource {
    /// Execute CPUID with the given leaf and subleaf
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegisters;

    /// Contents of XCR0. Only called when CPUID reports OSXSAVE.
    fn xcr0(&self) -> u64;
}

/// CPUID of the processor running this code
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCpuid;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuidSource for HostCpuid {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegisters {
        #[cfg(target_arch = "x86")]
        use std::arch::x86::__cpuid_count;
        #[cfg(target_arch = "x86_64")]
        use std::arch::x86_64::__cpuid_count;

        // SAFETY: every processor supported by this target implements CPUID
        #[allow(unused_unsafe)]
        let regs = unsafe { __cpuid_count(leaf, subleaf) };
        CpuidRegisters::new(regs.eax, regs.ebx, regs.ecx, regs.edx)
    }

    fn xcr0(&self) -> u64 {
        // SAFETY: callers only ask for XCR0 after CPUID reported OSXSAVE
        unsafe { read_xcr0() }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "xsave")]
unsafe fn read_xcr0() -> u64 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::_xgetbv;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::_xgetbv;

    _xgetbv(0)
}

/// Family, model and stepping decoded from the CPUID signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelInfo {
    pub stepping: u32,
    pub base_model: u32,
    pub base_family: u32,
    pub extended_model: u32,
    pub extended_family: u32,
    pub model: u32,
    pub family: u32,
}

impl ModelInfo {
    /// Decode the EAX value of leaf 1
    pub fn from_signature(eax: u32) -> Self {
        let stepping = eax & 0xF;
        let base_model = (eax >> 4) & 0xF;
        let base_family = (eax >> 8) & 0xF;
        let extended_model = (eax >> 16) & 0xF;
        let extended_family = (eax >> 20) & 0xFF;
        Self {
            stepping,
            base_model,
            base_family,
            extended_model,
            extended_family,
            model: base_model + (extended_model << 4),
            family: base_family + extended_family,
        }
    }
}

/// Everything CPUID tells about the processor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct X86Decode {
    pub vendor: Vendor,
    pub microarchitecture: Microarchitecture,
    pub model: ModelInfo,
    pub isa: FeatureSet,
    pub simd: FeatureSet,
    pub system: FeatureSet,
    pub cache: CacheInfo,
    pub brand: Option<String>,
}

/// Decode vendor, microarchitecture, features, caches and brand string
///
/// `long_mode` tells whether the calling code runs in 64-bit mode, which
/// guarantees a baseline of features regardless of what CPUID says.
pub fn decode<S: CpuidSource + ?Sized>(source: &S, long_mode: bool) -> X86Decode {
    let leaf0 = source.cpuid(0, 0);
    let max_base = leaf0.eax;
    let vendor = decode_vendor(leaf0.ebx, leaf0.edx, leaf0.ecx);
    let max_extended = source.cpuid(0x8000_0000, 0).eax;

    let model = if max_base >= 1 {
        ModelInfo::from_signature(source.cpuid(1, 0).eax)
    } else {
        ModelInfo::default()
    };
    let microarchitecture = decode_microarchitecture(vendor, &model, long_mode);

    let features = decode_features(source, vendor, microarchitecture, max_base, max_extended, long_mode);
    let cache = decode_cache(source, vendor, max_base, max_extended);
    let brand = decode_brand(source, max_extended);

    X86Decode {
        vendor,
        microarchitecture,
        model,
        isa: features.isa,
        simd: features.simd,
        system: features.system,
        cache,
        brand,
    }
}

/// Map the 12-byte vendor string, laid out in EBX, EDX, ECX order
pub fn decode_vendor(ebx: u32, edx: u32, ecx: u32) -> Vendor {
    let mut raw = [0u8; 12];
    raw[0..4].copy_from_slice(&ebx.to_le_bytes());
    raw[4..8].copy_from_slice(&edx.to_le_bytes());
    raw[8..12].copy_from_slice(&ecx.to_le_bytes());
    vendor_from_string(&raw)
}

/// Map a CPUID vendor string to a vendor
pub fn vendor_from_string(raw: &[u8; 12]) -> Vendor {
    match raw {
        b"GenuineIntel" => Vendor::Intel,
        b"AuthenticAMD" | b"AMDisbetter!" | b"AMD ISBETTER" => Vendor::Amd,
        b"CentaurHauls" | b"VIA VIA VIA " => Vendor::Via,
        b"GenuineTMx86" | b"TransmetaCPU" => Vendor::Transmeta,
        b"CyrixInstead" => Vendor::Cyrix,
        b"RiseRiseRise" => Vendor::Rise,
        b"Geode by NSC" => Vendor::Nsc,
        b"SiS SiS SiS " => Vendor::Sis,
        b"NexGenDriven" => Vendor::NexGen,
        b"UMC UMC UMC " => Vendor::Umc,
        b"Genuine  RDC" => Vendor::Rdc,
        b"Vortex86 SoC" => Vendor::Dmp,
        _ => Vendor::Unknown,
    }
}

/// Identify the microarchitecture from vendor and signature
///
/// Cores that cannot run 64-bit code are only recognized when `long_mode`
/// is false.
pub fn decode_microarchitecture(vendor: Vendor, model: &ModelInfo, long_mode: bool) -> Microarchitecture {
    match vendor {
        Vendor::Intel => intel_microarchitecture(model, long_mode),
        Vendor::Amd => amd_microarchitecture(model, long_mode),
        _ => Microarchitecture::Unknown,
    }
}

fn intel_microarchitecture(model: &ModelInfo, long_mode: bool) -> Microarchitecture {
    use Microarchitecture as M;

    match model.family {
        0x05 if !long_mode => M::P5,
        0x06 => match model.model {
            0x01 | 0x03 | 0x05 | 0x06 | 0x07 | 0x08 | 0x0A | 0x0B if !long_mode => M::P6,
            0x09 | 0x0D | 0x15 if !long_mode => M::Dothan,
            0x0E if !long_mode => M::Yonah,
            0x0F | 0x16 => M::Conroe,
            0x17 | 0x1D => M::Penryn,
            0x1C | 0x26 => M::Bonnell,
            0x27 | 0x35 | 0x36 => M::Saltwell,
            0x37 | 0x4A | 0x4D => M::Silvermont,
            0x1A | 0x1E | 0x1F | 0x2E | 0x25 | 0x2C | 0x2F => M::Nehalem,
            0x2A | 0x2D => M::SandyBridge,
            0x3A | 0x3E => M::IvyBridge,
            0x3C | 0x3F | 0x45 | 0x46 => M::Haswell,
            _ => M::Unknown,
        },
        0x0B if model.model == 0x01 => M::KnightsCorner,
        0x0F => match model.model {
            0x00..=0x02 => M::Willamette,
            0x03 | 0x04 | 0x06 => M::Prescott,
            _ => M::Unknown,
        },
        _ => M::Unknown,
    }
}

fn amd_microarchitecture(model: &ModelInfo, long_mode: bool) -> Microarchitecture {
    use Microarchitecture as M;

    match model.family {
        0x05 if !long_mode => match model.model {
            0x00..=0x02 => M::K5,
            0x06 | 0x07 | 0x08 | 0x0D => M::K6,
            0x0A => M::Geode,
            _ => M::Unknown,
        },
        0x06 if !long_mode => M::K7,
        0x0F | 0x11 => M::K8,
        0x10 | 0x12 => M::K10,
        0x14 => M::Bobcat,
        0x16 => M::Jaguar,
        0x15 => match model.model {
            0x00 | 0x01 => M::Bulldozer,
            0x02 | 0x10 | 0x13 => M::Piledriver,
            _ => match model.extended_model {
                0x0 => M::Bulldozer,
                0x1 | 0x2 => M::Piledriver,
                0x3 | 0x4 => M::Steamroller,
                _ => M::Unknown,
            },
        },
        _ => M::Unknown,
    }
}

#[derive(Debug, Default)]
struct FeatureMasks {
    isa: FeatureSet,
    simd: FeatureSet,
    system: FeatureSet,
}

#[inline]
fn bit(value: u32, index: u32) -> bool {
    (value >> index) & 1 != 0
}

fn decode_features<S: CpuidSource + ?Sized>(
    source: &S,
    vendor: Vendor,
    microarchitecture: Microarchitecture,
    max_base: u32,
    max_extended: u32,
    long_mode: bool,
) -> FeatureMasks {
    let mut masks = FeatureMasks::default();
    let FeatureMasks { isa, simd, system } = &mut masks;

    let basic = if max_base >= 1 { source.cpuid(1, 0) } else { CpuidRegisters::default() };
    let structured = if max_base >= 7 { source.cpuid(7, 0) } else { CpuidRegisters::default() };
    let extended = if max_extended >= 0x8000_0001 {
        source.cpuid(0x8000_0001, 0)
    } else {
        CpuidRegisters::default()
    };
    let combined_edx = basic.edx | extended.edx;
    let leaf7 = structured.ebx;

    isa.insert(x86::isa::CPUID);
    system.insert(generic::system::MISALIGNED_ACCESS);

    if long_mode {
        isa.insert(x86::isa::X64);
        isa.insert(x86::isa::RDTSC);
        isa.insert(x86::isa::CMOV);
        isa.insert(x86::isa::CMPXCHG8B);
        simd.insert(x86::simd::SSE);
        simd.insert(x86::simd::SSE2);
        system.insert(generic::system::ADDRESS_SPACE_64BIT);
        system.insert(generic::system::GP_REGISTERS_64BIT);
        system.insert(generic::system::CYCLE_COUNTER);
        system.insert(generic::system::CYCLE_COUNTER_64BIT);
    } else {
        if bit(combined_edx, 4) {
            isa.insert(x86::isa::RDTSC);
            system.insert(generic::system::CYCLE_COUNTER);
            system.insert(generic::system::CYCLE_COUNTER_64BIT);
        }
        if bit(extended.edx, 29) {
            isa.insert(x86::isa::X64);
        }
        if bit(combined_edx, 15) {
            isa.insert(x86::isa::CMOV);
        }
        if bit(combined_edx, 8) {
            isa.insert(x86::isa::CMPXCHG8B);
        }
        if bit(basic.edx, 25) {
            simd.insert(x86::simd::SSE);
        }
        if bit(basic.edx, 26) {
            simd.insert(x86::simd::SSE2);
        }
    }

    // System and privileged instructions
    if bit(basic.edx, 11) {
        isa.insert(x86::isa::SYSENTER);
    }
    if bit(extended.edx, 11) {
        isa.insert(x86::isa::SYSCALL);
    }
    if bit(combined_edx, 5) {
        isa.insert(x86::isa::MSR);
    }
    if bit(basic.edx, 19) {
        isa.insert(x86::isa::CLFLUSH);
    }
    if bit(basic.ecx, 3) {
        isa.insert(x86::isa::MONITOR);
    }
    if bit(basic.edx, 24) {
        isa.insert(x86::isa::FXSAVE);
    }
    if bit(extended.edx, 24) {
        // Cyrix reuses this bit for extended MMX
        if vendor == Vendor::Cyrix && !long_mode {
            simd.insert(x86::simd::EMMX);
        } else {
            isa.insert(x86::isa::FXSAVE);
        }
    }
    if bit(basic.ecx, 26) {
        isa.insert(x86::isa::XSAVE);
    }

    // General-purpose instructions
    if bit(combined_edx, 0) {
        isa.insert(x86::isa::FPU);
    }
    if bit(basic.ecx, 13) {
        isa.insert(x86::isa::CMPXCHG16B);
    }
    if bit(basic.ecx, 22) {
        isa.insert(x86::isa::MOVBE);
    }
    if bit(extended.ecx, 0) {
        isa.insert(x86::isa::LAHF_SAHF64);
    }
    if bit(leaf7, 0) {
        isa.insert(x86::isa::FS_GS_BASE);
    }
    if bit(extended.ecx, 5) {
        isa.insert(x86::isa::LZCNT);
    }
    if bit(basic.ecx, 23) {
        isa.insert(x86::isa::POPCNT);
    }
    if bit(extended.ecx, 21) {
        isa.insert(x86::isa::TBM);
    }
    if bit(leaf7, 3) {
        isa.insert(x86::isa::BMI);
    }
    if bit(leaf7, 8) {
        isa.insert(x86::isa::BMI2);
    }
    if bit(leaf7, 19) {
        isa.insert(x86::isa::ADX);
    }

    // Cryptography and randomness
    if bit(basic.ecx, 25) {
        isa.insert(x86::isa::AES);
    }
    if bit(basic.ecx, 1) {
        isa.insert(x86::isa::PCLMULQDQ);
    }
    if bit(basic.ecx, 30) {
        isa.insert(x86::isa::RDRAND);
    }
    if bit(leaf7, 18) {
        isa.insert(x86::isa::RDSEED);
    }
    if bit(leaf7, 29) {
        isa.insert(x86::isa::SHA);
    }

    // Transactional memory and profiling
    if bit(leaf7, 4) {
        isa.insert(x86::isa::HLE);
    }
    if bit(leaf7, 11) {
        isa.insert(x86::isa::RTM);
    }
    if leaf7 & 0x0810 != 0 {
        isa.insert(x86::isa::XTEST);
    }
    if bit(leaf7, 14) {
        isa.insert(x86::isa::MPX);
    }
    if bit(extended.ecx, 15) {
        isa.insert(x86::isa::LWP);
    }
    if bit(extended.edx, 27) {
        isa.insert(x86::isa::RDTSCP);
    }

    // SIMD extensions
    if bit(combined_edx, 23) {
        simd.insert(x86::simd::MMX);
    }
    if bit(basic.edx, 25) || bit(extended.edx, 22) {
        simd.insert(x86::simd::MMX_PLUS);
    }
    if bit(extended.edx, 31) {
        simd.insert(x86::simd::THREE_DNOW);
    }
    if bit(extended.edx, 30) {
        simd.insert(x86::simd::THREE_DNOW_PLUS);
        if microarchitecture == Microarchitecture::Geode {
            simd.insert(x86::simd::THREE_DNOW_GEODE);
        }
    }
    if bit(extended.ecx, 8) || extended.edx & 0xC000_0000 != 0 {
        simd.insert(x86::simd::THREE_DNOW_PREFETCH);
    }
    if bit(basic.ecx, 0) {
        simd.insert(x86::simd::SSE3);
    }
    if bit(basic.ecx, 9) {
        simd.insert(x86::simd::SSSE3);
    }
    if bit(basic.ecx, 19) {
        simd.insert(x86::simd::SSE4_1);
    }
    if bit(basic.ecx, 20) {
        simd.insert(x86::simd::SSE4_2);
    }
    if bit(extended.ecx, 6) {
        simd.insert(x86::simd::SSE4A);
    }
    if bit(basic.ecx, 28) {
        simd.insert(x86::simd::AVX);
    }
    if bit(leaf7, 5) {
        simd.insert(x86::simd::AVX2);
    }
    if bit(leaf7, 16) {
        simd.insert(x86::simd::AVX512F);
    }
    if bit(leaf7, 26) {
        simd.insert(x86::simd::AVX512PF);
    }
    if bit(leaf7, 27) {
        simd.insert(x86::simd::AVX512ER);
    }
    if bit(leaf7, 28) {
        simd.insert(x86::simd::AVX512CD);
    }
    if bit(basic.ecx, 12) {
        simd.insert(x86::simd::FMA3);
    }
    if bit(extended.ecx, 16) {
        simd.insert(x86::simd::FMA4);
    }
    if bit(extended.ecx, 11) {
        simd.insert(x86::simd::XOP);
    }
    if bit(basic.ecx, 29) {
        simd.insert(x86::simd::F16C);
    }

    if bit(extended.ecx, 7) {
        system.insert(x86::system::MISALIGNED_SSE);
    }

    decode_padlock(source, isa, system);
    decode_register_state(source, basic.ecx, max_base, isa, simd, system);

    masks
}

/// VIA PadLock units live in the Centaur extended leaves
fn decode_padlock<S: CpuidSource + ?Sized>(source: &S, isa: &mut FeatureSet, system: &mut FeatureSet) {
    let max_centaur = source.cpuid(0xC000_0000, 0).eax;
    if !(0xC000_0001..=0xC000_FFFF).contains(&max_centaur) {
        return;
    }
    let padlock = source.cpuid(0xC000_0001, 0).edx;

    let units = [
        (2, 3, x86::isa::RNG, x86::system::RNG),
        (6, 7, x86::isa::ACE, x86::system::ACE),
        (8, 9, x86::isa::ACE2, x86::system::ACE2),
        (10, 11, x86::isa::PHE, x86::system::PHE),
        (12, 13, x86::isa::PMM, x86::system::PMM),
    ];
    for (present, enabled, unit, unit_state) in units {
        if bit(padlock, present) {
            isa.insert(unit);
            if bit(padlock, enabled) {
                system.insert(unit_state);
            }
        }
    }
}

/// Which register files the OS saves on context switch
fn decode_register_state<S: CpuidSource + ?Sized>(
    source: &S,
    basic_ecx: u32,
    max_base: u32,
    isa: &FeatureSet,
    simd: &FeatureSet,
    system: &mut FeatureSet,
) {
    let has_fpu = isa.contains(x86::isa::FPU);
    let has_sse = simd.contains(x86::simd::SSE);

    // XSAVE supported and enabled by the OS
    if basic_ecx & 0x0C00_0000 != 0x0C00_0000 {
        if has_fpu {
            system.insert(x86::system::FPU);
        }
        if has_sse {
            system.insert(x86::system::XMM);
        }
        return;
    }

    let valid_bits = if max_base >= 0xD {
        let leaf = source.cpuid(0xD, 0);
        (u64::from(leaf.edx) << 32) | u64::from(leaf.eax)
    } else {
        0
    };
    let xcr0 = source.xcr0();
    let enabled = valid_bits & xcr0;

    if has_fpu && (valid_bits & 0x1 == 0 || xcr0 & 0x1 != 0) {
        system.insert(x86::system::FPU);
    }
    if has_sse && (valid_bits & 0x2 == 0 || xcr0 & 0x2 != 0) {
        system.insert(x86::system::XMM);
    }
    if simd.contains(x86::simd::AVX) && enabled & 0x6 == 0x6 {
        system.insert(x86::system::YMM);
    }
    if simd.contains(x86::simd::AVX512F) && enabled & 0xE6 == 0xE6 {
        system.insert(x86::system::ZMM);
    }
    if isa.contains(x86::isa::MPX) && enabled & 0x18 == 0x18 {
        system.insert(x86::system::BND);
    }
}

const AMD_L2_ASSOCIATIVITY: [u32; 16] = [0, 1, 2, 0, 4, 0, 8, 0, 16, 0, 32, 48, 64, 96, 128, FULLY_ASSOCIATIVE];

fn decode_cache<S: CpuidSource + ?Sized>(source: &S, vendor: Vendor, max_base: u32, max_extended: u32) -> CacheInfo {
    let mut cache = CacheInfo::default();

    if max_base >= 4 {
        for subleaf in 0..16 {
            let leaf = source.cpuid(4, subleaf);
            let cache_type = leaf.eax & 0x1F;
            if cache_type == 0 {
                break;
            }
            let level = (leaf.eax >> 5) & 0x7;
            let ways = 1 + (leaf.ebx >> 22);
            let partitions = 1 + ((leaf.ebx >> 12) & 0x3FF);
            let line_size = 1 + (leaf.ebx & 0xFFF);
            let sets = 1 + leaf.ecx;
            let associativity = if leaf.eax & 0x200 != 0 { FULLY_ASSOCIATIVE } else { ways };
            let size = ways
                .saturating_mul(partitions)
                .saturating_mul(line_size)
                .saturating_mul(sets);
            let entry = CacheLevel::new(size, line_size, associativity);

            match (level, cache_type) {
                (1, 1) => cache.l1d = entry,
                (1, 2) => cache.l1i = entry,
                (1, 3) => {
                    cache.l1d = entry;
                    cache.l1i = entry;
                }
                (2, 3) => cache.l2 = entry,
                (3, 3) => cache.l3 = entry,
                _ => {}
            }
        }
    }

    if vendor == Vendor::Amd && max_extended >= 0x8000_0005 {
        let leaf = source.cpuid(0x8000_0005, 0);
        cache.l1d = amd_l1_cache(leaf.ecx);
        cache.l1i = amd_l1_cache(leaf.edx);
    }

    if max_extended >= 0x8000_0006 {
        let leaf = source.cpuid(0x8000_0006, 0);
        if vendor != Vendor::Intel || !cache.l2.is_known() {
            let size = ((leaf.ecx >> 16) & 0xFFFF) * 1024;
            if size != 0 {
                cache.l2 = CacheLevel::new(
                    size,
                    leaf.ecx & 0xFF,
                    AMD_L2_ASSOCIATIVITY[((leaf.ecx >> 12) & 0xF) as usize],
                );
            }
        }
        if vendor == Vendor::Amd {
            let size = (leaf.edx >> 18).saturating_mul(512 * 1024);
            if size != 0 {
                cache.l3 = CacheLevel::new(
                    size,
                    leaf.edx & 0xFF,
                    AMD_L2_ASSOCIATIVITY[((leaf.edx >> 12) & 0xF) as usize],
                );
            }
        }
    }

    cache
}

fn amd_l1_cache(register: u32) -> CacheLevel {
    let associativity = match (register >> 16) & 0xFF {
        0xFF => FULLY_ASSOCIATIVE,
        ways => ways,
    };
    CacheLevel::new((register >> 24) * 1024, register & 0xFF, associativity)
}

fn decode_brand<S: CpuidSource + ?Sized>(source: &S, max_extended: u32) -> Option<String> {
    if max_extended < 0x8000_0004 {
        return None;
    }
    let mut raw = Vec::with_capacity(48);
    for leaf in 0x8000_0002..=0x8000_0004 {
        let regs = source.cpuid(leaf, 0);
        for value in [regs.eax, regs.ebx, regs.ecx, regs.edx] {
            raw.extend_from_slice(&value.to_le_bytes());
        }
    }
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = String::from_utf8_lossy(&raw[..end]);
    let brand = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!brand.is_empty()).then_some(brand)
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use std::collections::HashMap;

    /// CPUID answers recorded from a real processor
    #[derive(Debug, Clone, Default)]
    pub struct RecordedCpuid {
        leaves: HashMap<(u32, u32), CpuidRegisters>,
        xcr0: u64,
    }

    impl RecordedCpuid {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn leaf(mut self, leaf: u32, subleaf: u32, regs: [u32; 4]) -> Self {
            self.leaves
                .insert((leaf, subleaf), CpuidRegisters::new(regs[0], regs[1], regs[2], regs[3]));
            self
        }

        pub fn vendor(self, name: &[u8; 12], max_base: u32) -> Self {
            let word = |i: usize| u32::from_le_bytes([name[i], name[i + 1], name[i + 2], name[i + 3]]);
            self.leaf(0, 0, [max_base, word(0), word(8), word(4)])
        }

        pub fn brand(mut self, text: &str) -> Self {
            let mut bytes = [0u8; 48];
            bytes[..text.len()].copy_from_slice(text.as_bytes());
            let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
            for (n, leaf) in (0x8000_0002u32..=0x8000_0004).enumerate() {
                let base = n * 16;
                self = self.leaf(leaf, 0, [word(base), word(base + 4), word(base + 8), word(base + 12)]);
            }
            self
        }

        pub fn with_xcr0(mut self, xcr0: u64) -> Self {
            self.xcr0 = xcr0;
            self
        }

        /// Intel Core i7-4770 (Haswell) with AVX state enabled by the OS
        pub fn haswell() -> Self {
            Self::new()
                .vendor(b"GenuineIntel", 0xD)
                .leaf(1, 0, [0x0003_06C3, 0x0110_0800, 0x7FFA_FBFF, 0xBFEB_FBFF])
                .leaf(4, 0, [0x1C00_4121, 0x01C0_003F, 0x0000_003F, 0])
                .leaf(4, 1, [0x1C00_4122, 0x01C0_003F, 0x0000_003F, 0])
                .leaf(4, 2, [0x1C00_4143, 0x01C0_003F, 0x0000_01FF, 0])
                .leaf(4, 3, [0x1C03_C163, 0x03C0_003F, 0x0000_1FFF, 0x6])
                .leaf(7, 0, [0, 0x0000_27AB, 0, 0])
                .leaf(0xD, 0, [0x7, 0x340, 0x340, 0])
                .leaf(0x8000_0000, 0, [0x8000_0008, 0, 0, 0])
                .leaf(0x8000_0001, 0, [0, 0, 0x21, 0x2C10_0800])
                .leaf(0x8000_0006, 0, [0, 0, 0x0100_6040, 0])
                .brand("       Intel(R) Core(TM) i7-4770 CPU @ 3.40GHz")
                .with_xcr0(0x7)
        }

        /// AMD FX-8350 (Piledriver)
        pub fn piledriver() -> Self {
            Self::new()
                .vendor(b"AuthenticAMD", 0xD)
                .leaf(1, 0, [0x0060_0F20, 0x0008_0800, 0x3E98_3203, 0x178B_FBFF])
                .leaf(7, 0, [0, 0x8, 0, 0])
                .leaf(0xD, 0, [0x4000_0007, 0x3C0, 0x3C0, 0])
                .leaf(0x8000_0000, 0, [0x8000_001E, 0, 0, 0])
                .leaf(0x8000_0001, 0, [0x0060_0F20, 0x1000_0000, 0x01EB_BFFF, 0x2FD3_FBFF])
                .leaf(0x8000_0005, 0, [0, 0, 0x1004_0140, 0x4002_0140])
                .leaf(0x8000_0006, 0, [0, 0, 0x0800_8140, 0x0040_6140])
                .brand("AMD FX(tm)-8350 Eight-Core Processor")
                .with_xcr0(0x7)
        }
    }

    impl CpuidSource for RecordedCpuid {
        fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegisters {
            self.leaves.get(&(leaf, subleaf)).copied().unwrap_or_default()
        }

        fn xcr0(&self) -> u64 {
            self.xcr0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::RecordedCpuid;
    use super::*;

    #[test]
    fn test_vendor_strings() {
        assert_eq!(vendor_from_string(b"GenuineIntel"), Vendor::Intel);
        assert_eq!(vendor_from_string(b"AMDisbetter!"), Vendor::Amd);
        assert_eq!(vendor_from_string(b"VIA VIA VIA "), Vendor::Via);
        assert_eq!(vendor_from_string(b"Geode by NSC"), Vendor::Nsc);
        assert_eq!(vendor_from_string(b"Vortex86 SoC"), Vendor::Dmp);
        assert_eq!(vendor_from_string(b"HygonGenuine"), Vendor::Unknown);
    }

    #[test]
    fn test_signature_decode() {
        // Family 6, extended model 3, base model C, stepping 3
        let model = ModelInfo::from_signature(0x0003_06C3);
        assert_eq!(model.family, 6);
        assert_eq!(model.model, 0x3C);
        assert_eq!(model.stepping, 3);

        // AMD family 15h adds the extended family
        let model = ModelInfo::from_signature(0x0060_0F20);
        assert_eq!(model.family, 0x15);
        assert_eq!(model.model, 0x02);
    }

    #[test]
    fn test_legacy_cores_need_protected_mode() {
        let p6 = ModelInfo::from_signature(0x0000_0686);
        assert_eq!(decode_microarchitecture(Vendor::Intel, &p6, false), Microarchitecture::P6);
        assert_eq!(decode_microarchitecture(Vendor::Intel, &p6, true), Microarchitecture::Unknown);

        let k7 = ModelInfo::from_signature(0x0000_0662);
        assert_eq!(decode_microarchitecture(Vendor::Amd, &k7, false), Microarchitecture::K7);
        assert_eq!(decode_microarchitecture(Vendor::Amd, &k7, true), Microarchitecture::Unknown);
    }

    #[test]
    fn test_bulldozer_family_by_extended_model() {
        let steamroller = ModelInfo::from_signature(0x0063_0F01);
        assert_eq!(
            decode_microarchitecture(Vendor::Amd, &steamroller, true),
            Microarchitecture::Steamroller
        );
        let piledriver = ModelInfo::from_signature(0x0061_0F01);
        assert_eq!(decode_microarchitecture(Vendor::Amd, &piledriver, true), Microarchitecture::Piledriver);
    }

    #[test]
    fn test_haswell_decode() {
        let decoded = decode(&RecordedCpuid::haswell(), true);
        assert_eq!(decoded.vendor, Vendor::Intel);
        assert_eq!(decoded.microarchitecture, Microarchitecture::Haswell);

        for feature in [x86::isa::CPUID, x86::isa::X64, x86::isa::POPCNT, x86::isa::BMI2, x86::isa::MOVBE] {
            assert!(decoded.isa.contains(feature), "missing {feature}");
        }
        assert!(!decoded.isa.contains(x86::isa::TBM));
        for feature in [x86::simd::SSE4_2, x86::simd::AVX, x86::simd::AVX2, x86::simd::FMA3, x86::simd::F16C] {
            assert!(decoded.simd.contains(feature), "missing {feature}");
        }
        assert!(!decoded.simd.contains(x86::simd::AVX512F));
        assert!(!decoded.simd.contains(x86::simd::FMA4));

        assert!(decoded.system.contains(x86::system::YMM));
        assert!(!decoded.system.contains(x86::system::ZMM));
        assert!(decoded.system.contains(generic::system::ADDRESS_SPACE_64BIT));
        assert!(decoded.system.contains(generic::system::CYCLE_COUNTER));

        assert_eq!(decoded.cache.l1d, CacheLevel::new(32 * 1024, 64, 8));
        assert_eq!(decoded.cache.l2.size, 256 * 1024);
        assert_eq!(decoded.cache.l3.size, 8 * 1024 * 1024);
        assert_eq!(decoded.brand.as_deref(), Some("Intel(R) Core(TM) i7-4770 CPU @ 3.40GHz"));
    }

    #[test]
    fn test_ymm_requires_os_support() {
        let decoded = decode(&RecordedCpuid::haswell().with_xcr0(0x3), true);
        assert!(decoded.simd.contains(x86::simd::AVX));
        assert!(!decoded.system.contains(x86::system::YMM));
        assert!(decoded.system.contains(x86::system::XMM));
    }

    #[test]
    fn test_piledriver_decode() {
        let decoded = decode(&RecordedCpuid::piledriver(), true);
        assert_eq!(decoded.vendor, Vendor::Amd);
        assert_eq!(decoded.microarchitecture, Microarchitecture::Piledriver);
        for feature in [x86::simd::FMA4, x86::simd::XOP, x86::simd::SSE4A, x86::simd::FMA3] {
            assert!(decoded.simd.contains(feature), "missing {feature}");
        }
        assert!(decoded.isa.contains(x86::isa::TBM));
        assert!(decoded.isa.contains(x86::isa::LWP));
        assert!(decoded.system.contains(x86::system::MISALIGNED_SSE));

        assert_eq!(decoded.cache.l1d, CacheLevel::new(16 * 1024, 64, 4));
        assert_eq!(decoded.cache.l1i, CacheLevel::new(64 * 1024, 64, 2));
        assert_eq!(decoded.cache.l2, CacheLevel::new(2048 * 1024, 64, 16));
        assert_eq!(decoded.cache.l3.size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_protected_mode_reads_cpuid_bits() {
        // Pentium MMX: FPU, TSC, CX8, MMX but no CMOV or SSE
        let source = RecordedCpuid::new()
            .vendor(b"GenuineIntel", 1)
            .leaf(1, 0, [0x0000_0543, 0, 0, 0x0080_0111]);
        let decoded = decode(&source, false);
        assert_eq!(decoded.microarchitecture, Microarchitecture::P5);
        assert!(decoded.isa.contains(x86::isa::RDTSC));
        assert!(decoded.isa.contains(x86::isa::CMPXCHG8B));
        assert!(!decoded.isa.contains(x86::isa::CMOV));
        assert!(decoded.simd.contains(x86::simd::MMX));
        assert!(!decoded.simd.contains(x86::simd::SSE));
        assert!(!decoded.system.contains(generic::system::ADDRESS_SPACE_64BIT));
        // No XSAVE: legacy register files are always saved
        assert!(decoded.system.contains(x86::system::FPU));
        assert!(!decoded.system.contains(x86::system::XMM));
        assert_eq!(decoded.brand, None);
    }

    #[test]
    fn test_padlock_units() {
        let source = RecordedCpuid::new()
            .vendor(b"CentaurHauls", 1)
            .leaf(0xC000_0000, 0, [0xC000_0001, 0, 0, 0])
            .leaf(0xC000_0001, 0, [0, 0, 0, 0x0000_00CC]);
        let decoded = decode(&source, true);
        assert_eq!(decoded.vendor, Vendor::Via);
        assert!(decoded.isa.contains(x86::isa::RNG));
        assert!(decoded.system.contains(x86::system::RNG));
        assert!(decoded.isa.contains(x86::isa::ACE));
        assert!(decoded.system.contains(x86::system::ACE));
        assert!(!decoded.isa.contains(x86::isa::PHE));
    }

    #[test]
    fn test_padlock_enable_without_unit() {
        // RNG enable bit alone, PHE present and enabled
        let source = RecordedCpuid::new()
            .vendor(b"CentaurHauls", 1)
            .leaf(0xC000_0000, 0, [0xC000_0001, 0, 0, 0])
            .leaf(0xC000_0001, 0, [0, 0, 0, 0x0000_0C08]);
        let decoded = decode(&source, true);
        assert!(!decoded.isa.contains(x86::isa::RNG));
        assert!(!decoded.system.contains(x86::system::RNG));
        assert!(decoded.isa.contains(x86::isa::PHE));
        assert!(decoded.system.contains(x86::system::PHE));
    }

    #[test]
    fn test_empty_source() {
        let decoded = decode(&RecordedCpuid::new(), true);
        assert_eq!(decoded.vendor, Vendor::Unknown);
        assert_eq!(decoded.microarchitecture, Microarchitecture::Unknown);
        // Baseline guaranteed by long mode
        assert!(decoded.simd.contains(x86::simd::SSE2));
        assert!(decoded.isa.contains(x86::isa::CPUID));
        assert_eq!(decoded.cache, CacheInfo::default());
    }
}
