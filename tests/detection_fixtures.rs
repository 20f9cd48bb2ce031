//! Detection driven by recorded processor data
//!
//! CPUID register dumps and `/proc/cpuinfo` files from real machines are fed
//! through the decoders, and the resulting descriptions are checked end to end
//! including dispatch.

use cpu_capabilities::engines::dispatch::{dispatch_list_for, select_function_with, DispatchAbi};
use cpu_capabilities::engines::probe::linux::{count_logical_cores, ProcCpuInfo};
use cpu_capabilities::engines::probe::x86::{CpuidRegisters, CpuidSource};
use cpu_capabilities::engines::probe::{arm, mips, x86 as x86_probe, HostProbe, PlatformProbe};
use cpu_capabilities::features::{arm as arm_features, generic, mips as mips_features, x86};
use cpu_capabilities::{
    Architecture, CpuDescription, DetectionConfig, FunctionDescriptor, Microarchitecture, ProbeSnapshot, Vendor,
};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

struct Dump {
    leaves: HashMap<(u32, u32), CpuidRegisters>,
    xcr0: u64,
}

impl CpuidSource for Dump {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidRegisters {
        self.leaves.get(&(leaf, subleaf)).copied().unwrap_or_default()
    }

    fn xcr0(&self) -> u64 {
        self.xcr0
    }
}

/// Core i7-4770
fn haswell_dump(xcr0: u64) -> Dump {
    let leaves = [
        ((0, 0), [0xD, 0x756E_6547, 0x6C65_746E, 0x4965_6E69]),
        ((1, 0), [0x0003_06C3, 0x0110_0800, 0x7FFA_FBFF, 0xBFEB_FBFF]),
        ((7, 0), [0, 0x0000_27AB, 0, 0]),
        ((0xD, 0), [0x7, 0x340, 0x340, 0]),
        ((0x8000_0000, 0), [0x8000_0008, 0, 0, 0]),
        ((0x8000_0001, 0), [0, 0, 0x21, 0x2C10_0800]),
    ];
    Dump {
        leaves: leaves
            .into_iter()
            .map(|(key, [a, b, c, d])| (key, CpuidRegisters::new(a, b, c, d)))
            .collect(),
        xcr0,
    }
}

fn quiet() -> DetectionConfig {
    DetectionConfig {
        log_summary: false,
        ..DetectionConfig::default()
    }
}

fn snapshot_from_x86(decoded: &x86_probe::X86Decode) -> ProbeSnapshot {
    ProbeSnapshot::new(Architecture::X86)
        .with_vendor(decoded.vendor)
        .with_microarchitecture(decoded.microarchitecture)
        .with_isa(decoded.isa)
        .with_simd(decoded.simd)
        .with_system(decoded.system)
        .with_cache(decoded.cache)
}

type Kernel = fn() -> &'static str;

fn tuned() -> &'static str {
    "haswell"
}
fn avx() -> &'static str {
    "avx2"
}
fn neon() -> &'static str {
    "neon"
}
fn fallback() -> &'static str {
    "scalar"
}

const KERNELS: &[FunctionDescriptor<Kernel>] = &[
    FunctionDescriptor::new(tuned as Kernel, Microarchitecture::Haswell)
        .requires(x86::simd::AVX2)
        .requires(x86::isa::BMI2)
        .requires(x86::system::YMM),
    FunctionDescriptor::new(avx as Kernel, Microarchitecture::Unknown)
        .requires(x86::simd::AVX2)
        .requires(x86::system::YMM),
    FunctionDescriptor::new(neon as Kernel, Microarchitecture::CortexA9).requires(arm_features::simd::NEON),
    FunctionDescriptor::default_implementation(fallback as Kernel),
];

#[test]
fn test_haswell_dump_selects_tuned_kernel() {
    let decoded = x86_probe::decode(&haswell_dump(0x7), true);
    let description = CpuDescription::detect(&snapshot_from_x86(&decoded), &quiet());

    assert_eq!(description.vendor(), Vendor::Intel);
    assert_eq!(description.microarchitecture(), Microarchitecture::Haswell);
    assert!(description.is_supported(x86::simd::AVX2));
    assert!(description.is_supported(x86::system::YMM));
    assert!(!description.is_supported(arm_features::simd::NEON));

    let list = dispatch_list_for(DispatchAbi::X64, description.microarchitecture());
    let chosen = select_function_with(KERNELS, &description, list).unwrap();
    assert_eq!((chosen.function)(), "haswell");
}

#[test]
fn test_haswell_without_os_avx_state() {
    // OS saves only x87 and SSE state
    let decoded = x86_probe::decode(&haswell_dump(0x3), true);
    let description = CpuDescription::detect(&snapshot_from_x86(&decoded), &quiet());

    assert!(description.is_supported(x86::simd::AVX2));
    assert!(!description.is_supported(x86::system::YMM));

    let list = dispatch_list_for(DispatchAbi::X64, description.microarchitecture());
    let chosen = select_function_with(KERNELS, &description, list).unwrap();
    assert_eq!((chosen.function)(), "scalar");
}

#[test]
fn test_disabled_feature_forces_fallback() {
    let decoded = x86_probe::decode(&haswell_dump(0x7), true);
    let config = quiet().with_disabled(["AVX2"]);
    let description = CpuDescription::detect(&snapshot_from_x86(&decoded), &config);

    assert!(!description.is_supported(x86::simd::AVX2));
    assert!(description.is_supported(x86::simd::AVX));

    let list = dispatch_list_for(DispatchAbi::X64, description.microarchitecture());
    let chosen = select_function_with(KERNELS, &description, list).unwrap();
    assert_eq!((chosen.function)(), "scalar");
}

const PANDABOARD: &str = "Processor\t: ARMv7 Processor rev 10 (v7l)\n\
processor\t: 0\n\
BogoMIPS\t: 1592.52\n\
processor\t: 1\n\
BogoMIPS\t: 1592.52\n\
Features\t: swp half thumb fastmult vfp edsp thumbee neon vfpv3 tls\n\
CPU implementer\t: 0x41\n\
CPU architecture: 7\n\
CPU variant\t: 0x1\n\
CPU part\t: 0xc09\n\
CPU revision\t: 0\n\
\n\
Hardware\t: OMAP4 Panda board\n";

/// Fake procfs and sysfs trees for one machine
fn machine(cpuinfo: &str, cores: usize) -> (TempDir, DetectionConfig) {
    let root = TempDir::new().unwrap();
    let cpuinfo_path = root.path().join("cpuinfo");
    fs::write(&cpuinfo_path, cpuinfo).unwrap();

    let sysfs = root.path().join("cpu");
    for n in 0..cores {
        fs::create_dir_all(sysfs.join(format!("cpu{n}"))).unwrap();
    }
    // Entries that are not processors
    fs::create_dir_all(sysfs.join("cpufreq")).unwrap();
    fs::create_dir_all(sysfs.join("cpuidle")).unwrap();
    fs::write(sysfs.join("online"), "0-1\n").unwrap();

    let config = DetectionConfig {
        cpuinfo_path,
        sysfs_cpu_dir: sysfs,
        ..quiet()
    };
    (root, config)
}

#[test]
fn test_pandaboard_files() {
    let (_root, config) = machine(PANDABOARD, 2);

    let info = ProcCpuInfo::read(&config.cpuinfo_path).unwrap();
    let cores = count_logical_cores(&config.sysfs_cpu_dir).unwrap();
    assert_eq!(cores, 2);
    assert_eq!(info.processor_count(), 2);

    let decoded = arm::decode(&info, cores);
    let probe = ProbeSnapshot::new(Architecture::Arm)
        .with_vendor(decoded.vendor)
        .with_microarchitecture(decoded.microarchitecture)
        .with_isa(decoded.isa)
        .with_simd(decoded.simd)
        .with_system(decoded.system)
        .with_logical_cores(cores)
        .with_cpu_name(info.model_name().unwrap_or_default());
    let description = CpuDescription::detect(&probe, &config);

    assert_eq!(description.vendor(), Vendor::Arm);
    assert_eq!(description.microarchitecture(), Microarchitecture::CortexA9);
    assert_eq!(description.name(), Some("ARMv7 Processor rev 10 (v7l)"));
    assert!(description.is_supported(arm_features::simd::NEON));
    assert!(description.is_supported(arm_features::isa::V7));
    assert!(description.is_supported(generic::system::MISALIGNED_ACCESS));
    assert!(!description.is_supported(x86::simd::SSE2));

    let list = dispatch_list_for(DispatchAbi::Arm, description.microarchitecture());
    let chosen = select_function_with(KERNELS, &description, list).unwrap();
    assert_eq!((chosen.function)(), "neon");
}

const JZ4780: &str = "system type\t\t: JZ4780\n\
processor\t\t: 0\n\
cpu model\t\t: Ingenic JZRISC V4.15  FPU V0.1\n\
BogoMIPS\t\t: 1196.85\n\
isa\t\t\t: mips1 mips2 mips32r1 mips32r2\n\
ASEs implemented\t:\n\
processor\t\t: 1\n\
cpu model\t\t: Ingenic JZRISC V4.15  FPU V0.1\n\
BogoMIPS\t\t: 1196.85\n";

fn mxu_kernel() -> &'static str {
    "mxu"
}

#[test]
fn test_jz4780_files() {
    let (_root, config) = machine(JZ4780, 2);
    let info = ProcCpuInfo::read(&config.cpuinfo_path).unwrap();
    assert_eq!(info.processor_count(), 2);

    let decoded = mips::decode(&info);
    let probe = ProbeSnapshot::new(Architecture::Mips)
        .with_vendor(decoded.vendor)
        .with_microarchitecture(decoded.microarchitecture)
        .with_isa(decoded.isa)
        .with_simd(decoded.simd)
        .with_system(decoded.system)
        .with_cache(decoded.cache)
        .with_cpu_name(decoded.name.clone());
    let description = CpuDescription::detect(&probe, &config);

    assert_eq!(description.vendor(), Vendor::Ingenic);
    assert_eq!(description.microarchitecture(), Microarchitecture::XBurst);
    assert_eq!(description.name(), Some("Ingenic JZ4780"));
    assert!(description.is_supported(mips_features::isa::R2));
    assert!(description.is_supported(mips_features::isa::FPU));
    assert!(description.is_supported(mips_features::simd::MXU2));
    // Same SIMD bit as SSE, different architecture
    assert!(!description.is_supported(x86::simd::SSE));
    assert_eq!(description.cache().data_cache_size(2), Some(512 * 1024));

    let list = dispatch_list_for(DispatchAbi::Mips, description.microarchitecture());
    assert_eq!((select_function_with(KERNELS, &description, list).unwrap().function)(), "scalar");

    let tuned = [
        FunctionDescriptor::new(mxu_kernel as Kernel, Microarchitecture::XBurst).requires(mips_features::simd::MXU),
        FunctionDescriptor::default_implementation(fallback as Kernel),
    ];
    assert_eq!((select_function_with(&tuned, &description, list).unwrap().function)(), "mxu");
}

#[test]
fn test_host_probe_reads_configured_sysfs() {
    let (_root, config) = machine(PANDABOARD, 3);
    let probe = HostProbe::new(config);
    assert_eq!(probe.logical_cores().unwrap(), 3);
    assert_eq!(probe.architecture_id().unwrap(), Architecture::host().id());
}

#[test]
fn test_single_core_machine() {
    let (_root, config) = machine(PANDABOARD, 1);
    let probe = HostProbe::new(config.clone());
    let description = CpuDescription::detect(&probe, &config);
    assert_eq!(description.logical_cores(), 1);
    assert!(description.is_supported(generic::system::SINGLE_THREADED));
}

#[test]
fn test_missing_files() {
    let root = TempDir::new().unwrap();
    assert!(ProcCpuInfo::read(&root.path().join("cpuinfo")).is_err());
    assert!(count_logical_cores(&root.path().join("cpu")).is_err());
}
