//! Microarchitecture preference lists
//!
//! For a detected microarchitecture, the order in which implementations tuned
//! for other microarchitectures should be tried. The lists depend on the ABI
//! the crate is compiled for, since a 32-bit build cannot run code tuned for
//! 64-bit-only cores and vice versa.

use crate::modules::arch::Microarchitecture as M;

/// Instruction set ABI that selects a family of preference lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchAbi {
    X86,
    X64,
    Arm,
    Mips,
    Other,
}

impl DispatchAbi {
    /// ABI of the current compilation target
    pub const fn host() -> Self {
        if cfg!(target_arch = "x86") {
            DispatchAbi::X86
        } else if cfg!(target_arch = "x86_64") {
            DispatchAbi::X64
        } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            DispatchAbi::Arm
        } else if cfg!(any(target_arch = "mips", target_arch = "mips64")) {
            DispatchAbi::Mips
        } else {
            DispatchAbi::Other
        }
    }
}

/// Preference list for `microarchitecture` on the host ABI
pub fn dispatch_list(microarchitecture: M) -> &'static [M] {
    dispatch_list_for(DispatchAbi::host(), microarchitecture)
}

/// Preference list for `microarchitecture` on `abi`
///
/// Every list ends with [`M::Unknown`], which matches the default
/// implementation.
pub fn dispatch_list_for(abi: DispatchAbi, microarchitecture: M) -> &'static [M] {
    let list = match abi {
        DispatchAbi::X86 => x86_list(microarchitecture),
        DispatchAbi::X64 => x64_list(microarchitecture),
        DispatchAbi::Arm => arm_list(microarchitecture),
        DispatchAbi::Mips => mips_list(microarchitecture),
        DispatchAbi::Other => None,
    };
    list.unwrap_or(DEFAULT_ONLY)
}

const DEFAULT_ONLY: &[M] = &[M::Unknown];

fn x86_list(uarch: M) -> Option<&'static [M]> {
    let list: &'static [M] = match uarch {
        M::P5 => &[M::P5, M::K5, M::KnightsFerry, M::KnightsCorner, M::Unknown],
        M::P6 => &[M::P6, M::Dothan, M::K7, M::K6, M::Yonah, M::Conroe, M::Penryn, M::Unknown],
        M::Willamette => &[M::Willamette, M::Prescott, M::Yonah, M::Unknown],
        M::Prescott => &[M::Prescott, M::Willamette, M::Yonah, M::Unknown],
        M::Dothan => &[M::Dothan, M::P6, M::Yonah, M::Conroe, M::Penryn, M::Unknown],
        M::Yonah => &[M::Yonah, M::Conroe, M::Penryn, M::Dothan, M::P6, M::Unknown],
        M::Conroe => &[M::Conroe, M::Penryn, M::Nehalem, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::Penryn => &[M::Penryn, M::Conroe, M::Nehalem, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::Bonnell => &[M::Bonnell, M::Saltwell, M::Unknown],
        M::Nehalem => &[M::Nehalem, M::Penryn, M::Conroe, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::SandyBridge => &[M::SandyBridge, M::Nehalem, M::Penryn, M::Conroe, M::IvyBridge, M::Unknown],
        M::Saltwell => &[M::Saltwell, M::Bonnell, M::Unknown],
        M::IvyBridge => &[M::IvyBridge, M::SandyBridge, M::Nehalem, M::Penryn, M::Conroe, M::Unknown],
        M::Haswell => &[
            M::Haswell,
            M::IvyBridge,
            M::SandyBridge,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Unknown,
        ],
        M::Silvermont => &[M::Silvermont, M::Bobcat, M::Nehalem, M::Unknown],
        M::KnightsFerry => &[M::KnightsFerry, M::KnightsCorner, M::P5, M::Unknown],
        M::KnightsCorner => &[M::KnightsCorner, M::KnightsFerry, M::P5, M::Unknown],
        M::K5 => &[M::K5, M::Unknown],
        M::K6 => &[M::K6, M::Unknown],
        M::Geode => &[M::Geode, M::Unknown],
        M::K7 => &[M::K7, M::Unknown],
        M::K8 => &[M::K8, M::Nehalem, M::Unknown],
        M::K10 => &[M::K10, M::Nehalem, M::Unknown],
        M::Bobcat => &[M::Bobcat, M::Nehalem, M::Unknown],
        M::Bulldozer => &[M::Bulldozer, M::Nehalem, M::Unknown],
        M::Piledriver => &[M::Piledriver, M::Nehalem, M::Unknown],
        M::Jaguar => &[M::Jaguar, M::Nehalem, M::Unknown],
        M::Steamroller => &[M::Steamroller, M::Nehalem, M::Unknown],
        _ => return None,
    };
    Some(list)
}

fn x64_list(uarch: M) -> Option<&'static [M]> {
    let list: &'static [M] = match uarch {
        M::Prescott => &[M::Prescott, M::Unknown],
        M::Conroe => &[M::Conroe, M::Penryn, M::Nehalem, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::Penryn => &[M::Penryn, M::Conroe, M::Nehalem, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::Bonnell => &[M::Bonnell, M::Saltwell, M::Unknown],
        M::Nehalem => &[M::Nehalem, M::Penryn, M::Conroe, M::SandyBridge, M::IvyBridge, M::Unknown],
        M::SandyBridge => &[
            M::SandyBridge,
            M::IvyBridge,
            M::Haswell,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Unknown,
        ],
        M::Saltwell => &[M::Saltwell, M::Bonnell, M::Unknown],
        M::IvyBridge => &[
            M::IvyBridge,
            M::SandyBridge,
            M::Steamroller,
            M::Haswell,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Unknown,
        ],
        M::Haswell => &[
            M::Haswell,
            M::IvyBridge,
            M::SandyBridge,
            M::Piledriver,
            M::Bulldozer,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Unknown,
        ],
        M::Silvermont => &[M::Silvermont, M::Bobcat, M::Nehalem, M::Unknown],
        M::KnightsFerry => &[M::KnightsFerry, M::Unknown],
        M::KnightsCorner => &[M::KnightsCorner, M::Unknown],
        M::K8 => &[
            M::K8,
            M::Bobcat,
            M::Bonnell,
            M::K10,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Prescott,
            M::Unknown,
        ],
        M::K10 => &[
            M::K10,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::Bonnell,
            M::Silvermont,
            M::Jaguar,
            M::K8,
            M::Bobcat,
            M::Prescott,
            M::Unknown,
        ],
        M::Bobcat => &[M::Bobcat, M::Jaguar, M::Nehalem, M::Unknown],
        M::Bulldozer => &[
            M::Bulldozer,
            M::Piledriver,
            M::Steamroller,
            M::IvyBridge,
            M::SandyBridge,
            M::Haswell,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::K10,
            M::Unknown,
        ],
        M::Piledriver => &[
            M::Piledriver,
            M::Steamroller,
            M::Bulldozer,
            M::Haswell,
            M::IvyBridge,
            M::SandyBridge,
            M::Nehalem,
            M::Penryn,
            M::Conroe,
            M::K10,
            M::Unknown,
        ],
        M::Jaguar => &[M::Jaguar, M::Bobcat, M::Nehalem, M::Unknown],
        M::Steamroller => &[
            M::Steamroller,
            M::Haswell,
            M::Piledriver,
            M::Bulldozer,
            M::IvyBridge,
            M::SandyBridge,
            M::Nehalem,
            M::Unknown,
        ],
        _ => return None,
    };
    Some(list)
}

fn arm_list(uarch: M) -> Option<&'static [M]> {
    let list: &'static [M] = match uarch {
        M::StrongArm => &[M::StrongArm, M::Unknown],
        M::XScale => &[M::XScale, M::Arm9, M::Unknown],
        M::Arm7 => &[M::Arm7, M::Unknown],
        M::Arm9 => &[M::Arm9, M::Unknown],
        M::Arm11 => &[M::Arm11, M::Arm9, M::Unknown],
        M::CortexA5 => &[
            M::CortexA5,
            M::CortexA7,
            M::CortexA8,
            M::Scorpion,
            M::CortexA9,
            M::Krait,
            M::CortexA15,
            M::Arm11,
            M::Unknown,
        ],
        M::CortexA7 => &[
            M::CortexA7,
            M::CortexA9,
            M::CortexA8,
            M::Scorpion,
            M::Krait,
            M::CortexA15,
            M::CortexA5,
            M::Arm11,
            M::Unknown,
        ],
        M::CortexA8 => &[
            M::CortexA8,
            M::CortexA5,
            M::CortexA7,
            M::CortexA9,
            M::Scorpion,
            M::Krait,
            M::CortexA15,
            M::Arm11,
            M::Unknown,
        ],
        M::CortexA9 => &[
            M::CortexA9,
            M::CortexA7,
            M::CortexA8,
            M::Scorpion,
            M::Krait,
            M::CortexA15,
            M::CortexA5,
            M::Arm11,
            M::Unknown,
        ],
        M::CortexA15 => &[
            M::CortexA15,
            M::Krait,
            M::Scorpion,
            M::CortexA7,
            M::CortexA9,
            M::CortexA8,
            M::CortexA5,
            M::Arm11,
            M::Unknown,
        ],
        M::Scorpion => &[
            M::Scorpion,
            M::Krait,
            M::CortexA15,
            M::CortexA9,
            M::CortexA8,
            M::CortexA7,
            M::CortexA5,
            M::Arm11,
            M::Unknown,
        ],
        M::Krait => &[
            M::Krait,
            M::CortexA15,
            M::Scorpion,
            M::CortexA9,
            M::CortexA7,
            M::CortexA8,
            M::CortexA5,
            M::Arm11,
            M::Unknown,
        ],
        M::Pj1 => &[M::Pj1, M::Unknown],
        M::Pj4 => &[M::Pj4, M::CortexA9, M::XScale, M::Arm11, M::Unknown],
        M::Swift => &[M::Swift, M::Unknown],
        _ => return None,
    };
    Some(list)
}

fn mips_list(uarch: M) -> Option<&'static [M]> {
    let list: &'static [M] = match uarch {
        M::Mips24K => &[M::Mips24K, M::Unknown],
        M::Mips34K => &[M::Mips34K, M::Unknown],
        M::Mips74K => &[M::Mips74K, M::Unknown],
        M::XBurst => &[M::XBurst, M::Unknown],
        M::XBurst2 => &[M::XBurst2, M::Unknown],
        _ => return None,
    };
    Some(list)
}
