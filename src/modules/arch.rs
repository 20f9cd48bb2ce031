//! Processor identity
//!
//! Architecture, vendor and microarchitecture identifiers. All three are
//! closed enumerations with stable integer ids that can be decoded from the
//! raw values a platform probe reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction set architecture family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Architecture {
    /// Not detected, or common to all architectures
    Unknown = 0,
    /// x86 and x86-64
    X86 = 1,
    /// ARM and AArch64
    Arm = 2,
    /// MIPS
    Mips = 3,
    /// PowerPC
    PowerPc = 4,
    /// Itanium
    Ia64 = 5,
    /// SPARC
    Sparc = 6,
}

impl Architecture {
    /// Every architecture, in id order
    pub const ALL: [Architecture; 7] = [
        Architecture::Unknown,
        Architecture::X86,
        Architecture::Arm,
        Architecture::Mips,
        Architecture::PowerPc,
        Architecture::Ia64,
        Architecture::Sparc,
    ];

    /// Decode a raw architecture id; unrecognized ids map to `Unknown`
    pub fn from_id(id: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|arch| arch.id() == id)
            .unwrap_or(Architecture::Unknown)
    }

    /// Integer id of the architecture
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Stable identifier string
    pub const fn short_id(self) -> &'static str {
        match self {
            Architecture::Unknown => "Unknown",
            Architecture::X86 => "x86",
            Architecture::Arm => "ARM",
            Architecture::Mips => "MIPS",
            Architecture::PowerPc => "PowerPC",
            Architecture::Ia64 => "IA64",
            Architecture::Sparc => "SPARC",
        }
    }

    /// Human-readable name
    pub const fn describe(self) -> &'static str {
        self.short_id()
    }

    /// Architecture this crate was compiled for
    pub const fn host() -> Self {
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            Architecture::X86
        } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            Architecture::Arm
        } else if cfg!(any(
            target_arch = "mips",
            target_arch = "mips64",
            target_arch = "mips32r6",
            target_arch = "mips64r6"
        )) {
            Architecture::Mips
        } else if cfg!(any(target_arch = "powerpc", target_arch = "powerpc64")) {
            Architecture::PowerPc
        } else if cfg!(any(target_arch = "sparc", target_arch = "sparc64")) {
            Architecture::Sparc
        } else {
            Architecture::Unknown
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::Unknown
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Silicon vendor
///
/// Vendor ids are partitioned by architecture family: 1-19 for x86,
/// 20-39 for ARM, 40-49 for MIPS, 50-59 for PowerPC and 60-69 for SPARC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Vendor {
    Unknown = 0,

    Intel = 1,
    Amd = 2,
    Via = 3,
    Transmeta = 4,
    Cyrix = 5,
    Rise = 6,
    Nsc = 7,
    Sis = 8,
    NexGen = 9,
    Umc = 10,
    Rdc = 11,
    Dmp = 12,

    Arm = 20,
    Marvell = 21,
    Qualcomm = 22,
    Dec = 23,
    Ti = 24,
    Apple = 25,

    Ingenic = 40,
    Ict = 41,
    Mips = 42,

    Ibm = 50,
    Motorola = 51,
    PaSemi = 52,

    Sun = 60,
    Oracle = 61,
    Fujitsu = 62,
    Mcst = 63,
}

impl Vendor {
    /// Every vendor, in id order
    pub const ALL: [Vendor; 29] = [
        Vendor::Unknown,
        Vendor::Intel,
        Vendor::Amd,
        Vendor::Via,
        Vendor::Transmeta,
        Vendor::Cyrix,
        Vendor::Rise,
        Vendor::Nsc,
        Vendor::Sis,
        Vendor::NexGen,
        Vendor::Umc,
        Vendor::Rdc,
        Vendor::Dmp,
        Vendor::Arm,
        Vendor::Marvell,
        Vendor::Qualcomm,
        Vendor::Dec,
        Vendor::Ti,
        Vendor::Apple,
        Vendor::Ingenic,
        Vendor::Ict,
        Vendor::Mips,
        Vendor::Ibm,
        Vendor::Motorola,
        Vendor::PaSemi,
        Vendor::Sun,
        Vendor::Oracle,
        Vendor::Fujitsu,
        Vendor::Mcst,
    ];

    /// Decode a raw vendor id; unrecognized ids map to `Unknown`
    pub fn from_id(id: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|vendor| vendor.id() == id)
            .unwrap_or(Vendor::Unknown)
    }

    /// Integer id of the vendor
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Architecture family implied by the id range alone
    pub const fn family(self) -> Architecture {
        match self.id() {
            1..=19 => Architecture::X86,
            20..=39 => Architecture::Arm,
            40..=49 => Architecture::Mips,
            50..=59 => Architecture::PowerPc,
            60..=69 => Architecture::Sparc,
            _ => Architecture::Unknown,
        }
    }

    /// Stable identifier string
    pub const fn short_id(self) -> &'static str {
        match self {
            Vendor::Unknown => "Unknown",
            Vendor::Intel => "Intel",
            Vendor::Amd => "AMD",
            Vendor::Via => "VIA",
            Vendor::Transmeta => "Transmeta",
            Vendor::Cyrix => "Cyrix",
            Vendor::Rise => "Rise",
            Vendor::Nsc => "NSC",
            Vendor::Sis => "SiS",
            Vendor::NexGen => "NexGen",
            Vendor::Umc => "UMC",
            Vendor::Rdc => "RDC",
            Vendor::Dmp => "DMP",
            Vendor::Arm => "ARM",
            Vendor::Marvell => "Marvell",
            Vendor::Qualcomm => "Qualcomm",
            Vendor::Dec => "DEC",
            Vendor::Ti => "TI",
            Vendor::Apple => "Apple",
            Vendor::Ingenic => "Ingenic",
            Vendor::Ict => "ICT",
            Vendor::Mips => "MIPS",
            Vendor::Ibm => "IBM",
            Vendor::Motorola => "Motorola",
            Vendor::PaSemi => "PASemi",
            Vendor::Sun => "Sun",
            Vendor::Oracle => "Oracle",
            Vendor::Fujitsu => "Fujitsu",
            Vendor::Mcst => "MCST",
        }
    }

    /// Human-readable name
    pub const fn describe(self) -> &'static str {
        match self {
            Vendor::Dmp => "DM&P",
            Vendor::PaSemi => "P.A.Semi",
            other => other.short_id(),
        }
    }
}

impl Default for Vendor {
    fn default() -> Self {
        Vendor::Unknown
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

const fn compose(arch: Architecture, vendor: Vendor, sequence: u32) -> u32 {
    ((arch as u32) << 24) | ((vendor as u32) << 16) | sequence
}

/// Processor microarchitecture
///
/// The id packs the architecture in bits 24-31, the vendor in bits 16-23
/// and a vendor-local sequence number (starting at 1) in bits 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Microarchitecture {
    Unknown = 0,

    P5 = compose(Architecture::X86, Vendor::Intel, 0x0001),
    P6 = compose(Architecture::X86, Vendor::Intel, 0x0002),
    Willamette = compose(Architecture::X86, Vendor::Intel, 0x0003),
    Prescott = compose(Architecture::X86, Vendor::Intel, 0x0004),
    Dothan = compose(Architecture::X86, Vendor::Intel, 0x0005),
    Yonah = compose(Architecture::X86, Vendor::Intel, 0x0006),
    Conroe = compose(Architecture::X86, Vendor::Intel, 0x0007),
    Penryn = compose(Architecture::X86, Vendor::Intel, 0x0008),
    Bonnell = compose(Architecture::X86, Vendor::Intel, 0x0009),
    Nehalem = compose(Architecture::X86, Vendor::Intel, 0x000A),
    SandyBridge = compose(Architecture::X86, Vendor::Intel, 0x000B),
    Saltwell = compose(Architecture::X86, Vendor::Intel, 0x000C),
    IvyBridge = compose(Architecture::X86, Vendor::Intel, 0x000D),
    Haswell = compose(Architecture::X86, Vendor::Intel, 0x000E),
    Silvermont = compose(Architecture::X86, Vendor::Intel, 0x000F),
    KnightsFerry = compose(Architecture::X86, Vendor::Intel, 0x0100),
    KnightsCorner = compose(Architecture::X86, Vendor::Intel, 0x0101),

    K5 = compose(Architecture::X86, Vendor::Amd, 0x0001),
    K6 = compose(Architecture::X86, Vendor::Amd, 0x0002),
    K7 = compose(Architecture::X86, Vendor::Amd, 0x0003),
    Geode = compose(Architecture::X86, Vendor::Amd, 0x0004),
    K8 = compose(Architecture::X86, Vendor::Amd, 0x0005),
    K10 = compose(Architecture::X86, Vendor::Amd, 0x0006),
    Bobcat = compose(Architecture::X86, Vendor::Amd, 0x0007),
    Bulldozer = compose(Architecture::X86, Vendor::Amd, 0x0008),
    Piledriver = compose(Architecture::X86, Vendor::Amd, 0x0009),
    Jaguar = compose(Architecture::X86, Vendor::Amd, 0x000A),
    Steamroller = compose(Architecture::X86, Vendor::Amd, 0x000B),

    StrongArm = compose(Architecture::Arm, Vendor::Intel, 0x0001),
    XScale = compose(Architecture::Arm, Vendor::Intel, 0x0002),

    Arm7 = compose(Architecture::Arm, Vendor::Arm, 0x0001),
    Arm9 = compose(Architecture::Arm, Vendor::Arm, 0x0002),
    Arm11 = compose(Architecture::Arm, Vendor::Arm, 0x0003),
    CortexA5 = compose(Architecture::Arm, Vendor::Arm, 0x0004),
    CortexA7 = compose(Architecture::Arm, Vendor::Arm, 0x0005),
    CortexA8 = compose(Architecture::Arm, Vendor::Arm, 0x0006),
    CortexA9 = compose(Architecture::Arm, Vendor::Arm, 0x0007),
    CortexA15 = compose(Architecture::Arm, Vendor::Arm, 0x0008),

    Scorpion = compose(Architecture::Arm, Vendor::Qualcomm, 0x0001),
    Krait = compose(Architecture::Arm, Vendor::Qualcomm, 0x0002),

    Pj1 = compose(Architecture::Arm, Vendor::Marvell, 0x0001),
    Pj4 = compose(Architecture::Arm, Vendor::Marvell, 0x0002),

    Swift = compose(Architecture::Arm, Vendor::Apple, 0x0001),

    Itanium = compose(Architecture::Ia64, Vendor::Intel, 0x0001),
    Itanium2 = compose(Architecture::Ia64, Vendor::Intel, 0x0002),

    Mips24K = compose(Architecture::Mips, Vendor::Mips, 0x0001),
    Mips34K = compose(Architecture::Mips, Vendor::Mips, 0x0002),
    Mips74K = compose(Architecture::Mips, Vendor::Mips, 0x0003),

    XBurst = compose(Architecture::Mips, Vendor::Ingenic, 0x0001),
    XBurst2 = compose(Architecture::Mips, Vendor::Ingenic, 0x0002),
}

impl Microarchitecture {
    /// Every microarchitecture, grouped by architecture and vendor
    pub const ALL: [Microarchitecture; 51] = [
        Microarchitecture::Unknown,
        Microarchitecture::P5,
        Microarchitecture::P6,
        Microarchitecture::Willamette,
        Microarchitecture::Prescott,
        Microarchitecture::Dothan,
        Microarchitecture::Yonah,
        Microarchitecture::Conroe,
        Microarchitecture::Penryn,
        Microarchitecture::Bonnell,
        Microarchitecture::Nehalem,
        Microarchitecture::SandyBridge,
        Microarchitecture::Saltwell,
        Microarchitecture::IvyBridge,
        Microarchitecture::Haswell,
        Microarchitecture::Silvermont,
        Microarchitecture::KnightsFerry,
        Microarchitecture::KnightsCorner,
        Microarchitecture::K5,
        Microarchitecture::K6,
        Microarchitecture::K7,
        Microarchitecture::Geode,
        Microarchitecture::K8,
        Microarchitecture::K10,
        Microarchitecture::Bobcat,
        Microarchitecture::Bulldozer,
        Microarchitecture::Piledriver,
        Microarchitecture::Jaguar,
        Microarchitecture::Steamroller,
        Microarchitecture::StrongArm,
        Microarchitecture::XScale,
        Microarchitecture::Arm7,
        Microarchitecture::Arm9,
        Microarchitecture::Arm11,
        Microarchitecture::CortexA5,
        Microarchitecture::CortexA7,
        Microarchitecture::CortexA8,
        Microarchitecture::CortexA9,
        Microarchitecture::CortexA15,
        Microarchitecture::Scorpion,
        Microarchitecture::Krait,
        Microarchitecture::Pj1,
        Microarchitecture::Pj4,
        Microarchitecture::Swift,
        Microarchitecture::Itanium,
        Microarchitecture::Itanium2,
        Microarchitecture::Mips24K,
        Microarchitecture::Mips34K,
        Microarchitecture::Mips74K,
        Microarchitecture::XBurst,
        Microarchitecture::XBurst2,
    ];

    /// Decode a raw microarchitecture id; unrecognized ids map to `Unknown`
    pub fn from_id(id: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|uarch| uarch.id() == id)
            .unwrap_or(Microarchitecture::Unknown)
    }

    /// Integer id of the microarchitecture
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Architecture encoded in the id
    pub fn architecture(self) -> Architecture {
        Architecture::from_id(self.id() >> 24)
    }

    /// Vendor encoded in the id
    pub fn vendor(self) -> Vendor {
        Vendor::from_id((self.id() >> 16) & 0xFF)
    }

    /// Vendor-local sequence number
    pub const fn sequence(self) -> u32 {
        self.id() & 0xFFFF
    }

    /// Stable identifier string
    pub const fn short_id(self) -> &'static str {
        self.names().0
    }

    /// Human-readable name
    pub const fn describe(self) -> &'static str {
        self.names().1
    }

    const fn names(self) -> (&'static str, &'static str) {
        use Microarchitecture::*;
        match self {
            Unknown => ("Unknown", "Unknown"),
            P5 => ("P5", "P5"),
            P6 => ("P6", "P6"),
            Willamette => ("Willamette", "Willamette"),
            Prescott => ("Prescott", "Prescott"),
            Dothan => ("Dothan", "Dothan"),
            Yonah => ("Yonah", "Yonah"),
            Conroe => ("Conroe", "Conroe"),
            Penryn => ("Penryn", "Penryn"),
            Bonnell => ("Bonnell", "Bonnell"),
            Nehalem => ("Nehalem", "Nehalem"),
            SandyBridge => ("SandyBridge", "Sandy Bridge"),
            Saltwell => ("Saltwell", "Saltwell"),
            IvyBridge => ("IvyBridge", "Ivy Bridge"),
            Haswell => ("Haswell", "Haswell"),
            Silvermont => ("Silvermont", "Silvermont"),
            KnightsFerry => ("KnightsFerry", "Knights Ferry"),
            KnightsCorner => ("KnightsCorner", "Knights Corner"),
            K5 => ("K5", "K5"),
            K6 => ("K6", "K6"),
            K7 => ("K7", "K7"),
            Geode => ("Geode", "Geode"),
            K8 => ("K8", "K8"),
            K10 => ("K10", "K10"),
            Bobcat => ("Bobcat", "Bobcat"),
            Bulldozer => ("Bulldozer", "Bulldozer"),
            Piledriver => ("Piledriver", "Piledriver"),
            Jaguar => ("Jaguar", "Jaguar"),
            Steamroller => ("Steamroller", "Steamroller"),
            StrongArm => ("StrongARM", "StrongARM"),
            XScale => ("XScale", "XScale"),
            Arm7 => ("ARM7", "ARM7"),
            Arm9 => ("ARM9", "ARM9"),
            Arm11 => ("ARM11", "ARM11"),
            CortexA5 => ("CortexA5", "Cortex-A5"),
            CortexA7 => ("CortexA7", "Cortex-A7"),
            CortexA8 => ("CortexA8", "Cortex-A8"),
            CortexA9 => ("CortexA9", "Cortex-A9"),
            CortexA15 => ("CortexA15", "Cortex-A15"),
            Scorpion => ("Scorpion", "Scorpion"),
            Krait => ("Krait", "Krait"),
            Pj1 => ("PJ1", "PJ1"),
            Pj4 => ("PJ4", "PJ4"),
            Swift => ("Swift", "Swift"),
            Itanium => ("Itanium", "Itanium"),
            Itanium2 => ("Itanium2", "Itanium 2"),
            Mips24K => ("MIPS24K", "MIPS 24K"),
            Mips34K => ("MIPS34K", "MIPS 34K"),
            Mips74K => ("MIPS74K", "MIPS 74K"),
            XBurst => ("XBurst", "XBurst"),
            XBurst2 => ("XBurst2", "XBurst 2"),
        }
    }
}

impl Default for Microarchitecture {
    fn default() -> Self {
        Microarchitecture::Unknown
    }
}

impl fmt::Display for Microarchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
