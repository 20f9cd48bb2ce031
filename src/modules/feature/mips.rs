//! MIPS features

/// MIPS instruction set revisions and extensions
pub mod isa {
    feature_table! { Isa, Mips;
        MIPS_I = 0 => "MIPS_I", "MIPS I instructions";
        MIPS_II = 1 => "MIPS_II", "MIPS II instructions";
        MIPS_III = 2 => "MIPS_III", "MIPS III instructions";
        MIPS_IV = 3 => "MIPS_IV", "MIPS IV instructions";
        MIPS_V = 4 => "MIPS_V", "MIPS V instructions";
        R1 = 5 => "R1", "MIPS32/MIPS64 Release 1 instructions";
        R2 = 6 => "R2", "MIPS32/MIPS64 Release 2 instructions";
        FPU = 24 => "FPU", "FPU with S, D, and W formats";
        MIPS16 = 25 => "MIPS16", "MIPS16 extension";
        SMART_MIPS = 26 => "SmartMIPS", "SmartMIPS extension";
        MT = 27 => "MT", "Multi-threading extension";
        MICRO_MIPS = 28 => "MicroMIPS", "MicroMIPS extension";
        VZ = 29 => "VZ", "Virtualization extension";
    }
}

/// MIPS SIMD extensions
pub mod simd {
    feature_table! { Simd, Mips;
        MDMX = 0 => "MDMX", "MDMX instruction set";
        PAIRED_SINGLE = 1 => "PairedSingle", "Paired-single instructions";
        MIPS3D = 2 => "MIPS3D", "MIPS3D instruction set";
        DSP = 3 => "DSP", "MIPS DSP extension";
        DSP2 = 4 => "DSP2", "MIPS DSP Release 2 extension";
        GODSON_MMX = 5 => "GodsonMMX", "Loongson (Godson) MMX instruction set";
        MXU = 6 => "MXU", "Ingenic Media Extension";
        MXU2 = 7 => "MXU2", "Ingenic Media Extension 2";
    }
}
