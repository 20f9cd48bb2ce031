//! ARM features

/// ARM instruction set versions, modes and floating-point extensions
pub mod isa {
    feature_table! { Isa, Arm;
        V4 = 0 => "V4", "ARMv4 instruction set";
        V5 = 1 => "V5", "ARMv5 instruction set";
        V5E = 2 => "V5E", "ARMv5 DSP instructions";
        V6 = 3 => "V6", "ARMv6 instruction set";
        V6K = 4 => "V6K", "ARMv6 Multiprocessing extensions";
        V7 = 5 => "V7", "ARMv7 instruction set";
        V7MP = 6 => "V7MP", "ARMv7 Multiprocessing extensions";
        THUMB = 7 => "Thumb", "Thumb mode";
        THUMB2 = 8 => "Thumb2", "Thumb-2 mode";
        THUMB_EE = 9 => "ThumbEE", "Thumb EE mode";
        JAZELLE = 10 => "Jazelle", "Jazelle extension";
        FPA = 11 => "FPA", "FPA instruction set";
        VFP = 12 => "VFP", "VFP instruction set";
        VFP2 = 13 => "VFP2", "VFPv2 instruction set";
        VFP3 = 14 => "VFP3", "VFPv3 instruction set";
        /// VFP with all 32 double-precision registers
        VFP_D32 = 15 => "VFPd32", "VFP with 32 DP registers";
        VFP3_HP = 16 => "VFP3HP", "VFPv3 half-precision extension";
        VFP4 = 17 => "VFP4", "VFPv4 instruction set";
        DIV = 18 => "Div", "SDIV and UDIV instructions";
        ARMADA = 19 => "Armada", "Marvell Armada instruction extensions";
    }
}

/// ARM SIMD extensions
pub mod simd {
    feature_table! { Simd, Arm;
        XSCALE = 0 => "XScale", "XScale instructions";
        WMMX = 1 => "WMMX", "Wireless MMX instruction set";
        WMMX2 = 2 => "WMMX2", "Wireless MMX 2 instruction set";
        NEON = 3 => "NEON", "NEON (Advanced SIMD) instruction set";
        NEON_HP = 4 => "NEONHP", "NEON (Advanced SIMD) half-precision extension";
        NEON2 = 5 => "NEON2", "NEON (Advanced SIMD) v2 instruction set";
    }
}

/// ARM register-file and OS support features
pub mod system {
    feature_table! { System, Arm;
        VFP_VECTOR_MODE = 32 => "VFPVectorMode", "Hardware VFP vector mode";
        FPA = 56 => "FPA", "FPA registers";
        WMMX = 57 => "WMMX", "WMMX registers";
        /// 32 single-precision VFP registers
        S32 = 58 => "S32", "32 VFP S registers";
        /// 32 double-precision VFP registers
        D32 = 59 => "D32", "32 VFP D registers";
    }
}
