//! x86 and x86-64 features
//!
//! Codes follow the bit positions reported by the platform probe, so a
//! constant's mask can be tested directly against a detected mask.

/// Non-SIMD instruction set extensions
pub mod isa {
    feature_table! { Isa, X86;
        FPU = 0 => "FPU", "x87 FPU";
        CPUID = 1 => "Cpuid", "CPUID instruction";
        RDTSC = 2 => "Rdtsc", "RDTSC instruction";
        CMOV = 3 => "CMOV", "CMOV instruction";
        SYSENTER = 4 => "SYSENTER", "SYSENTER and SYSEXIT instructions";
        SYSCALL = 5 => "SYSCALL", "SYSCALL and SYSRET instructions";
        MSR = 6 => "MSR", "RDMSR and WRMSR instructions";
        CLFLUSH = 7 => "Clflush", "CLFLUSH instruction";
        MONITOR = 8 => "MONITOR", "MONITOR and MWAIT instructions";
        FXSAVE = 9 => "FXSAVE", "FXSAVE and FXRSTOR instructions";
        XSAVE = 10 => "XSAVE", "XSAVE, XRSTOR, XGETBV, and XSETBV instructions";
        CMPXCHG8B = 11 => "Cmpxchg8b", "CMPXCHG8B instruction";
        CMPXCHG16B = 12 => "Cmpxchg16b", "CMPXCHG16B instruction";
        X64 = 13 => "X64", "x86-64 mode";
        LAHF_SAHF64 = 14 => "LahfSahf64", "LAHF and SAHF instructions in x86-64 mode";
        FS_GS_BASE = 15 => "FsGsBase", "RDFSBASE, RDGSBASE, WRFSBASE, and WRGSBASE instructions";
        MOVBE = 16 => "Movbe", "MOVBE instruction";
        POPCNT = 17 => "Popcnt", "POPCNT instruction";
        LZCNT = 18 => "Lzcnt", "LZCNT instruction";
        BMI = 19 => "BMI", "BMI instruction set";
        BMI2 = 20 => "BMI2", "BMI 2 instruction set";
        TBM = 21 => "TBM", "TBM instruction set";
        RDRAND = 22 => "Rdrand", "RDRAND instruction";
        /// VIA PadLock crypto engine
        ACE = 23 => "ACE", "Padlock Advanced Cryptography Engine";
        ACE2 = 24 => "ACE2", "Padlock Advanced Cryptography Engine 2";
        RNG = 25 => "RNG", "Padlock Random Number Generator";
        PHE = 26 => "PHE", "Padlock Hash Engine";
        PMM = 27 => "PMM", "Padlock Montgomery Multiplier";
        AES = 28 => "AES", "AES instruction set";
        PCLMULQDQ = 29 => "Pclmulqdq", "PCLMULQDQ instruction";
        RDTSCP = 30 => "Rdtscp", "RDTSCP instruction";
        LWP = 31 => "LWP", "Lightweight Profiling extension";
        HLE = 32 => "HLE", "Hardware Lock Elision extension";
        RTM = 33 => "RTM", "Restricted Transactional Memory extension";
        XTEST = 34 => "Xtest", "XTEST instruction";
        RDSEED = 35 => "Rdseed", "RDSEED instruction";
        ADX = 36 => "ADX", "ADCX and ADOX instructions";
        SHA = 37 => "SHA", "SHA instructions";
        MPX = 38 => "MPX", "Memory Protection extension";
    }
}

/// SIMD instruction set extensions
pub mod simd {
    feature_table! { Simd, X86;
        MMX = 0 => "MMX", "MMX instruction set";
        MMX_PLUS = 1 => "MMXPlus", "MMX+ instruction set";
        /// Cyrix extended MMX
        EMMX = 2 => "EMMX", "EMMX instruction set";
        THREE_DNOW = 3 => "ThreeDNow", "3dnow! instruction set";
        THREE_DNOW_PLUS = 4 => "ThreeDNowPlus", "3dnow!+ instruction set";
        THREE_DNOW_PREFETCH = 5 => "ThreeDNowPrefetch", "3dnow! prefetch instructions";
        THREE_DNOW_GEODE = 6 => "ThreeDNowGeode", "Geode 3dnow! instructions";
        SSE = 7 => "SSE", "SSE instruction set";
        SSE2 = 8 => "SSE2", "SSE 2 instruction set";
        SSE3 = 9 => "SSE3", "SSE 3 instruction set";
        SSSE3 = 10 => "SSSE3", "Supplemental SSE 3 instruction set";
        SSE4_1 = 11 => "SSE4_1", "SSE 4.1 instruction set";
        SSE4_2 = 12 => "SSE4_2", "SSE 4.2 instruction set";
        SSE4A = 13 => "SSE4A", "SSE 4A instruction set";
        AVX = 14 => "AVX", "AVX instruction set";
        AVX2 = 15 => "AVX2", "AVX 2 instruction set";
        XOP = 16 => "XOP", "XOP instruction set";
        F16C = 17 => "F16C", "F16C instruction set";
        FMA3 = 18 => "FMA3", "FMA3 instruction set";
        FMA4 = 19 => "FMA4", "FMA4 instruction set";
        /// Knights Ferry vector instructions
        KNF = 20 => "KNF", "KNF instruction set";
        /// Knights Corner vector instructions
        KNC = 21 => "KNC", "KNC instruction set";
        AVX512F = 22 => "AVX512F", "AVX-512 Foundation instructions";
        AVX512CD = 23 => "AVX512CD", "AVX-512 Conflict Detection instructions";
        AVX512ER = 24 => "AVX512ER", "AVX-512 Exponential and Reciprocal instructions";
        AVX512PF = 25 => "AVX512PF", "AVX-512 Prefetch instructions";
    }
}

/// OS-enabled register state and PadLock availability
pub mod system {
    feature_table! { System, X86;
        ACE = 32 => "ACE", "Padlock Advanced Cryptography Engine";
        ACE2 = 33 => "ACE2", "Padlock Advanced Cryptography Engine 2";
        RNG = 34 => "RNG", "Padlock Random Number Generator";
        PHE = 35 => "PHE", "Padlock Hash Engine";
        PMM = 36 => "PMM", "Padlock Montgomery Multiplier";
        MISALIGNED_SSE = 37 => "MisalignedSSE", "Misaligned memory operands in SSE instructions";
        FPU = 52 => "FPU", "x87 FPU registers";
        /// The OS saves XMM state on context switch
        XMM = 53 => "XMM", "XMM registers";
        /// The OS saves YMM state on context switch
        YMM = 54 => "YMM", "YMM registers";
        /// The OS saves ZMM and opmask state on context switch
        ZMM = 55 => "ZMM", "ZMM registers";
        BND = 56 => "BND", "BND registers";
    }
}
