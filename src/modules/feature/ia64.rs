//! Itanium features

pub mod isa {
    feature_table! { Isa, Ia64;
        BRL = 0 => "Brl", "Long branch instruction";
        ATOMIC128 = 1 => "Atomic128", "Atomic 128-bit (16-byte) loads, stores, and CAS";
        CLZ = 2 => "Clz", "CLZ (count leading zeros) instruction";
        MPY4 = 3 => "Mpy4", "MPY4 and MPYSHL4 (Truncated 32-bit multiplication) instructions";
    }
}
