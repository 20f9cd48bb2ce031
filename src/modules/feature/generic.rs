//! Features common to every architecture

/// System features reported on all architectures
pub mod system {
    feature_table! { System, Unknown;
        /// A user-accessible cycle counter exists
        CYCLE_COUNTER = 0 => "CycleCounter", "CPU cycle counter";
        /// The cycle counter is 64 bits wide
        CYCLE_COUNTER_64BIT = 1 => "CycleCounter64Bit", "64-bit CPU cycle counter";
        ADDRESS_SPACE_64BIT = 2 => "AddressSpace64Bit", "64-bit address space";
        GP_REGISTERS_64BIT = 3 => "GPRegisters64Bit", "64-bit general-purpose registers";
        /// Unaligned loads and stores do not trap
        MISALIGNED_ACCESS = 4 => "MisalignedAccess", "Misaligned memory access";
        /// The system exposes exactly one logical core
        SINGLE_THREADED = 5 => "SingleThreaded", "Single hardware thread";
    }
}
