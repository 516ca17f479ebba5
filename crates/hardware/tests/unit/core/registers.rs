//! Register file properties.

use proptest::prelude::*;

use loki_core::common::Warnings;
use loki_core::config::CoreConfig;
use loki_core::core::registers::RegisterFile;

proptest! {
    /// A write of V to any writable register is observed by the next read.
    #[test]
    fn writes_are_observed(reg in 2u8..16, value in any::<u32>()) {
        let mut regs = RegisterFile::new(&CoreConfig::default());
        let warnings = Warnings::default();
        regs.write(reg, value, &warnings);
        prop_assert_eq!(regs.read(reg), value);
    }

    /// r0 reads zero no matter what is written to it.
    #[test]
    fn r0_always_reads_zero(value in any::<u32>()) {
        let mut regs = RegisterFile::new(&CoreConfig::default());
        let warnings = Warnings::default();
        regs.write(0, value, &warnings);
        prop_assert_eq!(regs.read(0), 0);
    }

    /// Distinct registers do not alias.
    #[test]
    fn registers_do_not_alias(a in 2u8..9, b in 9u8..16, va in any::<u32>(), vb in any::<u32>()) {
        let mut regs = RegisterFile::new(&CoreConfig::default());
        let warnings = Warnings::default();
        regs.write(a, va, &warnings);
        regs.write(b, vb, &warnings);
        prop_assert_eq!(regs.read(a), va);
        prop_assert_eq!(regs.read(b), vb);
    }
}
