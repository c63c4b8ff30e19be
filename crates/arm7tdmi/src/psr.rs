//! Program status registers (CPSR/SPSR).
//!
//! - Bits 31-28: condition flags N, Z, C, V
//! - Bits 27-8: reserved
//! - Bit 7: I (IRQ disable)
//! - Bit 6: F (FIQ disable)
//! - Bit 5: T (THUMB state)
//! - Bits 4-0: mode

use crate::mode::Mode;

/// Negative flag.
pub const N: u32 = 1 << 31;
/// Zero flag.
pub const Z: u32 = 1 << 30;
/// Carry flag.
pub const C: u32 = 1 << 29;
/// Overflow flag.
pub const V: u32 = 1 << 28;
/// IRQ disable.
pub const I: u32 = 1 << 7;
/// FIQ disable.
pub const F: u32 = 1 << 6;
/// THUMB state.
pub const T: u32 = 1 << 5;
/// Mode field.
pub const MODE_MASK: u32 = 0x1F;

/// MSR field mask: condition flags byte.
pub const FIELD_FLAGS: u32 = 0xFF00_0000;
/// MSR field mask: status byte (reserved on ARMv4).
pub const FIELD_STATUS: u32 = 0x00FF_0000;
/// MSR field mask: extension byte (reserved on ARMv4).
pub const FIELD_EXTENSION: u32 = 0x0000_FF00;
/// MSR field mask: control byte.
pub const FIELD_CONTROL: u32 = 0x0000_00FF;

/// A program status register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Psr(pub u32);

impl Psr {
    /// Status register for `mode` with IRQ and FIQ masked, ARM state.
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Self {
        Self(I | F | mode.bits())
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_set(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u32, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[must_use]
    pub const fn n(self) -> bool {
        self.is_set(N)
    }

    #[must_use]
    pub const fn z(self) -> bool {
        self.is_set(Z)
    }

    #[must_use]
    pub const fn c(self) -> bool {
        self.is_set(C)
    }

    #[must_use]
    pub const fn v(self) -> bool {
        self.is_set(V)
    }

    #[must_use]
    pub const fn thumb(self) -> bool {
        self.is_set(T)
    }

    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.is_set(I)
    }

    #[must_use]
    pub const fn fiq_disabled(self) -> bool {
        self.is_set(F)
    }

    /// Raw mode field.
    #[must_use]
    pub const fn mode_bits(self) -> u32 {
        self.0 & MODE_MASK
    }

    /// Set N and Z from a result.
    pub fn set_nz(&mut self, result: u32) {
        self.set(N, result & 0x8000_0000 != 0);
        self.set(Z, result == 0);
    }

    /// Set N and Z from a 64-bit result (long multiplies).
    pub fn set_nz64(&mut self, result: u64) {
        self.set(N, result & (1 << 63) != 0);
        self.set(Z, result == 0);
    }

    /// Evaluate a 4-bit condition field.
    ///
    /// `NV` (0xF) never passes on ARMv4.
    #[must_use]
    pub const fn condition(self, cond: u32) -> bool {
        match cond & 0xF {
            0x0 => self.z(),                          // EQ
            0x1 => !self.z(),                         // NE
            0x2 => self.c(),                          // CS/HS
            0x3 => !self.c(),                         // CC/LO
            0x4 => self.n(),                          // MI
            0x5 => !self.n(),                         // PL
            0x6 => self.v(),                          // VS
            0x7 => !self.v(),                         // VC
            0x8 => self.c() && !self.z(),             // HI
            0x9 => !self.c() || self.z(),             // LS
            0xA => self.n() == self.v(),              // GE
            0xB => self.n() != self.v(),              // LT
            0xC => !self.z() && self.n() == self.v(), // GT
            0xD => self.z() || self.n() != self.v(),  // LE
            0xE => true,                              // AL
            _ => false,                               // NV
        }
    }
}

/// Assembler suffix for a condition field (`AL` prints as nothing).
#[must_use]
pub const fn condition_suffix(cond: u32) -> &'static str {
    match cond & 0xF {
        0x0 => "eq",
        0x1 => "ne",
        0x2 => "cs",
        0x3 => "cc",
        0x4 => "mi",
        0x5 => "pl",
        0x6 => "vs",
        0x7 => "vc",
        0x8 => "hi",
        0x9 => "ls",
        0xA => "ge",
        0xB => "lt",
        0xC => "gt",
        0xD => "le",
        0xE => "",
        _ => "nv",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_conditions_follow_n_and_v() {
        let psr = Psr(N);
        assert!(psr.condition(0xB), "LT when N != V");
        assert!(!psr.condition(0xA));
        assert!(psr.condition(0xD), "LE when N != V");

        let psr = Psr(N | V);
        assert!(psr.condition(0xA), "GE when N == V");
        assert!(psr.condition(0xC), "GT when Z clear and N == V");
    }

    #[test]
    fn unsigned_conditions_follow_c_and_z() {
        assert!(Psr(C).condition(0x8), "HI");
        assert!(!Psr(C | Z).condition(0x8));
        assert!(Psr(Z).condition(0x9), "LS");
    }

    #[test]
    fn always_and_never() {
        assert!(Psr(0).condition(0xE));
        assert!(!Psr(N | Z | C | V).condition(0xF));
    }

    #[test]
    fn nz_from_result() {
        let mut psr = Psr(C);
        psr.set_nz(0);
        assert!(psr.z() && !psr.n() && psr.c());
        psr.set_nz(0x8000_0000);
        assert!(psr.n() && !psr.z());
    }
}
