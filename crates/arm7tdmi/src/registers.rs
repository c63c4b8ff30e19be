//! Register file with per-mode banks.
//!
//! The sixteen visible registers live in `r`. Each mode group owns a bank
//! holding its private r13, r14 and SPSR; r8-r12 are shared by every mode
//! except FIQ, which has its own copies. Banked values are copied out of
//! `r` when a mode is left and copied back in when it is entered again, so
//! the visible array always belongs to exactly one mode.

use crate::mode::Mode;
use crate::psr::{MODE_MASK, Psr};

/// Stack pointer register index.
pub const SP: usize = 13;
/// Link register index.
pub const LR: usize = 14;
/// Program counter register index.
pub const PC: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Bank {
    sp: u32,
    lr: u32,
    spsr: Psr,
}

/// ARM7TDMI registers: visible set, CPSR, and the inactive banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    r: [u32; 16],
    cpsr: Psr,
    mode: Mode,
    banks: [Bank; Mode::BANKS],
    /// r8-r12 of every non-FIQ mode while FIQ is active.
    high_user: [u32; 5],
    /// r8-r12 of FIQ mode while another mode is active.
    high_fiq: [u32; 5],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Power-on state: Supervisor mode, IRQ and FIQ masked, all zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            r: [0; 16],
            cpsr: Psr::for_mode(Mode::Supervisor),
            mode: Mode::Supervisor,
            banks: [Bank::default(); Mode::BANKS],
            high_user: [0; 5],
            high_fiq: [0; 5],
        }
    }

    /// Read a visible register. r15 is returned raw (pipelined value).
    #[must_use]
    pub fn get(&self, index: usize) -> u32 {
        self.r[index & 0xF]
    }

    /// Write a visible register without touching the pipeline.
    pub fn set(&mut self, index: usize, value: u32) {
        self.r[index & 0xF] = value;
    }

    /// All sixteen visible registers.
    #[must_use]
    pub fn visible(&self) -> [u32; 16] {
        self.r
    }

    #[must_use]
    pub fn cpsr(&self) -> Psr {
        self.cpsr
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// SPSR of the active mode, or `None` in User and System mode.
    #[must_use]
    pub fn spsr(&self) -> Option<Psr> {
        self.mode
            .has_spsr()
            .then(|| self.banks[self.mode.bank()].spsr)
    }

    /// Write the active mode's SPSR. Ignored in User and System mode.
    pub fn set_spsr(&mut self, value: Psr) {
        if self.mode.has_spsr() {
            self.banks[self.mode.bank()].spsr = value;
        }
    }

    /// Write the CPSR, switching register banks if the mode changes.
    ///
    /// A reserved mode encoding keeps the current mode; every other bit is
    /// still written. Returns `false` in that case.
    pub fn set_cpsr(&mut self, value: Psr) -> bool {
        let Some(mode) = Mode::from_bits(value.bits()) else {
            self.cpsr = Psr((value.bits() & !MODE_MASK) | self.mode.bits());
            return false;
        };
        self.switch_mode(mode);
        self.cpsr = value;
        true
    }

    /// Change the mode field and swap register banks.
    pub fn switch_mode(&mut self, mode: Mode) {
        let old = self.mode;
        if old != mode {
            let bank = &mut self.banks[old.bank()];
            bank.sp = self.r[SP];
            bank.lr = self.r[LR];

            if (old == Mode::Fiq) != (mode == Mode::Fiq) {
                let (save, load) = if old == Mode::Fiq {
                    (&mut self.high_fiq, &self.high_user)
                } else {
                    (&mut self.high_user, &self.high_fiq)
                };
                save.copy_from_slice(&self.r[8..13]);
                self.r[8..13].copy_from_slice(load);
            }

            let bank = &self.banks[mode.bank()];
            self.r[SP] = bank.sp;
            self.r[LR] = bank.lr;
            self.mode = mode;
        }
        self.cpsr = Psr((self.cpsr.bits() & !MODE_MASK) | mode.bits());
    }

    /// Read a User-mode register regardless of the active mode.
    ///
    /// Used by `LDM`/`STM` with the S bit set.
    #[must_use]
    pub fn user_reg(&self, index: usize) -> u32 {
        match index {
            8..=12 if self.mode == Mode::Fiq => self.high_user[index - 8],
            SP if self.mode.bank() != 0 => self.banks[0].sp,
            LR if self.mode.bank() != 0 => self.banks[0].lr,
            _ => self.r[index & 0xF],
        }
    }

    /// Write a User-mode register regardless of the active mode.
    pub fn set_user_reg(&mut self, index: usize, value: u32) {
        match index {
            8..=12 if self.mode == Mode::Fiq => self.high_user[index - 8] = value,
            SP if self.mode.bank() != 0 => self.banks[0].sp = value,
            LR if self.mode.bank() != 0 => self.banks[0].lr = value,
            _ => self.r[index & 0xF] = value,
        }
    }

    /// Banked r13/r14 of any mode, without switching to it.
    #[must_use]
    pub fn banked(&self, mode: Mode) -> (u32, u32) {
        if mode.bank() == self.mode.bank() {
            (self.r[SP], self.r[LR])
        } else {
            let bank = &self.banks[mode.bank()];
            (bank.sp, bank.lr)
        }
    }

    /// Set banked r13/r14 of any mode, without switching to it.
    pub fn set_banked(&mut self, mode: Mode, sp: u32, lr: u32) {
        if mode.bank() == self.mode.bank() {
            self.r[SP] = sp;
            self.r[LR] = lr;
        } else {
            let bank = &mut self.banks[mode.bank()];
            bank.sp = sp;
            bank.lr = lr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state_is_supervisor_with_interrupts_masked() {
        let regs = RegisterFile::new();
        assert_eq!(regs.mode(), Mode::Supervisor);
        assert!(regs.cpsr().irq_disabled());
        assert!(regs.cpsr().fiq_disabled());
        assert_eq!(regs.spsr(), Some(Psr::default()));
    }

    #[test]
    fn stack_pointer_is_banked_per_mode() {
        let mut regs = RegisterFile::new();
        regs.set(SP, 0x0300_7FE0);
        regs.switch_mode(Mode::Irq);
        assert_eq!(regs.get(SP), 0);
        regs.set(SP, 0x0300_7FA0);
        regs.switch_mode(Mode::Supervisor);
        assert_eq!(regs.get(SP), 0x0300_7FE0);
        assert_eq!(regs.banked(Mode::Irq), (0x0300_7FA0, 0));
    }

    #[test]
    fn fiq_banks_high_registers() {
        let mut regs = RegisterFile::new();
        regs.switch_mode(Mode::User);
        for i in 8..=12 {
            regs.set(i, i as u32);
        }
        regs.switch_mode(Mode::Fiq);
        for i in 8..=12 {
            assert_eq!(regs.get(i), 0, "r{i} must be FIQ's copy");
            regs.set(i, 0x100 + i as u32);
        }
        assert_eq!(regs.user_reg(10), 10);
        regs.switch_mode(Mode::Irq);
        assert_eq!(regs.get(10), 10, "IRQ shares User's r8-r12");
        regs.switch_mode(Mode::Fiq);
        assert_eq!(regs.get(10), 0x10A);
    }

    #[test]
    fn system_mode_sees_user_registers() {
        let mut regs = RegisterFile::new();
        regs.switch_mode(Mode::User);
        regs.set(SP, 0x1234);
        regs.set(LR, 0x5678);
        regs.switch_mode(Mode::System);
        assert_eq!((regs.get(SP), regs.get(LR)), (0x1234, 0x5678));
        assert_eq!(regs.spsr(), None);
    }

    #[test]
    fn reserved_mode_keeps_current_mode() {
        let mut regs = RegisterFile::new();
        assert!(!regs.set_cpsr(Psr(0xF000_0000 | 0x05)));
        assert_eq!(regs.mode(), Mode::Supervisor);
        assert_eq!(regs.cpsr().mode_bits(), Mode::Supervisor.bits());
        assert!(regs.cpsr().n());
    }

    #[test]
    fn user_bank_access_from_privileged_mode() {
        let mut regs = RegisterFile::new();
        regs.switch_mode(Mode::Irq);
        regs.set_user_reg(LR, 0xCAFE);
        assert_eq!(regs.get(LR), 0);
        regs.switch_mode(Mode::User);
        assert_eq!(regs.get(LR), 0xCAFE);
    }
}
