//! Exception entry.
//!
//! | Exception         | Vector | Mode       | LR                    | Masks |
//! |-------------------|--------|------------|-----------------------|-------|
//! | Reset             | `0x00` | Supervisor | -                     | I, F  |
//! | Undefined         | `0x04` | Undefined  | next instruction      | I     |
//! | SoftwareInterrupt | `0x08` | Supervisor | next instruction      | I     |
//! | Irq               | `0x18` | Irq        | next instruction + 4  | I     |
//! | Fiq               | `0x1C` | Fiq        | next instruction + 4  | I, F  |
//!
//! FIQ and IRQ are level-sensitive lines sampled between instructions.
//! Undefined and SoftwareInterrupt are raised by the executing instruction
//! and entered as soon as it completes. Prefetch and data aborts cannot
//! occur on this system and are not modeled.

use emu_core::Bus;
use log::debug;

use crate::cpu::Arm7tdmi;
use crate::mode::Mode;
use crate::psr::{F, I, T};
use crate::registers::{LR, PC};

/// Exception classes, in no particular order; see [`Exception::priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exception {
    Reset,
    Undefined,
    SoftwareInterrupt,
    Irq,
    Fiq,
}

impl Exception {
    /// Address the core branches to on entry.
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::Undefined => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    /// Mode the core switches to.
    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::Undefined => Mode::Undefined,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Fixed priority, 0 highest.
    ///
    /// Undefined and SoftwareInterrupt share a level: one instruction can
    /// raise at most one of them.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Reset => 0,
            Self::Fiq => 1,
            Self::Irq => 2,
            Self::Undefined | Self::SoftwareInterrupt => 3,
        }
    }

    /// Whether entry also sets the F bit.
    #[must_use]
    pub const fn masks_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }

    /// Added to `r15 - width` to form the saved LR.
    ///
    /// Interrupts are taken between instructions, where `r15 - width` is the
    /// next instruction. Synchronous exceptions are entered while r15 still
    /// reads two instructions ahead, where `r15 - width` is already the
    /// instruction after the faulting one.
    const fn return_offset(self) -> u32 {
        match self {
            Self::Irq | Self::Fiq => 4,
            Self::Reset | Self::Undefined | Self::SoftwareInterrupt => 0,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Undefined => "undefined instruction",
            Self::SoftwareInterrupt => "swi",
            Self::Irq => "irq",
            Self::Fiq => "fiq",
        }
    }
}

impl Arm7tdmi {
    /// Highest-priority interrupt line that is asserted and not masked.
    pub(crate) fn pending_interrupt<B: Bus>(&self, bus: &B) -> Option<Exception> {
        let cpsr = self.regs.cpsr();
        if bus.fiq_pending() && !cpsr.fiq_disabled() {
            Some(Exception::Fiq)
        } else if bus.irq_pending() && !cpsr.irq_disabled() {
            Some(Exception::Irq)
        } else {
            None
        }
    }

    /// Register side of exception entry: SPSR, bank switch, LR, masks.
    ///
    /// r15 is left untouched.
    pub(crate) fn enter_mode(&mut self, exception: Exception) {
        let old = self.regs.cpsr();
        let return_address = self
            .regs
            .get(PC)
            .wrapping_sub(self.width())
            .wrapping_add(exception.return_offset());

        self.regs.switch_mode(exception.mode());
        self.regs.set_spsr(old);
        self.regs.set(LR, return_address);

        let mut cpsr = self.regs.cpsr();
        cpsr.set(T, false);
        cpsr.set(I, true);
        if exception.masks_fiq() {
            cpsr.set(F, true);
        }
        self.regs.set_cpsr(cpsr);
    }

    /// Take `exception` and branch to its vector. Returns the refill cost.
    pub(crate) fn enter_exception<B: Bus>(&mut self, bus: &mut B, exception: Exception) -> u32 {
        self.enter_mode(exception);
        debug!(
            "{} entered, lr={:#010X} spsr={:#010X}",
            exception.name(),
            self.regs.get(LR),
            self.regs.spsr().map_or(0, |spsr| spsr.bits())
        );
        self.branch(bus, exception.vector())
    }

    /// Raise a synchronous exception from the executing instruction.
    pub(crate) fn raise(&mut self, exception: Exception) {
        self.raised = Some(exception);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_and_modes() {
        assert_eq!(Exception::Irq.vector(), 0x18);
        assert_eq!(Exception::Fiq.mode(), Mode::Fiq);
        assert_eq!(Exception::SoftwareInterrupt.mode(), Mode::Supervisor);
        assert_eq!(Exception::Undefined.vector(), 0x04);
    }

    #[test]
    fn priority_order() {
        let mut all = [
            Exception::Undefined,
            Exception::Irq,
            Exception::Reset,
            Exception::Fiq,
        ];
        all.sort_by_key(|e| e.priority());
        assert_eq!(all[..3], [Exception::Reset, Exception::Fiq, Exception::Irq]);
        assert_eq!(
            Exception::Undefined.priority(),
            Exception::SoftwareInterrupt.priority()
        );
    }
}
