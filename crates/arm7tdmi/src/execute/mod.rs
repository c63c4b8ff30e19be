//! Instruction handlers shared by both instruction sets.
//!
//! Handlers return the cycles they add on top of the opcode fetch and the
//! entry's fixed internal cycles: bus accesses, multiplier cycles and
//! pipeline refills.

mod arm;
mod thumb;

use emu_core::{Access, Bus, Width};

use crate::alu::add_with_carry;
use crate::cpu::Arm7tdmi;
use crate::psr::{C, V};
use crate::registers::PC;

/// ALU opcodes (bits 24-21 of an ARM data-processing instruction).
pub(crate) mod opcode {
    pub const AND: u32 = 0x0;
    pub const EOR: u32 = 0x1;
    pub const SUB: u32 = 0x2;
    pub const RSB: u32 = 0x3;
    pub const ADD: u32 = 0x4;
    pub const ADC: u32 = 0x5;
    pub const SBC: u32 = 0x6;
    pub const RSC: u32 = 0x7;
    pub const TST: u32 = 0x8;
    pub const TEQ: u32 = 0x9;
    pub const CMP: u32 = 0xA;
    pub const CMN: u32 = 0xB;
    pub const ORR: u32 = 0xC;
    pub const MOV: u32 = 0xD;
    pub const BIC: u32 = 0xE;
    pub const MVN: u32 = 0xF;
}

/// Decoded LDM/STM, PUSH/POP or LDMIA/STMIA.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockTransfer {
    pub base: usize,
    pub list: u16,
    pub load: bool,
    /// Increment before (IB/DB) rather than after.
    pub pre: bool,
    pub up: bool,
    pub writeback: bool,
    /// S bit: user bank transfer, or CPSR restore when loading r15.
    pub psr: bool,
}

impl Arm7tdmi {
    /// Run ALU operation `op`, setting flags if asked.
    ///
    /// Returns the result for operations that write a destination, `None`
    /// for TST/TEQ/CMP/CMN. Logical operations take C from the shifter.
    pub(crate) fn alu(
        &mut self,
        op: u32,
        lhs: u32,
        rhs: u32,
        shifter_carry: bool,
        set_flags: bool,
    ) -> Option<u32> {
        use opcode::{ADC, ADD, AND, BIC, CMN, CMP, EOR, MOV, MVN, ORR, RSB, SBC, SUB, TEQ, TST};

        let carry = self.regs.cpsr().c();
        let (result, carry_out, overflow) = match op {
            AND | TST => (lhs & rhs, shifter_carry, None),
            EOR | TEQ => (lhs ^ rhs, shifter_carry, None),
            ORR => (lhs | rhs, shifter_carry, None),
            MOV => (rhs, shifter_carry, None),
            BIC => (lhs & !rhs, shifter_carry, None),
            MVN => (!rhs, shifter_carry, None),
            _ => {
                let (a, b, c) = match op {
                    SUB | CMP => (lhs, !rhs, true),
                    RSB => (rhs, !lhs, true),
                    ADD | CMN => (lhs, rhs, false),
                    ADC => (lhs, rhs, carry),
                    SBC => (lhs, !rhs, carry),
                    _ => (rhs, !lhs, carry), // RSC
                };
                let (result, carry_out, overflow) = add_with_carry(a, b, c);
                (result, carry_out, Some(overflow))
            }
        };

        if set_flags {
            let mut cpsr = self.regs.cpsr();
            cpsr.set_nz(result);
            cpsr.set(C, carry_out);
            if let Some(overflow) = overflow {
                cpsr.set(V, overflow);
            }
            self.regs.set_cpsr(cpsr);
        }

        (!(TST..=CMN).contains(&op)).then_some(result)
    }

    /// Word load with the ARM7 misaligned rotation.
    pub(crate) fn load_word<B: Bus>(&mut self, bus: &mut B, address: u32) -> (u32, u32) {
        let read = self.read_data(bus, address, Width::Word, Access::NonSequential);
        (read.data.rotate_right(8 * (address & 3)), read.cycles)
    }

    /// Halfword load. Odd addresses rotate the halfword into the top byte.
    pub(crate) fn load_half<B: Bus>(&mut self, bus: &mut B, address: u32) -> (u32, u32) {
        let read = self.read_data(bus, address, Width::Half, Access::NonSequential);
        (read.data.rotate_right(8 * (address & 1)), read.cycles)
    }

    /// Sign-extending halfword load. Odd addresses load a signed byte.
    pub(crate) fn load_signed_half<B: Bus>(&mut self, bus: &mut B, address: u32) -> (u32, u32) {
        if address & 1 != 0 {
            return self.load_signed_byte(bus, address);
        }
        let read = self.read_data(bus, address, Width::Half, Access::NonSequential);
        (read.data as u16 as i16 as u32, read.cycles)
    }

    pub(crate) fn load_byte<B: Bus>(&mut self, bus: &mut B, address: u32) -> (u32, u32) {
        let read = self.read_data(bus, address, Width::Byte, Access::NonSequential);
        (read.data & 0xFF, read.cycles)
    }

    pub(crate) fn load_signed_byte<B: Bus>(&mut self, bus: &mut B, address: u32) -> (u32, u32) {
        let read = self.read_data(bus, address, Width::Byte, Access::NonSequential);
        (read.data as u8 as i8 as u32, read.cycles)
    }

    pub(crate) fn store<B: Bus>(&mut self, bus: &mut B, address: u32, width: Width, value: u32) -> u32 {
        let value = match width {
            Width::Byte => value & 0xFF,
            Width::Half => value & 0xFFFF,
            Width::Word => value,
        };
        self.write_data(bus, address, width, Access::NonSequential, value)
    }

    /// Value of a register as a store source: r15 reads one width further
    /// ahead than it does as an ALU operand.
    pub(crate) fn store_value(&self, reg: usize) -> u32 {
        if reg == PC {
            self.regs.get(PC).wrapping_add(self.width())
        } else {
            self.regs.get(reg)
        }
    }

    /// Load/store multiple.
    ///
    /// Registers move lowest-numbered first to the lowest address. An empty
    /// list transfers r15 alone but moves the base by 0x40. For stores, a
    /// base register that is not first in the list is stored as its
    /// written-back value. For loads, write-back happens before the loads,
    /// so a base in the list ends up holding the loaded value.
    pub(crate) fn block_transfer<B: Bus>(&mut self, bus: &mut B, t: BlockTransfer) -> u32 {
        let (list, span) = if t.list == 0 {
            (1u16 << PC, 0x40)
        } else {
            (t.list, 4 * t.list.count_ones())
        };
        let base = self.regs.get(t.base);
        let (start, new_base) = match (t.up, t.pre) {
            (true, false) => (base, base.wrapping_add(span)),
            (true, true) => (base.wrapping_add(4), base.wrapping_add(span)),
            (false, false) => (base.wrapping_sub(span).wrapping_add(4), base.wrapping_sub(span)),
            (false, true) => (base.wrapping_sub(span), base.wrapping_sub(span)),
        };
        let loads_pc = t.load && list & (1 << PC) != 0;
        let user_bank = t.psr && !loads_pc;

        let mut cycles = 0;
        let mut address = start;
        let mut access = Access::NonSequential;

        if t.load {
            if t.writeback {
                self.regs.set(t.base, new_base);
            }
            let mut target = None;
            for reg in (0..16).filter(|&r| list & (1 << r) != 0) {
                let read = self.read_data(bus, address, Width::Word, access);
                cycles += read.cycles;
                if reg == PC {
                    target = Some(read.data);
                } else if user_bank {
                    self.regs.set_user_reg(reg, read.data);
                } else {
                    self.regs.set(reg, read.data);
                }
                address = address.wrapping_add(4);
                access = Access::Sequential;
            }
            if let Some(target) = target {
                if t.psr {
                    self.restore_cpsr();
                }
                cycles += self.branch(bus, target);
            }
        } else {
            let first = list.trailing_zeros() as usize;
            for reg in (0..16).filter(|&r| list & (1 << r) != 0) {
                let value = if reg == t.base && t.writeback && reg != first {
                    new_base
                } else if user_bank && reg != PC {
                    self.regs.user_reg(reg)
                } else {
                    self.store_value(reg)
                };
                cycles += self.write_data(bus, address, Width::Word, access, value);
                address = address.wrapping_add(4);
                access = Access::Sequential;
            }
            if t.writeback {
                self.regs.set(t.base, new_base);
            }
        }
        cycles
    }
}
