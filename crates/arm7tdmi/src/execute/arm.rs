//! 32-bit ARM instruction handlers.

use emu_core::{Bus, Width};
use log::warn;

use super::BlockTransfer;
use crate::alu::{self, ShiftKind};
use crate::cpu::Arm7tdmi;
use crate::decode::arm::{self as table, ArmOp};
use crate::exception::Exception;
use crate::psr::{FIELD_CONTROL, FIELD_EXTENSION, FIELD_FLAGS, FIELD_STATUS, Psr, T};
use crate::registers::{LR, PC};

const fn reg(insn: u32, shift: u32) -> usize {
    ((insn >> shift) & 0xF) as usize
}

const fn flag(insn: u32, n: u32) -> bool {
    insn & (1 << n) != 0
}

impl Arm7tdmi {
    /// Execute one ARM instruction. r15 already reads instruction + 8.
    pub(crate) fn execute_arm<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        if !self.regs.cpsr().condition(insn >> 28) {
            return 0;
        }
        let entry = table::lookup(insn);
        let internal = entry.cost.internal_cycles();
        internal
            + match entry.op {
                ArmOp::DataProcessing => self.arm_data_processing(bus, insn),
                ArmOp::Mrs => self.arm_mrs(insn),
                ArmOp::Msr => self.arm_msr(insn),
                ArmOp::Multiply => self.arm_multiply(insn),
                ArmOp::MultiplyLong => self.arm_multiply_long(insn),
                ArmOp::Swap => self.arm_swap(bus, insn),
                ArmOp::BranchExchange => self.arm_branch_exchange(bus, insn),
                ArmOp::HalfwordTransfer => self.arm_halfword_transfer(bus, insn),
                ArmOp::SingleTransfer => self.arm_single_transfer(bus, insn),
                ArmOp::BlockTransfer => self.arm_block_transfer(bus, insn),
                ArmOp::Branch => self.arm_branch(bus, insn),
                ArmOp::SoftwareInterrupt => {
                    self.raise(Exception::SoftwareInterrupt);
                    0
                }
                ArmOp::Undefined => {
                    warn!(
                        "undefined ARM instruction {insn:08X} at {:#010X}",
                        self.executing_address()
                    );
                    self.raise(Exception::Undefined);
                    0
                }
            }
    }

    /// Second operand and shifter carry of a data-processing instruction.
    ///
    /// With a register-specified shift the core takes an extra cycle before
    /// reading registers, so r15 reads one word further ahead.
    fn arm_shifter_operand(&self, insn: u32) -> (u32, bool) {
        let carry = self.regs.cpsr().c();
        if flag(insn, 25) {
            return alu::rotated_immediate(insn & 0xFFF, carry);
        }
        let rm = reg(insn, 0);
        let kind = ShiftKind::from_bits(insn >> 5);
        if flag(insn, 4) {
            let amount = self.regs.get(reg(insn, 8)) & 0xFF;
            let value = self.read_reg_late(rm);
            alu::shift_by_register(kind, value, amount, carry)
        } else {
            alu::shift_by_immediate(kind, self.regs.get(rm), (insn >> 7) & 0x1F, carry)
        }
    }

    /// Register read after the extra internal cycle of a register shift.
    fn read_reg_late(&self, index: usize) -> u32 {
        let value = self.regs.get(index);
        if index == PC { value.wrapping_add(4) } else { value }
    }

    fn arm_data_processing<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let op = (insn >> 21) & 0xF;
        let set_flags = flag(insn, 20);
        let rd = reg(insn, 12);
        let register_shift = !flag(insn, 25) && flag(insn, 4);

        let (rhs, shifter_carry) = self.arm_shifter_operand(insn);
        let rn = reg(insn, 16);
        let lhs = if register_shift {
            self.read_reg_late(rn)
        } else {
            self.regs.get(rn)
        };

        // With Rd = r15 the S bit means "restore CPSR", not "set flags".
        let exception_return = set_flags && rd == PC;
        let Some(result) = self.alu(op, lhs, rhs, shifter_carry, set_flags && !exception_return)
        else {
            if exception_return {
                self.restore_cpsr();
            }
            return 0;
        };

        if rd == PC {
            if exception_return {
                self.restore_cpsr();
            }
            return self.branch(bus, result);
        }
        self.regs.set(rd, result);
        0
    }

    fn arm_mrs(&mut self, insn: u32) -> u32 {
        let value = if flag(insn, 22) {
            self.regs.spsr().unwrap_or_else(|| self.regs.cpsr())
        } else {
            self.regs.cpsr()
        };
        self.regs.set(reg(insn, 12), value.bits());
        0
    }

    fn arm_msr(&mut self, insn: u32) -> u32 {
        let value = if flag(insn, 25) {
            alu::rotated_immediate(insn & 0xFFF, false).0
        } else {
            self.regs.get(reg(insn, 0))
        };

        let mut mask = 0;
        for (bit, field) in [
            (19, FIELD_FLAGS),
            (18, FIELD_STATUS),
            (17, FIELD_EXTENSION),
            (16, FIELD_CONTROL),
        ] {
            if flag(insn, bit) {
                mask |= field;
            }
        }

        if flag(insn, 22) {
            if let Some(spsr) = self.regs.spsr() {
                self.regs
                    .set_spsr(Psr((spsr.bits() & !mask) | (value & mask)));
            }
            return 0;
        }

        if !self.regs.mode().is_privileged() {
            mask &= FIELD_FLAGS;
        }
        // The T bit only changes through BX and exception entry/return.
        mask &= !T;
        let cpsr = self.regs.cpsr().bits();
        self.write_cpsr(Psr((cpsr & !mask) | (value & mask)));
        0
    }

    fn arm_multiply(&mut self, insn: u32) -> u32 {
        let rs = self.regs.get(reg(insn, 8));
        let mut result = self.regs.get(reg(insn, 0)).wrapping_mul(rs);
        let mut cycles = alu::multiplier_cycles(rs, true);
        if flag(insn, 21) {
            result = result.wrapping_add(self.regs.get(reg(insn, 12)));
            cycles += 1;
        }
        self.regs.set(reg(insn, 16), result);
        if flag(insn, 20) {
            let mut cpsr = self.regs.cpsr();
            cpsr.set_nz(result);
            self.regs.set_cpsr(cpsr);
        }
        cycles
    }

    fn arm_multiply_long(&mut self, insn: u32) -> u32 {
        let signed = flag(insn, 22);
        let accumulate = flag(insn, 21);
        let (rd_lo, rd_hi) = (reg(insn, 12), reg(insn, 16));
        let rs = self.regs.get(reg(insn, 8));
        let rm = self.regs.get(reg(insn, 0));

        let mut result = if signed {
            (i64::from(rm as i32) * i64::from(rs as i32)) as u64
        } else {
            u64::from(rm) * u64::from(rs)
        };
        let mut cycles = alu::multiplier_cycles(rs, signed);
        if accumulate {
            let acc = (u64::from(self.regs.get(rd_hi)) << 32) | u64::from(self.regs.get(rd_lo));
            result = result.wrapping_add(acc);
            cycles += 1;
        }

        self.regs.set(rd_lo, result as u32);
        self.regs.set(rd_hi, (result >> 32) as u32);
        if flag(insn, 20) {
            let mut cpsr = self.regs.cpsr();
            cpsr.set_nz64(result);
            self.regs.set_cpsr(cpsr);
        }
        cycles
    }

    fn arm_swap<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let address = self.regs.get(reg(insn, 16));
        let source = self.regs.get(reg(insn, 0));
        let rd = reg(insn, 12);
        let (width, (value, read_cycles)) = if flag(insn, 22) {
            (Width::Byte, self.load_byte(bus, address))
        } else {
            (Width::Word, self.load_word(bus, address))
        };
        let write_cycles = self.store(bus, address, width, source);
        let mut cycles = read_cycles + write_cycles;
        if rd == PC {
            cycles += self.branch(bus, value);
        } else {
            self.regs.set(rd, value);
        }
        cycles
    }

    fn arm_branch_exchange<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let target = self.regs.get(reg(insn, 0));
        let mut cpsr = self.regs.cpsr();
        cpsr.set(T, target & 1 != 0);
        self.regs.set_cpsr(cpsr);
        self.branch(bus, target)
    }

    fn arm_branch<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let offset = (((insn & 0x00FF_FFFF) << 8) as i32 >> 6) as u32;
        let pc = self.regs.get(PC);
        if flag(insn, 24) {
            self.regs.set(LR, pc.wrapping_sub(4));
        }
        self.branch(bus, pc.wrapping_add(offset))
    }

    /// Address arithmetic shared by single and halfword transfers.
    ///
    /// Returns the access address and the base after write-back.
    fn transfer_address(&self, insn: u32, offset: u32) -> (u32, u32) {
        let base = self.regs.get(reg(insn, 16));
        let indexed = if flag(insn, 23) {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        if flag(insn, 24) {
            (indexed, indexed)
        } else {
            (base, indexed)
        }
    }

    /// Post-indexed transfers always write back; pre-indexed only with W.
    const fn writes_back(insn: u32) -> bool {
        !flag(insn, 24) || flag(insn, 21)
    }

    fn arm_single_transfer<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let offset = if flag(insn, 25) {
            let kind = ShiftKind::from_bits(insn >> 5);
            let amount = (insn >> 7) & 0x1F;
            alu::shift_by_immediate(kind, self.regs.get(reg(insn, 0)), amount, self.regs.cpsr().c()).0
        } else {
            insn & 0xFFF
        };
        let (address, new_base) = self.transfer_address(insn, offset);
        let (rn, rd) = (reg(insn, 16), reg(insn, 12));
        let byte = flag(insn, 22);

        if flag(insn, 20) {
            let (value, mut cycles) = if byte {
                self.load_byte(bus, address)
            } else {
                self.load_word(bus, address)
            };
            if Self::writes_back(insn) {
                self.regs.set(rn, new_base);
            }
            if rd == PC {
                cycles += self.branch(bus, value);
            } else {
                self.regs.set(rd, value);
            }
            cycles
        } else {
            let width = if byte { Width::Byte } else { Width::Word };
            let value = self.store_value(rd);
            let cycles = self.store(bus, address, width, value);
            if Self::writes_back(insn) {
                self.regs.set(rn, new_base);
            }
            cycles
        }
    }

    fn arm_halfword_transfer<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        let offset = if flag(insn, 22) {
            ((insn >> 4) & 0xF0) | (insn & 0xF)
        } else {
            self.regs.get(reg(insn, 0))
        };
        let (address, new_base) = self.transfer_address(insn, offset);
        let (rn, rd) = (reg(insn, 16), reg(insn, 12));

        if flag(insn, 20) {
            let (value, mut cycles) = match (insn >> 5) & 3 {
                1 => self.load_half(bus, address),
                2 => self.load_signed_byte(bus, address),
                _ => self.load_signed_half(bus, address),
            };
            if Self::writes_back(insn) {
                self.regs.set(rn, new_base);
            }
            if rd == PC {
                cycles += self.branch(bus, value);
            } else {
                self.regs.set(rd, value);
            }
            cycles
        } else {
            let value = self.store_value(rd);
            let cycles = self.store(bus, address, Width::Half, value);
            if Self::writes_back(insn) {
                self.regs.set(rn, new_base);
            }
            cycles
        }
    }

    fn arm_block_transfer<B: Bus>(&mut self, bus: &mut B, insn: u32) -> u32 {
        self.block_transfer(
            bus,
            BlockTransfer {
                base: reg(insn, 16),
                list: insn as u16,
                load: flag(insn, 20),
                pre: flag(insn, 24),
                up: flag(insn, 23),
                writeback: flag(insn, 21),
                psr: flag(insn, 22),
            },
        )
    }
}
