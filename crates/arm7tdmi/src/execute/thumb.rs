//! 16-bit THUMB instruction handlers.
//!
//! Most formats are restricted forms of ARM instructions and share the ALU,
//! load/store and block transfer paths with them. r15 reads instruction + 4.

use emu_core::{Bus, Width};
use log::warn;

use super::{BlockTransfer, opcode};
use crate::alu::{self, ShiftKind};
use crate::cpu::Arm7tdmi;
use crate::decode::thumb::{self as table, ThumbOp};
use crate::exception::Exception;
use crate::psr::{C, T};
use crate::registers::{LR, PC, SP};

const fn low(insn: u16, shift: u32) -> usize {
    ((insn >> shift) & 7) as usize
}

const fn flag(insn: u16, n: u32) -> bool {
    insn & (1 << n) != 0
}

impl Arm7tdmi {
    /// Execute one THUMB instruction.
    pub(crate) fn execute_thumb<B: Bus>(&mut self, bus: &mut B, insn: u16) -> u32 {
        let entry = table::lookup(insn);
        let internal = entry.cost.internal_cycles();
        internal
            + match entry.op {
                ThumbOp::MoveShifted => self.thumb_move_shifted(insn),
                ThumbOp::AddSubtract => self.thumb_add_subtract(insn),
                ThumbOp::Immediate => self.thumb_immediate(insn),
                ThumbOp::Alu => self.thumb_alu(insn),
                ThumbOp::HiRegister => self.thumb_hi_register(bus, insn),
                ThumbOp::PcRelativeLoad => {
                    let address = (self.regs.get(PC) & !2).wrapping_add(u32::from(insn & 0xFF) << 2);
                    self.thumb_load(bus, low(insn, 8), address, Width::Word, false)
                }
                ThumbOp::LoadStoreRegister => {
                    let address = self.regs.get(low(insn, 3)).wrapping_add(self.regs.get(low(insn, 6)));
                    let width = if flag(insn, 10) { Width::Byte } else { Width::Word };
                    self.thumb_transfer(bus, insn, flag(insn, 11), address, width)
                }
                ThumbOp::LoadStoreSigned => self.thumb_load_store_signed(bus, insn),
                ThumbOp::LoadStoreImmediate => {
                    let offset = u32::from((insn >> 6) & 0x1F);
                    let (width, offset) = if flag(insn, 12) {
                        (Width::Byte, offset)
                    } else {
                        (Width::Word, offset << 2)
                    };
                    let address = self.regs.get(low(insn, 3)).wrapping_add(offset);
                    self.thumb_transfer(bus, insn, flag(insn, 11), address, width)
                }
                ThumbOp::LoadStoreHalf => {
                    let offset = u32::from((insn >> 6) & 0x1F) << 1;
                    let address = self.regs.get(low(insn, 3)).wrapping_add(offset);
                    self.thumb_transfer(bus, insn, flag(insn, 11), address, Width::Half)
                }
                ThumbOp::SpRelative => {
                    let address = self.regs.get(SP).wrapping_add(u32::from(insn & 0xFF) << 2);
                    let rd = low(insn, 8);
                    if flag(insn, 11) {
                        self.thumb_load(bus, rd, address, Width::Word, false)
                    } else {
                        self.store(bus, address, Width::Word, self.regs.get(rd))
                    }
                }
                ThumbOp::LoadAddress => {
                    let base = if flag(insn, 11) {
                        self.regs.get(SP)
                    } else {
                        self.regs.get(PC) & !2
                    };
                    self.regs
                        .set(low(insn, 8), base.wrapping_add(u32::from(insn & 0xFF) << 2));
                    0
                }
                ThumbOp::AdjustSp => {
                    let offset = u32::from(insn & 0x7F) << 2;
                    let sp = self.regs.get(SP);
                    let sp = if flag(insn, 7) {
                        sp.wrapping_sub(offset)
                    } else {
                        sp.wrapping_add(offset)
                    };
                    self.regs.set(SP, sp);
                    0
                }
                ThumbOp::PushPop => self.thumb_push_pop(bus, insn),
                ThumbOp::MultipleTransfer => self.block_transfer(
                    bus,
                    BlockTransfer {
                        base: low(insn, 8),
                        list: insn & 0xFF,
                        load: flag(insn, 11),
                        pre: false,
                        up: true,
                        writeback: true,
                        psr: false,
                    },
                ),
                ThumbOp::ConditionalBranch => {
                    if !self.regs.cpsr().condition(u32::from(insn >> 8)) {
                        return internal;
                    }
                    let offset = (i32::from(insn as u8 as i8) << 1) as u32;
                    self.branch(bus, self.regs.get(PC).wrapping_add(offset))
                }
                ThumbOp::SoftwareInterrupt => {
                    self.raise(Exception::SoftwareInterrupt);
                    0
                }
                ThumbOp::Branch => {
                    let offset = ((i32::from(insn << 5) << 16) >> 20) as u32;
                    self.branch(bus, self.regs.get(PC).wrapping_add(offset))
                }
                ThumbOp::LongBranchPrefix => {
                    let offset = ((i32::from(insn << 5) << 16) >> 9) as u32;
                    self.regs.set(LR, self.regs.get(PC).wrapping_add(offset));
                    0
                }
                ThumbOp::LongBranchSuffix => {
                    let target = self.regs.get(LR).wrapping_add(u32::from(insn & 0x7FF) << 1);
                    self.regs.set(LR, self.regs.get(PC).wrapping_sub(2) | 1);
                    self.branch(bus, target)
                }
                ThumbOp::Undefined => {
                    warn!(
                        "undefined THUMB instruction {insn:04X} at {:#010X}",
                        self.executing_address()
                    );
                    self.raise(Exception::Undefined);
                    0
                }
            }
    }

    fn set_shift_flags(&mut self, result: u32, carry: bool) {
        let mut cpsr = self.regs.cpsr();
        cpsr.set_nz(result);
        cpsr.set(C, carry);
        self.regs.set_cpsr(cpsr);
    }

    fn thumb_move_shifted(&mut self, insn: u16) -> u32 {
        let kind = ShiftKind::from_bits(u32::from(insn >> 11));
        let amount = u32::from((insn >> 6) & 0x1F);
        let (result, carry) =
            alu::shift_by_immediate(kind, self.regs.get(low(insn, 3)), amount, self.regs.cpsr().c());
        self.regs.set(low(insn, 0), result);
        self.set_shift_flags(result, carry);
        0
    }

    fn thumb_add_subtract(&mut self, insn: u16) -> u32 {
        let operand = if flag(insn, 10) {
            u32::from((insn >> 6) & 7)
        } else {
            self.regs.get(low(insn, 6))
        };
        let op = if flag(insn, 9) { opcode::SUB } else { opcode::ADD };
        let lhs = self.regs.get(low(insn, 3));
        if let Some(result) = self.alu(op, lhs, operand, false, true) {
            self.regs.set(low(insn, 0), result);
        }
        0
    }

    fn thumb_immediate(&mut self, insn: u16) -> u32 {
        let rd = low(insn, 8);
        let op = match (insn >> 11) & 3 {
            0 => opcode::MOV,
            1 => opcode::CMP,
            2 => opcode::ADD,
            _ => opcode::SUB,
        };
        let carry = self.regs.cpsr().c();
        let lhs = self.regs.get(rd);
        if let Some(result) = self.alu(op, lhs, u32::from(insn & 0xFF), carry, true) {
            self.regs.set(rd, result);
        }
        0
    }

    fn thumb_alu(&mut self, insn: u16) -> u32 {
        let (rd, rs) = (low(insn, 0), low(insn, 3));
        let (lhs, rhs) = (self.regs.get(rd), self.regs.get(rs));
        let carry = self.regs.cpsr().c();

        let shift = match (insn >> 6) & 0xF {
            0x2 => Some(ShiftKind::Lsl),
            0x3 => Some(ShiftKind::Lsr),
            0x4 => Some(ShiftKind::Asr),
            0x7 => Some(ShiftKind::Ror),
            _ => None,
        };
        if let Some(kind) = shift {
            let (result, carry) = alu::shift_by_register(kind, lhs, rhs & 0xFF, carry);
            self.regs.set(rd, result);
            self.set_shift_flags(result, carry);
            return 1;
        }

        let op = match (insn >> 6) & 0xF {
            0x0 => opcode::AND,
            0x1 => opcode::EOR,
            0x5 => opcode::ADC,
            0x6 => opcode::SBC,
            0x8 => opcode::TST,
            0x9 => {
                // NEG Rd, Rs is RSB Rd, Rs, #0.
                if let Some(result) = self.alu(opcode::RSB, rhs, 0, carry, true) {
                    self.regs.set(rd, result);
                }
                return 0;
            }
            0xA => opcode::CMP,
            0xB => opcode::CMN,
            0xC => opcode::ORR,
            0xD => {
                let result = lhs.wrapping_mul(rhs);
                self.regs.set(rd, result);
                let mut cpsr = self.regs.cpsr();
                cpsr.set_nz(result);
                self.regs.set_cpsr(cpsr);
                return alu::multiplier_cycles(lhs, true);
            }
            0xE => opcode::BIC,
            _ => opcode::MVN,
        };
        if let Some(result) = self.alu(op, lhs, rhs, carry, true) {
            self.regs.set(rd, result);
        }
        0
    }

    fn thumb_hi_register<B: Bus>(&mut self, bus: &mut B, insn: u16) -> u32 {
        let rd = low(insn, 0) | (usize::from(flag(insn, 7)) << 3);
        let rs = low(insn, 3) | (usize::from(flag(insn, 6)) << 3);
        let value = self.regs.get(rs);

        let result = match (insn >> 8) & 3 {
            0 => self.regs.get(rd).wrapping_add(value),
            1 => {
                let lhs = self.regs.get(rd);
                self.alu(opcode::CMP, lhs, value, false, true);
                return 0;
            }
            2 => value,
            _ => {
                let mut cpsr = self.regs.cpsr();
                cpsr.set(T, value & 1 != 0);
                self.regs.set_cpsr(cpsr);
                return self.branch(bus, value);
            }
        };
        if rd == PC {
            return self.branch(bus, result);
        }
        self.regs.set(rd, result);
        0
    }

    fn thumb_load<B: Bus>(&mut self, bus: &mut B, rd: usize, address: u32, width: Width, signed: bool) -> u32 {
        let (value, cycles) = match (width, signed) {
            (Width::Byte, false) => self.load_byte(bus, address),
            (Width::Byte, true) => self.load_signed_byte(bus, address),
            (Width::Half, false) => self.load_half(bus, address),
            (Width::Half, true) => self.load_signed_half(bus, address),
            (Width::Word, _) => self.load_word(bus, address),
        };
        self.regs.set(rd, value);
        cycles
    }

    fn thumb_transfer<B: Bus>(&mut self, bus: &mut B, insn: u16, load: bool, address: u32, width: Width) -> u32 {
        let rd = low(insn, 0);
        if load {
            self.thumb_load(bus, rd, address, width, false)
        } else {
            self.store(bus, address, width, self.regs.get(rd))
        }
    }

    fn thumb_load_store_signed<B: Bus>(&mut self, bus: &mut B, insn: u16) -> u32 {
        let address = self.regs.get(low(insn, 3)).wrapping_add(self.regs.get(low(insn, 6)));
        let rd = low(insn, 0);
        match (insn >> 10) & 3 {
            0 => self.store(bus, address, Width::Half, self.regs.get(rd)),
            1 => self.thumb_load(bus, rd, address, Width::Byte, true),
            2 => self.thumb_load(bus, rd, address, Width::Half, false),
            _ => self.thumb_load(bus, rd, address, Width::Half, true),
        }
    }

    fn thumb_push_pop<B: Bus>(&mut self, bus: &mut B, insn: u16) -> u32 {
        let load = flag(insn, 11);
        let mut list = insn & 0xFF;
        if flag(insn, 8) {
            list |= if load { 1 << PC } else { 1 << LR };
        }
        self.block_transfer(
            bus,
            BlockTransfer {
                base: SP,
                list,
                load,
                pre: !load,
                up: load,
                writeback: true,
                psr: false,
            },
        )
    }
}
