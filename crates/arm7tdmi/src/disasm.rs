//! ARM and THUMB disassembler.
//!
//! Dispatches on the same decode tables as the execution engine, so an
//! encoding the CPU treats as undefined prints as `undefined`. Branch
//! targets are resolved against `address`, the instruction's own address.

use crate::alu::{ShiftKind, rotated_immediate};
use crate::decode::arm::{self as arm_table, ArmOp};
use crate::decode::thumb::{self as thumb_table, ThumbOp};
use crate::psr::condition_suffix;

const ALU_MNEMONICS: [&str; 16] = [
    "and", "eor", "sub", "rsb", "add", "adc", "sbc", "rsc", "tst", "teq", "cmp", "cmn", "orr",
    "mov", "bic", "mvn",
];

fn reg_name(index: u32) -> String {
    match index & 0xF {
        13 => "sp".to_string(),
        14 => "lr".to_string(),
        15 => "pc".to_string(),
        n => format!("r{n}"),
    }
}

fn reg_list(list: u16) -> String {
    let names: Vec<String> = (0..16)
        .filter(|&r| list & (1 << r) != 0)
        .map(reg_name)
        .collect();
    format!("{{{}}}", names.join(", "))
}

fn shifted_register(insn: u32) -> String {
    let rm = reg_name(insn);
    let kind = ShiftKind::from_bits(insn >> 5);
    if insn & 0x10 != 0 {
        return format!("{rm}, {} {}", kind.mnemonic(), reg_name(insn >> 8));
    }
    let amount = (insn >> 7) & 0x1F;
    match (kind, amount) {
        (ShiftKind::Lsl, 0) => rm,
        (ShiftKind::Ror, 0) => format!("{rm}, rrx"),
        (_, 0) => format!("{rm}, {} #32", kind.mnemonic()),
        _ => format!("{rm}, {} #{amount}", kind.mnemonic()),
    }
}

/// Disassemble a 32-bit ARM instruction at `address`.
#[must_use]
pub fn arm(insn: u32, address: u32) -> String {
    let cond = condition_suffix(insn >> 28);
    let bit = |n: u32| insn & (1 << n) != 0;
    let rn = reg_name(insn >> 16);
    let rd = reg_name(insn >> 12);

    match arm_table::lookup(insn).op {
        ArmOp::DataProcessing => {
            let op = ((insn >> 21) & 0xF) as usize;
            let operand = if bit(25) {
                format!("#{:#X}", rotated_immediate(insn & 0xFFF, false).0)
            } else {
                shifted_register(insn)
            };
            let s = if bit(20) && !(8..=11).contains(&op) { "s" } else { "" };
            let m = ALU_MNEMONICS[op];
            match op {
                8..=11 => format!("{m}{cond} {rn}, {operand}"),
                13 | 15 => format!("{m}{cond}{s} {rd}, {operand}"),
                _ => format!("{m}{cond}{s} {rd}, {rn}, {operand}"),
            }
        }
        ArmOp::Mrs => {
            let psr = if bit(22) { "spsr" } else { "cpsr" };
            format!("mrs{cond} {rd}, {psr}")
        }
        ArmOp::Msr => {
            let psr = if bit(22) { "spsr" } else { "cpsr" };
            let mut fields = String::from("_");
            for (n, c) in [(19, 'f'), (18, 's'), (17, 'x'), (16, 'c')] {
                if bit(n) {
                    fields.push(c);
                }
            }
            let source = if bit(25) {
                format!("#{:#X}", rotated_immediate(insn & 0xFFF, false).0)
            } else {
                reg_name(insn)
            };
            format!("msr{cond} {psr}{fields}, {source}")
        }
        ArmOp::Multiply => {
            let (rd, rm, rs) = (reg_name(insn >> 16), reg_name(insn), reg_name(insn >> 8));
            let s = if bit(20) { "s" } else { "" };
            if bit(21) {
                format!("mla{cond}{s} {rd}, {rm}, {rs}, {}", reg_name(insn >> 12))
            } else {
                format!("mul{cond}{s} {rd}, {rm}, {rs}")
            }
        }
        ArmOp::MultiplyLong => {
            let sign = if bit(22) { 's' } else { 'u' };
            let op = if bit(21) { "mlal" } else { "mull" };
            let s = if bit(20) { "s" } else { "" };
            format!(
                "{sign}{op}{cond}{s} {}, {}, {}, {}",
                reg_name(insn >> 12),
                reg_name(insn >> 16),
                reg_name(insn),
                reg_name(insn >> 8)
            )
        }
        ArmOp::Swap => {
            let b = if bit(22) { "b" } else { "" };
            format!("swp{cond}{b} {rd}, {}, [{rn}]", reg_name(insn))
        }
        ArmOp::BranchExchange => format!("bx{cond} {}", reg_name(insn)),
        ArmOp::HalfwordTransfer => {
            let op = match ((insn >> 5) & 3, bit(20)) {
                (1, false) => "strh",
                (1, true) => "ldrh",
                (2, _) => "ldrsb",
                _ => "ldrsh",
            };
            let sign = if bit(23) { "" } else { "-" };
            let offset = if bit(22) {
                format!("#{sign}{:#X}", ((insn >> 4) & 0xF0) | (insn & 0xF))
            } else {
                format!("{sign}{}", reg_name(insn))
            };
            format!("{op}{cond} {rd}, {}", address_mode(&rn, &offset, bit(24), bit(21)))
        }
        ArmOp::SingleTransfer => {
            let op = if bit(20) { "ldr" } else { "str" };
            let b = if bit(22) { "b" } else { "" };
            let t = if !bit(24) && bit(21) { "t" } else { "" };
            let sign = if bit(23) { "" } else { "-" };
            let offset = if bit(25) {
                format!("{sign}{}", shifted_register(insn & !0x10))
            } else {
                format!("#{sign}{:#X}", insn & 0xFFF)
            };
            format!("{op}{cond}{b}{t} {rd}, {}", address_mode(&rn, &offset, bit(24), bit(21)))
        }
        ArmOp::BlockTransfer => {
            let op = if bit(20) { "ldm" } else { "stm" };
            let mode = match (bit(23), bit(24)) {
                (true, false) => "ia",
                (true, true) => "ib",
                (false, false) => "da",
                (false, true) => "db",
            };
            let w = if bit(21) { "!" } else { "" };
            let s = if bit(22) { "^" } else { "" };
            format!("{op}{cond}{mode} {rn}{w}, {}{s}", reg_list(insn as u16))
        }
        ArmOp::Branch => {
            let link = if bit(24) { "l" } else { "" };
            let offset = (((insn & 0x00FF_FFFF) << 8) as i32 >> 6) as u32;
            let target = address.wrapping_add(8).wrapping_add(offset);
            format!("b{link}{cond} {target:#010X}")
        }
        ArmOp::SoftwareInterrupt => format!("swi{cond} {:#X}", insn & 0x00FF_FFFF),
        ArmOp::Undefined => format!("undefined {insn:#010X}"),
    }
}

fn address_mode(rn: &str, offset: &str, pre: bool, writeback: bool) -> String {
    if pre {
        let w = if writeback { "!" } else { "" };
        format!("[{rn}, {offset}]{w}")
    } else {
        format!("[{rn}], {offset}")
    }
}

/// Disassemble a 16-bit THUMB instruction at `address`.
#[must_use]
pub fn thumb(insn: u16, address: u32) -> String {
    let word = u32::from(insn);
    let r = |shift: u32| reg_name((word >> shift) & 7);
    let imm8 = word & 0xFF;
    let bit = |n: u32| word & (1 << n) != 0;
    let pc = address.wrapping_add(4);

    match thumb_table::lookup(insn).op {
        ThumbOp::MoveShifted => {
            let kind = ShiftKind::from_bits(word >> 11);
            format!("{} {}, {}, #{}", kind.mnemonic(), r(0), r(3), (word >> 6) & 0x1F)
        }
        ThumbOp::AddSubtract => {
            let op = if bit(9) { "sub" } else { "add" };
            let operand = if bit(10) {
                format!("#{}", (word >> 6) & 7)
            } else {
                r(6)
            };
            format!("{op} {}, {}, {operand}", r(0), r(3))
        }
        ThumbOp::Immediate => {
            let op = ["mov", "cmp", "add", "sub"][((word >> 11) & 3) as usize];
            format!("{op} {}, #{imm8:#X}", r(8))
        }
        ThumbOp::Alu => {
            const OPS: [&str; 16] = [
                "and", "eor", "lsl", "lsr", "asr", "adc", "sbc", "ror", "tst", "neg", "cmp",
                "cmn", "orr", "mul", "bic", "mvn",
            ];
            format!("{} {}, {}", OPS[((word >> 6) & 0xF) as usize], r(0), r(3))
        }
        ThumbOp::HiRegister => {
            let rd = reg_name((word & 7) | (u32::from(bit(7)) << 3));
            let rs = reg_name(((word >> 3) & 7) | (u32::from(bit(6)) << 3));
            match (word >> 8) & 3 {
                0 => format!("add {rd}, {rs}"),
                1 => format!("cmp {rd}, {rs}"),
                2 => format!("mov {rd}, {rs}"),
                _ => format!("bx {rs}"),
            }
        }
        ThumbOp::PcRelativeLoad => {
            let target = (pc & !2).wrapping_add(imm8 << 2);
            format!("ldr {}, [pc, #{:#X}] ; {target:#010X}", r(8), imm8 << 2)
        }
        ThumbOp::LoadStoreRegister => {
            let op = match (bit(11), bit(10)) {
                (false, false) => "str",
                (false, true) => "strb",
                (true, false) => "ldr",
                (true, true) => "ldrb",
            };
            format!("{op} {}, [{}, {}]", r(0), r(3), r(6))
        }
        ThumbOp::LoadStoreSigned => {
            let op = ["strh", "ldsb", "ldrh", "ldsh"][((word >> 10) & 3) as usize];
            format!("{op} {}, [{}, {}]", r(0), r(3), r(6))
        }
        ThumbOp::LoadStoreImmediate => {
            let (op, scale) = match (bit(11), bit(12)) {
                (false, false) => ("str", 4),
                (false, true) => ("strb", 1),
                (true, false) => ("ldr", 4),
                (true, true) => ("ldrb", 1),
            };
            format!("{op} {}, [{}, #{:#X}]", r(0), r(3), ((word >> 6) & 0x1F) * scale)
        }
        ThumbOp::LoadStoreHalf => {
            let op = if bit(11) { "ldrh" } else { "strh" };
            format!("{op} {}, [{}, #{:#X}]", r(0), r(3), ((word >> 6) & 0x1F) << 1)
        }
        ThumbOp::SpRelative => {
            let op = if bit(11) { "ldr" } else { "str" };
            format!("{op} {}, [sp, #{:#X}]", r(8), imm8 << 2)
        }
        ThumbOp::LoadAddress => {
            let base = if bit(11) { "sp" } else { "pc" };
            format!("add {}, {base}, #{:#X}", r(8), imm8 << 2)
        }
        ThumbOp::AdjustSp => {
            let sign = if bit(7) { "-" } else { "" };
            format!("add sp, #{sign}{:#X}", (word & 0x7F) << 2)
        }
        ThumbOp::PushPop => {
            let mut list = insn & 0xFF;
            let (op, extra) = if bit(11) { ("pop", 15) } else { ("push", 14) };
            if bit(8) {
                list |= 1 << extra;
            }
            format!("{op} {}", reg_list(list))
        }
        ThumbOp::MultipleTransfer => {
            let op = if bit(11) { "ldmia" } else { "stmia" };
            format!("{op} {}!, {}", r(8), reg_list(insn & 0xFF))
        }
        ThumbOp::ConditionalBranch => {
            let offset = (i32::from(insn as u8 as i8) << 1) as u32;
            format!("b{} {:#010X}", condition_suffix(word >> 8), pc.wrapping_add(offset))
        }
        ThumbOp::SoftwareInterrupt => format!("swi {imm8:#X}"),
        ThumbOp::Branch => {
            let offset = ((i32::from(insn << 5) << 16) >> 20) as u32;
            format!("b {:#010X}", pc.wrapping_add(offset))
        }
        ThumbOp::LongBranchPrefix => {
            let offset = ((i32::from(insn << 5) << 16) >> 9) as u32;
            format!("bl.hi {:#010X}", pc.wrapping_add(offset))
        }
        ThumbOp::LongBranchSuffix => format!("bl.lo {:#X}", (word & 0x7FF) << 1),
        ThumbOp::Undefined => format!("undefined {insn:#06X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_data_processing() {
        assert_eq!(arm(0xE3A0_0001, 0), "mov r0, #0x1");
        assert_eq!(arm(0xE091_0002, 0), "adds r0, r1, r2");
        assert_eq!(arm(0x1081_0312, 0), "addne r0, r1, r2, lsl r3");
        assert_eq!(arm(0xE350_0000, 0), "cmp r0, #0x0");
        assert_eq!(arm(0xE1B0_F00E, 0), "movs pc, lr");
    }

    #[test]
    fn arm_memory_and_branches() {
        assert_eq!(arm(0xE591_0004, 0), "ldr r0, [r1, #0x4]");
        assert_eq!(arm(0xE4D1_0001, 0), "ldrb r0, [r1], #0x1");
        assert_eq!(arm(0xE92D_4003, 0), "stmdb sp!, {r0, r1, lr}");
        assert_eq!(arm(0xEAFF_FFFE, 0x0800_0000), "b 0x08000000");
        assert_eq!(arm(0xEF00_0005, 0), "swi 0x5");
        assert_eq!(arm(0xE12F_FF1E, 0), "bx lr");
        assert_eq!(arm(0xEE00_0000, 0), "undefined 0xEE000000");
    }

    #[test]
    fn thumb_formats() {
        assert_eq!(thumb(0x2001, 0), "mov r0, #0x1");
        assert_eq!(thumb(0x1888, 0), "add r0, r1, r2");
        assert_eq!(thumb(0xB500, 0), "push {lr}");
        assert_eq!(thumb(0xBD01, 0), "pop {r0, pc}");
        assert_eq!(thumb(0xE7FE, 0x100), "b 0x00000100");
        assert_eq!(thumb(0xD0FE, 0x100), "beq 0x00000100");
        assert_eq!(thumb(0x4770, 0), "bx lr");
    }
}
