//! 16-bit THUMB decode table, indexed by bits 15-8 (256 entries).

use super::CostClass;

/// THUMB instruction format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbOp {
    /// LSL/LSR/ASR Rd, Rs, #offset5.
    MoveShifted,
    /// ADD/SUB Rd, Rs, Rn|#imm3.
    AddSubtract,
    /// MOV/CMP/ADD/SUB Rd, #imm8.
    Immediate,
    /// Two-register ALU operations.
    Alu,
    /// ADD/CMP/MOV on r8-r15, BX.
    HiRegister,
    /// LDR Rd, [PC, #imm8*4].
    PcRelativeLoad,
    /// LDR/STR/LDRB/STRB Rd, [Rb, Ro].
    LoadStoreRegister,
    /// STRH/LDRH/LDSB/LDSH Rd, [Rb, Ro].
    LoadStoreSigned,
    /// LDR/STR/LDRB/STRB Rd, [Rb, #imm5].
    LoadStoreImmediate,
    /// LDRH/STRH Rd, [Rb, #imm5*2].
    LoadStoreHalf,
    /// LDR/STR Rd, [SP, #imm8*4].
    SpRelative,
    /// ADD Rd, PC|SP, #imm8*4.
    LoadAddress,
    /// ADD SP, #+/-imm7*4.
    AdjustSp,
    /// PUSH/POP.
    PushPop,
    /// LDMIA/STMIA Rb!.
    MultipleTransfer,
    /// B{cond}.
    ConditionalBranch,
    SoftwareInterrupt,
    /// B label.
    Branch,
    /// First half of BL: LR = PC + (offset << 12).
    LongBranchPrefix,
    /// Second half of BL.
    LongBranchSuffix,
    Undefined,
}

/// One THUMB table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbEntry {
    pub op: ThumbOp,
    pub cost: CostClass,
}

impl ThumbEntry {
    const UNDEFINED: Self = Self::new(ThumbOp::Undefined, CostClass::Undefined);

    const fn new(op: ThumbOp, cost: CostClass) -> Self {
        Self { op, cost }
    }
}

/// Look up the table entry for an instruction halfword.
#[must_use]
pub fn lookup(insn: u16) -> ThumbEntry {
    TABLE[usize::from(insn >> 8)]
}

static TABLE: [ThumbEntry; 256] = build();

const fn build() -> [ThumbEntry; 256] {
    let mut table = [ThumbEntry::UNDEFINED; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

const fn classify(hi: u8) -> ThumbEntry {
    use CostClass as C;
    use ThumbOp as T;

    let load = hi & 0x08 != 0;
    match hi >> 4 {
        0x0 | 0x1 => {
            if hi >> 3 == 0b00011 {
                ThumbEntry::new(T::AddSubtract, C::Alu)
            } else {
                ThumbEntry::new(T::MoveShifted, C::Alu)
            }
        }
        0x2 | 0x3 => ThumbEntry::new(T::Immediate, C::Alu),
        0x4 => match (hi >> 2) & 3 {
            0 => ThumbEntry::new(T::Alu, C::Alu),
            1 => ThumbEntry::new(T::HiRegister, C::Alu),
            _ => ThumbEntry::new(T::PcRelativeLoad, C::Load),
        },
        0x5 => {
            if hi & 0x02 == 0 {
                ThumbEntry::new(T::LoadStoreRegister, C::transfer(load))
            } else {
                // STRH is the only store among the sign-extending group.
                ThumbEntry::new(T::LoadStoreSigned, C::transfer(hi & 0x0C != 0))
            }
        }
        0x6 | 0x7 => ThumbEntry::new(T::LoadStoreImmediate, C::transfer(load)),
        0x8 => ThumbEntry::new(T::LoadStoreHalf, C::transfer(load)),
        0x9 => ThumbEntry::new(T::SpRelative, C::transfer(load)),
        0xA => ThumbEntry::new(T::LoadAddress, C::Alu),
        0xB => {
            if hi == 0xB0 {
                ThumbEntry::new(T::AdjustSp, C::Alu)
            } else if hi & 0xF6 == 0xB4 {
                ThumbEntry::new(T::PushPop, C::block(load))
            } else {
                ThumbEntry::UNDEFINED
            }
        }
        0xC => ThumbEntry::new(T::MultipleTransfer, C::block(load)),
        0xD => match hi & 0xF {
            0xF => ThumbEntry::new(T::SoftwareInterrupt, C::SoftwareInterrupt),
            0xE => ThumbEntry::UNDEFINED,
            _ => ThumbEntry::new(T::ConditionalBranch, C::Branch),
        },
        0xE => {
            if load {
                ThumbEntry::UNDEFINED
            } else {
                ThumbEntry::new(T::Branch, C::Branch)
            }
        }
        _ => {
            if load {
                ThumbEntry::new(T::LongBranchSuffix, C::Branch)
            } else {
                ThumbEntry::new(T::LongBranchPrefix, C::Alu)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(insn: u16) -> ThumbOp {
        lookup(insn).op
    }

    #[test]
    fn register_formats() {
        assert_eq!(op(0x0088), ThumbOp::MoveShifted); // lsl r0, r1, #2
        assert_eq!(op(0x1888), ThumbOp::AddSubtract); // add r0, r1, r2
        assert_eq!(op(0x1E48), ThumbOp::AddSubtract); // sub r0, r1, #1
        assert_eq!(op(0x2001), ThumbOp::Immediate); // mov r0, #1
        assert_eq!(op(0x4148), ThumbOp::Alu); // adc r0, r1
        assert_eq!(op(0x4770), ThumbOp::HiRegister); // bx lr
        assert_eq!(op(0x4801), ThumbOp::PcRelativeLoad);
    }

    #[test]
    fn transfer_formats_pick_load_or_store_cost() {
        assert_eq!(lookup(0x5088).cost, CostClass::Store); // str r0, [r1, r2]
        assert_eq!(lookup(0x5888).cost, CostClass::Load); // ldr
        assert_eq!(lookup(0x5288).cost, CostClass::Store); // strh
        assert_eq!(lookup(0x5688).cost, CostClass::Load); // ldsb
        assert_eq!(lookup(0x6848).cost, CostClass::Load); // ldr r0, [r1, #4]
        assert_eq!(lookup(0x8048).cost, CostClass::Store); // strh r0, [r1, #2]
        assert_eq!(lookup(0x9801).cost, CostClass::Load); // ldr r0, [sp, #4]
    }

    #[test]
    fn stack_and_branch_formats() {
        assert_eq!(op(0xA801), ThumbOp::LoadAddress);
        assert_eq!(op(0xB081), ThumbOp::AdjustSp);
        assert_eq!(lookup(0xB500).cost, CostClass::StoreMultiple); // push {lr}
        assert_eq!(lookup(0xBD00).cost, CostClass::LoadMultiple); // pop {pc}
        assert_eq!(op(0xB800), ThumbOp::Undefined);
        assert_eq!(op(0xC803), ThumbOp::MultipleTransfer);
        assert_eq!(op(0xD0FE), ThumbOp::ConditionalBranch);
        assert_eq!(op(0xDE00), ThumbOp::Undefined);
        assert_eq!(op(0xDF00), ThumbOp::SoftwareInterrupt);
        assert_eq!(op(0xE7FE), ThumbOp::Branch);
        assert_eq!(op(0xE800), ThumbOp::Undefined);
        assert_eq!(op(0xF000), ThumbOp::LongBranchPrefix);
        assert_eq!(op(0xF800), ThumbOp::LongBranchSuffix);
    }
}
