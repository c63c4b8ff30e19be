//! 32-bit ARM decode table.
//!
//! Indexed by bits 27-20 and 7-4 of the instruction (12 bits, 4096
//! entries). Those bits are enough to tell every ARMv4 format apart.
//!
//! ```text
//! 27-25 | 24-20 | 7-4  | format
//! 000   | 0000x | 1001 | MUL / MLA
//! 000   | 01xxx | 1001 | UMULL / UMLAL / SMULL / SMLAL
//! 000   | 10x00 | 1001 | SWP / SWPB
//! 000   | xxxxx | 1xx1 | LDRH / STRH / LDRSB / LDRSH
//! 000   | 10010 | 0001 | BX
//! 000   | 10x00 | 0000 | MRS
//! 000   | 10x10 | 0000 | MSR (register)
//! 00x   | xxxxx | xxxx | data processing
//! 001   | 10x10 | xxxx | MSR (immediate)
//! 01x   | xxxxx | xxxx | LDR / STR
//! 100   | xxxxx | xxxx | LDM / STM
//! 101   | xxxxx | xxxx | B / BL
//! 110   | xxxxx | xxxx | coprocessor transfer (undefined here)
//! 1110  | xxxx  | xxxx | coprocessor operation (undefined here)
//! 1111  | xxxx  | xxxx | SWI
//! ```

use super::CostClass;

/// Handler selected by the ARM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOp {
    DataProcessing,
    Mrs,
    Msr,
    Multiply,
    MultiplyLong,
    Swap,
    BranchExchange,
    HalfwordTransfer,
    SingleTransfer,
    BlockTransfer,
    Branch,
    SoftwareInterrupt,
    Undefined,
}

/// One ARM table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmEntry {
    pub op: ArmOp,
    pub cost: CostClass,
}

impl ArmEntry {
    const UNDEFINED: Self = Self::new(ArmOp::Undefined, CostClass::Undefined);

    const fn new(op: ArmOp, cost: CostClass) -> Self {
        Self { op, cost }
    }
}

/// Table index for an instruction word.
#[must_use]
pub const fn index(insn: u32) -> usize {
    (((insn >> 16) & 0xFF0) | ((insn >> 4) & 0xF)) as usize
}

/// Look up the table entry for an instruction word.
#[must_use]
pub fn lookup(insn: u32) -> ArmEntry {
    TABLE[index(insn)]
}

static TABLE: [ArmEntry; 4096] = build();

const fn build() -> [ArmEntry; 4096] {
    let mut table = [ArmEntry::UNDEFINED; 4096];
    let mut i = 0;
    while i < table.len() {
        table[i] = classify((i >> 4) as u32, (i & 0xF) as u32);
        i += 1;
    }
    table
}

/// `hi` is bits 27-20, `lo` is bits 7-4.
const fn classify(hi: u32, lo: u32) -> ArmEntry {
    let load = hi & 1 != 0;
    match hi >> 5 {
        0b000 => {
            if lo == 0b1001 {
                if hi & 0xFC == 0x00 {
                    ArmEntry::new(ArmOp::Multiply, CostClass::Multiply)
                } else if hi & 0xF8 == 0x08 {
                    ArmEntry::new(ArmOp::MultiplyLong, CostClass::MultiplyLong)
                } else if hi & 0xFB == 0x10 {
                    ArmEntry::new(ArmOp::Swap, CostClass::Swap)
                } else {
                    ArmEntry::UNDEFINED
                }
            } else if lo & 0b1001 == 0b1001 {
                // Stores only exist for the unsigned halfword form on ARMv4.
                let sh = (lo >> 1) & 3;
                if !load && sh != 1 {
                    ArmEntry::UNDEFINED
                } else {
                    ArmEntry::new(ArmOp::HalfwordTransfer, CostClass::transfer(load))
                }
            } else if hi == 0x12 && lo == 0b0001 {
                ArmEntry::new(ArmOp::BranchExchange, CostClass::Branch)
            } else if hi & 0xFB == 0x10 && lo == 0 {
                ArmEntry::new(ArmOp::Mrs, CostClass::Alu)
            } else if hi & 0xFB == 0x12 && lo == 0 {
                ArmEntry::new(ArmOp::Msr, CostClass::Alu)
            } else if hi & 0xF9 == 0x10 {
                // TST/TEQ/CMP/CMN without S.
                ArmEntry::UNDEFINED
            } else if lo & 0b1001 == 0b0001 {
                ArmEntry::new(ArmOp::DataProcessing, CostClass::AluRegisterShift)
            } else {
                ArmEntry::new(ArmOp::DataProcessing, CostClass::Alu)
            }
        }
        0b001 => {
            if hi & 0xFB == 0x32 {
                ArmEntry::new(ArmOp::Msr, CostClass::Alu)
            } else if hi & 0xF9 == 0x30 {
                ArmEntry::UNDEFINED
            } else {
                ArmEntry::new(ArmOp::DataProcessing, CostClass::Alu)
            }
        }
        0b010 => ArmEntry::new(ArmOp::SingleTransfer, CostClass::transfer(load)),
        0b011 => {
            if lo & 1 != 0 {
                ArmEntry::UNDEFINED
            } else {
                ArmEntry::new(ArmOp::SingleTransfer, CostClass::transfer(load))
            }
        }
        0b100 => ArmEntry::new(ArmOp::BlockTransfer, CostClass::block(load)),
        0b101 => ArmEntry::new(ArmOp::Branch, CostClass::Branch),
        0b110 => ArmEntry::UNDEFINED,
        _ => {
            if hi & 0x10 != 0 {
                ArmEntry::new(ArmOp::SoftwareInterrupt, CostClass::SoftwareInterrupt)
            } else {
                ArmEntry::UNDEFINED
            }
        }
    }
}
