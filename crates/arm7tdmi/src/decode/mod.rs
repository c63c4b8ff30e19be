//! Instruction decode tables.
//!
//! Each instruction set has one table built at compile time. An entry is an
//! operation tag (which handler runs) plus a [`CostClass`] (how many
//! internal cycles the instruction adds when its condition passes). Memory
//! access costs are not part of the entry: the bus reports those.

pub mod arm;
pub mod thumb;

/// Fixed internal-cycle cost shared by a family of instructions.
///
/// Multiplies add their data-dependent `m` cycles in the handler, as do
/// THUMB register-specified shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostClass {
    /// Data processing with an immediate or immediate-shifted operand.
    Alu,
    /// Data processing with a register-specified shift amount.
    AluRegisterShift,
    /// MUL / MLA.
    Multiply,
    /// UMULL / UMLAL / SMULL / SMLAL.
    MultiplyLong,
    /// Single register load.
    Load,
    /// Single register store.
    Store,
    /// SWP / SWPB.
    Swap,
    /// LDM, POP.
    LoadMultiple,
    /// STM, PUSH.
    StoreMultiple,
    /// B, BL, BX.
    Branch,
    /// SWI.
    SoftwareInterrupt,
    /// Encoding with no table entry.
    Undefined,
}

impl CostClass {
    /// Internal (I) cycles added on top of the fetch and any bus accesses.
    #[must_use]
    pub const fn internal_cycles(self) -> u32 {
        match self {
            Self::Alu
            | Self::Multiply
            | Self::Store
            | Self::StoreMultiple
            | Self::Branch
            | Self::SoftwareInterrupt => 0,
            Self::AluRegisterShift
            | Self::MultiplyLong
            | Self::Load
            | Self::Swap
            | Self::LoadMultiple
            | Self::Undefined => 1,
        }
    }

    /// Load or store class selected by an L bit.
    #[must_use]
    pub(crate) const fn transfer(load: bool) -> Self {
        if load { Self::Load } else { Self::Store }
    }

    /// Block load or block store class selected by an L bit.
    #[must_use]
    pub(crate) const fn block(load: bool) -> Self {
        if load {
            Self::LoadMultiple
        } else {
            Self::StoreMultiple
        }
    }
}
