//! Processor operating modes.
//!
//! | Mode       | CPSR bits | Banked registers        | SPSR |
//! |------------|-----------|-------------------------|------|
//! | User       | `0x10`    | -                       | no   |
//! | FIQ        | `0x11`    | r8-r14                  | yes  |
//! | IRQ        | `0x12`    | r13-r14                 | yes  |
//! | Supervisor | `0x13`    | r13-r14                 | yes  |
//! | Abort      | `0x17`    | r13-r14                 | yes  |
//! | Undefined  | `0x1B`    | r13-r14                 | yes  |
//! | System     | `0x1F`    | shares User's registers | no   |

/// ARMv4 processor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    User,
    Fiq,
    Irq,
    Supervisor,
    Abort,
    Undefined,
    System,
}

impl Mode {
    /// Every valid mode.
    pub const ALL: [Mode; 7] = [
        Mode::User,
        Mode::Fiq,
        Mode::Irq,
        Mode::Supervisor,
        Mode::Abort,
        Mode::Undefined,
        Mode::System,
    ];

    /// Number of distinct register banks (User and System share one).
    pub const BANKS: usize = 6;

    /// Decode the CPSR mode field. Reserved encodings return `None`.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x1F {
            0x10 => Some(Mode::User),
            0x11 => Some(Mode::Fiq),
            0x12 => Some(Mode::Irq),
            0x13 => Some(Mode::Supervisor),
            0x17 => Some(Mode::Abort),
            0x1B => Some(Mode::Undefined),
            0x1F => Some(Mode::System),
            _ => None,
        }
    }

    /// CPSR mode field encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Mode::User => 0x10,
            Mode::Fiq => 0x11,
            Mode::Irq => 0x12,
            Mode::Supervisor => 0x13,
            Mode::Abort => 0x17,
            Mode::Undefined => 0x1B,
            Mode::System => 0x1F,
        }
    }

    /// Index of the register bank this mode uses.
    #[must_use]
    pub const fn bank(self) -> usize {
        match self {
            Mode::User | Mode::System => 0,
            Mode::Fiq => 1,
            Mode::Irq => 2,
            Mode::Supervisor => 3,
            Mode::Abort => 4,
            Mode::Undefined => 5,
        }
    }

    /// Exception modes own a saved status register.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Mode::User | Mode::System)
    }

    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Mode::User)
    }

    /// Short lowercase name, as used in assembler listings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Mode::User => "usr",
            Mode::Fiq => "fiq",
            Mode::Irq => "irq",
            Mode::Supervisor => "svc",
            Mode::Abort => "abt",
            Mode::Undefined => "und",
            Mode::System => "sys",
        }
    }
}
