//! Barrel shifter, adder and multiplier timing.
//!
//! Shifter results are `(value, carry_out)`. Immediate-amount shifts use the
//! encoding rules where an amount of zero means something else for every
//! kind but LSL:
//!
//! | Kind | `#0` means | Carry out            |
//! |------|------------|----------------------|
//! | LSL  | no shift   | unchanged            |
//! | LSR  | LSR #32    | bit 31               |
//! | ASR  | ASR #32    | bit 31               |
//! | ROR  | RRX        | bit 0                |

/// Barrel shifter operation, bits 6-5 of a shifted-register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    /// Decode a two-bit shift type field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
            Self::Ror => "ror",
        }
    }
}

const fn bit(value: u32, n: u32) -> bool {
    (value >> n) & 1 != 0
}

/// Shift by a five-bit immediate amount.
#[must_use]
pub const fn shift_by_immediate(kind: ShiftKind, value: u32, amount: u32, carry_in: bool) -> (u32, bool) {
    let amount = amount & 0x1F;
    match kind {
        ShiftKind::Lsl if amount == 0 => (value, carry_in),
        ShiftKind::Lsl => (value << amount, bit(value, 32 - amount)),
        ShiftKind::Lsr if amount == 0 => (0, bit(value, 31)),
        ShiftKind::Lsr => (value >> amount, bit(value, amount - 1)),
        ShiftKind::Asr if amount == 0 => ((value as i32 >> 31) as u32, bit(value, 31)),
        ShiftKind::Asr => (((value as i32) >> amount) as u32, bit(value, amount - 1)),
        ShiftKind::Ror if amount == 0 => (((carry_in as u32) << 31) | (value >> 1), bit(value, 0)),
        ShiftKind::Ror => (value.rotate_right(amount), bit(value, amount - 1)),
    }
}

/// Shift by the bottom byte of a register.
///
/// An amount of zero leaves both value and carry untouched. Amounts of 32
/// and above saturate.
#[must_use]
pub const fn shift_by_register(kind: ShiftKind, value: u32, amount: u32, carry_in: bool) -> (u32, bool) {
    let amount = amount & 0xFF;
    if amount == 0 {
        return (value, carry_in);
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (value << amount, bit(value, 32 - amount)),
            32 => (0, bit(value, 0)),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (value >> amount, bit(value, amount - 1)),
            32 => (0, bit(value, 31)),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if amount < 32 {
                (((value as i32) >> amount) as u32, bit(value, amount - 1))
            } else {
                ((value as i32 >> 31) as u32, bit(value, 31))
            }
        }
        ShiftKind::Ror => {
            let amount = amount & 0x1F;
            if amount == 0 {
                (value, bit(value, 31))
            } else {
                (value.rotate_right(amount), bit(value, amount - 1))
            }
        }
    }
}

/// Decode a 12-bit rotated immediate (8-bit value, 4-bit rotate / 2).
#[must_use]
pub const fn rotated_immediate(field: u32, carry_in: bool) -> (u32, bool) {
    let rotate = ((field >> 8) & 0xF) * 2;
    let value = (field & 0xFF).rotate_right(rotate);
    if rotate == 0 {
        (value, carry_in)
    } else {
        (value, bit(value, 31))
    }
}

/// `a + b + carry` returning `(result, carry_out, overflow)`.
///
/// Subtraction is `add_with_carry(a, !b, true)`; the carry out is then the
/// inverted borrow, as the flags expect.
#[must_use]
pub const fn add_with_carry(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    let wide = a as u64 + b as u64 + carry as u64;
    let result = wide as u32;
    let overflow = (!(a ^ b) & (a ^ result)) >> 31 != 0;
    (result, wide > u32::MAX as u64, overflow)
}

/// Internal cycles `m` the multiplier array takes for operand `rs`.
///
/// The array retires eight bits per cycle and stops once the remaining
/// upper bits are all zero, or (for `signed`) all ones.
#[must_use]
pub const fn multiplier_cycles(rs: u32, signed: bool) -> u32 {
    let mut m = 1;
    while m < 4 {
        let upper = rs >> (8 * m);
        let ones = u32::MAX >> (8 * m);
        if upper == 0 || (signed && upper == ones) {
            break;
        }
        m += 1;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_zero_encodings() {
        assert_eq!(shift_by_immediate(ShiftKind::Lsl, 0x8000_0001, 0, true), (0x8000_0001, true));
        assert_eq!(shift_by_immediate(ShiftKind::Lsr, 0x8000_0000, 0, false), (0, true));
        assert_eq!(shift_by_immediate(ShiftKind::Asr, 0x8000_0000, 0, false), (0xFFFF_FFFF, true));
        assert_eq!(shift_by_immediate(ShiftKind::Ror, 0x0000_0003, 0, true), (0x8000_0001, true));
    }

    #[test]
    fn immediate_shift_carry_is_last_bit_out() {
        assert_eq!(shift_by_immediate(ShiftKind::Lsl, 0x4000_0000, 2, false), (0, true));
        assert_eq!(shift_by_immediate(ShiftKind::Lsr, 0x0000_0002, 2, true), (0, true));
        assert_eq!(shift_by_immediate(ShiftKind::Ror, 0x0000_00F0, 4, false), (0x0000_000F, false));
    }

    #[test]
    fn register_shift_saturates() {
        assert_eq!(shift_by_register(ShiftKind::Lsl, 1, 32, false), (0, true));
        assert_eq!(shift_by_register(ShiftKind::Lsl, 1, 33, true), (0, false));
        assert_eq!(shift_by_register(ShiftKind::Lsr, 0x8000_0000, 32, false), (0, true));
        assert_eq!(shift_by_register(ShiftKind::Asr, 0x8000_0000, 200, false), (0xFFFF_FFFF, true));
        assert_eq!(shift_by_register(ShiftKind::Ror, 0x8000_0000, 32, false), (0x8000_0000, true));
    }

    #[test]
    fn register_shift_by_zero_keeps_carry() {
        assert_eq!(shift_by_register(ShiftKind::Lsr, 0x1234, 0x100, true), (0x1234, true));
    }

    #[test]
    fn rotated_immediate_sets_carry_only_when_rotated() {
        assert_eq!(rotated_immediate(0x0FF, true), (0xFF, true));
        assert_eq!(rotated_immediate(0x4FF, false), (0xFF00_0000, true));
        assert_eq!(rotated_immediate(0xF01, false), (4, false));
    }

    #[test]
    fn adder_flags() {
        assert_eq!(add_with_carry(0xFFFF_FFFF, 1, false), (0, true, false));
        assert_eq!(add_with_carry(0x7FFF_FFFF, 1, false), (0x8000_0000, false, true));
        // 5 - 7: borrow, so carry clear.
        assert_eq!(add_with_carry(5, !7, true), (0xFFFF_FFFE, false, false));
        // 7 - 5: no borrow.
        assert_eq!(add_with_carry(7, !5, true), (2, true, false));
    }

    #[test]
    fn multiplier_terminates_early() {
        assert_eq!(multiplier_cycles(0x0000_00FF, false), 1);
        assert_eq!(multiplier_cycles(0x0000_FFFF, false), 2);
        assert_eq!(multiplier_cycles(0x00FF_FFFF, false), 3);
        assert_eq!(multiplier_cycles(0xFFFF_FFFF, false), 4);
        assert_eq!(multiplier_cycles(0xFFFF_FFFF, true), 1);
        assert_eq!(multiplier_cycles(0xFFFF_8000, true), 2);
    }
}
