//! Memory-mapped hardware register with read and write masks.

/// A 16-bit hardware register.
///
/// `read_mask` selects the bits software sees; `write_mask` selects the
/// bits software may change. Hardware-owned bits are updated through
/// [`IoReg::set`], which bypasses the masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoReg {
    value: u16,
    read_mask: u16,
    write_mask: u16,
}

impl IoReg {
    #[must_use]
    pub const fn new(value: u16, read_mask: u16, write_mask: u16) -> Self {
        Self {
            value,
            read_mask,
            write_mask,
        }
    }

    /// Raw value, including bits software cannot read.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.value
    }

    /// Replace the raw value (hardware side).
    pub fn set(&mut self, value: u16) {
        self.value = value;
    }

    /// Value as seen by a CPU read.
    #[must_use]
    pub const fn read(self) -> u16 {
        self.value & self.read_mask
    }

    /// CPU write: only writable bits change.
    pub fn write(&mut self, value: u16) {
        self.value = (self.value & !self.write_mask) | (value & self.write_mask);
    }

    /// CPU write to one byte lane (`high` selects bits 15..8).
    pub fn write_byte(&mut self, high: bool, value: u8) {
        let (shift, lane) = if high { (8, 0xFF00) } else { (0, 0x00FF) };
        let mask = self.write_mask & lane;
        self.value = (self.value & !mask) | ((u16::from(value) << shift) & mask);
    }

    /// True if any bit of `bits` is set in the raw value.
    #[must_use]
    pub const fn any(self, bits: u16) -> bool {
        self.value & bits != 0
    }
}

#[cfg(test)]
mod tests {
    use super::IoReg;

    #[test]
    fn write_respects_mask() {
        let mut reg = IoReg::new(0x00F0, 0xFFFF, 0x00C7);
        reg.write(0xFFFF);
        assert_eq!(reg.get(), 0x00F7);
        reg.write(0x0000);
        assert_eq!(reg.get(), 0x0030);
    }

    #[test]
    fn read_hides_write_only_bits() {
        let mut reg = IoReg::new(0, 0x0000, 0xFFFF);
        reg.write(0x1234);
        assert_eq!(reg.read(), 0);
        assert_eq!(reg.get(), 0x1234);
    }

    #[test]
    fn byte_lanes_are_independent() {
        let mut reg = IoReg::new(0x1234, 0xFFFF, 0xFFFF);
        reg.write_byte(true, 0xAB);
        assert_eq!(reg.get(), 0xAB34);
        reg.write_byte(false, 0xCD);
        assert_eq!(reg.get(), 0xABCD);
    }
}
