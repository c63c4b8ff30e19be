//! Memory and I/O bus interface.

/// Size of a single bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
}

impl Width {
    /// Number of bytes moved by this access.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Mask that aligns an address down to this width.
    #[must_use]
    pub const fn align_mask(self) -> u32 {
        !(self.bytes() - 1)
    }
}

/// Whether an access continues from the previous one at the next address.
///
/// Many buses (ROM in particular) are much cheaper for sequential accesses,
/// so every access carries this hint and the bus prices it accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// First access of a burst (N cycle).
    NonSequential,
    /// Follows the previous access at the adjacent address (S cycle).
    Sequential,
}

/// Result of a bus read: the data plus the cycles the access took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Value read, zero-extended to 32 bits.
    pub data: u32,
    /// Cycles consumed by the access, including wait states.
    pub cycles: u32,
}

impl ReadResult {
    #[must_use]
    pub const fn new(data: u32, cycles: u32) -> Self {
        Self { data, cycles }
    }
}

/// Memory bus as seen by a CPU.
///
/// Every access returns its cost so the CPU can report exact cycle counts
/// per instruction. The bus never fails: unmapped addresses still return a
/// value and a cost.
pub trait Bus {
    /// Read `width` bits from `address`.
    ///
    /// The address is expected to be aligned to `width`; implementations
    /// may force alignment.
    fn read(&mut self, address: u32, width: Width, access: Access) -> ReadResult;

    /// Write the low `width` bits of `value` to `address`. Returns cycles.
    fn write(&mut self, address: u32, width: Width, access: Access, value: u32) -> u32;

    /// Level of the maskable interrupt line, sampled between instructions.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Level of the fast interrupt line, sampled between instructions.
    fn fiq_pending(&self) -> bool {
        false
    }
}

/// Flat little-endian RAM with fixed access costs.
///
/// Intended for CPU tests: the address is masked to the memory size, and
/// every access costs `nonseq_cycles` or `seq_cycles` regardless of width.
pub struct SimpleBus {
    memory: Vec<u8>,
    mask: u32,
    /// Cost of a non-sequential access.
    pub nonseq_cycles: u32,
    /// Cost of a sequential access.
    pub seq_cycles: u32,
    /// Interrupt line driven by the test.
    pub irq: bool,
    /// Fast interrupt line driven by the test.
    pub fiq: bool,
}

impl SimpleBus {
    /// 64 KiB of zeroed RAM where every access costs one cycle.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(0x1_0000)
    }

    /// Zeroed RAM of `size` bytes (rounded up to a power of two).
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        let size = size.next_power_of_two().max(4);
        Self {
            memory: vec![0; size],
            mask: (size - 1) as u32,
            nonseq_cycles: 1,
            seq_cycles: 1,
            irq: false,
            fiq: false,
        }
    }

    /// Copy `data` into memory starting at `address`.
    pub fn load(&mut self, address: u32, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let index = (address.wrapping_add(offset as u32) & self.mask) as usize;
            self.memory[index] = byte;
        }
    }

    /// Store 32-bit words little-endian starting at `address`.
    pub fn load_words(&mut self, address: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.load(address.wrapping_add(i as u32 * 4), &word.to_le_bytes());
        }
    }

    /// Store 16-bit halfwords little-endian starting at `address`.
    pub fn load_halves(&mut self, address: u32, halves: &[u16]) {
        for (i, half) in halves.iter().enumerate() {
            self.load(address.wrapping_add(i as u32 * 2), &half.to_le_bytes());
        }
    }

    /// Read without side effects or cost.
    #[must_use]
    pub fn peek(&self, address: u32, width: Width) -> u32 {
        let base = address & width.align_mask();
        (0..width.bytes()).fold(0, |acc, i| {
            let byte = self.memory[(base.wrapping_add(i) & self.mask) as usize];
            acc | (u32::from(byte) << (8 * i))
        })
    }

    fn cost(&self, access: Access) -> u32 {
        match access {
            Access::NonSequential => self.nonseq_cycles,
            Access::Sequential => self.seq_cycles,
        }
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u32, width: Width, access: Access) -> ReadResult {
        ReadResult::new(self.peek(address, width), self.cost(access))
    }

    fn write(&mut self, address: u32, width: Width, access: Access, value: u32) -> u32 {
        let base = address & width.align_mask();
        for i in 0..width.bytes() {
            self.memory[(base.wrapping_add(i) & self.mask) as usize] = (value >> (8 * i)) as u8;
        }
        self.cost(access)
    }

    fn irq_pending(&self) -> bool {
        self.irq
    }

    fn fiq_pending(&self) -> bool {
        self.fiq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_word_round_trip() {
        let mut bus = SimpleBus::new();
        bus.write(0x100, Width::Word, Access::NonSequential, 0x1122_3344);
        assert_eq!(bus.peek(0x100, Width::Byte), 0x44);
        assert_eq!(bus.peek(0x102, Width::Half), 0x1122);
        assert_eq!(
            bus.read(0x100, Width::Word, Access::Sequential).data,
            0x1122_3344
        );
    }

    #[test]
    fn accesses_are_force_aligned() {
        let mut bus = SimpleBus::new();
        bus.load_words(0x200, &[0xAABB_CCDD]);
        assert_eq!(bus.peek(0x203, Width::Word), 0xAABB_CCDD);
        assert_eq!(bus.peek(0x201, Width::Half), 0xCCDD);
    }

    #[test]
    fn access_kind_selects_cost() {
        let mut bus = SimpleBus::new();
        bus.nonseq_cycles = 5;
        bus.seq_cycles = 2;
        assert_eq!(bus.read(0, Width::Word, Access::NonSequential).cycles, 5);
        assert_eq!(bus.write(0, Width::Half, Access::Sequential, 0), 2);
    }

    #[test]
    fn address_wraps_at_memory_size() {
        let mut bus = SimpleBus::with_size(0x100);
        bus.load(0x1_0010, &[0x5A]);
        assert_eq!(bus.peek(0x10, Width::Byte), 0x5A);
    }
}
