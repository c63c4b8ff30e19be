//! Interrupt controller: IE, IF and IME.

use emu_core::IoReg;

/// Interrupt sources, by IE/IF bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    HBlank = 1,
    VCount = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
    Timer3 = 6,
    Serial = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    GamePak = 13,
}

impl Interrupt {
    const TIMERS: [Self; 4] = [Self::Timer0, Self::Timer1, Self::Timer2, Self::Timer3];
    const DMAS: [Self; 4] = [Self::Dma0, Self::Dma1, Self::Dma2, Self::Dma3];

    /// IE/IF bit for this source.
    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }

    /// Overflow interrupt of timer `index`.
    #[must_use]
    pub const fn timer(index: usize) -> Self {
        Self::TIMERS[index]
    }

    /// End-of-transfer interrupt of DMA channel `index`.
    #[must_use]
    pub const fn dma(index: usize) -> Self {
        Self::DMAS[index]
    }
}

const SOURCES: u16 = 0x3FFF;

pub struct InterruptController {
    /// Enabled sources (0x200).
    pub enable: IoReg,
    /// Requested sources (0x202). CPU writes acknowledge.
    pub flags: IoReg,
    /// Master enable (0x208).
    pub master: IoReg,
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            enable: IoReg::new(0, SOURCES, SOURCES),
            flags: IoReg::new(0, SOURCES, 0),
            master: IoReg::new(0, 0x0001, 0x0001),
        }
    }

    /// Latch the request bits in `mask`.
    pub fn request(&mut self, mask: u16) {
        if mask != 0 {
            self.flags.set(self.flags.get() | (mask & SOURCES));
        }
    }

    /// Writing a 1 to an IF bit clears it.
    pub fn acknowledge(&mut self, mask: u16) {
        self.flags.set(self.flags.get() & !mask);
    }

    /// An enabled source is requesting. Wakes a halted CPU whatever IME
    /// and CPSR.I say.
    pub fn wake(&self) -> bool {
        self.enable.get() & self.flags.get() != 0
    }

    /// Level of the CPU's IRQ line.
    pub fn irq_line(&self) -> bool {
        self.master.any(1) && self.wake()
    }
}
