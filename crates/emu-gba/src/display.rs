//! Display timing: scanline position, DISPSTAT and VCOUNT.
//!
//! No pixels are produced. The display only tracks where the beam is, so
//! that blanking flags, VCount matches, their interrupts and the
//! blank-triggered DMA happen on the right cycle.

use emu_core::{IoReg, Tickable};

use crate::bus::store;
use crate::config::{CYCLES_PER_LINE, HDRAW_CYCLES, LINES_PER_FRAME, VISIBLE_LINES};
use crate::interrupt::Interrupt;

const VBLANK: u16 = 0x0001;
const HBLANK: u16 = 0x0002;
const VCOUNT_MATCH: u16 = 0x0004;
const VBLANK_IRQ: u16 = 0x0008;
const HBLANK_IRQ: u16 = 0x0010;
const VCOUNT_IRQ: u16 = 0x0020;

/// Blank periods that start DMA transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlankTriggers {
    pub vblank: bool,
    pub hblank: bool,
}

pub struct Display {
    /// DISPCNT, stored for software.
    pub control: IoReg,
    /// DISPSTAT. Bits 2..0 are owned by the display.
    pub status: IoReg,
    vcount: u16,
    /// Cycles into the current line.
    dot_cycles: u32,
    irq: u16,
    triggers: BlankTriggers,
}

impl Display {
    pub fn new() -> Self {
        Self {
            control: IoReg::new(0x0080, 0xFFFF, 0xFFF7),
            status: IoReg::new(0, 0xFF3F, 0xFF38),
            vcount: 0,
            dot_cycles: 0,
            irq: 0,
            triggers: BlankTriggers::default(),
        }
    }

    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    pub fn take_irq(&mut self) -> u16 {
        std::mem::take(&mut self.irq)
    }

    pub fn take_triggers(&mut self) -> BlankTriggers {
        std::mem::take(&mut self.triggers)
    }

    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x000 => self.control.read(),
            0x004 => self.status.read(),
            _ => self.vcount,
        }
    }

    pub fn write(&mut self, offset: u32, value: u16, lanes: u16) {
        match offset {
            0x000 => store(&mut self.control, value, lanes),
            0x004 => {
                store(&mut self.status, value, lanes);
                self.compare_vcount(false);
            }
            _ => {}
        }
    }

    fn set_flag(&mut self, flag: u16, on: bool) {
        let status = self.status.get();
        self.status
            .set(if on { status | flag } else { status & !flag });
    }

    fn raise(&mut self, enable: u16, source: Interrupt) {
        if self.status.any(enable) {
            self.irq |= source.mask();
        }
    }

    /// Update the VCount match flag; a new match requests an interrupt when
    /// `edge` is set.
    fn compare_vcount(&mut self, edge: bool) {
        let matched = self.vcount == self.status.get() >> 8;
        self.set_flag(VCOUNT_MATCH, matched);
        if matched && edge {
            self.raise(VCOUNT_IRQ, Interrupt::VCount);
        }
    }

    fn enter_hblank(&mut self) {
        self.set_flag(HBLANK, true);
        self.raise(HBLANK_IRQ, Interrupt::HBlank);
        if self.vcount < VISIBLE_LINES {
            self.triggers.hblank = true;
        }
    }

    fn next_line(&mut self) {
        self.dot_cycles = 0;
        self.set_flag(HBLANK, false);
        self.vcount = (self.vcount + 1) % LINES_PER_FRAME;
        if self.vcount == VISIBLE_LINES {
            self.set_flag(VBLANK, true);
            self.raise(VBLANK_IRQ, Interrupt::VBlank);
            self.triggers.vblank = true;
        } else if self.vcount == LINES_PER_FRAME - 1 {
            // The flag drops one line early.
            self.set_flag(VBLANK, false);
        }
        self.compare_vcount(true);
    }
}

impl Tickable for Display {
    fn tick(&mut self, cycles: u32) {
        let mut remaining = cycles;
        while remaining > 0 {
            let boundary = if self.dot_cycles < HDRAW_CYCLES {
                HDRAW_CYCLES
            } else {
                CYCLES_PER_LINE
            };
            let run = remaining.min(boundary - self.dot_cycles);
            self.dot_cycles += run;
            remaining -= run;
            if self.dot_cycles == HDRAW_CYCLES {
                self.enter_hblank();
            } else if self.dot_cycles == CYCLES_PER_LINE {
                self.next_line();
            }
        }
    }

    fn next_event(&self) -> Option<u32> {
        Some(if self.dot_cycles < HDRAW_CYCLES {
            HDRAW_CYCLES - self.dot_cycles
        } else {
            CYCLES_PER_LINE - self.dot_cycles
        })
    }
}
