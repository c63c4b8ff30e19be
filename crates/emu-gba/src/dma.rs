//! DMA channel registers and transfer state.
//!
//! The channels only hold state. The bus performs the transfers, since they
//! go through the same memory map and wait states as the CPU.

use emu_core::IoReg;

use crate::bus::store;
use crate::display::BlankTriggers;

const DEST_CONTROL_SHIFT: u16 = 5;
const SOURCE_CONTROL_SHIFT: u16 = 7;
const REPEAT: u16 = 0x0200;
const WORD: u16 = 0x0400;
const TIMING_SHIFT: u16 = 12;
const IRQ_ENABLE: u16 = 0x4000;
const ENABLE: u16 = 0x8000;

/// When an enabled channel starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    VBlank,
    HBlank,
    /// Sound FIFO or video capture; never started here.
    Special,
}

/// How an address moves after each unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
    Fixed,
    /// Increment, and reload the destination when a repeat starts.
    IncrementReload,
}

impl Step {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Increment,
            1 => Self::Decrement,
            2 => Self::Fixed,
            _ => Self::IncrementReload,
        }
    }

    pub fn apply(self, address: u32, unit: u32) -> u32 {
        match self {
            Self::Increment | Self::IncrementReload => address.wrapping_add(unit),
            Self::Decrement => address.wrapping_sub(unit),
            Self::Fixed => address,
        }
    }
}

/// A transfer the bus should run now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub channel: usize,
    pub source: u32,
    pub dest: u32,
    pub count: u32,
    pub word: bool,
    pub source_step: Step,
    pub dest_step: Step,
}

pub struct Channel {
    index: usize,
    source: u32,
    dest: u32,
    count: IoReg,
    pub control: IoReg,
    /// Internal address and count registers, latched on enable.
    internal_source: u32,
    internal_dest: u32,
    active: bool,
}

impl Channel {
    fn new(index: usize) -> Self {
        let control_mask = if index == 3 { 0xFFE0 } else { 0xF7E0 };
        Self {
            index,
            source: 0,
            dest: 0,
            count: IoReg::new(0, 0x0000, if index == 3 { 0xFFFF } else { 0x3FFF }),
            control: IoReg::new(0, control_mask, control_mask),
            internal_source: 0,
            internal_dest: 0,
            active: false,
        }
    }

    fn source_mask(&self) -> u32 {
        if self.index == 0 { 0x07FF_FFFE } else { 0x0FFF_FFFE }
    }

    fn dest_mask(&self) -> u32 {
        if self.index == 3 { 0x0FFF_FFFE } else { 0x07FF_FFFE }
    }

    fn enabled(&self) -> bool {
        self.control.any(ENABLE)
    }

    pub fn timing(&self) -> Timing {
        match (self.control.get() >> TIMING_SHIFT) & 3 {
            0 => Timing::Immediate,
            1 => Timing::VBlank,
            2 => Timing::HBlank,
            _ => Timing::Special,
        }
    }

    fn units(&self) -> u32 {
        match u32::from(self.count.get()) {
            0 if self.index == 3 => 0x1_0000,
            0 => 0x4000,
            count => count,
        }
    }

    fn latch(&mut self) {
        self.internal_source = self.source & self.source_mask();
        self.internal_dest = self.dest & self.dest_mask();
        self.active = self.timing() == Timing::Immediate;
    }

    fn transfer(&self) -> Transfer {
        let control = self.control.get();
        Transfer {
            channel: self.index,
            source: self.internal_source,
            dest: self.internal_dest,
            count: self.units(),
            word: control & WORD != 0,
            source_step: Step::from_bits(control >> SOURCE_CONTROL_SHIFT),
            dest_step: Step::from_bits(control >> DEST_CONTROL_SHIFT),
        }
    }
}

pub struct Dma {
    pub channels: [Channel; 4],
}

impl Dma {
    pub fn new() -> Self {
        Self {
            channels: [Channel::new(0), Channel::new(1), Channel::new(2), Channel::new(3)],
        }
    }

    /// Read a halfword at `offset` from 0x0400_00B0. Only the control
    /// register is readable.
    pub fn read(&self, offset: u32) -> u16 {
        let channel = &self.channels[(offset / 12) as usize];
        match offset % 12 {
            10 => channel.control.read(),
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u32, value: u16, lanes: u16) {
        let channel = &mut self.channels[(offset / 12) as usize];
        let merge = |old: u32, shift: u32| {
            let mask = u32::from(lanes) << shift;
            (old & !mask) | ((u32::from(value) << shift) & mask)
        };
        match offset % 12 {
            0 => channel.source = merge(channel.source, 0),
            2 => channel.source = merge(channel.source, 16),
            4 => channel.dest = merge(channel.dest, 0),
            6 => channel.dest = merge(channel.dest, 16),
            8 => store(&mut channel.count, value, lanes),
            _ => {
                let was_enabled = channel.enabled();
                store(&mut channel.control, value, lanes);
                if !was_enabled && channel.enabled() {
                    channel.latch();
                    log::debug!(
                        "DMA{} enabled: {:#010X} -> {:#010X}, {} units, {:?}",
                        channel.index,
                        channel.internal_source,
                        channel.internal_dest,
                        channel.units(),
                        channel.timing()
                    );
                } else if !channel.enabled() {
                    channel.active = false;
                }
            }
        }
    }

    /// Start every enabled channel waiting for one of `triggers`.
    pub fn trigger(&mut self, triggers: BlankTriggers) {
        for channel in &mut self.channels {
            let fire = match channel.timing() {
                Timing::VBlank => triggers.vblank,
                Timing::HBlank => triggers.hblank,
                _ => false,
            };
            if fire && channel.enabled() {
                channel.active = true;
            }
        }
    }

    /// Highest-priority channel with a transfer to run.
    pub fn next_transfer(&self) -> Option<Transfer> {
        self.channels
            .iter()
            .find(|channel| channel.active)
            .map(Channel::transfer)
    }

    /// Record the end of a transfer: final addresses, repeat or disable.
    /// Returns true if the channel requests its interrupt.
    pub fn finish(&mut self, transfer: &Transfer, source: u32, dest: u32) -> bool {
        let channel = &mut self.channels[transfer.channel];
        channel.internal_source = source;
        channel.active = false;
        let control = channel.control.get();
        if control & REPEAT != 0 && channel.timing() != Timing::Immediate {
            channel.internal_dest = if transfer.dest_step == Step::IncrementReload {
                channel.dest & channel.dest_mask()
            } else {
                dest
            };
        } else {
            channel.internal_dest = dest;
            channel.control.set(control & !ENABLE);
        }
        control & IRQ_ENABLE != 0
    }
}
