//! Top-level GBA system.
//!
//! Owns the CPU and the bus (which owns every peripheral). Time only moves
//! through the scheduler in `scheduler.rs`.

use arm7tdmi::{Arm7tdmi, Mode, Psr};
use emu_core::{Cpu, Observable, Value, Width};
use log::info;

use crate::bus::GbaBus;
use crate::config::{
    BIOS_SIZE, GbaConfig, MAX_ROM_SIZE, ROM_ENTRY, SKIP_BIOS_SP_IRQ, SKIP_BIOS_SP_SVC,
    SKIP_BIOS_SP_SYS,
};
use crate::error::GbaError;

/// GBA system.
pub struct Gba {
    pub(crate) cpu: Arm7tdmi,
    pub(crate) bus: GbaBus,
    /// Jump over halted time to the next peripheral event.
    pub(crate) halt_fast_forward: bool,
    /// No BIOS image: start at the cartridge entry point.
    skip_bios: bool,
    /// Budget overspent by the last frame, zero or negative.
    pub(crate) overspent: i32,
    /// Completed frame counter.
    pub(crate) frame_count: u64,
}

impl Gba {
    /// Create a new GBA from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the BIOS image is not 16 KiB or the ROM image is
    /// empty or larger than the cartridge address space.
    pub fn new(config: &GbaConfig) -> Result<Self, GbaError> {
        if let Some(len) = config.bios.as_ref().map(Vec::len).filter(|&len| len != BIOS_SIZE) {
            return Err(GbaError::BiosSize(len));
        }
        if config.rom.is_empty() {
            return Err(GbaError::EmptyRom);
        }
        if config.rom.len() > MAX_ROM_SIZE {
            return Err(GbaError::RomTooLarge(config.rom.len()));
        }

        info!(
            "GBA: {} KiB ROM, {}",
            config.rom.len().div_ceil(1024),
            if config.bios.is_some() {
                "booting through BIOS"
            } else {
                "no BIOS, starting at cartridge entry"
            }
        );

        let mut gba = Self {
            cpu: Arm7tdmi::new(),
            bus: GbaBus::new(config.bios.as_deref(), config.rom.clone()),
            halt_fast_forward: config.halt_fast_forward,
            skip_bios: config.bios.is_none(),
            overspent: 0,
            frame_count: 0,
        };
        gba.reset();
        Ok(gba)
    }

    /// Power-cycle the machine. ROM and save RAM are kept.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset();
        self.overspent = 0;
        self.frame_count = 0;
        if self.skip_bios {
            self.boot_cartridge();
        }
    }

    /// Register state the BIOS leaves when it hands over to the cartridge.
    fn boot_cartridge(&mut self) {
        let regs = self.cpu.registers_mut();
        regs.set_banked(Mode::Supervisor, SKIP_BIOS_SP_SVC, 0);
        regs.set_banked(Mode::Irq, SKIP_BIOS_SP_IRQ, 0);
        regs.set_cpsr(Psr(Mode::System.bits()));
        regs.set(13, SKIP_BIOS_SP_SYS);
        self.cpu.set_pc(ROM_ENTRY);
    }

    #[must_use]
    pub fn cpu(&self) -> &Arm7tdmi {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Arm7tdmi {
        &mut self.cpu
    }

    /// Whether the CPU is waiting in HALTCNT for an interrupt.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.bus.halted
    }

    /// Total machine cycles since reset.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.bus.ticked()
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Read memory without side effects or cost.
    #[must_use]
    pub fn peek(&self, address: u32, width: Width) -> u32 {
        self.bus.peek(address, width)
    }
}

fn parse_address(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl Observable for Gba {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("timer") {
            let (index, field) = rest.split_once('.')?;
            let index: usize = index.parse().ok().filter(|&i| i < 4)?;
            (field == "counter").then(|| self.bus.timers.counter(index).into())
        } else if let Some(rest) = path.strip_prefix("display.") {
            match rest {
                "vcount" => Some(self.bus.display.vcount().into()),
                "dispstat" => Some(self.bus.display.status.get().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("irq.") {
            let irq = &self.bus.interrupts;
            match rest {
                "ie" => Some(irq.enable.get().into()),
                "if" => Some(irq.flags.get().into()),
                "ime" => Some(irq.master.any(1).into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|address| Value::U8(self.bus.peek(address, Width::Byte) as u8))
        } else {
            match path {
                "halted" => Some(self.bus.halted.into()),
                "cycles" => Some(self.bus.ticked().into()),
                "frame_count" => Some(self.frame_count.into()),
                _ => self.cpu.query(path),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<arm7tdmi_paths>",
            "timer0.counter",
            "timer1.counter",
            "timer2.counter",
            "timer3.counter",
            "display.vcount",
            "display.dispstat",
            "irq.ie",
            "irq.if",
            "irq.ime",
            "memory.<address>",
            "halted",
            "cycles",
            "frame_count",
        ]
    }
}
