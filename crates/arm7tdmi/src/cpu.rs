//! ARM7TDMI fetch/execute loop.
//!
//! # Pipeline model
//!
//! The three-stage pipeline is folded into r15. Between steps r15 holds
//! the address of the next instruction plus one instruction width. A step
//! fetches at `r15 - width`, advances r15 by one width, then executes, so
//! the executing instruction sees r15 = its own address + 2 × width (ARM
//! +8, THUMB +4) as the hardware does.
//!
//! Writing r15 flushes the pipeline. [`Arm7tdmi::branch`] pays for the
//! refill (a non-sequential fetch at the target and a sequential one after
//! it) and leaves r15 one width past the target.
//!
//! # Fetch access kind
//!
//! The opcode fetch is sequential unless the previous step touched data
//! memory, the pipeline was flushed, or the core was just reset.

use emu_core::{Access, Bus, Cpu, Observable, ReadResult, Value, Width};
use log::{Level, log_enabled, trace};

use crate::disasm;
use crate::exception::Exception;
use crate::mode::Mode;
use crate::psr::Psr;
use crate::registers::{PC, RegisterFile};

/// ARM7TDMI CPU.
#[derive(Debug, Clone)]
pub struct Arm7tdmi {
    pub(crate) regs: RegisterFile,
    /// Access kind of the next opcode fetch.
    pub(crate) next_fetch: Access,
    /// Synchronous exception raised by the executing instruction.
    pub(crate) raised: Option<Exception>,
    /// Total cycles reported by `step`.
    cycles: u64,
}

impl Default for Arm7tdmi {
    fn default() -> Self {
        Self::new()
    }
}

impl Arm7tdmi {
    /// A CPU in its reset state, about to fetch from address 0.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: RegisterFile::new(),
            next_fetch: Access::NonSequential,
            raised: None,
            cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Current instruction width in bytes (4 in ARM state, 2 in THUMB).
    #[must_use]
    pub fn width(&self) -> u32 {
        self.fetch_width().bytes()
    }

    pub(crate) fn fetch_width(&self) -> Width {
        if self.regs.cpsr().thumb() {
            Width::Half
        } else {
            Width::Word
        }
    }

    #[must_use]
    pub fn cpsr(&self) -> Psr {
        self.regs.cpsr()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.regs.mode()
    }

    /// Register file, for boot setup and debuggers.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Total cycles executed since reset.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Redirect execution to `address` without charging a pipeline refill.
    ///
    /// The next fetch is non-sequential. The width follows the current T bit.
    pub fn set_pc(&mut self, address: u32) {
        let width = self.fetch_width();
        let address = address & width.align_mask();
        self.regs.set(PC, address.wrapping_add(width.bytes()));
        self.next_fetch = Access::NonSequential;
    }

    /// Flush the pipeline and continue at `target`. Returns the refill cost.
    pub(crate) fn branch<B: Bus>(&mut self, bus: &mut B, target: u32) -> u32 {
        let width = self.fetch_width();
        let target = target & width.align_mask();
        let next = target.wrapping_add(width.bytes());
        let first = bus.read(target, width, Access::NonSequential).cycles;
        let second = bus.read(next, width, Access::Sequential).cycles;
        self.regs.set(PC, next);
        self.next_fetch = Access::Sequential;
        first + second
    }

    /// Data read. The address is aligned down to `width`.
    pub(crate) fn read_data<B: Bus>(
        &mut self,
        bus: &mut B,
        address: u32,
        width: Width,
        access: Access,
    ) -> ReadResult {
        self.next_fetch = Access::NonSequential;
        bus.read(address & width.align_mask(), width, access)
    }

    /// Data write. The address is aligned down to `width`.
    pub(crate) fn write_data<B: Bus>(
        &mut self,
        bus: &mut B,
        address: u32,
        width: Width,
        access: Access,
        value: u32,
    ) -> u32 {
        self.next_fetch = Access::NonSequential;
        bus.write(address & width.align_mask(), width, access, value)
    }

    /// Write the CPSR, logging reserved mode encodings.
    pub(crate) fn write_cpsr(&mut self, value: Psr) {
        if !self.regs.set_cpsr(value) {
            log::warn!(
                "invalid mode {:#04X} written to CPSR at {:#010X}; staying in {}",
                value.mode_bits(),
                self.executing_address(),
                self.regs.mode().name()
            );
        }
    }

    /// CPSR ← SPSR, used by exception returns.
    pub(crate) fn restore_cpsr(&mut self) {
        if let Some(spsr) = self.regs.spsr() {
            self.write_cpsr(spsr);
        } else {
            log::warn!(
                "exception return in {} mode has no SPSR at {:#010X}",
                self.regs.mode().name(),
                self.executing_address()
            );
        }
    }

    /// Address of the executing instruction (valid during execution only).
    pub(crate) fn executing_address(&self) -> u32 {
        self.regs.get(PC).wrapping_sub(2 * self.width())
    }

    fn trace_instruction(&self, address: u32, opcode: u32) {
        let text = if self.regs.cpsr().thumb() {
            disasm::thumb(opcode as u16, address)
        } else {
            disasm::arm(opcode, address)
        };
        trace!(
            "{address:08X}: {opcode:0width$X}  {text:<32} cpsr={:08X} {}",
            self.regs.cpsr().bits(),
            self.regs.mode().name(),
            width = (self.width() * 2) as usize
        );
    }
}

impl Cpu for Arm7tdmi {
    type Registers = RegisterFile;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if let Some(exception) = self.pending_interrupt(bus) {
            let cycles = self.enter_exception(bus, exception);
            self.cycles += u64::from(cycles);
            return cycles;
        }

        let width = self.fetch_width();
        let address = self.regs.get(PC).wrapping_sub(width.bytes());
        let fetch = bus.read(address, width, self.next_fetch);
        self.next_fetch = Access::Sequential;
        self.regs.set(PC, self.regs.get(PC).wrapping_add(width.bytes()));

        if log_enabled!(Level::Trace) {
            self.trace_instruction(address, fetch.data);
        }

        let mut cycles = fetch.cycles;
        cycles += match width {
            Width::Half => self.execute_thumb(bus, fetch.data as u16),
            _ => self.execute_arm(bus, fetch.data),
        };
        if let Some(exception) = self.raised.take() {
            cycles += self.enter_exception(bus, exception);
        }

        self.cycles += u64::from(cycles);
        cycles
    }

    fn pc(&self) -> u32 {
        self.regs.get(PC).wrapping_sub(self.width())
    }

    fn registers(&self) -> RegisterFile {
        self.regs.clone()
    }

    fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.raised = None;
        self.cycles = 0;
        self.enter_mode(Exception::Reset);
        self.set_pc(Exception::Reset.vector());
    }
}

const QUERY_PATHS: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15", "sp", "lr", "pc", "cpsr", "spsr", "mode", "thumb", "flags.n", "flags.z",
    "flags.c", "flags.v", "flags.i", "flags.f", "cycles",
];

impl Observable for Arm7tdmi {
    fn query(&self, path: &str) -> Option<Value> {
        let cpsr = self.regs.cpsr();
        if let Some(flag) = path.strip_prefix("flags.") {
            let set = match flag {
                "n" => cpsr.n(),
                "z" => cpsr.z(),
                "c" => cpsr.c(),
                "v" => cpsr.v(),
                "i" => cpsr.irq_disabled(),
                "f" => cpsr.fiq_disabled(),
                _ => return None,
            };
            return Some(set.into());
        }
        if let Some(index) = path.strip_prefix('r').and_then(|n| n.parse::<usize>().ok()) {
            return (index < 16).then(|| self.regs.get(index).into());
        }
        match path {
            "sp" => Some(self.regs.get(13).into()),
            "lr" => Some(self.regs.get(14).into()),
            "pc" => Some(Cpu::pc(self).into()),
            "cpsr" => Some(cpsr.bits().into()),
            "spsr" => self.regs.spsr().map(|spsr| spsr.bits().into()),
            "mode" => Some(self.regs.mode().name().into()),
            "thumb" => Some(cpsr.thumb().into()),
            "cycles" => Some(self.cycles.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
