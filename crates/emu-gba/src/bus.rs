//! GBA bus: memory map, wait states and I/O dispatch.
//!
//! Implements `emu_core::Bus` for the ARM7TDMI. Every access is priced
//! from the region it hits and whether it is sequential:
//!
//! | Region      | Bus    | 8/16-bit | 32-bit        |
//! |-------------|--------|----------|---------------|
//! | BIOS, IWRAM, I/O, OAM | 32 | 1 | 1             |
//! | EWRAM       | 16     | 3        | 6             |
//! | Palette, VRAM | 16   | 1        | 2             |
//! | ROM (WS0-2) | 16     | 1 + N/S wait | N/S + S   |
//! | SRAM        | 8      | 1 + wait | 1 + wait      |
//!
//! ROM and SRAM wait states come from WAITCNT. Unmapped reads return 0.

use emu_core::{Access, Bus, IoReg, ReadResult, Tickable, Width};
use log::{debug, trace};

use crate::config::BIOS_SIZE;
use crate::display::Display;
use crate::dma::Dma;
use crate::interrupt::{Interrupt, InterruptController};
use crate::timer::Timers;

const EWRAM_SIZE: usize = 256 * 1024;
const IWRAM_SIZE: usize = 32 * 1024;
const PALETTE_SIZE: usize = 1024;
const VRAM_SIZE: usize = 96 * 1024;
const OAM_SIZE: usize = 1024;
const SRAM_SIZE: usize = 64 * 1024;

/// Wait states for WAITCNT's two-bit non-sequential fields (also SRAM).
const NONSEQ_WAIT: [u32; 4] = [4, 3, 2, 8];
/// Wait states for the sequential bit of WS0, WS1 and WS2.
const SEQ_WAIT: [[u32; 2]; 3] = [[2, 1], [4, 1], [8, 1]];

/// KEYINPUT with every button released.
const KEYS_RELEASED: u16 = 0x03FF;

/// IRQ dispatcher installed when no BIOS image is given: the BIOS's own
/// handler at 0x18/0x128, which saves the scratch registers and calls the
/// user handler stored at 0x0300_7FFC. SWIs return immediately.
const HLE_BIOS: &[(u32, u32)] = &[
    (0x008, 0xE1B0_F00E), // movs pc, lr
    (0x018, 0xEA00_0042), // b 0x128
    (0x128, 0xE92D_500F), // stmfd sp!, {r0-r3, r12, lr}
    (0x12C, 0xE3A0_0301), // mov r0, #0x04000000
    (0x130, 0xE28F_E000), // add lr, pc, #0
    (0x134, 0xE510_F004), // ldr pc, [r0, #-4]
    (0x138, 0xE8BD_500F), // ldmfd sp!, {r0-r3, r12, lr}
    (0x13C, 0xE25E_F004), // subs pc, lr, #4
];

/// Write the byte lanes selected by `lanes` (0x00FF, 0xFF00 or 0xFFFF)
/// of a halfword register.
pub(crate) fn store(reg: &mut IoReg, value: u16, lanes: u16) {
    match lanes {
        0x00FF => reg.write_byte(false, value as u8),
        0xFF00 => reg.write_byte(true, (value >> 8) as u8),
        _ => reg.write(value),
    }
}

fn read_le(memory: &[u8], offset: usize, width: Width) -> u32 {
    memory
        .get(offset..offset + width.bytes() as usize)
        .map_or(0, |bytes| {
            bytes
                .iter()
                .rev()
                .fold(0, |acc, &byte| (acc << 8) | u32::from(byte))
        })
}

fn write_le(memory: &mut [u8], offset: usize, width: Width, value: u32) {
    if let Some(bytes) = memory.get_mut(offset..offset + width.bytes() as usize) {
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (value >> (8 * i)) as u8;
        }
    }
}

/// VRAM is 96 KiB mirrored in 128 KiB steps; the last 32 KiB of each step
/// repeats the 32 KiB before it.
fn vram_offset(address: u32) -> usize {
    let offset = address & 0x1_FFFF;
    (if offset >= 0x1_8000 { offset - 0x8000 } else { offset }) as usize
}

/// The GBA bus, implementing `emu_core::Bus`.
pub struct GbaBus {
    bios: Vec<u8>,
    ewram: Vec<u8>,
    iwram: Vec<u8>,
    palette: Vec<u8>,
    vram: Vec<u8>,
    oam: Vec<u8>,
    rom: Vec<u8>,
    sram: Vec<u8>,
    pub(crate) interrupts: InterruptController,
    pub(crate) timers: Timers,
    pub(crate) display: Display,
    pub(crate) dma: Dma,
    /// WAITCNT (0x204).
    waitcnt: IoReg,
    /// POSTFLG (0x300): set once the BIOS boot sequence has run.
    postflg: u8,
    /// Set by a HALTCNT write, cleared by the scheduler on wake-up.
    pub(crate) halted: bool,
    /// Registers without behaviour here (video, sound, serial), kept so
    /// software reads back what it wrote.
    io: Box<[u16; 0x200]>,
    /// Cycles ticked into the peripherals since reset.
    ticked: u64,
}

impl GbaBus {
    /// Build the bus around validated images. Without a BIOS the built-in
    /// IRQ dispatcher is installed and POSTFLG reads as booted.
    #[must_use]
    pub fn new(bios: Option<&[u8]>, rom: Vec<u8>) -> Self {
        let booted = bios.is_none();
        let mut image = vec![0; BIOS_SIZE];
        match bios {
            Some(bios) => image.copy_from_slice(bios),
            None => {
                for &(address, word) in HLE_BIOS {
                    write_le(&mut image, address as usize, Width::Word, word);
                }
            }
        }
        Self {
            bios: image,
            ewram: vec![0; EWRAM_SIZE],
            iwram: vec![0; IWRAM_SIZE],
            palette: vec![0; PALETTE_SIZE],
            vram: vec![0; VRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            rom,
            sram: vec![0xFF; SRAM_SIZE],
            interrupts: InterruptController::new(),
            timers: Timers::new(),
            display: Display::new(),
            dma: Dma::new(),
            waitcnt: IoReg::new(0, 0xFFFF, 0x7FFF),
            postflg: u8::from(booted),
            halted: false,
            io: Box::new([0; 0x200]),
            ticked: 0,
        }
    }

    /// Power-on state for RAM and I/O. BIOS, ROM and save RAM survive.
    pub fn reset(&mut self) {
        for memory in [
            &mut self.ewram,
            &mut self.iwram,
            &mut self.palette,
            &mut self.vram,
            &mut self.oam,
        ] {
            memory.fill(0);
        }
        self.interrupts = InterruptController::new();
        self.timers = Timers::new();
        self.display = Display::new();
        self.dma = Dma::new();
        self.waitcnt.set(0);
        self.halted = false;
        self.io.fill(0);
        self.ticked = 0;
    }

    /// Cycles ticked into the peripherals since reset.
    #[must_use]
    pub fn ticked(&self) -> u64 {
        self.ticked
    }

    /// Read without side effects or cost (for observation).
    #[must_use]
    pub fn peek(&self, address: u32, width: Width) -> u32 {
        self.read_value(address & width.align_mask(), width)
    }

    fn rom_wait(&self, state: u32, access: Access) -> u32 {
        let waitcnt = u32::from(self.waitcnt.get());
        match access {
            Access::NonSequential => NONSEQ_WAIT[((waitcnt >> (2 + 3 * state)) & 3) as usize],
            Access::Sequential => {
                SEQ_WAIT[state as usize][((waitcnt >> (4 + 3 * state)) & 1) as usize]
            }
        }
    }

    fn access_cycles(&self, address: u32, width: Width, access: Access) -> u32 {
        let word = width == Width::Word;
        match address >> 24 {
            0x02 => {
                if word {
                    6
                } else {
                    3
                }
            }
            0x05 | 0x06 => 1 + u32::from(word),
            region @ 0x08..=0x0D => {
                let state = (region - 0x08) / 2;
                let first = 1 + self.rom_wait(state, access);
                if word {
                    first + 1 + self.rom_wait(state, Access::Sequential)
                } else {
                    first
                }
            }
            0x0E | 0x0F => 1 + NONSEQ_WAIT[usize::from(self.waitcnt.get() & 3)],
            _ => 1,
        }
    }

    fn read_value(&self, address: u32, width: Width) -> u32 {
        match address >> 24 {
            0x00 => read_le(&self.bios, address as usize, width),
            0x02 => read_le(&self.ewram, (address & 0x3_FFFF) as usize, width),
            0x03 => read_le(&self.iwram, (address & 0x7FFF) as usize, width),
            0x04 => self.read_io(address & 0x00FF_FFFF, width),
            0x05 => read_le(&self.palette, (address & 0x3FF) as usize, width),
            0x06 => read_le(&self.vram, vram_offset(address), width),
            0x07 => read_le(&self.oam, (address & 0x3FF) as usize, width),
            0x08..=0x0D => read_le(&self.rom, (address & 0x01FF_FFFF) as usize, width),
            // 8-bit bus: the byte appears on every lane.
            0x0E | 0x0F => u32::from(self.sram[(address & 0xFFFF) as usize]) * 0x0101_0101,
            _ => {
                trace!("unmapped {width:?} read at {address:#010X}");
                0
            }
        }
    }

    fn write_value(&mut self, address: u32, width: Width, value: u32) {
        match address >> 24 {
            0x02 => write_le(&mut self.ewram, (address & 0x3_FFFF) as usize, width, value),
            0x03 => write_le(&mut self.iwram, (address & 0x7FFF) as usize, width, value),
            0x04 => self.write_io(address & 0x00FF_FFFF, width, value),
            // Byte writes to palette and VRAM land on both halves.
            0x05 | 0x06 => {
                let (offset, width, value) = match width {
                    Width::Byte => (address & !1, Width::Half, (value & 0xFF) * 0x0101),
                    _ => (address, width, value),
                };
                if address >> 24 == 0x05 {
                    write_le(&mut self.palette, (offset & 0x3FF) as usize, width, value);
                } else {
                    write_le(&mut self.vram, vram_offset(offset), width, value);
                }
            }
            0x07 if width != Width::Byte => {
                write_le(&mut self.oam, (address & 0x3FF) as usize, width, value);
            }
            0x0E | 0x0F => self.sram[(address & 0xFFFF) as usize] = value as u8,
            _ => trace!("ignored {width:?} write of {value:#X} at {address:#010X}"),
        }
    }

    fn read_io(&self, offset: u32, width: Width) -> u32 {
        match width {
            Width::Word => {
                u32::from(self.io_read(offset)) | (u32::from(self.io_read(offset + 2)) << 16)
            }
            Width::Half => u32::from(self.io_read(offset)),
            Width::Byte => (u32::from(self.io_read(offset & !1)) >> (8 * (offset & 1))) & 0xFF,
        }
    }

    fn write_io(&mut self, offset: u32, width: Width, value: u32) {
        match width {
            Width::Word => {
                self.io_write(offset, value as u16, 0xFFFF);
                self.io_write(offset + 2, (value >> 16) as u16, 0xFFFF);
            }
            Width::Half => self.io_write(offset, value as u16, 0xFFFF),
            Width::Byte => {
                let shift = 8 * (offset & 1);
                self.io_write(offset & !1, ((value & 0xFF) << shift) as u16, 0xFF << shift);
            }
        }
    }

    fn io_read(&self, offset: u32) -> u16 {
        match offset {
            0x000 | 0x004 | 0x006 => self.display.read(offset),
            0x0B0..=0x0DF => self.dma.read(offset - 0x0B0),
            0x100..=0x10F => self.timers.read(offset - 0x100),
            0x130 => KEYS_RELEASED,
            0x200 => self.interrupts.enable.read(),
            0x202 => self.interrupts.flags.read(),
            0x204 => self.waitcnt.read(),
            0x208 => self.interrupts.master.read(),
            // HALTCNT is write-only.
            0x300 => u16::from(self.postflg),
            0x000..=0x3FF => self.io[(offset >> 1) as usize],
            _ => {
                trace!("unmapped I/O read at {offset:#05X}");
                0
            }
        }
    }

    fn io_write(&mut self, offset: u32, value: u16, lanes: u16) {
        match offset {
            0x000 | 0x004 => self.display.write(offset, value, lanes),
            0x006 | 0x130 => {}
            0x0B0..=0x0DF => self.dma.write(offset - 0x0B0, value, lanes),
            0x100..=0x10F => self.timers.write(offset - 0x100, value, lanes),
            0x200 => store(&mut self.interrupts.enable, value, lanes),
            0x202 => self.interrupts.acknowledge(value & lanes),
            0x204 => store(&mut self.waitcnt, value, lanes),
            0x208 => store(&mut self.interrupts.master, value, lanes),
            0x300 => {
                if lanes & 0x00FF != 0 {
                    self.postflg = (value & 1) as u8;
                }
                if lanes & 0xFF00 != 0 {
                    self.halt_control((value >> 8) as u8);
                }
            }
            0x000..=0x3FF => {
                let slot = &mut self.io[(offset >> 1) as usize];
                *slot = (*slot & !lanes) | (value & lanes);
            }
            _ => trace!("ignored I/O write of {value:#06X} at {offset:#05X}"),
        }
    }

    /// HALTCNT: bit 7 clear halts until an enabled interrupt is requested.
    fn halt_control(&mut self, value: u8) {
        if value & 0x80 == 0 {
            debug!(
                "halt: IE={:#06X} IF={:#06X}",
                self.interrupts.enable.get(),
                self.interrupts.flags.get()
            );
            self.halted = true;
        } else {
            debug!("stop mode requested; not emulated");
        }
    }

    /// Run the highest-priority pending DMA transfer to completion.
    /// Returns its cost, or `None` if no channel is active.
    ///
    /// A transfer costs 2 internal cycles plus its reads and writes, the
    /// first of each non-sequential.
    pub fn run_dma(&mut self) -> Option<u32> {
        let transfer = self.dma.next_transfer()?;
        let width = if transfer.word {
            Width::Word
        } else {
            Width::Half
        };
        let unit = width.bytes();
        let mut source = transfer.source;
        let mut dest = transfer.dest;
        let mut access = Access::NonSequential;
        let mut cycles = 2;
        for _ in 0..transfer.count {
            let read = self.read(source, width, access);
            cycles += read.cycles;
            cycles += self.write(dest, width, access, read.data);
            access = Access::Sequential;
            source = transfer.source_step.apply(source, unit);
            dest = transfer.dest_step.apply(dest, unit);
        }
        trace!(
            "DMA{} moved {} units to {:#010X}: {cycles} cycles",
            transfer.channel,
            transfer.count,
            transfer.dest
        );
        if self.dma.finish(&transfer, source, dest) {
            self.interrupts
                .request(Interrupt::dma(transfer.channel).mask());
        }
        Some(cycles)
    }
}

impl Bus for GbaBus {
    fn read(&mut self, address: u32, width: Width, access: Access) -> ReadResult {
        let address = address & width.align_mask();
        ReadResult::new(
            self.read_value(address, width),
            self.access_cycles(address, width, access),
        )
    }

    fn write(&mut self, address: u32, width: Width, access: Access, value: u32) -> u32 {
        let address = address & width.align_mask();
        self.write_value(address, width, value);
        self.access_cycles(address, width, access)
    }

    fn irq_pending(&self) -> bool {
        self.interrupts.irq_line()
    }
}

impl Tickable for GbaBus {
    /// Advance display and timers, latch their interrupt requests and start
    /// any DMA waiting on a blank period.
    fn tick(&mut self, cycles: u32) {
        self.display.tick(cycles);
        self.timers.tick(cycles);
        let irq = self.display.take_irq() | self.timers.take_irq();
        self.interrupts.request(irq);
        let triggers = self.display.take_triggers();
        self.dma.trigger(triggers);
        self.ticked += u64::from(cycles);
    }

    fn next_event(&self) -> Option<u32> {
        [self.display.next_event(), self.timers.next_event()]
            .into_iter()
            .flatten()
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bus() -> GbaBus {
        let rom: Vec<u8> = (0..=255).collect();
        GbaBus::new(None, rom)
    }

    #[test]
    fn iwram_mirrors_every_32k() {
        let mut bus = make_bus();
        bus.write(0x0300_0010, Width::Word, Access::NonSequential, 0xDEAD_BEEF);
        assert_eq!(bus.peek(0x0300_8010, Width::Word), 0xDEAD_BEEF);
        assert_eq!(bus.peek(0x03FF_8012, Width::Half), 0xDEAD);
    }

    #[test]
    fn rom_reads_are_little_endian() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0x0800_0004, Width::Word, Access::Sequential).data, 0x0706_0504);
        assert_eq!(bus.read(0x0A00_0001, Width::Byte, Access::Sequential).data, 1);
        assert_eq!(bus.peek(0x0800_1000, Width::Word), 0, "past the end of the image");
    }

    #[test]
    fn rom_wait_states_follow_waitcnt() {
        let mut bus = make_bus();
        let n = Access::NonSequential;
        let s = Access::Sequential;
        assert_eq!(bus.read(0x0800_0000, Width::Half, n).cycles, 5);
        assert_eq!(bus.read(0x0800_0002, Width::Half, s).cycles, 3);
        assert_eq!(bus.read(0x0800_0000, Width::Word, n).cycles, 5 + 3);

        // WS0 N=3 (bits 3..2 = 1), WS0 S=1 (bit 4).
        bus.write(0x0400_0204, Width::Half, n, 0x0014);
        assert_eq!(bus.read(0x0800_0000, Width::Word, n).cycles, 4 + 2);
        assert_eq!(bus.read(0x0800_0004, Width::Word, s).cycles, 2 + 2);
        // WS2 keeps its defaults.
        assert_eq!(bus.read(0x0C00_0000, Width::Half, s).cycles, 9);
    }

    #[test]
    fn ewram_word_costs_two_halfword_accesses() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0x0200_0000, Width::Half, Access::NonSequential).cycles, 3);
        assert_eq!(bus.read(0x0200_0000, Width::Word, Access::Sequential).cycles, 6);
        assert_eq!(bus.read(0x0300_0000, Width::Word, Access::NonSequential).cycles, 1);
        assert_eq!(bus.write(0x0600_0000, Width::Word, Access::NonSequential, 0), 2);
    }

    #[test]
    fn unmapped_reads_return_zero() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0x1000_0000, Width::Word, Access::NonSequential).data, 0);
        assert_eq!(bus.peek(0x0000_4000, Width::Word), 0);
    }

    #[test]
    fn palette_byte_write_fills_halfword() {
        let mut bus = make_bus();
        bus.write(0x0500_0003, Width::Byte, Access::NonSequential, 0x1F);
        assert_eq!(bus.peek(0x0500_0002, Width::Half), 0x1F1F);
    }

    #[test]
    fn oam_ignores_byte_writes() {
        let mut bus = make_bus();
        bus.write(0x0700_0000, Width::Byte, Access::NonSequential, 0xAA);
        assert_eq!(bus.peek(0x0700_0000, Width::Half), 0);
    }

    #[test]
    fn sram_is_byte_wide() {
        let mut bus = make_bus();
        bus.write(0x0E00_0010, Width::Byte, Access::NonSequential, 0x5A);
        assert_eq!(bus.peek(0x0E00_0010, Width::Word), 0x5A5A_5A5A);
        assert_eq!(bus.read(0x0E00_0010, Width::Word, Access::Sequential).cycles, 5);
    }

    #[test]
    fn interrupt_flags_acknowledge_by_byte() {
        let mut bus = make_bus();
        bus.interrupts.request(0x0101);
        bus.write(0x0400_0203, Width::Byte, Access::NonSequential, 0x01);
        assert_eq!(bus.peek(0x0400_0202, Width::Half), 0x0001);
    }

    #[test]
    fn word_write_covers_ie_and_if() {
        let mut bus = make_bus();
        bus.interrupts.request(Interrupt::VBlank.mask());
        bus.write(0x0400_0200, Width::Word, Access::NonSequential, 0x0001_0001);
        assert_eq!(bus.interrupts.enable.get(), 1);
        assert_eq!(bus.interrupts.flags.get(), 0);
    }

    #[test]
    fn haltcnt_byte_write_halts() {
        let mut bus = make_bus();
        bus.write(0x0400_0301, Width::Byte, Access::NonSequential, 0x00);
        assert!(bus.halted);
        assert_eq!(bus.peek(0x0400_0300, Width::Byte), 1, "POSTFLG unaffected");
    }

    #[test]
    fn unknown_io_registers_read_back() {
        let mut bus = make_bus();
        bus.write(0x0400_0008, Width::Half, Access::NonSequential, 0x1C08);
        assert_eq!(bus.peek(0x0400_0008, Width::Half), 0x1C08);
        assert_eq!(bus.peek(0x0400_0130, Width::Half), 0x03FF);
    }

    #[test]
    fn irq_line_follows_controller() {
        let mut bus = make_bus();
        bus.write(0x0400_0200, Width::Half, Access::NonSequential, 0x0008);
        bus.write(0x0400_0208, Width::Half, Access::NonSequential, 1);
        // Timer 0: reload 0xFFFF, IRQ, start.
        bus.write(0x0400_0100, Width::Word, Access::NonSequential, 0x00C0_FFFF);
        assert!(!bus.irq_pending());
        bus.tick(1);
        assert!(bus.irq_pending());
    }

    #[test]
    fn immediate_dma_copies_and_charges() {
        let mut bus = make_bus();
        // DMA3: ROM -> IWRAM, 4 words, enable.
        bus.write(0x0400_00D4, Width::Word, Access::NonSequential, 0x0800_0000);
        bus.write(0x0400_00D8, Width::Word, Access::NonSequential, 0x0300_0100);
        bus.write(0x0400_00DC, Width::Word, Access::NonSequential, 0x8400_0004);

        let cycles = bus.run_dma().unwrap();
        assert_eq!(bus.peek(0x0300_010C, Width::Word), 0x0F0E_0D0C);
        // 2 I + ROM word N (8) + 3 ROM word S (6) + IWRAM writes (4 x 1).
        assert_eq!(cycles, 2 + 8 + 3 * 6 + 4);
        assert_eq!(bus.run_dma(), None);
        assert_eq!(bus.peek(0x0400_00DE, Width::Half) & 0x8000, 0);
    }

    #[test]
    fn hblank_dma_waits_for_display() {
        let mut bus = make_bus();
        bus.write(0x0400_00BC, Width::Word, Access::NonSequential, 0x0800_0000);
        bus.write(0x0400_00C0, Width::Word, Access::NonSequential, 0x0300_0000);
        bus.write(0x0400_00C4, Width::Word, Access::NonSequential, 0xA000_0001);
        assert_eq!(bus.run_dma(), None);

        bus.tick(960);
        assert!(bus.run_dma().is_some());
        assert_eq!(bus.peek(0x0300_0000, Width::Half), 0x0100);
    }

    #[test]
    fn next_event_is_earliest_peripheral() {
        let mut bus = make_bus();
        assert_eq!(bus.next_event(), Some(960));
        bus.write(0x0400_0100, Width::Word, Access::NonSequential, 0x00C0_FF00);
        assert_eq!(bus.next_event(), Some(0x100));
    }

    #[test]
    fn hle_bios_vectors_irq_to_dispatcher() {
        let bus = make_bus();
        assert_eq!(bus.peek(0x18, Width::Word), 0xEA00_0042);
        assert_eq!(bus.peek(0x13C, Width::Word), 0xE25E_F004);
    }
}
