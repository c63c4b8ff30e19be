//! Machine configuration and hardware timing constants.

/// CPU clock: 2^24 Hz.
pub const CPU_HZ: u32 = 16_777_216;

/// Cycles per scanline dot.
pub const CYCLES_PER_DOT: u32 = 4;
/// Visible dots per line; HBlank starts after them.
pub const HDRAW_CYCLES: u32 = 240 * CYCLES_PER_DOT;
/// Cycles per scanline, HBlank included.
pub const CYCLES_PER_LINE: u32 = 308 * CYCLES_PER_DOT;
/// Visible lines; VBlank starts after them.
pub const VISIBLE_LINES: u16 = 160;
/// Lines per frame, VBlank included.
pub const LINES_PER_FRAME: u16 = 228;
/// One video frame.
pub const CYCLES_PER_FRAME: i32 = (CYCLES_PER_LINE * LINES_PER_FRAME as u32) as i32;

pub const BIOS_SIZE: usize = 16 * 1024;
pub const MAX_ROM_SIZE: usize = 32 * 1024 * 1024;

/// Stack pointers the BIOS leaves behind before jumping to the cartridge.
pub const SKIP_BIOS_SP_SVC: u32 = 0x0300_7FE0;
pub const SKIP_BIOS_SP_IRQ: u32 = 0x0300_7FA0;
pub const SKIP_BIOS_SP_SYS: u32 = 0x0300_7F00;
/// Cartridge entry point.
pub const ROM_ENTRY: u32 = 0x0800_0000;

/// Configuration for creating a GBA instance.
#[derive(Debug, Clone)]
pub struct GbaConfig {
    /// 16 KiB BIOS image. Without one the machine starts at the cartridge
    /// entry point in the state the BIOS would have left.
    pub bios: Option<Vec<u8>>,
    /// Cartridge ROM image.
    pub rom: Vec<u8>,
    /// Skip straight to the next peripheral event while halted instead of
    /// ticking one cycle at a time. Both produce the same machine state.
    pub halt_fast_forward: bool,
}

impl GbaConfig {
    /// Boot `rom` directly, with halt fast-forward on.
    #[must_use]
    pub fn new(rom: Vec<u8>) -> Self {
        Self {
            bios: None,
            rom,
            halt_fast_forward: true,
        }
    }
}

impl Default for GbaConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_280896_cycles() {
        assert_eq!(CYCLES_PER_FRAME, 280_896);
        assert_eq!(CYCLES_PER_LINE - HDRAW_CYCLES, 272);
    }

    #[test]
    fn sixty_frames_take_about_a_second() {
        let second = CYCLES_PER_FRAME as u32 * 60;
        assert!(second.abs_diff(CPU_HZ) < CPU_HZ / 100);
    }
}
