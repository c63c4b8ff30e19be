//! Game Boy Advance machine built around the ARM7TDMI core.
//!
//! Everything is clocked by the CPU at 16.78 MHz. Each CPU step reports
//! how many cycles it took (fetch, data accesses and internal cycles, with
//! the wait states of every region it touched), and the peripherals are
//! then advanced by exactly that amount:
//! - Display: 1232 cycles per line (960 drawing + 272 HBlank), 228 lines
//!   per frame (160 visible + 68 VBlank), 280,896 cycles per frame.
//! - Timers: prescaled from the CPU clock (1/64/256/1024) or cascaded.
//! - DMA: runs between CPU steps and is charged like CPU accesses.
//!
//! While the CPU is halted the scheduler skips straight to the next
//! peripheral event instead of ticking one cycle at a time.

mod bus;
pub mod config;
mod display;
mod dma;
mod error;
mod gba;
mod interrupt;
mod scheduler;
mod timer;

pub use config::GbaConfig;
pub use error::GbaError;
pub use gba::Gba;
pub use interrupt::Interrupt;
