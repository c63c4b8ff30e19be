//! CPU core trait.

use crate::Bus;

/// A CPU core driven one instruction at a time.
///
/// The bus is passed in, not owned, so the machine can share it with DMA
/// and other bus masters between steps. Every step reports how many clock
/// cycles it consumed; the caller advances all peripherals by exactly that
/// amount before the next step.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction (or one exception entry) and return the
    /// cycles it took, memory access costs included.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Address of the next instruction to execute.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
