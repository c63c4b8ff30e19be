//! ARM7TDMI CPU core.
//!
//! Executes one instruction per [`step`](emu_core::Cpu::step) and reports
//! its exact cycle cost: the opcode fetch, every data access priced by the
//! bus, internal cycles, and pipeline refills after a write to r15.
//!
//! Two independent decode tables cover the 32-bit ARM and 16-bit THUMB
//! encodings. The CPSR T bit selects which one the next fetch uses.

pub mod alu;
mod cpu;
pub mod decode;
pub mod disasm;
mod exception;
mod execute;
pub mod mode;
pub mod psr;
mod registers;

pub use cpu::Arm7tdmi;
pub use exception::Exception;
pub use mode::Mode;
pub use psr::Psr;
pub use registers::RegisterFile;
