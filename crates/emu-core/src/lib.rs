//! Core traits and types for cycle-accurate emulation.
//!
//! Time is counted in CPU clock cycles. A CPU reports how many cycles each
//! instruction took, and every peripheral is advanced by exactly that many
//! cycles before the next instruction runs.

mod bus;
mod cpu;
mod io_reg;
mod observable;
mod tickable;

pub use bus::{Access, Bus, ReadResult, SimpleBus, Width};
pub use cpu::Cpu;
pub use io_reg::IoReg;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
