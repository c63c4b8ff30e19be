use thiserror::Error;

use crate::config::{BIOS_SIZE, MAX_ROM_SIZE};

/// Problems with the images a machine is built from.
///
/// Once a [`Gba`](crate::Gba) exists nothing can fail: guest faults are
/// architectural exceptions, not Rust errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GbaError {
    #[error("BIOS image is {0} bytes, expected {expected}", expected = BIOS_SIZE)]
    BiosSize(usize),
    #[error("ROM image is empty")]
    EmptyRom,
    #[error("ROM image is {0} bytes, larger than the {max}-byte cartridge space", max = MAX_ROM_SIZE)]
    RomTooLarge(usize),
}
