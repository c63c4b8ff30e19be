//! Cycle scheduler: runs the CPU against a cycle budget and keeps every
//! peripheral in step with it.
//!
//! Each iteration does exactly one of: run a pending DMA transfer, sit out
//! halted time, or execute one CPU step. Whatever it costs is ticked into
//! the peripherals before the next iteration, so an instruction always
//! sees the hardware as of the end of the previous one.

use emu_core::{Cpu, Tickable};
use log::debug;

use crate::config::CYCLES_PER_FRAME;
use crate::gba::Gba;

impl Gba {
    /// Run until at least `target` cycles have elapsed.
    ///
    /// Returns `target` minus the cycles actually run, which is zero or
    /// negative once anything ran: the last step may overshoot. Add it to
    /// the next target to keep long-run timing exact. A target that is
    /// already zero or negative runs nothing and comes straight back.
    pub fn execute(&mut self, target: i32) -> i32 {
        let mut consumed: i32 = 0;
        while consumed < target {
            if self.bus.halted && self.bus.interrupts.wake() {
                debug!(
                    "halt exit after {} cycles: IF={:#06X}",
                    self.bus.ticked(),
                    self.bus.interrupts.flags.get()
                );
                self.bus.halted = false;
            }

            let cycles = if let Some(cycles) = self.bus.run_dma() {
                cycles
            } else if self.bus.halted {
                self.halt_cycles(target - consumed)
            } else {
                self.cpu.step(&mut self.bus)
            };

            self.bus.tick(cycles);
            consumed = consumed.saturating_add_unsigned(cycles);
        }
        target - consumed
    }

    /// Cycles to sit out while halted, never more than `remaining`.
    fn halt_cycles(&self, remaining: i32) -> u32 {
        let remaining = remaining.max(1) as u32;
        if !self.halt_fast_forward {
            return 1;
        }
        self.bus
            .next_event()
            .unwrap_or(remaining)
            .clamp(1, remaining)
    }

    /// Run one video frame, carrying the previous frame's overspend.
    ///
    /// Returns the cycles this call actually ran.
    pub fn run_frame(&mut self) -> u32 {
        let start = self.bus.ticked();
        self.overspent = self.execute(CYCLES_PER_FRAME + self.overspent);
        self.frame_count += 1;
        (self.bus.ticked() - start) as u32
    }
}

#[cfg(test)]
mod tests {
    use emu_core::{Observable, Value};

    use crate::config::{CYCLES_PER_FRAME, CYCLES_PER_LINE, GbaConfig};
    use crate::gba::Gba;

    /// `b .` at the cartridge entry point.
    fn spin() -> Gba {
        Gba::new(&GbaConfig::new(0xEAFF_FFFEu32.to_le_bytes().to_vec())).unwrap()
    }

    #[test]
    fn non_positive_target_runs_nothing() {
        let mut gba = spin();
        assert_eq!(gba.execute(0), 0);
        assert_eq!(gba.execute(-7), -7);
        assert_eq!(gba.cycles(), 0);
    }

    #[test]
    fn overspend_is_reported() {
        let mut gba = spin();
        let overspent = gba.execute(1);
        assert!(overspent <= 0);
        assert_eq!(gba.cycles(), (1 - overspent) as u64);
    }

    #[test]
    fn frames_carry_overspend() {
        let mut gba = spin();
        let ran: u64 = (0..3).map(|_| u64::from(gba.run_frame())).sum();

        assert_eq!(gba.frame_count(), 3);
        assert_eq!(ran, gba.cycles());
        assert_eq!(
            gba.cycles() as i64,
            3 * i64::from(CYCLES_PER_FRAME) - i64::from(gba.overspent)
        );
        let line = gba.cycles() / u64::from(CYCLES_PER_LINE);
        assert_eq!(
            gba.query("display.vcount").as_ref().and_then(Value::as_u64),
            Some(line % 228)
        );
    }

    #[test]
    fn halted_without_fast_forward_ticks_single_cycles() {
        let mut gba = spin();
        gba.halt_fast_forward = false;
        gba.bus.halted = true;

        assert_eq!(gba.execute(10), 0);
        assert_eq!(gba.cycles(), 10);
        assert!(gba.halted());
    }

    #[test]
    fn halted_fast_forward_stops_at_budget() {
        let mut gba = spin();
        gba.bus.halted = true;

        assert_eq!(gba.execute(100_000), 0, "halted time never overshoots");
        assert!(gba.halted(), "no interrupt enabled");
    }
}
