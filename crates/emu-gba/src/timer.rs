//! The four 16-bit timers.
//!
//! Each timer counts CPU cycles through a prescaler, or (timers 1-3) counts
//! overflows of the timer below it. On overflow the counter restarts from
//! the reload value and, if enabled, requests an interrupt.

use emu_core::{IoReg, Tickable};

use crate::bus::store;
use crate::interrupt::Interrupt;

const CASCADE: u16 = 0x0004;
const IRQ_ENABLE: u16 = 0x0040;
const START: u16 = 0x0080;

/// Prescaler shifts for control bits 1..0: every 1, 64, 256, 1024 cycles.
const PRESCALER_SHIFT: [u32; 4] = [0, 6, 8, 10];

pub struct Timer {
    /// TMxCNT_L as read.
    pub counter: IoReg,
    /// TMxCNT_L as written.
    pub reload: IoReg,
    /// TMxCNT_H.
    pub control: IoReg,
    /// Cycles accumulated towards the next prescaled increment.
    prescale: u64,
}

impl Timer {
    fn new() -> Self {
        Self {
            counter: IoReg::new(0, 0xFFFF, 0x0000),
            reload: IoReg::new(0, 0x0000, 0xFFFF),
            control: IoReg::new(0, 0x00C7, 0x00C7),
            prescale: 0,
        }
    }

    fn running(&self) -> bool {
        self.control.any(START)
    }

    fn irq_enabled(&self) -> bool {
        self.control.any(IRQ_ENABLE)
    }

    fn shift(&self) -> u32 {
        PRESCALER_SHIFT[usize::from(self.control.get() & 3)]
    }

    /// Increments between overflows once the counter has reloaded.
    fn period(&self) -> u64 {
        0x1_0000 - u64::from(self.reload.get())
    }

    fn prescaled(&mut self, cycles: u32) -> u64 {
        self.prescale += u64::from(cycles);
        let shift = self.shift();
        let increments = self.prescale >> shift;
        self.prescale &= (1 << shift) - 1;
        increments
    }

    /// Advance the counter. Returns the number of overflows.
    fn count(&mut self, increments: u64) -> u64 {
        let total = u64::from(self.counter.get()) + increments;
        if total < 0x1_0000 {
            self.counter.set(total as u16);
            return 0;
        }
        let past = total - 0x1_0000;
        let period = self.period();
        self.counter
            .set((u64::from(self.reload.get()) + past % period) as u16);
        1 + past / period
    }
}

pub struct Timers {
    timers: [Timer; 4],
    /// Interrupt requests raised since the last `take_irq`.
    irq: u16,
}

impl Timers {
    pub fn new() -> Self {
        Self {
            timers: [Timer::new(), Timer::new(), Timer::new(), Timer::new()],
            irq: 0,
        }
    }

    /// Current count of timer `index`.
    pub fn counter(&self, index: usize) -> u16 {
        self.timers[index].counter.get()
    }

    pub fn take_irq(&mut self) -> u16 {
        std::mem::take(&mut self.irq)
    }

    /// Read a halfword at `offset` from 0x0400_0100.
    pub fn read(&self, offset: u32) -> u16 {
        let timer = &self.timers[(offset as usize >> 2) & 3];
        if offset & 2 == 0 {
            timer.counter.read()
        } else {
            timer.control.read()
        }
    }

    /// Write the byte lanes in `lanes` of a halfword at `offset` from
    /// 0x0400_0100.
    pub fn write(&mut self, offset: u32, value: u16, lanes: u16) {
        let index = (offset as usize >> 2) & 3;
        let timer = &mut self.timers[index];
        if offset & 2 == 0 {
            store(&mut timer.reload, value, lanes);
            return;
        }
        let was_running = timer.running();
        store(&mut timer.control, value, lanes);
        // A smaller prescaler keeps only the partial count it can still hold.
        timer.prescale &= (1 << timer.shift()) - 1;
        if !was_running && timer.running() {
            timer.counter.set(timer.reload.get());
            timer.prescale = 0;
            log::trace!(
                "timer {index} started: reload {:#06X}, control {:#06X}",
                timer.reload.get(),
                timer.control.get()
            );
        }
    }

    /// Cycles until timer `index` has overflowed `overflows` times, or `None`
    /// if it (or a timer it cascades from) is stopped.
    fn cycles_until(&self, index: usize, overflows: u64) -> Option<u64> {
        let timer = &self.timers[index];
        if !timer.running() {
            return None;
        }
        let increments =
            (0x1_0000 - u64::from(timer.counter.get())) + (overflows - 1) * timer.period();
        if index > 0 && timer.control.any(CASCADE) {
            self.cycles_until(index - 1, increments)
        } else {
            Some((increments << timer.shift()).saturating_sub(timer.prescale))
        }
    }
}

impl Tickable for Timers {
    fn tick(&mut self, cycles: u32) {
        let mut overflows = 0;
        for (index, timer) in self.timers.iter_mut().enumerate() {
            if !timer.running() {
                overflows = 0;
                continue;
            }
            let increments = if index > 0 && timer.control.any(CASCADE) {
                overflows
            } else {
                timer.prescaled(cycles)
            };
            overflows = timer.count(increments);
            if overflows > 0 && timer.irq_enabled() {
                self.irq |= Interrupt::timer(index).mask();
            }
        }
    }

    /// Only overflows that request an interrupt are events; a silent timer
    /// ticks the same in one call as in many.
    fn next_event(&self) -> Option<u32> {
        (0..4)
            .filter(|&index| self.timers[index].irq_enabled())
            .filter_map(|index| self.cycles_until(index, 1))
            .min()
            .map(|cycles| u32::try_from(cycles).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: u16 = 0xFFFF;

    fn start(timers: &mut Timers, index: usize, reload: u16, control: u16) {
        let offset = index as u32 * 4;
        timers.write(offset, reload, ALL);
        timers.write(offset + 2, control | START, ALL);
    }

    #[test]
    fn start_loads_reload_value() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0xFF00, 0);
        assert_eq!(timers.read(0), 0xFF00);
        timers.tick(5);
        assert_eq!(timers.read(0), 0xFF05);
    }

    #[test]
    fn prescaler_divides_cycles() {
        let mut timers = Timers::new();
        start(&mut timers, 1, 0, 1); // 1/64
        timers.tick(63);
        assert_eq!(timers.counter(1), 0);
        timers.tick(1);
        assert_eq!(timers.counter(1), 1);
        timers.tick(64 * 10 + 5);
        assert_eq!(timers.counter(1), 11);
    }

    #[test]
    fn overflow_reloads_and_requests_irq() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0xFFF0, IRQ_ENABLE);
        timers.tick(0x10 + 3);

        assert_eq!(timers.counter(0), 0xFFF3);
        assert_eq!(timers.take_irq(), Interrupt::Timer0.mask());
        assert_eq!(timers.take_irq(), 0);
    }

    #[test]
    fn cascade_counts_overflows() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0xFFFE, 0);
        start(&mut timers, 1, 0xFFFF, CASCADE | IRQ_ENABLE);
        timers.tick(2);
        assert_eq!(timers.counter(1), 0xFFFF, "one overflow below, one overflow here");
        assert_eq!(timers.take_irq(), Interrupt::Timer1.mask());
    }

    #[test]
    fn next_event_is_exact() {
        let mut timers = Timers::new();
        start(&mut timers, 2, 0xFFF0, 2 | IRQ_ENABLE); // 1/256
        timers.tick(100);
        let wait = timers.next_event().unwrap();
        assert_eq!(wait, 16 * 256 - 100);

        timers.tick(wait - 1);
        assert_eq!(timers.take_irq(), 0);
        timers.tick(1);
        assert_eq!(timers.take_irq(), Interrupt::Timer2.mask());
    }

    #[test]
    fn prescaler_change_while_running() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0xFFF0, 3 | IRQ_ENABLE); // 1/1024
        timers.tick(1000);
        assert_eq!(timers.counter(0), 0xFFF0);

        timers.write(2, START | IRQ_ENABLE, ALL); // 1/1, still running
        assert_eq!(timers.next_event(), Some(0x10));
        timers.tick(1);
        assert_eq!(timers.counter(0), 0xFFF1);

        timers.write(2, START | IRQ_ENABLE | 1, ALL); // 1/64
        timers.tick(30);
        assert_eq!(timers.next_event(), Some(15 * 64 - 30));
    }

    #[test]
    fn cascaded_next_event_follows_source() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0xFF00, 0);
        start(&mut timers, 1, 0xFFFE, CASCADE | IRQ_ENABLE);
        assert_eq!(timers.next_event(), Some(2 * 0x100));
    }

    #[test]
    fn silent_timers_schedule_nothing() {
        let mut timers = Timers::new();
        start(&mut timers, 0, 0, 0);
        assert_eq!(timers.next_event(), None);
    }

    #[test]
    fn one_big_tick_matches_many_small_ones() {
        let mut big = Timers::new();
        let mut small = Timers::new();
        for timers in [&mut big, &mut small] {
            start(timers, 0, 0xFFC0, 1);
            start(timers, 1, 0xFFFD, CASCADE | IRQ_ENABLE);
        }
        big.tick(50_000);
        for _ in 0..50_000 {
            small.tick(1);
        }
        for index in 0..4 {
            assert_eq!(big.counter(index), small.counter(index));
        }
        assert_eq!(big.take_irq(), small.take_irq());
    }
}
