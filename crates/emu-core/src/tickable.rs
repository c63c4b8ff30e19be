//! Trait for components advanced by CPU clock cycles.

/// A peripheral that is advanced in lockstep with the CPU.
///
/// The machine calls `tick` once per executed (or fast-forwarded) step with
/// the exact number of cycles that step consumed, in the order the CPU
/// incurred them.
pub trait Tickable {
    /// Advance the component by `cycles` clock cycles.
    ///
    /// Must produce the same state as `cycles` calls of `tick(1)`.
    fn tick(&mut self, cycles: u32);

    /// Cycles until this component next changes state in a way software or
    /// the interrupt controller can observe.
    ///
    /// The value must be an exact lower bound: ticking by this amount in
    /// one call may never skip past a state change. `None` means nothing is
    /// scheduled.
    fn next_event(&self) -> Option<u32> {
        None
    }
}
