//! Bounded waits driven by a [`DelayNs`] provider.
//!
//! The driver never reads a clock. Elapsed time is the sum of the delays it
//! has issued itself, which is enough to bound the SRDY handshake and the
//! reset and startup windows on any HAL.

use embedded_hal::delay::DelayNs;

/// A countdown of microseconds, or an unbounded wait.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timeout {
    remaining_us: Option<u32>,
}

impl Timeout {
    /// A budget of `us` microseconds. `None` never expires.
    pub const fn from_us(us: Option<u32>) -> Self {
        Self { remaining_us: us }
    }

    /// A budget of `ms` milliseconds.
    pub const fn from_ms(ms: u32) -> Self {
        Self {
            remaining_us: Some(ms.saturating_mul(1_000)),
        }
    }

    /// A budget that never expires.
    pub const fn never() -> Self {
        Self { remaining_us: None }
    }

    /// `true` once the whole budget has been spent.
    pub const fn expired(&self) -> bool {
        matches!(self.remaining_us, Some(0))
    }

    /// Remaining budget in microseconds, `None` if unbounded.
    pub const fn remaining_us(&self) -> Option<u32> {
        self.remaining_us
    }

    /// Sleeps for `step_us` (capped at the remaining budget) and charges it.
    pub fn wait<D: DelayNs>(&mut self, delay: &mut D, step_us: u32) {
        let step = match self.remaining_us {
            Some(left) => step_us.min(left),
            None => step_us,
        };
        delay.delay_us(step);
        if let Some(left) = self.remaining_us.as_mut() {
            // A zero step would never make progress.
            *left = left.saturating_sub(step.max(1));
        }
    }
}
