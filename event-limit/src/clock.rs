use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use quanta::Clock;
use quanta::Instant;

/// Unix time in whole seconds, advanced by a monotonic `quanta` clock.
///
/// Wall time is sampled once, when the clock is built. Later readings add the
/// monotonic time elapsed since then, so they never go backwards even if the
/// system clock is stepped.
#[derive(Debug, Clone)]
pub struct UnixClock {
    clock: Clock,
    /// A fixed point in time to calculate deltas from.
    anchor: Instant,
    /// Time since the unix epoch at `anchor`.
    epoch: Duration,
}

impl UnixClock {
    pub fn new() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::with_clock(Clock::new(), epoch)
    }

    /// Builds a clock reading `epoch` at the current instant of `clock`.
    ///
    /// Pair with `quanta::Clock::mock()` to drive time by hand in tests.
    pub fn with_clock(clock: Clock, epoch: Duration) -> Self {
        let anchor = clock.now();
        Self {
            clock,
            anchor,
            epoch,
        }
    }

    /// Current unix time in seconds.
    #[inline]
    pub fn now(&self) -> i64 {
        let elapsed = self.clock.now().duration_since(self.anchor);
        whole_secs(self.epoch + elapsed)
    }
}

/// Whole seconds in `d`, clamped to `i64::MAX`.
#[inline]
pub(crate) fn whole_secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

impl Default for UnixClock {
    fn default() -> Self {
        Self::new()
    }
}
