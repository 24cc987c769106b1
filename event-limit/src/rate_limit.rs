use std::ops::ControlFlow;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::trace;

use crate::Reason;
use crate::Strategy;
use crate::UnixClock;
use crate::clock::whole_secs;

/// A debounce cell holding the unix time of the last permitted event.
///
/// One cell is owned per tracked key and shared by reference (or `Arc`)
/// between every thread handling events for that key. The cell is only ever
/// mutated through a compare-and-swap, so it is lock-free.
#[derive(Debug)]
pub struct RateLimit {
    /// Unix seconds of the last permitted event.
    last: AtomicI64,
    clock: UnixClock,
}

impl RateLimit {
    /// Creates a cell seeded at the unix epoch, so the first call is permitted.
    pub fn new() -> Self {
        Self::with_clock(UnixClock::new())
    }

    pub fn with_clock(clock: UnixClock) -> Self {
        Self {
            last: AtomicI64::new(0),
            clock,
        }
    }

    /// Replaces the seed with an explicit "last permitted" time.
    pub fn starting_at(self, last: i64) -> Self {
        self.last.store(last, Ordering::Release);
        self
    }

    /// Claims the current second if more than `interval` seconds have passed
    /// since the last permitted event.
    ///
    /// Among any number of callers racing inside the same disallowed window,
    /// exactly one observes `true`.
    pub fn rate_limit(&self, interval: i64) -> bool {
        let now = self.clock.now();
        let mut last = self.last.load(Ordering::Acquire);

        loop {
            if now.saturating_sub(last) <= interval {
                return false;
            }

            match self
                .last
                .compare_exchange_weak(last, now, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => {
                    // Lost to another caller (or a spurious failure), re-evaluate
                    trace!(last, actual, "rate limit cell contended");
                    last = actual;
                }
            }
        }
    }

    /// Reports whether [`rate_limit`](Self::rate_limit) would currently succeed.
    ///
    /// Nothing is claimed, so the answer may be stale as soon as it returns.
    pub fn check_rate_limit(&self, interval: i64) -> bool {
        self.clock
            .now()
            .saturating_sub(self.last.load(Ordering::Acquire))
            > interval
    }

    /// The unix time of the last permitted event.
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::Acquire)
    }

    /// Forgets the last permitted event.
    pub fn reset(&self) {
        self.last.store(0, Ordering::Release);
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new()
    }
}

/// Permits at most one event per `interval`.
///
/// A [`Strategy`] around a single [`RateLimit`] cell.
#[derive(Debug)]
pub struct Throttle {
    cell: RateLimit,
    interval: i64,
}

impl Throttle {
    /// Creates a new `Throttle` strategy.
    ///
    /// # Arguments
    ///
    /// * `interval` - Minimum time between permitted events. Truncated to whole seconds,
    ///   and clamped to `i64::MAX` seconds.
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, UnixClock::new())
    }

    pub fn with_clock(interval: Duration, clock: UnixClock) -> Self {
        Self {
            cell: RateLimit::with_clock(clock),
            interval: whole_secs(interval),
        }
    }

    pub fn cell(&self) -> &RateLimit {
        &self.cell
    }
}

impl Strategy for Throttle {
    #[inline]
    fn process(&self) -> ControlFlow<Reason> {
        if self.cell.rate_limit(self.interval) {
            return ControlFlow::Continue(());
        }

        let elapsed = self.cell.now().saturating_sub(self.cell.last());
        let wait = self.interval.saturating_sub(elapsed).saturating_add(1).max(1);
        trace!(wait, "throttled");
        ControlFlow::Break(Reason::Overloaded {
            retry_after: Duration::from_secs(wait as u64),
        })
    }
}
