use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::AtomicBool;
use crate::LimitError;
use crate::Reason;
use crate::Strategy;
use crate::UnixClock;
use crate::clock::whole_secs;

/// Records event timestamps for one key in a fixed-capacity ring.
///
/// The ring answers "did the last N events happen within P seconds?" in O(1)
/// without growing. Every operation holds the same lock for a constant number
/// of steps, so callers never wait on anything but one another's O(1) work.
#[derive(Debug)]
pub struct SaturationLimit {
    ring: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    /// Unix seconds of recorded events. Unused slots hold the epoch.
    times: Vec<i64>,
    /// Slot of the most recently recorded event.
    index: usize,
}

impl Ring {
    /// The timestamp `back` slots behind the cursor.
    ///
    /// `back` may be negative or exceed the capacity; the offset wraps
    /// around in either direction.
    #[inline]
    fn behind(&self, back: isize) -> i64 {
        let len = self.times.len() as isize;
        let i = (self.index as isize).wrapping_sub(back).rem_euclid(len);
        self.times[i as usize]
    }

    #[inline]
    fn push(&mut self, t: i64) {
        self.index = (self.index + 1) % self.times.len();
        self.times[self.index] = t;
    }

    /// Returns the oldest of the trailing `num` events if it falls within
    /// `period` of `curtime`.
    #[inline]
    fn saturated(&self, num: usize, period: i64, curtime: i64) -> Option<i64> {
        let oldest = self.behind((num as isize).wrapping_sub(1));
        (curtime.saturating_sub(oldest) <= period).then_some(oldest)
    }
}

impl SaturationLimit {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            ring: Mutex::new(Ring {
                times: vec![0; capacity.get()],
                index: 0,
            }),
        }
    }

    /// Like [`new`](Self::new), for capacities that have not been validated yet.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, LimitError> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(LimitError::ZeroCapacity)
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().times.len()
    }

    /// Records an event at `t`, overwriting the oldest slot.
    pub fn append(&self, t: i64) {
        self.ring.lock().push(t);
    }

    /// Reports whether recording one more event at `curtime` would put `num`
    /// events inside `period`.
    ///
    /// Use this before acting: it inspects the event `num - 1` slots behind
    /// the newest one, treating the next append as the `num`-th event.
    pub fn check(&self, num: usize, period: i64, curtime: i64) -> bool {
        self.ring.lock().saturated(num, period, curtime).is_some()
    }

    /// Reports whether the newest recorded event and the one `num` slots
    /// before it are at most `period` apart.
    ///
    /// Use this after appending an event that has already happened.
    pub fn check_after(&self, num: usize, period: i64) -> bool {
        let ring = self.ring.lock();
        let newest = ring.times[ring.index];
        newest.saturating_sub(ring.behind(num as isize)) <= period
    }

    /// Checks and records under a single lock.
    ///
    /// Returns `true` and records `curtime` when [`check`](Self::check) finds
    /// room, otherwise leaves the ring untouched and returns `false`.
    pub fn try_append(&self, num: usize, period: i64, curtime: i64) -> bool {
        self.admit(num, period, curtime).is_ok()
    }

    /// On rejection, yields the oldest event holding the window shut.
    pub(crate) fn admit(&self, num: usize, period: i64, curtime: i64) -> Result<(), i64> {
        let mut ring = self.ring.lock();
        match ring.saturated(num, period, curtime) {
            Some(oldest) => Err(oldest),
            None => {
                ring.push(curtime);
                Ok(())
            }
        }
    }

    /// Changes the capacity, keeping the most recent events.
    ///
    /// The newest `min(old, new)` events survive in recency order and the
    /// cursor points at the newest of them. Any extra slots read as the epoch.
    pub fn resize(&self, size: NonZeroUsize) {
        let size = size.get();
        let mut ring = self.ring.lock();
        let old = ring.times.len();
        if old == size {
            return;
        }

        let keep = old.min(size);
        let mut times = vec![0; size];
        for (back, slot) in times[..keep].iter_mut().rev().enumerate() {
            *slot = ring.behind(back as isize);
        }
        ring.times = times;
        ring.index = keep - 1;

        debug!(from = old, to = size, kept = keep, "resized saturation limit");
    }

    /// Like [`resize`](Self::resize), for sizes that have not been validated yet.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::ZeroCapacity`] if `size` is zero. The ring is
    /// left unchanged.
    pub fn try_resize(&self, size: usize) -> Result<(), LimitError> {
        let size = NonZeroUsize::new(size).ok_or(LimitError::ZeroCapacity)?;
        self.resize(size);
        Ok(())
    }

    /// Recorded timestamps, newest first.
    #[cfg(test)]
    pub(crate) fn recent(&self) -> Vec<i64> {
        let ring = self.ring.lock();
        (0..ring.times.len())
            .map(|back| ring.behind(back as isize))
            .collect()
    }
}

/// Admits at most `num` events in any trailing `period`.
///
/// A [`Strategy`] around a [`SaturationLimit`] sized one slot larger than
/// `num`, so that [`exceeded`](Self::exceeded) can look one event further
/// back than [`process`](Strategy::process) does.
#[derive(Debug)]
pub struct SaturationWindow {
    limit: SaturationLimit,
    num: usize,
    period: i64,
    clock: UnixClock,
    /// Set once anything has been recorded through this window.
    recorded: AtomicBool,
}

impl SaturationWindow {
    /// Creates a new `SaturationWindow` strategy.
    ///
    /// # Arguments
    ///
    /// * `num` - The maximum number of events allowed within `period`.
    /// * `period` - The length of the trailing window. Truncated to whole seconds,
    ///   and clamped to `i64::MAX` seconds.
    pub fn new(num: NonZeroUsize, period: Duration) -> Self {
        Self::with_clock(num, period, UnixClock::new())
    }

    pub fn with_clock(num: NonZeroUsize, period: Duration, clock: UnixClock) -> Self {
        let capacity = num.saturating_add(1);
        Self::from_parts(SaturationLimit::new(capacity), num.get(), period, clock)
    }

    pub(crate) fn from_parts(
        limit: SaturationLimit,
        num: usize,
        period: Duration,
        clock: UnixClock,
    ) -> Self {
        Self {
            limit,
            num,
            period: whole_secs(period),
            clock,
            recorded: AtomicBool::new(false),
        }
    }

    pub fn limit(&self) -> &SaturationLimit {
        &self.limit
    }

    /// Records an event that has already happened.
    pub fn record(&self) {
        self.limit.append(self.clock.now());
        self.recorded.set(true);
    }

    /// Reports whether the most recently recorded event was more than `num`
    /// inside the trailing `period`.
    ///
    /// Always `false` until the first event has been recorded.
    pub fn exceeded(&self) -> bool {
        self.recorded.get() && self.limit.check_after(self.num, self.period)
    }
}

impl Strategy for SaturationWindow {
    fn process(&self) -> ControlFlow<Reason> {
        let now = self.clock.now();
        match self.limit.admit(self.num, self.period, now) {
            Ok(()) => {
                self.recorded.set(true);
                ControlFlow::Continue(())
            }
            Err(oldest) => {
                // The window reopens once `oldest` is more than `period` old
                let elapsed = now.saturating_sub(oldest);
                let wait = self.period.saturating_sub(elapsed).saturating_add(1).max(1);
                trace!(wait, "saturated");
                ControlFlow::Break(Reason::Overloaded {
                    retry_after: Duration::from_secs(wait as u64),
                })
            }
        }
    }
}
