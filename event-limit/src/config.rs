//! Serializable limiter settings.
//!
//! Settings are plain data so they can live alongside the rest of an
//! application's configuration. [`validate`](SaturationConfig::validate)
//! rejects values that would break the ring arithmetic, and `build` turns a
//! valid config into a ready [`Strategy`](crate::Strategy).

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::LimitError;
use crate::SaturationLimit;
use crate::SaturationWindow;
use crate::Throttle;
use crate::UnixClock;

fn check_period(secs: u64) -> Result<(), LimitError> {
    if secs == 0 {
        return Err(LimitError::ZeroPeriod);
    }
    if i64::try_from(secs).is_err() {
        return Err(LimitError::PeriodTooLong { secs });
    }
    Ok(())
}

/// Settings for a [`Throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum number of seconds between permitted events.
    pub interval_secs: u64,
}

impl ThrottleConfig {
    pub fn new(interval_secs: u64) -> Self {
        Self { interval_secs }
    }

    pub fn validate(&self) -> Result<(), LimitError> {
        check_period(self.interval_secs)
    }

    pub fn build(&self) -> Result<Throttle, LimitError> {
        self.build_with_clock(UnixClock::new())
    }

    pub fn build_with_clock(&self, clock: UnixClock) -> Result<Throttle, LimitError> {
        self.validate()
            .inspect_err(|error| warn!(%error, "invalid throttle config"))?;
        Ok(Throttle::with_clock(
            Duration::from_secs(self.interval_secs),
            clock,
        ))
    }
}

/// Settings for a [`SaturationWindow`].
///
/// ```rust
/// use event_limit::SaturationConfig;
///
/// let config: SaturationConfig =
///     serde_json::from_str(r#"{ "num": 5, "period_secs": 10 }"#).unwrap();
/// assert_eq!(config.capacity(), 6);
/// assert!(config.build().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationConfig {
    /// Ring size. Defaults to one more than `num`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Maximum number of events inside the window.
    pub num: usize,
    /// Window length in seconds.
    pub period_secs: u64,
}

impl SaturationConfig {
    pub fn new(num: usize, period_secs: u64) -> Self {
        Self {
            capacity: None,
            num,
            period_secs,
        }
    }

    /// Overrides the ring size, e.g. to leave room for a later `resize`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or_else(|| self.num.saturating_add(1))
    }

    pub fn validate(&self) -> Result<(), LimitError> {
        let capacity = self.capacity();
        if capacity == 0 {
            return Err(LimitError::ZeroCapacity);
        }
        // `exceeded` looks `num` slots back, which must not wrap onto itself
        if self.num == 0 || self.num >= capacity {
            return Err(LimitError::InvalidWindow {
                num: self.num,
                capacity,
            });
        }
        check_period(self.period_secs)
    }

    pub fn build(&self) -> Result<SaturationWindow, LimitError> {
        self.build_with_clock(UnixClock::new())
    }

    pub fn build_with_clock(&self, clock: UnixClock) -> Result<SaturationWindow, LimitError> {
        self.validate()
            .inspect_err(|error| warn!(%error, "invalid saturation config"))?;
        let capacity = NonZeroUsize::new(self.capacity()).ok_or(LimitError::ZeroCapacity)?;
        Ok(SaturationWindow::from_parts(
            SaturationLimit::new(capacity),
            self.num,
            Duration::from_secs(self.period_secs),
            clock,
        ))
    }
}
