//! # event-limit
//!
//! `event-limit` provides the per-key limiting primitives behind a chat
//! moderation engine: "has this user sent more than N messages in the last P
//! seconds?" and "has enough time passed since this channel was last pinged?".
//!
//! ## Primitives
//!
//! * [`SaturationLimit`]: a fixed-capacity ring of event timestamps. Every
//!   operation is O(1) under a short `parking_lot` mutex.
//! * [`RateLimit`]: a debounce cell holding the time of the last permitted
//!   event, claimed with a lock-free Compare-And-Swap (CAS) loop so that
//!   exactly one racing caller wins.
//! * [`AtomicBool`] and [`AtomicFlag`]: single-word flags.
//!
//! Instances for different keys share nothing, so one instance per user,
//! channel or guild scales with the number of keys rather than contending.
//!
//! ## Strategies
//!
//! [`Throttle`] and [`SaturationWindow`] bind a primitive to a fixed interval
//! and expose it through the [`Strategy`] trait.
//!
//! ## Example
//!
//! ```rust
//! use event_limit::SaturationWindow;
//! use event_limit::Strategy;
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! // At most 5 messages every 10 seconds
//! let window = SaturationWindow::new(NonZeroUsize::new(5).unwrap(), Duration::from_secs(10));
//!
//! if window.process().is_continue() {
//!     // Send the message
//! }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod atomic;
mod clock;
mod config;
mod error;
mod rate_limit;
mod saturation;

#[cfg(test)]
mod tests;

pub use atomic::AtomicBool;
pub use atomic::AtomicFlag;
pub use clock::UnixClock;
pub use config::SaturationConfig;
pub use config::ThrottleConfig;
pub use error::LimitError;
pub use rate_limit::RateLimit;
pub use rate_limit::Throttle;
pub use saturation::SaturationLimit;
pub use saturation::SaturationWindow;

/// Reasons why an event might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// The common interface of the limiting strategies.
///
/// Strategies are shared across threads via `Arc`.
pub trait Strategy: Debug {
    /// Attempts to admit a single event now.
    ///
    /// # Errors
    ///
    /// Returns `Reason` if the limit has been reached.
    fn process(&self) -> ControlFlow<Reason>;
}
