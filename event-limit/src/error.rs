/// Errors produced when building or reconfiguring a limiter.
///
/// Hot-path operations never fail; these are only returned from constructors,
/// `try_resize` and configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitError {
    /// A saturation buffer must hold at least one timestamp.
    #[error("capacity must be non-zero")]
    ZeroCapacity,

    /// The number of trailing events inspected must fit inside the buffer.
    ///
    /// A `num` larger than the capacity would wrap around and read a slot
    /// that has already been overwritten.
    #[error("window of {num} events does not fit a capacity of {capacity}")]
    InvalidWindow {
        /// The requested number of trailing events.
        num: usize,
        /// The configured buffer capacity.
        capacity: usize,
    },

    /// Periods and intervals are measured in whole seconds and must be positive.
    #[error("period must be at least one second")]
    ZeroPeriod,

    /// Periods are compared as signed seconds and must fit an `i64`.
    #[error("period of {secs} seconds is too long")]
    PeriodTooLong {
        /// The configured period in seconds.
        secs: u64,
    },
}
