use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

/// A boolean stored in a single machine word.
///
/// Every load and store is atomic, so a reader sees exactly `true` or exactly
/// `false`. Accesses are `Relaxed`: the flag must not be used to publish other
/// non-atomic data.
#[derive(Debug, Default)]
pub struct AtomicBool {
    flag: AtomicU32,
}

impl AtomicBool {
    pub const fn new(value: bool) -> Self {
        Self {
            flag: AtomicU32::new(value as u32),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::Relaxed) != 0
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.flag.store(value as u32, Ordering::Relaxed);
    }
}

/// A test-and-set flag.
///
/// Retained for call sites that rely on its exact swap semantics. It is not a
/// lock: protect short critical sections with a mutex, and use a CAS loop
/// (see [`RateLimit`](crate::RateLimit)) for single-winner claims.
#[derive(Debug, Default)]
pub struct AtomicFlag {
    flag: AtomicU32,
}

impl AtomicFlag {
    pub const fn new() -> Self {
        Self {
            flag: AtomicU32::new(0),
        }
    }

    /// Sets the flag and returns whether it was already set.
    #[inline]
    pub fn test_and_set(&self) -> bool {
        self.flag.swap(1, Ordering::SeqCst) != 0
    }

    #[inline]
    pub fn clear(&self) {
        self.flag.swap(0, Ordering::SeqCst);
    }
}
