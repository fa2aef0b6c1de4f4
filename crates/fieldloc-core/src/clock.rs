//! Time sources for live and replay operation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::id::Timestamp;
use crate::traits::TimeSource;

/// Wall clock measured from construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_secs_f64())
    }
}

/// Externally driven clock for log replay.
///
/// The replayer calls [`set`](Self::set) as it walks through the log; the
/// loop reads the value through [`TimeSource::now`]. The time is stored as
/// raw `f64` bits so reads and writes are lock-free.
#[derive(Debug)]
pub struct ReplayClock {
    bits: AtomicU64,
}

impl ReplayClock {
    /// A replay clock starting at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            bits: AtomicU64::new(start.0.to_bits()),
        }
    }

    /// Move the clock to `t`.
    pub fn set(&self, t: Timestamp) {
        self.bits.store(t.0.to_bits(), Ordering::Release);
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: f64) {
        let now = self.now();
        self.set(now.offset(secs));
    }
}

impl Default for ReplayClock {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}

impl TimeSource for ReplayClock {
    fn now(&self) -> Timestamp {
        Timestamp(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }
}
