//! Worker thread driving a [`LocalizationLoop`] on a period.
//!
//! The thread owns the loop exclusively (moved in via `thread::spawn`).
//! Between two ticks it sleeps in short slices with `park_timeout`, so
//! that `unpark()` from the shutdown path wakes it immediately and a
//! pending reset can cut the wait short.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fieldloc_core::{TimeSource, Timestamp};

use crate::config::RunMode;
use crate::tick::LocalizationLoop;

/// Length of one sleep slice.
pub(crate) const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// State held by the tick thread's main loop.
pub(crate) struct TickThreadState {
    localization: LocalizationLoop,
    clock: Arc<dyn TimeSource>,
    shutdown_flag: Arc<AtomicBool>,
    tick_stopped: Arc<AtomicBool>,
}

impl TickThreadState {
    pub fn new(
        localization: LocalizationLoop,
        clock: Arc<dyn TimeSource>,
        shutdown_flag: Arc<AtomicBool>,
        tick_stopped: Arc<AtomicBool>,
    ) -> Self {
        Self {
            localization,
            clock,
            shutdown_flag,
            tick_stopped,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Acquire)
    }

    /// Main tick loop. Runs until `shutdown_flag` is set.
    ///
    /// Consumes self and returns the loop so the caller can inspect its
    /// final state through the `JoinHandle`.
    pub fn run(mut self) -> LocalizationLoop {
        loop {
            if self.shutdown_requested() {
                break;
            }

            let tick_start = Instant::now();
            let now = self.clock.now();
            let report = self.localization.tick(now);
            log::debug!(
                "tick {} at {}: {:?}",
                report.sequence,
                now,
                report.branch
            );

            let period = self.localization.config().period;
            match self.localization.config().mode {
                RunMode::Live => self.sleep_until(tick_start + Duration::from_secs_f64(period)),
                RunMode::Replay => self.wait_for_clock(now, period),
            }
        }

        // Signal that the tick thread has stopped.
        self.tick_stopped.store(true, Ordering::Release);
        self.localization
    }

    /// Sleep until `deadline` in slices. Returns early on shutdown, or
    /// after at least one slice when the loop has work waiting.
    fn sleep_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now) else {
                return;
            };
            if remaining.is_zero() {
                return;
            }
            thread::park_timeout(remaining.min(SLEEP_SLICE));
            if self.shutdown_requested() || self.localization.wants_early_tick() {
                return;
            }
        }
    }

    /// Wait until the replay clock has moved `period` seconds past
    /// `last`, with the same early exits as [`sleep_until`](Self::sleep_until).
    fn wait_for_clock(&self, last: Timestamp, period: f64) {
        loop {
            if self.clock.now().secs_since(last) >= period {
                return;
            }
            thread::park_timeout(SLEEP_SLICE);
            if self.shutdown_requested() || self.localization.wants_early_tick() {
                return;
            }
        }
    }
}
