//! User-facing `RealtimeLocalizer` API and shutdown state machine.
//!
//! The localization loop runs on a dedicated `fieldloc-tick` thread at the
//! configured period. Callers interact with it through three channels:
//!
//! ```text
//! Caller thread(s)                 Tick thread
//!     |                                |
//!     |--reset_*() / reconfigure()---->| control_rx.try_iter()
//!     |   [control_tx: bounded(N)]     | loop.apply_control()
//!     |                                | loop.tick(clock.now())
//!     |<--latest()---------------------| mailbox.publish(estimate)
//!     |<--particles()------------------| filter mutex (short hold)
//!     |                                | park_timeout(10ms) slices
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError};
use fieldloc_core::{FieldMap, Pose2D, PublishedEstimate, ResetNoise, ResetRequest, TimeSource};
use fieldloc_filter::{FieldParticleFilter, Particle};

use crate::config::{ConfigError, LocalizationConfig};
use crate::mailbox::EstimateMailbox;
use crate::metrics::TickMetrics;
use crate::tick::{Collaborators, ControlCommand, LocalizationLoop};
use crate::tick_thread::TickThreadState;

// ── Error types ──────────────────────────────────────────────────

/// Error submitting a control command to the tick thread.
#[derive(Debug, PartialEq)]
pub enum ControlError {
    /// The tick thread has shut down.
    Shutdown,
    /// The control channel is full (back-pressure).
    ChannelFull,
    /// The submitted configuration failed validation.
    InvalidConfig(ConfigError),
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown => write!(f, "tick thread has shut down"),
            Self::ChannelFull => write!(f, "control channel full"),
            Self::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            _ => None,
        }
    }
}

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from the shutdown state machine.
#[derive(Debug)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Time spent waiting for the tick thread to stop.
    pub drain_ms: u64,
    /// Whether the tick thread was joined successfully.
    pub tick_joined: bool,
    /// Estimates published over the lifetime of the localizer.
    pub published: u64,
}

// ── ShutdownState ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Draining,
    Dropped,
}

// ── RealtimeLocalizer ────────────────────────────────────────────

/// Localization running on a background thread.
///
/// Dropping the localizer shuts the thread down.
pub struct RealtimeLocalizer {
    control_tx: Option<Sender<ControlCommand>>,
    mailbox: Arc<EstimateMailbox>,
    filter: Arc<Mutex<FieldParticleFilter>>,
    shutdown_flag: Arc<AtomicBool>,
    tick_stopped: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<LocalizationLoop>>,
    final_metrics: Option<TickMetrics>,
    state: ShutdownState,
}

impl RealtimeLocalizer {
    /// Build the loop and spawn the tick thread.
    ///
    /// `clock` provides loop time: a monotonic clock in live mode, a
    /// replay clock advanced by the log player in replay mode.
    pub fn new(
        config: LocalizationConfig,
        map: Arc<FieldMap>,
        collaborators: Collaborators,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        let capacity = config.control_queue_capacity;
        let mut localization = LocalizationLoop::new(config, map, collaborators, clock.now())?;
        let (control_tx, control_rx) = crossbeam_channel::bounded(capacity);
        localization.attach_controls(control_rx);

        let mailbox = Arc::clone(localization.mailbox());
        let filter = Arc::clone(localization.filter());
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let tick_stopped = Arc::new(AtomicBool::new(false));

        let tick_shutdown = Arc::clone(&shutdown_flag);
        let tick_stopped_flag = Arc::clone(&tick_stopped);
        let tick_thread = thread::Builder::new()
            .name("fieldloc-tick".into())
            .spawn(move || {
                TickThreadState::new(localization, clock, tick_shutdown, tick_stopped_flag).run()
            })
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            control_tx: Some(control_tx),
            mailbox,
            filter,
            shutdown_flag,
            tick_stopped,
            tick_thread: Some(tick_thread),
            final_metrics: None,
            state: ShutdownState::Running,
        })
    }

    fn submit(&self, command: ControlCommand) -> Result<(), ControlError> {
        let tx = self.control_tx.as_ref().ok_or(ControlError::Shutdown)?;
        tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => ControlError::ChannelFull,
            TrySendError::Disconnected(_) => ControlError::Shutdown,
        })?;
        // Cut the current sleep short.
        if let Some(handle) = &self.tick_thread {
            handle.thread().unpark();
        }
        Ok(())
    }

    // ── Reset surface ────────────────────────────────────────────

    /// Request a reset of the given kind.
    pub fn reset(&self, request: ResetRequest) -> Result<(), ControlError> {
        self.submit(ControlCommand::Reset(request))
    }

    /// Spread the population over the whole field.
    pub fn reset_uniform(&self) -> Result<(), ControlError> {
        self.reset(ResetRequest::Uniform)
    }

    /// Spread the population along the field borders, facing inwards.
    pub fn reset_borders(&self) -> Result<(), ControlError> {
        self.reset(ResetRequest::Borders)
    }

    /// Perturb the population around the current estimate after a fall.
    pub fn reset_fall(&self) -> Result<(), ControlError> {
        self.reset(ResetRequest::Fall)
    }

    /// Gather the population around `pose`.
    pub fn reset_custom(
        &self,
        pose: Pose2D,
        xy_noise: f64,
        heading_noise: f64,
    ) -> Result<(), ControlError> {
        self.reset(ResetRequest::Custom {
            pose,
            noise: ResetNoise {
                xy: xy_noise,
                heading: heading_noise,
            },
        })
    }

    // ── Configuration ────────────────────────────────────────────

    /// Validate `config` and hand it to the tick thread, which installs
    /// it at the start of its next tick.
    pub fn reconfigure(&self, config: LocalizationConfig) -> Result<(), ControlError> {
        config.validate().map_err(ControlError::InvalidConfig)?;
        self.submit(ControlCommand::Reconfigure(Box::new(config)))
    }

    // ── Results ──────────────────────────────────────────────────

    /// The most recently published estimate.
    pub fn latest(&self) -> Option<Arc<PublishedEstimate>> {
        self.mailbox.latest()
    }

    /// Number of estimates published so far.
    pub fn published(&self) -> u64 {
        self.mailbox.published()
    }

    /// Copy of the current population.
    pub fn particles(&self) -> Vec<Particle> {
        self.filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .particles()
            .to_vec()
    }

    /// Whether the tick thread is running.
    pub fn is_running(&self) -> bool {
        self.state == ShutdownState::Running && !self.tick_stopped.load(Ordering::Acquire)
    }

    /// Metrics of the last tick, available once shut down.
    pub fn final_metrics(&self) -> Option<&TickMetrics> {
        self.final_metrics.as_ref()
    }

    /// Stop the tick thread.
    ///
    /// 1. **Running → Draining:** set the shutdown flag, unpark the tick
    ///    thread (wakes it from its sleep slice), wait for it to stop.
    /// 2. **Draining → Dropped:** drop the control channel, join.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ShutdownState::Dropped {
            return ShutdownReport {
                total_ms: 0,
                drain_ms: 0,
                tick_joined: true,
                published: self.mailbox.published(),
            };
        }

        let start = Instant::now();

        // Phase 1: Running → Draining
        self.state = ShutdownState::Draining;
        self.shutdown_flag.store(true, Ordering::Release);
        if let Some(handle) = &self.tick_thread {
            handle.thread().unpark();
        }

        // A tick in progress finishes first; allow it one second.
        let drain_deadline = Instant::now() + Duration::from_secs(1);
        while !self.tick_stopped.load(Ordering::Acquire) {
            if Instant::now() > drain_deadline {
                break;
            }
            thread::yield_now();
        }
        let drain_ms = start.elapsed().as_millis() as u64;

        // Phase 2: Draining → Dropped
        self.state = ShutdownState::Dropped;
        self.control_tx.take();

        let tick_joined = if let Some(handle) = self.tick_thread.take() {
            match handle.join() {
                Ok(localization) => {
                    self.final_metrics = Some(localization.metrics().clone());
                    true
                }
                Err(_) => false,
            }
        } else {
            true
        };

        let total_ms = start.elapsed().as_millis() as u64;
        log::info!("localizer stopped in {total_ms} ms");
        ShutdownReport {
            total_ms,
            drain_ms,
            tick_joined,
            published: self.mailbox.published(),
        }
    }
}

impl Drop for RealtimeLocalizer {
    fn drop(&mut self) {
        if self.state != ShutdownState::Dropped {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for RealtimeLocalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeLocalizer")
            .field("state", &self.state)
            .field("published", &self.mailbox.published())
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: the handle can be shared across caller threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RealtimeLocalizer>();
};
