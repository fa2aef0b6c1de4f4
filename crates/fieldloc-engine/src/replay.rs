//! Synchronous localization driven by caller timestamps.
//!
//! [`ReplayLocalizer`] runs the same [`LocalizationLoop`] as the realtime
//! worker, but on the caller's thread: each [`tick()`](ReplayLocalizer::tick)
//! call runs one tick at the supplied timestamp and returns the
//! [`TickReport`]. It is the driver for log replay and for tests.
//!
//! # Ownership model
//!
//! `ReplayLocalizer` is [`Send`] (can be moved between threads). All
//! mutating methods take `&mut self`; resets and configuration swaps take
//! effect at the next tick, exactly as control commands do on the worker
//! thread.
//!
//! # Time
//!
//! Timestamps must not go backwards. A timestamp earlier than the previous
//! tick is replaced by the previous tick's timestamp, as in
//! [`LocalizationLoop::tick`].

use std::sync::Arc;

use fieldloc_core::{FieldMap, Pose2D, PublishedEstimate, ResetNoise, ResetRequest, Timestamp};
use fieldloc_filter::Particle;

use crate::config::{ConfigError, LocalizationConfig};
use crate::metrics::TickMetrics;
use crate::tick::{Collaborators, ControlCommand, LocalizationLoop, TickReport};

// Compile-time assertion: ReplayLocalizer can be handed to another thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<ReplayLocalizer>();
};

/// Localization stepped by the caller.
#[derive(Debug)]
pub struct ReplayLocalizer {
    localization: LocalizationLoop,
    queued: Vec<ControlCommand>,
}

impl ReplayLocalizer {
    /// Build a localizer whose clock starts at `start`.
    pub fn new(
        config: LocalizationConfig,
        map: Arc<FieldMap>,
        collaborators: Collaborators,
        start: Timestamp,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            localization: LocalizationLoop::new(config, map, collaborators, start)?,
            queued: Vec::new(),
        })
    }

    /// Run one tick at `now`.
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let now = self.localization.hold_monotonic(now);
        for command in std::mem::take(&mut self.queued) {
            self.localization.apply_control(command, now);
        }
        self.localization.tick(now)
    }

    /// Run ticks every `period` seconds after the last tick up to and
    /// including `end`. Returns the reports in order.
    pub fn run_until(&mut self, end: Timestamp, period: f64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        if period <= 0.0 {
            return reports;
        }
        let mut next = self.last_tick().offset(period);
        while next <= end {
            reports.push(self.tick(next));
            next = next.offset(period);
        }
        reports
    }

    // ── Reset surface ────────────────────────────────────────────

    /// Request a reset, applied at the next tick.
    pub fn reset(&mut self, request: ResetRequest) {
        self.queued.push(ControlCommand::Reset(request));
    }

    /// Spread the population over the whole field.
    pub fn reset_uniform(&mut self) {
        self.reset(ResetRequest::Uniform);
    }

    /// Spread the population along the field borders, facing inwards.
    pub fn reset_borders(&mut self) {
        self.reset(ResetRequest::Borders);
    }

    /// Perturb the population around the current estimate after a fall.
    pub fn reset_fall(&mut self) {
        self.reset(ResetRequest::Fall);
    }

    /// Gather the population around `pose`.
    pub fn reset_custom(&mut self, pose: Pose2D, xy_noise: f64, heading_noise: f64) {
        self.reset(ResetRequest::Custom {
            pose,
            noise: ResetNoise {
                xy: xy_noise,
                heading: heading_noise,
            },
        });
    }

    /// Validate `config` and install it at the next tick.
    pub fn reconfigure(&mut self, config: LocalizationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.queued
            .push(ControlCommand::Reconfigure(Box::new(config)));
        Ok(())
    }

    // ── Results ──────────────────────────────────────────────────

    /// The most recently published estimate.
    pub fn latest(&self) -> Option<Arc<PublishedEstimate>> {
        self.localization.mailbox().latest()
    }

    /// Copy of the current population.
    pub fn particles(&self) -> Vec<Particle> {
        self.localization.particles()
    }

    /// Metrics of the most recent tick.
    pub fn metrics(&self) -> &TickMetrics {
        self.localization.metrics()
    }

    /// Timestamp of the most recent tick.
    pub fn last_tick(&self) -> Timestamp {
        self.localization.last_tick()
    }

    /// The wrapped loop.
    pub fn localization(&self) -> &LocalizationLoop {
        &self.localization
    }

    /// Unwrap into the loop.
    pub fn into_inner(self) -> LocalizationLoop {
        self.localization
    }
}
