//! The localization loop.
//!
//! [`LocalizationLoop`] owns one particle filter, one consistency watchdog
//! and the collaborator handles, and advances them one
//! [`tick`](LocalizationLoop::tick) at a time. It has no notion of
//! threads or clocks: the caller supplies `now` on every tick. The
//! realtime worker thread and the replay driver both wrap it.
//!
//! # Tick pipeline
//!
//! 1. Apply queued control commands and snapshot the configuration.
//! 2. Steal the staged sightings.
//! 3. Play gate: when closed, hold the filter and publish.
//! 4. Fallen gate: publish the preserved estimate.
//! 5. Grace period after the gate reopens, waiting for a proper reset.
//! 6. Build the observation set.
//! 7. Watchdog update.
//! 8. Noise gain, odometry, filter step.
//! 9. Publish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crossbeam_channel::Receiver;
use fieldloc_core::{
    ClusterList, Displacement, FieldMap, ObservationSource, OdometrySource, PlayGate, Pose2D, PublishedEstimate,
    ResetKind, ResetRequest, ResultSink, Timestamp,
};
use fieldloc_filter::{FieldParticleFilter, Particle, StepOutcome};
use fieldloc_obs::{ObservationSet, ObservationSetBuilder};

use crate::config::{ConfigError, LocalizationConfig, RunMode};
use crate::mailbox::EstimateMailbox;
use crate::metrics::TickMetrics;
use crate::watcher::{ConsistencyWatcher, WatcherVerdict};

/// Noise gain while running on odometry only.
pub const ODOMETRY_ONLY_GAIN: f64 = 1e-6;

// ── Control commands ─────────────────────────────────────────────

/// A request applied by the loop at the start of the next tick.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    /// Ask the filter for a reset.
    Reset(ResetRequest),
    /// Install a new configuration snapshot.
    Reconfigure(Box<LocalizationConfig>),
}

// ── TickReport ───────────────────────────────────────────────────

/// Which part of the pipeline a tick ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickBranch {
    /// Observations were scored and the filter stepped.
    Stepped,
    /// The play gate was closed.
    Gated,
    /// The robot was fallen.
    Fallen,
    /// The gate reopened recently and no proper reset has arrived yet.
    Grace,
}

/// What one [`LocalizationLoop::tick`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Branch taken.
    pub branch: TickBranch,
    /// Sequence number of the estimate published by this tick.
    pub sequence: u64,
    /// Raw sightings stolen this tick.
    pub sightings: usize,
    /// Observations fed to the filter. 0 unless the filter stepped.
    pub observations: usize,
    /// Noise gain used for the step.
    pub noise_gain: Option<f64>,
    /// Watchdog outcome, when the watchdog ran.
    pub verdict: Option<WatcherVerdict>,
    /// Filter outcome, when the filter stepped.
    pub outcome: Option<StepOutcome>,
}

impl TickReport {
    fn skipped(branch: TickBranch, sightings: usize) -> Self {
        Self {
            branch,
            sequence: 0,
            sightings,
            observations: 0,
            noise_gain: None,
            verdict: None,
            outcome: None,
        }
    }
}

// ── Collaborators ────────────────────────────────────────────────

/// External services the loop reads from and publishes to.
pub struct Collaborators {
    /// Staged sightings.
    pub observations: Arc<dyn ObservationSource>,
    /// Integrated odometry.
    pub odometry: Arc<dyn OdometrySource>,
    /// Referee, fall and penalty state.
    pub gate: Arc<dyn PlayGate>,
    /// Receives every published estimate, if set.
    pub sink: Option<Box<dyn ResultSink>>,
}

impl Collaborators {
    /// Collaborators without a result sink.
    pub fn new(
        observations: Arc<dyn ObservationSource>,
        odometry: Arc<dyn OdometrySource>,
        gate: Arc<dyn PlayGate>,
    ) -> Self {
        Self {
            observations,
            odometry,
            gate,
            sink: None,
        }
    }

    /// Attach a result sink.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

// ── Noise gain ───────────────────────────────────────────────────

/// Multiplier of the time-proportional motion noise for a tick at `now`.
///
/// Odometry-only mode nearly freezes the diffusion. Right after a Uniform
/// reset the gain decays linearly from the boost to 1. Otherwise a
/// low consistency score raises the gain up to the watcher's
/// `max_noise`.
pub fn noise_gain(config: &LocalizationConfig, watcher: &ConsistencyWatcher, now: Timestamp) -> f64 {
    if config.odometry_only {
        return ODOMETRY_ONLY_GAIN;
    }
    let boost = &config.noise_boost;
    let since_uniform = watcher.elapsed_since_uniform_reset(now);
    if since_uniform < boost.duration {
        let r = (since_uniform / boost.duration).max(0.0);
        return boost.max_boost * (1.0 - r) + r;
    }
    if config.watcher.enabled {
        return 1.0 + (1.0 - watcher.score()) * (config.watcher.max_noise - 1.0);
    }
    1.0
}

// ── LocalizationLoop ─────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
struct FilterResults {
    representative: Pose2D,
    quality: f64,
    clusters: ClusterList,
}

impl FilterResults {
    fn import(filter: &FieldParticleFilter) -> Self {
        Self {
            representative: filter.representative_particle(),
            quality: filter.representative_quality(),
            clusters: filter.positions_from_clusters().clone(),
        }
    }
}

fn lock(filter: &Mutex<FieldParticleFilter>) -> MutexGuard<'_, FieldParticleFilter> {
    filter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-threaded localization pipeline.
pub struct LocalizationLoop {
    config: Arc<LocalizationConfig>,
    map: Arc<FieldMap>,
    filter: Arc<Mutex<FieldParticleFilter>>,
    watcher: ConsistencyWatcher,
    builder: ObservationSetBuilder,
    collaborators: Collaborators,
    mailbox: Arc<EstimateMailbox>,
    controls: Option<Receiver<ControlCommand>>,
    results: FilterResults,
    last_tick: Timestamp,
    last_odometry: Timestamp,
    last_forbidden: Timestamp,
    forbidden: bool,
    sequence: u64,
    metrics: TickMetrics,
}

// Compile-time assertion: the loop is moved into the worker thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<LocalizationLoop>();
};

impl LocalizationLoop {
    /// Build a loop starting at `start` with a uniform population.
    pub fn new(
        config: LocalizationConfig,
        map: Arc<FieldMap>,
        collaborators: Collaborators,
        start: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = FieldParticleFilter::new(config.filter.clone(), Arc::clone(&map))?;
        let results = FilterResults::import(&filter);
        let builder = ObservationSetBuilder::new(Arc::clone(&map), config.observations.clone())
            .goalkeeper(config.goalkeeper);
        Ok(Self {
            config: Arc::new(config),
            map,
            filter: Arc::new(Mutex::new(filter)),
            watcher: ConsistencyWatcher::new(start),
            builder,
            collaborators,
            mailbox: Arc::new(EstimateMailbox::new()),
            controls: None,
            results,
            last_tick: start,
            last_odometry: start,
            last_forbidden: start,
            forbidden: false,
            sequence: 0,
            metrics: TickMetrics::default(),
        })
    }

    /// Receive control commands from `rx` at the start of every tick.
    pub(crate) fn attach_controls(&mut self, rx: Receiver<ControlCommand>) {
        self.controls = Some(rx);
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> &Arc<LocalizationConfig> {
        &self.config
    }

    /// The field map.
    pub fn map(&self) -> &Arc<FieldMap> {
        &self.map
    }

    /// Shared handle to the filter.
    pub fn filter(&self) -> &Arc<Mutex<FieldParticleFilter>> {
        &self.filter
    }

    /// Shared handle to the estimate mailbox.
    pub fn mailbox(&self) -> &Arc<EstimateMailbox> {
        &self.mailbox
    }

    /// The consistency watchdog.
    pub fn watcher(&self) -> &ConsistencyWatcher {
        &self.watcher
    }

    /// Metrics of the most recent tick.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// Sequence number of the most recent publication.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Loop time of the most recent tick, or the start time before the
    /// first one.
    pub fn last_tick(&self) -> Timestamp {
        self.last_tick
    }

    /// `now`, or the time of the previous tick if `now` is earlier.
    pub(crate) fn hold_monotonic(&mut self, now: Timestamp) -> Timestamp {
        if now >= self.last_tick {
            return now;
        }
        log::warn!(
            "loop time went backwards from {} to {}, holding",
            self.last_tick,
            now
        );
        self.metrics.backwards_ticks += 1;
        self.last_tick
    }

    /// Copy of the current population.
    pub fn particles(&self) -> Vec<Particle> {
        lock(&self.filter).particles().to_vec()
    }

    /// Kind of the reset waiting in the filter.
    pub fn pending_reset(&self) -> ResetKind {
        lock(&self.filter).pending_reset()
    }

    /// Whether the play gate lets the loop run, resolving an
    /// indeterminate answer by run mode.
    pub fn play_allowed(&self) -> bool {
        self.collaborators
            .gate
            .is_allowed_to_play()
            .unwrap_or(self.config.mode == RunMode::Replay)
    }

    /// Whether the next tick should run before the period elapses: work
    /// is waiting (a reset or a queued command) and play is allowed.
    pub fn wants_early_tick(&self) -> bool {
        let queued = self.controls.as_ref().is_some_and(|rx| !rx.is_empty());
        (queued || self.pending_reset() != ResetKind::None) && self.play_allowed()
    }

    // ── Control surface ──────────────────────────────────────────

    /// Ask the filter for a reset at the next step. A reset already
    /// pending is replaced.
    pub fn request_reset(&mut self, request: ResetRequest, now: Timestamp) {
        lock(&self.filter).ask_for_reset(request);
        self.watcher.note_reset(request.kind(), now);
        log::info!("{} reset requested at {}", request.kind(), now);
    }

    /// Install a new configuration. Invalid configurations are rejected
    /// and the current one stays in place.
    pub fn reconfigure(&mut self, config: LocalizationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        lock(&self.filter).reconfigure(config.filter.clone())?;
        self.builder = ObservationSetBuilder::new(Arc::clone(&self.map), config.observations.clone())
            .goalkeeper(config.goalkeeper);
        self.config = Arc::new(config);
        log::info!("configuration replaced");
        Ok(())
    }

    /// Apply one control command.
    pub fn apply_control(&mut self, command: ControlCommand, now: Timestamp) {
        self.metrics.control_commands += 1;
        match command {
            ControlCommand::Reset(request) => self.request_reset(request, now),
            ControlCommand::Reconfigure(config) => {
                if let Err(e) = self.reconfigure(*config) {
                    log::warn!("rejected configuration: {e}");
                }
            }
        }
    }

    fn drain_controls(&mut self, now: Timestamp) {
        let commands: Vec<ControlCommand> = match &self.controls {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for command in commands {
            self.apply_control(command, now);
        }
    }

    // ── Tick ─────────────────────────────────────────────────────

    fn begin_metrics(&mut self) {
        let m = std::mem::take(&mut self.metrics);
        self.metrics = TickMetrics {
            ticks: m.ticks + 1,
            gated_ticks: m.gated_ticks,
            fallen_ticks: m.fallen_ticks,
            grace_ticks: m.grace_ticks,
            resets_applied: m.resets_applied,
            watchdog_resets: m.watchdog_resets,
            control_commands: m.control_commands,
            backwards_ticks: m.backwards_ticks,
            invalid_odometry: m.invalid_odometry,
            suspicious_rotations: m.suspicious_rotations,
            clamped_steps: m.clamped_steps,
            degenerate_steps: m.degenerate_steps,
            ..Default::default()
        };
    }

    /// Run one tick at loop time `now`. A `now` earlier than the previous
    /// tick is replaced by the previous tick's time.
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let tick_start = Instant::now();
        self.begin_metrics();
        let now = self.hold_monotonic(now);
        self.last_tick = now;

        let control_start = Instant::now();
        self.drain_controls(now);
        self.metrics.control_us = control_start.elapsed().as_micros() as u64;
        let config = Arc::clone(&self.config);

        let batch = self.collaborators.observations.steal();
        self.metrics.sightings = batch.len();

        let report = if !self.play_allowed() {
            self.hold_gated(now, batch.len())
        } else if self.collaborators.gate.is_fallen() {
            log::debug!("robot is fallen, holding the estimate");
            self.metrics.fallen_ticks += 1;
            TickReport::skipped(TickBranch::Fallen, batch.len())
        } else if let Some(report) = self.grace(&config, now, batch.len()) {
            report
        } else {
            self.forbidden = false;
            self.step(&config, &batch, now)
        };

        let quality_enabled = report.branch == TickBranch::Stepped;
        let publish_start = Instant::now();
        let sequence = self.publish(now, quality_enabled);
        self.metrics.publish_us = publish_start.elapsed().as_micros() as u64;
        self.metrics.total_us = tick_start.elapsed().as_micros() as u64;

        TickReport { sequence, ..report }
    }

    fn hold_gated(&mut self, now: Timestamp, sightings: usize) -> TickReport {
        self.last_forbidden = now;
        self.forbidden = true;
        log::debug!("play gate closed at {now}, holding the filter");
        let mut filter = lock(&self.filter);
        if filter.cancel_pending_reset(ResetKind::Uniform) {
            log::debug!("pending uniform reset cancelled by the play gate");
        }
        if filter.pending_reset() == ResetKind::Custom {
            filter.apply_pending_reset();
            self.metrics.resets_applied += 1;
        }
        self.results = FilterResults::import(&filter);
        drop(filter);
        self.metrics.gated_ticks += 1;
        TickReport::skipped(TickBranch::Gated, sightings)
    }

    fn grace(
        &mut self,
        config: &LocalizationConfig,
        now: Timestamp,
        sightings: usize,
    ) -> Option<TickReport> {
        if !self.forbidden {
            return None;
        }
        let since_forbidden = now.secs_since(self.last_forbidden);
        let filter = lock(&self.filter);
        let pending = filter.pending_reset();
        if since_forbidden >= config.start_without_reset_delay
            || !matches!(pending, ResetKind::None | ResetKind::Uniform)
        {
            return None;
        }
        self.results = FilterResults::import(&filter);
        drop(filter);
        log::debug!(
            "delaying restart: {since_forbidden:.2}s since the gate closed, pending reset '{pending}'"
        );
        self.metrics.grace_ticks += 1;
        Some(TickReport::skipped(TickBranch::Grace, sightings))
    }

    fn step(
        &mut self,
        config: &LocalizationConfig,
        batch: &fieldloc_core::ObservationBatch,
        now: Timestamp,
    ) -> TickReport {
        let obs_start = Instant::now();
        let pending = self.pending_reset();
        let observations = if pending == ResetKind::None && !config.odometry_only {
            self.builder.build(batch)
        } else {
            ObservationSet::new()
        };
        self.metrics.observations = observations.len();
        self.metrics.observation_us = obs_start.elapsed().as_micros() as u64;

        let verdict = if config.odometry_only {
            self.watcher.force_full();
            None
        } else {
            let mut filter = lock(&self.filter);
            Some(
                self.watcher
                    .update(&config.watcher, &observations, &mut filter, now),
            )
        };
        if verdict.is_some_and(|v| v.reset_issued) {
            self.metrics.watchdog_resets += 1;
        }

        let gain = noise_gain(config, &self.watcher, now);
        log::debug!("noise gain {gain:.3} (consistency {:.3})", self.watcher.score());
        self.metrics.noise_gain = gain;

        // Odometry before a non-Fall reset is meaningless for the new
        // population.
        let pending = self.pending_reset();
        let odometry_start = match pending {
            ResetKind::None | ResetKind::Fall => self.last_odometry,
            _ => self.watcher.last_reset(),
        };
        let mut motion = self
            .collaborators
            .odometry
            .displacement(odometry_start, now);
        if !motion.is_finite() {
            log::warn!("invalid odometry {motion:?} between {odometry_start} and {now}, ignored");
            self.metrics.invalid_odometry += 1;
            motion = Displacement::zero();
        }
        if motion.rotation() > config.suspicious_rotation {
            log::warn!(
                "unlikely rotation from odometry: {:.1} deg",
                motion.dheading.to_degrees()
            );
            self.metrics.suspicious_rotations += 1;
        }
        let elapsed = now.secs_since(self.last_odometry);
        let dt = if elapsed > config.max_step_time {
            log::warn!(
                "large time elapsed in the filter: {elapsed:.2}s, clamped to {:.2}s",
                config.max_step_time
            );
            self.metrics.clamped_steps += 1;
            config.max_step_time
        } else {
            elapsed
        };

        let step_start = Instant::now();
        let mut filter = lock(&self.filter);
        filter.set_noise_gain(gain);
        if let Err(e) = filter.resize(config.filter.particle_count) {
            log::warn!("cannot resize the population: {e}");
        }
        let outcome = filter.step(&motion, &observations, dt);
        self.results = FilterResults::import(&filter);
        self.metrics.particles = filter.len();
        drop(filter);
        self.metrics.filter_step_us = step_start.elapsed().as_micros() as u64;
        self.last_odometry = now;

        match outcome {
            StepOutcome::ResetApplied(_) => self.metrics.resets_applied += 1,
            StepOutcome::Updated {
                degenerate,
                effective_particles,
                ..
            } => {
                self.metrics.effective_particles = effective_particles;
                if degenerate {
                    self.metrics.degenerate_steps += 1;
                }
            }
        }

        TickReport {
            branch: TickBranch::Stepped,
            sequence: 0,
            sightings: batch.len(),
            observations: observations.len(),
            noise_gain: Some(gain),
            verdict,
            outcome: Some(outcome),
        }
    }

    fn publish(&mut self, now: Timestamp, quality_enabled: bool) -> u64 {
        self.sequence += 1;
        let estimate = PublishedEstimate {
            pose: self.results.representative,
            quality: self.results.quality,
            quality_enabled,
            consistency: self.watcher.score(),
            clusters: self.results.clusters.clone(),
            sequence: self.sequence,
            timestamp: now,
        };
        if let Some(sink) = self.collaborators.sink.as_mut() {
            sink.publish(&estimate);
        }
        self.mailbox.publish(estimate);
        self.sequence
    }
}

impl std::fmt::Debug for LocalizationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizationLoop")
            .field("sequence", &self.sequence)
            .field("consistency", &self.watcher.score())
            .field("last_tick", &self.last_tick)
            .field("last_odometry", &self.last_odometry)
            .field("forbidden", &self.forbidden)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NoiseBoostConfig, WatcherConfig};

    fn at(secs: f64) -> Timestamp {
        Timestamp(secs)
    }

    #[test]
    fn odometry_only_gain_is_tiny() {
        let config = LocalizationConfig {
            odometry_only: true,
            ..Default::default()
        };
        let w = ConsistencyWatcher::new(at(0.0));
        assert_eq!(noise_gain(&config, &w, at(1.0)), ODOMETRY_ONLY_GAIN);
    }

    #[test]
    fn boost_decays_linearly_after_uniform_reset() {
        let config = LocalizationConfig::default();
        let w = ConsistencyWatcher::new(at(0.0));
        assert!((noise_gain(&config, &w, at(0.0)) - 10.0).abs() < 1e-12);
        assert!((noise_gain(&config, &w, at(2.5)) - 5.5).abs() < 1e-12);
    }

    #[test]
    fn consistency_scales_gain_after_boost() {
        let config = LocalizationConfig::default();
        let mut w = ConsistencyWatcher::new(at(0.0));
        assert!((noise_gain(&config, &w, at(6.0)) - 1.0).abs() < 1e-12);
        w.note_reset(ResetKind::Uniform, at(0.0));
        assert!((noise_gain(&config, &w, at(6.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn disabled_watcher_and_no_boost_means_unit_gain() {
        let config = LocalizationConfig {
            watcher: WatcherConfig {
                enabled: false,
                ..Default::default()
            },
            noise_boost: NoiseBoostConfig {
                duration: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut w = ConsistencyWatcher::new(at(0.0));
        w.note_reset(ResetKind::Uniform, at(0.0));
        assert_eq!(noise_gain(&config, &w, at(0.0)), 1.0);
    }

    #[test]
    fn skipped_report_has_no_step() {
        let r = TickReport::skipped(TickBranch::Fallen, 3);
        assert_eq!(r.sightings, 3);
        assert!(r.outcome.is_none());
        assert!(r.verdict.is_none());
        assert!(r.noise_gain.is_none());
    }
}
