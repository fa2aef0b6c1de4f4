//! Consistency watchdog.
//!
//! The filter can lock onto a wrong pose that explains the observations
//! locally (the field is symmetric). [`ConsistencyWatcher`] keeps a score
//! in [0, 1] that decays every tick, rises with landmark features that
//! agree with the representative pose and falls with those that do not.
//! Tags and the field prior are not graded. When the score reaches 0 it
//! asks the filter for a Uniform reset, at most once per `reset_interval`.

use fieldloc_core::{Pose2D, ResetKind, ResetRequest, Timestamp};
use fieldloc_filter::FieldParticleFilter;
use fieldloc_obs::ObservationSet;

use crate::config::WatcherConfig;

/// Scores below this snap to exactly 0.
const SNAP_TO_ZERO: f64 = 1e-9;

/// Outcome of one [`ConsistencyWatcher::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WatcherVerdict {
    /// Score change applied this tick, before clamping.
    pub delta: f64,
    /// Score after the update.
    pub score: f64,
    /// Observations that agreed with the representative pose.
    pub good: u32,
    /// Observations that contradicted it.
    pub bad: u32,
    /// Whether a Uniform reset was requested.
    pub reset_issued: bool,
}

/// Tracks how well the estimate explains recent observations.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsistencyWatcher {
    score: f64,
    last_reset: Timestamp,
    last_uniform_reset: Timestamp,
}

impl ConsistencyWatcher {
    /// A watcher with full score, treating `start` as the last reset.
    pub fn new(start: Timestamp) -> Self {
        Self {
            score: 1.0,
            last_reset: start,
            last_uniform_reset: start,
        }
    }

    /// Current score in [0, 1].
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Time of the last reset of any kind.
    pub fn last_reset(&self) -> Timestamp {
        self.last_reset
    }

    /// Time of the last Uniform reset.
    pub fn last_uniform_reset(&self) -> Timestamp {
        self.last_uniform_reset
    }

    /// Seconds since the last reset of any kind.
    pub fn elapsed_since_reset(&self, now: Timestamp) -> f64 {
        now.secs_since(self.last_reset)
    }

    /// Seconds since the last Uniform reset.
    pub fn elapsed_since_uniform_reset(&self, now: Timestamp) -> f64 {
        now.secs_since(self.last_uniform_reset)
    }

    /// Pin the score to 1. Used while the watchdog is disabled or the
    /// loop runs on odometry only.
    pub fn force_full(&mut self) {
        self.score = 1.0;
    }

    /// Record a reset requested from outside the watchdog.
    pub fn note_reset(&mut self, kind: ResetKind, now: Timestamp) {
        match kind {
            ResetKind::None => return,
            ResetKind::Uniform => {
                self.last_uniform_reset = now;
                self.score = 0.0;
            }
            ResetKind::Custom | ResetKind::Borders => self.score = 1.0,
            ResetKind::Fall => {}
        }
        self.last_reset = now;
    }

    /// Score `observations` against the filter's representative pose and
    /// ask the filter for a Uniform reset if the score has run out.
    pub fn update(
        &mut self,
        config: &WatcherConfig,
        observations: &ObservationSet,
        filter: &mut FieldParticleFilter,
        now: Timestamp,
    ) -> WatcherVerdict {
        if !config.enabled {
            self.force_full();
            return WatcherVerdict {
                score: self.score,
                ..Default::default()
            };
        }

        let representative = filter.representative_particle();
        let mut verdict = self.score_observations(config, observations, &representative);
        self.score = (self.score + verdict.delta).clamp(0.0, 1.0);
        if self.score < SNAP_TO_ZERO {
            self.score = 0.0;
        }
        log::debug!(
            "consistency {:.3} (delta {:+.3}, {} good, {} bad)",
            self.score,
            verdict.delta,
            verdict.good,
            verdict.bad
        );

        let reset_allowed = self.elapsed_since_uniform_reset(now) > config.reset_interval;
        if self.score <= 0.0 && reset_allowed && !filter.is_reset_pending() {
            self.last_reset = now;
            self.last_uniform_reset = now;
            self.score = 0.0;
            filter.ask_for_reset(ResetRequest::Uniform);
            verdict.reset_issued = true;
            log::info!(
                "consistency exhausted at {}, asking for a uniform reset (estimate was {})",
                now,
                representative
            );
        }
        verdict.score = self.score;
        verdict
    }

    fn score_observations(
        &self,
        config: &WatcherConfig,
        observations: &ObservationSet,
        representative: &Pose2D,
    ) -> WatcherVerdict {
        let mut verdict = WatcherVerdict {
            delta: -config.step_cost,
            ..Default::default()
        };
        for obs in observations.scorable() {
            let score = obs.potential(representative);
            let min_score = obs.min_score();
            log::trace!("watchdog observation score {score:.4e} (min {min_score:.4e})");
            if score > min_score {
                verdict.delta += config.good_obs_gain;
                verdict.good += 1;
            } else {
                verdict.delta -= config.bad_obs_cost;
                verdict.bad += 1;
            }
        }
        verdict
    }
}
