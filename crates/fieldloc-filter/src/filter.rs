//! The field particle filter.
//!
//! [`FieldParticleFilter`] owns the particle population, a single pending
//! reset slot and the derived estimate (representative pose, quality and
//! cluster positions). One [`step`](FieldParticleFilter::step) either
//! consumes the pending reset or runs motion update, observation weighting
//! and systematic resampling.

use std::sync::Arc;

use fieldloc_core::{
    ClusterList, ClusterPosition, Displacement, FieldMap, Point2, Pose2D, ResetKind, ResetRequest,
};
use fieldloc_obs::ObservationSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cluster::{cluster, ClusterParams, Clustering};
use crate::config::{FilterConfig, FilterError};
use crate::motion::MotionModel;
use crate::particle::Particle;
use crate::reset;
use crate::resample;

/// Maximum number of cluster positions kept for publication.
const PUBLISHED_CLUSTERS: usize = 4;

/// What one [`FieldParticleFilter::step`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    /// A pending reset was consumed; motion and observations were skipped.
    ResetApplied(ResetKind),
    /// Regular update.
    Updated {
        /// Whether observation weights were applied.
        weighted: bool,
        /// Whether every particle had zero likelihood, so the previous
        /// weights were kept.
        degenerate: bool,
        /// Effective sample size after weighting, before resampling.
        effective_particles: f64,
    },
}

/// Particle filter estimating the robot pose on the field.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fieldloc_core::{Displacement, FieldMap, ResetKind, ResetRequest};
/// use fieldloc_filter::{FieldParticleFilter, FilterConfig};
/// use fieldloc_obs::ObservationSet;
///
/// let config = FilterConfig { particle_count: 200, seed: 1, ..Default::default() };
/// let mut filter = FieldParticleFilter::new(config, Arc::new(FieldMap::default())).unwrap();
/// filter.ask_for_reset(ResetRequest::Borders);
/// assert_eq!(filter.pending_reset(), ResetKind::Borders);
/// filter.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
/// assert!(!filter.is_reset_pending());
/// ```
#[derive(Debug)]
pub struct FieldParticleFilter {
    config: FilterConfig,
    map: Arc<FieldMap>,
    motion: MotionModel,
    particles: Vec<Particle>,
    target_count: usize,
    pending: Option<ResetRequest>,
    noise_gain: f64,
    representative: Pose2D,
    quality: f64,
    clusters: ClusterList,
    rng: ChaCha8Rng,
}

impl FieldParticleFilter {
    /// Build a filter with a uniform population of
    /// `config.particle_count` particles.
    pub fn new(config: FilterConfig, map: Arc<FieldMap>) -> Result<Self, FilterError> {
        config.validate()?;
        let rng = if config.seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(config.seed)
        };
        let n = config.particle_count;
        let mut filter = Self {
            motion: MotionModel::from_config(&config),
            config,
            map,
            particles: Vec::new(),
            target_count: n,
            pending: None,
            noise_gain: 1.0,
            representative: Pose2D::origin(),
            quality: 0.0,
            clusters: ClusterList::new(),
            rng,
        };
        filter.initialize_uniform(n)?;
        Ok(filter)
    }

    /// The filter configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Swap the noise and clustering parameters. The population, the
    /// random generator and the pending reset are kept; a new particle
    /// count takes effect at the next [`resize`](Self::resize).
    pub fn reconfigure(&mut self, config: FilterConfig) -> Result<(), FilterError> {
        config.validate()?;
        self.motion = MotionModel::from_config(&config);
        self.config = config;
        Ok(())
    }

    /// The field map.
    pub fn map(&self) -> &Arc<FieldMap> {
        &self.map
    }

    /// Replace the population with `n` uniformly spread particles. Quality
    /// drops to 0. The pending reset slot is not touched.
    pub fn initialize_uniform(&mut self, n: usize) -> Result<(), FilterError> {
        if n == 0 {
            return Err(FilterError::ZeroParticles);
        }
        self.target_count = n;
        self.particles = reset::uniform(n, &self.map, &mut self.rng);
        self.refresh_estimate();
        self.quality = 0.0;
        Ok(())
    }

    // ── Population size ──────────────────────────────────────────

    /// Resample the current population to `n` particles. Later steps keep
    /// this size. The pending reset slot is not touched.
    pub fn resize(&mut self, n: usize) -> Result<(), FilterError> {
        if n == 0 {
            return Err(FilterError::ZeroParticles);
        }
        self.target_count = n;
        if self.particles.len() != n {
            self.particles = resample::systematic(&self.particles, n, &mut self.rng);
        }
        Ok(())
    }

    /// Current population size.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the population is empty. Never true after construction.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Read-only view of the population.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    // ── Noise ────────────────────────────────────────────────────

    /// Set the multiplier of the time-proportional motion noise.
    pub fn set_noise_gain(&mut self, gain: f64) {
        self.noise_gain = if gain.is_finite() { gain.max(0.0) } else { 1.0 };
    }

    /// Current noise gain.
    pub fn noise_gain(&self) -> f64 {
        self.noise_gain
    }

    // ── Reset slot ───────────────────────────────────────────────

    /// Request a reset at the next step. A request already pending is
    /// replaced.
    pub fn ask_for_reset(&mut self, request: ResetRequest) {
        if let Some(prev) = self.pending.replace(request) {
            log::debug!(
                "pending {} reset replaced by {}",
                prev.kind(),
                request.kind()
            );
        }
    }

    /// Clear the pending reset if it is of `kind`. Returns whether a reset
    /// was cleared.
    pub fn cancel_pending_reset(&mut self, kind: ResetKind) -> bool {
        match self.pending {
            Some(req) if req.kind() == kind => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Apply the pending reset now. Returns the kind applied, or
    /// [`ResetKind::None`] when nothing was pending.
    pub fn apply_pending_reset(&mut self) -> ResetKind {
        match self.pending.take() {
            Some(req) => {
                self.apply_reset(&req);
                req.kind()
            }
            None => ResetKind::None,
        }
    }

    /// Whether a reset is pending.
    pub fn is_reset_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Kind of the pending reset.
    pub fn pending_reset(&self) -> ResetKind {
        self.pending.map_or(ResetKind::None, |r| r.kind())
    }

    /// The pending request, if any.
    pub fn pending_reset_request(&self) -> Option<&ResetRequest> {
        self.pending.as_ref()
    }

    fn apply_reset(&mut self, request: &ResetRequest) {
        let n = self.target_count;
        let previous_quality = self.quality;
        self.particles = match request {
            ResetRequest::Uniform => reset::uniform(n, &self.map, &mut self.rng),
            ResetRequest::Custom { pose, noise } => {
                reset::custom(n, pose, noise, &self.map, &mut self.rng)
            }
            ResetRequest::Fall => reset::fall(
                n,
                &self.representative,
                self.config.fall_xy_radius,
                self.config.fall_heading_noise,
                &self.map,
                &mut self.rng,
            ),
            ResetRequest::Borders => reset::borders(
                n,
                &self.map,
                self.config.borders_xy_noise,
                self.config.borders_heading_noise,
                &mut self.rng,
            ),
        };
        self.refresh_estimate();
        self.quality = match request {
            ResetRequest::Uniform => 0.0,
            ResetRequest::Custom { .. } | ResetRequest::Borders => 1.0,
            ResetRequest::Fall => previous_quality,
        };
        log::info!(
            "applied {} reset, {} particles, representative {}",
            request.kind(),
            n,
            self.representative
        );
    }

    // ── Step ─────────────────────────────────────────────────────

    /// Advance the filter by one tick.
    ///
    /// A pending reset is consumed and nothing else happens. Otherwise
    /// every particle is moved by `motion` with noise for `dt` seconds
    /// (a non-finite `motion` or `dt` counts as no motion),
    /// reweighted by `observations` when there are any, and the population
    /// is resampled to the target size.
    pub fn step(
        &mut self,
        motion: &Displacement,
        observations: &ObservationSet,
        dt: f64,
    ) -> StepOutcome {
        if let Some(req) = self.pending.take() {
            self.apply_reset(&req);
            return StepOutcome::ResetApplied(req.kind());
        }

        let (motion, dt) = if motion.is_finite() && dt.is_finite() {
            (*motion, dt)
        } else {
            log::warn!("non-finite motion {motion:?} over {dt}s, treated as no motion");
            (Displacement::zero(), 0.0)
        };
        let noise = self.motion.noise(&motion, dt, self.noise_gain);
        for p in &mut self.particles {
            let moved = self.motion.sample(&p.pose, &motion, &noise, &mut self.rng);
            let clamped = self.map.clamp_to_reachable(Point2::new(moved.x, moved.y));
            p.pose = Pose2D::new(clamped.x, clamped.y, moved.heading);
        }

        let mut degenerate = false;
        let weighted = !observations.is_empty();
        if weighted {
            degenerate = !self.reweight(observations);
        }
        let effective_particles = self.effective_particles();

        self.particles = resample::systematic(&self.particles, self.target_count, &mut self.rng);
        self.refresh_estimate();

        StepOutcome::Updated {
            weighted,
            degenerate,
            effective_particles,
        }
    }

    /// Multiply weights by the observation likelihoods, normalizing with
    /// the log-sum-exp trick. Returns false and leaves the weights intact
    /// if every particle has zero likelihood.
    fn reweight(&mut self, observations: &ObservationSet) -> bool {
        let log_weights: Vec<f64> = self
            .particles
            .iter()
            .map(|p| p.weight.ln() + observations.log_likelihood(&p.pose))
            .collect();
        let max = log_weights
            .iter()
            .copied()
            .filter(|lw| !lw.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            log::warn!("all particles have zero likelihood, keeping current weights");
            return false;
        }
        let sum: f64 = log_weights
            .iter()
            .map(|&lw| if lw.is_nan() { 0.0 } else { (lw - max).exp() })
            .sum();
        for (p, lw) in self.particles.iter_mut().zip(&log_weights) {
            p.weight = if lw.is_nan() {
                0.0
            } else {
                (lw - max).exp() / sum
            };
        }
        true
    }

    fn effective_particles(&self) -> f64 {
        let sum_sq: f64 = self.particles.iter().map(|p| p.weight * p.weight).sum();
        if sum_sq > 0.0 {
            1.0 / sum_sq
        } else {
            0.0
        }
    }

    // ── Estimate ─────────────────────────────────────────────────

    fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            radius: self.config.cluster_radius,
            heading_tolerance: self.config.cluster_heading_tolerance,
            max_clusters: self.config.max_clusters,
        }
    }

    fn refresh_estimate(&mut self) {
        let clustering: Clustering = cluster(&self.particles, &self.cluster_params());
        if let Some(main) = clustering.main() {
            self.representative = main.mean;
            let share = clustering.main_share();
            let q = share / (1.0 + main.spread / self.config.quality_radius);
            self.quality = if q.is_finite() { q.clamp(0.0, 1.0) } else { 0.0 };
        } else {
            self.quality = 0.0;
        }
        let total = clustering.total_weight;
        self.clusters = clustering
            .clusters
            .iter()
            .take(PUBLISHED_CLUSTERS)
            .map(|c| ClusterPosition {
                pose: c.mean,
                weight: if total > 0.0 { c.weight / total } else { 0.0 },
            })
            .collect();
    }

    /// Weighted mean pose of the heaviest cluster.
    pub fn representative_particle(&self) -> Pose2D {
        self.representative
    }

    /// Confidence in the representative pose, in [0, 1].
    pub fn representative_quality(&self) -> f64 {
        self.quality
    }

    /// Cluster positions, heaviest first.
    pub fn positions_from_clusters(&self) -> &ClusterList {
        &self.clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldloc_core::{ObservationBatch, Point3, ResetNoise, TagId, TagSighting};
    use fieldloc_obs::{ObservationConfig, ObservationSetBuilder};
    use proptest::prelude::*;

    fn filter(n: usize, seed: u64) -> FieldParticleFilter {
        FieldParticleFilter::new(
            FilterConfig {
                particle_count: n,
                seed,
                ..Default::default()
            },
            Arc::new(FieldMap::default()),
        )
        .unwrap()
    }

    fn custom(x: f64, y: f64, h: f64, xy: f64) -> ResetRequest {
        ResetRequest::Custom {
            pose: Pose2D::new(x, y, h),
            noise: ResetNoise {
                xy,
                heading: 0.05,
            },
        }
    }

    // ── Construction tests ───────────────────────────────────────

    #[test]
    fn new_filter_is_uniform_with_zero_quality() {
        let f = filter(500, 1);
        assert_eq!(f.len(), 500);
        assert_eq!(f.representative_quality(), 0.0);
        assert!(!f.is_reset_pending());
    }

    #[test]
    fn zero_particles_rejected() {
        let err = FieldParticleFilter::new(
            FilterConfig {
                particle_count: 0,
                ..Default::default()
            },
            Arc::new(FieldMap::default()),
        )
        .unwrap_err();
        assert_eq!(err, FilterError::ZeroParticles);
    }

    #[test]
    fn reconfigure_keeps_population() {
        let mut f = filter(100, 14);
        let before = f.particles().to_vec();
        let cfg = FilterConfig {
            xy_noise: 0.5,
            ..Default::default()
        };
        f.reconfigure(cfg).unwrap();
        assert_eq!(f.config().xy_noise, 0.5);
        assert_eq!(f.particles(), &before[..]);
        let bad = FilterConfig {
            xy_noise: -1.0,
            ..Default::default()
        };
        assert!(f.reconfigure(bad).is_err());
        assert_eq!(f.config().xy_noise, 0.5);
    }

    // ── Reset slot tests ─────────────────────────────────────────

    #[test]
    fn last_reset_request_wins() {
        let mut f = filter(100, 2);
        f.ask_for_reset(custom(1.0, 1.0, 0.0, 0.1));
        f.ask_for_reset(ResetRequest::Uniform);
        assert!(f.is_reset_pending());
        assert_eq!(f.pending_reset(), ResetKind::Uniform);
        assert_eq!(f.pending_reset_request(), Some(&ResetRequest::Uniform));
    }

    #[test]
    fn cancel_only_matching_kind() {
        let mut f = filter(100, 3);
        f.ask_for_reset(custom(1.0, 1.0, 0.0, 0.1));
        assert!(!f.cancel_pending_reset(ResetKind::Uniform));
        assert_eq!(f.pending_reset(), ResetKind::Custom);
        assert!(f.cancel_pending_reset(ResetKind::Custom));
        assert_eq!(f.pending_reset(), ResetKind::None);
    }

    #[test]
    fn reset_consumed_exactly_once() {
        let mut f = filter(200, 4);
        f.ask_for_reset(custom(2.0, -1.0, 0.3, 0.05));
        let out = f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        assert_eq!(out, StepOutcome::ResetApplied(ResetKind::Custom));
        assert!(!f.is_reset_pending());
        let out = f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        assert!(matches!(out, StepOutcome::Updated { weighted: false, .. }));
    }

    #[test]
    fn apply_pending_reset_forces_now() {
        let mut f = filter(200, 5);
        f.ask_for_reset(custom(-2.0, 1.0, 0.0, 0.05));
        assert_eq!(f.apply_pending_reset(), ResetKind::Custom);
        assert_eq!(f.apply_pending_reset(), ResetKind::None);
        assert!(f.representative_particle().distance(&Pose2D::new(-2.0, 1.0, 0.0)) < 0.1);
        assert_eq!(f.representative_quality(), 1.0);
    }

    #[test]
    fn resize_keeps_pending_reset() {
        let mut f = filter(200, 6);
        f.ask_for_reset(ResetRequest::Fall);
        f.resize(50).unwrap();
        assert_eq!(f.len(), 50);
        assert_eq!(f.pending_reset(), ResetKind::Fall);
        assert_eq!(f.resize(0), Err(FilterError::ZeroParticles));
    }

    #[test]
    fn uniform_reset_covers_field_and_zeroes_quality() {
        let mut f = filter(5000, 7);
        f.apply_reset(&custom(0.0, 0.0, 0.0, 0.05));
        f.ask_for_reset(ResetRequest::Uniform);
        f.step(&Displacement::zero(), &ObservationSet::new(), 1.0);
        assert_eq!(f.representative_quality(), 0.0);
        let xs = f.particles().iter().map(|p| p.pose.x);
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(f64::NEG_INFINITY, f64::max);
        let ys = f.particles().iter().map(|p| p.pose.y);
        let min_y = ys.clone().fold(f64::INFINITY, f64::min);
        let max_y = ys.fold(f64::NEG_INFINITY, f64::max);
        assert!(min_x < -4.5 && max_x > 4.5);
        assert!(min_y < -3.0 && max_y > 3.0);
    }

    #[test]
    fn fall_reset_keeps_quality_and_position() {
        let mut f = filter(1000, 8);
        f.ask_for_reset(custom(1.0, 2.0, 0.0, 0.02));
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        let q = f.representative_quality();
        f.ask_for_reset(ResetRequest::Fall);
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        assert_eq!(f.representative_quality(), q);
        assert!(f.representative_particle().distance(&Pose2D::new(1.0, 2.0, 0.0)) < 0.3);
    }

    #[test]
    fn borders_reset_sets_full_quality() {
        let mut f = filter(500, 9);
        f.ask_for_reset(ResetRequest::Borders);
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        assert_eq!(f.representative_quality(), 1.0);
    }

    // ── Step tests ───────────────────────────────────────────────

    #[test]
    fn odometry_moves_population() {
        let mut f = filter(500, 10);
        f.ask_for_reset(custom(0.0, 0.0, 0.0, 0.01));
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        f.set_noise_gain(0.0);
        f.step(&Displacement::new(1.0, 0.0, 0.0), &ObservationSet::new(), 0.1);
        let rep = f.representative_particle();
        assert!((rep.x - 1.0).abs() < 0.1);
        assert!(rep.y.abs() < 0.1);
    }

    #[test]
    fn non_finite_motion_is_no_motion() {
        let mut f = filter(200, 13);
        f.ask_for_reset(custom(1.0, 1.0, 0.0, 0.01));
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        f.set_noise_gain(0.0);
        let bad = Displacement {
            dx: f64::NAN,
            dy: 0.0,
            dheading: f64::INFINITY,
        };
        f.step(&bad, &ObservationSet::new(), 0.1);
        f.step(&Displacement::zero(), &ObservationSet::new(), f64::NAN);
        assert!(f.particles().iter().all(|p| p.pose.is_finite()));
        assert!(f.representative_particle().distance(&Pose2D::new(1.0, 1.0, 0.0)) < 0.1);
    }

    #[test]
    fn particles_stay_reachable() {
        let mut f = filter(300, 11);
        f.ask_for_reset(custom(5.0, 3.5, 0.0, 0.2));
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        for _ in 0..5 {
            f.step(&Displacement::new(2.0, 0.0, 0.0), &ObservationSet::new(), 1.0);
        }
        let map = FieldMap::default();
        assert!(f
            .particles()
            .iter()
            .all(|p| map.is_reachable(&p.pose.position())));
    }

    #[test]
    fn drift_without_input_is_bounded() {
        let cfg = FilterConfig::default();
        let mut f = filter(2000, 12);
        let start = Pose2D::new(1.0, 1.0, 0.0);
        f.ask_for_reset(ResetRequest::Custom {
            pose: start,
            noise: ResetNoise {
                xy: 0.01,
                heading: 0.01,
            },
        });
        f.step(&Displacement::zero(), &ObservationSet::new(), 1.0);
        let ticks = 20;
        for _ in 0..ticks {
            f.step(&Displacement::zero(), &ObservationSet::new(), 1.0);
        }
        let bound = ticks as f64 * cfg.xy_noise * f.noise_gain();
        assert!(f.representative_particle().distance(&start) <= bound);
    }

    #[test]
    fn tight_tag_localizes_uniform_population() {
        let map = Arc::new(
            FieldMap::default()
                .with_tag(TagId(3), Point3::new(3.0, 1.0, 0.0))
                .unwrap(),
        );
        let mut f = FieldParticleFilter::new(
            FilterConfig {
                particle_count: 5000,
                seed: 42,
                ..Default::default()
            },
            Arc::clone(&map),
        )
        .unwrap();
        let batch = ObservationBatch {
            tags: vec![TagSighting {
                id: TagId(3),
                position: Point3::new(0.0, 0.0, 0.0),
                std_dev: Point3::new(0.01, 0.01, 0.01),
                samples: 10,
            }],
            camera_height: 0.6,
            ..Default::default()
        };
        let obs = ObservationSetBuilder::new(map, ObservationConfig::default()).build(&batch);
        f.step(&Displacement::zero(), &obs, 0.1);
        let rep = f.representative_particle();
        assert!(
            rep.distance(&Pose2D::new(3.0, 1.0, 0.0)) < 0.2,
            "representative {rep} too far from the tag"
        );
    }

    #[test]
    fn clusters_are_sorted_and_bounded() {
        let mut f = filter(1000, 13);
        f.step(&Displacement::zero(), &ObservationSet::new(), 0.1);
        let clusters = f.positions_from_clusters();
        assert!(!clusters.is_empty());
        assert!(clusters.len() <= PUBLISHED_CLUSTERS);
        for pair in clusters.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn quality_stays_in_unit_interval(
            seed in 1u64..1000,
            dx in -1.0f64..1.0,
            dh in -1.0f64..1.0,
            tag_x in -2.0f64..2.0,
            tag_y in -2.0f64..2.0,
            gain in 0.0f64..10.0,
            dt in 0.0f64..5.0,
        ) {
            let map = Arc::new(
                FieldMap::default()
                    .with_tag(TagId(1), Point3::new(0.0, 0.0, 0.0))
                    .unwrap(),
            );
            let mut f = FieldParticleFilter::new(
                FilterConfig { particle_count: 150, seed, ..Default::default() },
                Arc::clone(&map),
            )
            .unwrap();
            f.set_noise_gain(gain);
            let batch = ObservationBatch {
                tags: vec![TagSighting {
                    id: TagId(1),
                    position: Point3::new(tag_x, tag_y, 0.0),
                    std_dev: Point3::new(0.01, 0.01, 0.01),
                    samples: 5,
                }],
                ..Default::default()
            };
            let obs = ObservationSetBuilder::new(map, ObservationConfig::default()).build(&batch);
            for _ in 0..3 {
                f.step(&Displacement::new(dx, 0.0, dh), &obs, dt);
                let q = f.representative_quality();
                prop_assert!((0.0..=1.0).contains(&q));
                prop_assert!(f.representative_particle().is_finite());
            }
        }
    }
}
