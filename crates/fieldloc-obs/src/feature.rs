//! Landmark sightings scored by bearing and elevation.
//!
//! For a candidate pose every landmark of the sighted kind predicts a
//! bearing and an elevation. The angular errors are scored with a Gaussian
//! mixed with a false-positive floor, and the best matching landmark wins.

use std::sync::Arc;

use fieldloc_core::{angle_diff, FeatureSighting, FieldMap, LandmarkKind, Point2, Pose2D};

use crate::config::ObservationConfig;
use crate::score::{log_gauss2, log_mix};

/// A feature sighting bound to the field map and model parameters.
#[derive(Clone, Debug)]
pub struct FeatureObservation {
    /// Landmark kind.
    pub kind: LandmarkKind,
    /// Robot-frame bearing, radians.
    pub bearing: f64,
    /// Elevation below the horizon, radians.
    pub elevation: f64,
    /// Camera height above the ground, metres.
    pub camera_height: f64,
    /// Exponent applied to the score.
    pub weight: f64,
    sigma_bearing: f64,
    sigma_elevation: f64,
    p_false: f64,
    accept_sigmas: f64,
    map: Arc<FieldMap>,
}

impl FeatureObservation {
    /// Bind a raw sighting.
    pub fn new(
        sighting: &FeatureSighting,
        camera_height: f64,
        map: Arc<FieldMap>,
        config: &ObservationConfig,
    ) -> Self {
        Self {
            kind: sighting.kind,
            bearing: sighting.bearing,
            elevation: sighting.elevation,
            camera_height,
            weight: sighting.weight.max(0.0),
            sigma_bearing: config.sigma_bearing,
            sigma_elevation: config.sigma_elevation,
            p_false: config.feature_p_false,
            accept_sigmas: config.accept_sigmas,
            map,
        }
    }

    /// Bearing and elevation at which `landmark` appears from `pose`.
    pub fn expected_angles(&self, pose: &Pose2D, landmark: &Point2) -> (f64, f64) {
        let local = pose.to_local(landmark);
        let bearing = local.y.atan2(local.x);
        let elevation = self.camera_height.atan2(local.norm());
        (bearing, elevation)
    }

    /// Unweighted log score of the best matching landmark.
    fn best_log_score(&self, pose: &Pose2D) -> f64 {
        let mut best = self.p_false.ln();
        for landmark in self.map.landmarks(self.kind) {
            let (b, e) = self.expected_angles(pose, landmark);
            let log_g = log_gauss2(
                angle_diff(b, self.bearing),
                self.sigma_bearing,
                self.elevation - e,
                self.sigma_elevation,
            );
            best = best.max(log_mix(self.p_false, log_g));
        }
        best
    }

    /// Natural log of [`potential`](Self::potential).
    pub fn log_potential(&self, pose: &Pose2D) -> f64 {
        let lp = self.weight * self.best_log_score(pose);
        log::trace!(
            "{} bearing={:.3} elevation={:.3} at {} -> log potential {:.4}",
            self.kind.name(),
            self.bearing,
            self.elevation,
            pose,
            lp
        );
        lp
    }

    /// Likelihood of this sighting from `pose`, raised to the weight.
    pub fn potential(&self, pose: &Pose2D) -> f64 {
        self.log_potential(pose).exp()
    }

    /// Potential of a sighting off by `accept_sigmas` standard deviations
    /// on one axis. Anything at or below this is inconsistent.
    pub fn min_score(&self) -> f64 {
        let k = self.accept_sigmas;
        (self.weight * log_mix(self.p_false, -0.5 * k * k)).exp()
    }

    /// Whether two sightings likely refer to the same landmark.
    pub fn is_similar(&self, other: &FeatureObservation, merge_angle: f64) -> bool {
        self.kind == other.kind
            && angle_diff(self.bearing, other.bearing).abs() < merge_angle
            && (self.elevation - other.elevation).abs() < merge_angle
    }

    /// Fold `other` into `self`: weights add and angles average by weight.
    pub fn merge(&mut self, other: &FeatureObservation) {
        let total = self.weight + other.weight;
        if total <= 0.0 {
            return;
        }
        let r = other.weight / total;
        self.bearing = fieldloc_core::normalize_angle(
            self.bearing + r * angle_diff(self.bearing, other.bearing),
        );
        self.elevation += r * (other.elevation - self.elevation);
        self.weight = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs_from(pose: &Pose2D, landmark: Point2, kind: LandmarkKind) -> FeatureObservation {
        let map = Arc::new(FieldMap::default());
        let probe = FeatureObservation::new(
            &FeatureSighting {
                kind,
                bearing: 0.0,
                elevation: 0.0,
                weight: 1.0,
            },
            0.6,
            Arc::clone(&map),
            &ObservationConfig::default(),
        );
        let (b, e) = probe.expected_angles(pose, &landmark);
        FeatureObservation::new(
            &FeatureSighting {
                kind,
                bearing: b,
                elevation: e,
                weight: 1.0,
            },
            0.6,
            map,
            &ObservationConfig::default(),
        )
    }

    #[test]
    fn exact_pose_scores_one() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let obs = obs_from(&pose, Point2::new(0.0, 0.0), LandmarkKind::CenterMark);
        // Looking straight down at the centre mark from on top of it.
        assert!((obs.potential(&pose) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correct_pose_beats_wrong_pose() {
        let truth = Pose2D::new(2.0, 0.5, 0.3);
        let obs = obs_from(&truth, Point2::new(3.0, 0.0), LandmarkKind::PenaltyMark);
        let wrong = Pose2D::new(-1.0, -2.0, 2.0);
        assert!(obs.potential(&truth) > obs.potential(&wrong));
        assert!(obs.potential(&truth) > obs.min_score());
    }

    #[test]
    fn potential_never_below_floor() {
        let truth = Pose2D::new(2.0, 0.5, 0.3);
        let obs = obs_from(&truth, Point2::new(3.0, 0.0), LandmarkKind::PenaltyMark);
        let far = Pose2D::new(-4.0, 3.5, -3.0);
        assert!(obs.potential(&far) >= 0.1 - 1e-12);
    }

    #[test]
    fn min_score_increases_with_lower_weight() {
        let truth = Pose2D::new(0.0, 0.0, 0.0);
        let mut obs = obs_from(&truth, Point2::new(3.0, 0.0), LandmarkKind::PenaltyMark);
        let single = obs.min_score();
        obs.weight = 2.0;
        assert!(obs.min_score() < single);
    }

    #[test]
    fn merge_averages_by_weight() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let mut a = obs_from(&pose, Point2::new(3.0, 0.0), LandmarkKind::PenaltyMark);
        let mut b = a.clone();
        a.bearing = 0.0;
        b.bearing = 0.04;
        b.weight = 3.0;
        assert!(a.is_similar(&b, 5f64.to_radians()));
        a.merge(&b);
        assert_eq!(a.weight, 4.0);
        assert!((a.bearing - 0.03).abs() < 1e-12);
    }

    #[test]
    fn different_kinds_are_not_similar() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let a = obs_from(&pose, Point2::new(3.0, 0.0), LandmarkKind::PenaltyMark);
        let mut b = a.clone();
        b.kind = LandmarkKind::GoalPost;
        assert!(!a.is_similar(&b, 1.0));
    }
}
