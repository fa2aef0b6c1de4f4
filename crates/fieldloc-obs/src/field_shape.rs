//! Prior that robots stay inside the field lines.

use std::sync::Arc;

use fieldloc_core::{FieldMap, Pose2D};

use crate::config::ObservationConfig;

/// Penalizes poses outside the field; goalkeepers are also expected in
/// their own half.
#[derive(Clone, Debug)]
pub struct FieldShapeObservation {
    /// Whether the robot plays goalkeeper.
    pub goalkeeper: bool,
    sigma: f64,
    log_floor: f64,
    log_outside_half: f64,
    map: Arc<FieldMap>,
}

impl FieldShapeObservation {
    /// Create the prior.
    pub fn new(goalkeeper: bool, map: Arc<FieldMap>, config: &ObservationConfig) -> Self {
        Self {
            goalkeeper,
            sigma: config.outside_field_sigma,
            log_floor: config.field_shape_floor.ln(),
            log_outside_half: config.goalkeeper_outside_factor.ln(),
            map,
        }
    }

    /// Natural log of [`potential`](Self::potential).
    pub fn log_potential(&self, pose: &Pose2D) -> f64 {
        let p = pose.position();
        let d = self.map.distance_outside_field(&p);
        let mut lp = if d > 0.0 {
            let r = d / self.sigma;
            (-0.5 * r * r).max(self.log_floor)
        } else {
            0.0
        };
        if self.goalkeeper && !self.map.is_in_own_half(&p) {
            lp += self.log_outside_half;
        }
        lp
    }

    /// 1 inside the field, decaying outside.
    pub fn potential(&self, pose: &Pose2D) -> f64 {
        self.log_potential(pose).exp()
    }

    /// Lowest value the potential can take.
    pub fn min_score(&self) -> f64 {
        let mut lp = self.log_floor;
        if self.goalkeeper {
            lp += self.log_outside_half;
        }
        lp.exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(goalkeeper: bool) -> FieldShapeObservation {
        FieldShapeObservation::new(
            goalkeeper,
            Arc::new(FieldMap::default()),
            &ObservationConfig::default(),
        )
    }

    #[test]
    fn inside_field_is_one() {
        assert_eq!(shape(false).potential(&Pose2D::new(2.0, 1.0, 0.0)), 1.0);
    }

    #[test]
    fn decays_outside() {
        let s = shape(false);
        let near = s.potential(&Pose2D::new(4.7, 0.0, 0.0));
        let far = s.potential(&Pose2D::new(5.4, 0.0, 0.0));
        assert!(near < 1.0);
        assert!(far < near);
        assert!(far >= s.min_score());
    }

    #[test]
    fn goalkeeper_prefers_own_half() {
        let s = shape(true);
        let own = s.potential(&Pose2D::new(-3.5, 0.0, 0.0));
        let theirs = s.potential(&Pose2D::new(3.5, 0.0, 0.0));
        assert_eq!(own, 1.0);
        assert!(theirs < own);
    }
}
