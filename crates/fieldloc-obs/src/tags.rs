//! Fiducial tag sightings scored by robot-frame position error.

use std::sync::Arc;

use fieldloc_core::{FieldMap, Point3, Pose2D, TagId, TagSighting};

use crate::config::ObservationConfig;
use crate::score::{log_gauss2, log_mix};

/// A tag sighting bound to the field map and model parameters.
#[derive(Clone, Debug)]
pub struct TagsObservation {
    /// Tag identifier.
    pub id: TagId,
    /// Mean position of the tag in the robot frame.
    pub seen: Point3,
    /// Per-axis standard deviation of `seen`.
    pub std_dev: Point3,
    /// Number of aggregated detections.
    pub samples: u32,
    /// Exponent applied to the score.
    pub weight: f64,
    sigma_x: f64,
    sigma_y: f64,
    p_false: f64,
    accept_sigmas: f64,
    map: Arc<FieldMap>,
}

impl TagsObservation {
    /// Bind a raw sighting.
    pub fn new(sighting: &TagSighting, map: Arc<FieldMap>, config: &ObservationConfig) -> Self {
        let counted = sighting.samples.min(config.max_tag_samples);
        Self {
            id: sighting.id,
            seen: sighting.position,
            std_dev: sighting.std_dev,
            samples: sighting.samples,
            weight: f64::from(counted) * config.tag_sample_weight,
            sigma_x: sighting.std_dev.x.abs().max(config.min_tag_sigma),
            sigma_y: sighting.std_dev.y.abs().max(config.min_tag_sigma),
            p_false: config.tag_p_false,
            accept_sigmas: config.accept_sigmas,
            map,
        }
    }

    /// Whether the field map knows where this tag is.
    pub fn is_known(&self) -> bool {
        self.map.tag_position(self.id).is_some()
    }

    /// Natural log of [`potential`](Self::potential).
    pub fn log_potential(&self, pose: &Pose2D) -> f64 {
        let Some(known) = self.map.tag_position(self.id) else {
            return 0.0;
        };
        let expected = pose.to_local(&known.xy());
        let log_g = log_gauss2(
            expected.x - self.seen.x,
            self.sigma_x,
            expected.y - self.seen.y,
            self.sigma_y,
        );
        let lp = self.weight * log_mix(self.p_false, log_g);
        log::trace!("{} at {} -> log potential {:.4}", self.id, pose, lp);
        lp
    }

    /// Likelihood of this sighting from `pose`, raised to the weight.
    /// Unknown tags are neutral.
    pub fn potential(&self, pose: &Pose2D) -> f64 {
        self.log_potential(pose).exp()
    }

    /// Potential of a sighting off by `accept_sigmas` standard deviations
    /// on one axis.
    pub fn min_score(&self) -> f64 {
        let k = self.accept_sigmas;
        (self.weight * log_mix(self.p_false, -0.5 * k * k)).exp()
    }
}
