//! Observation model parameters.

use std::error::Error;
use std::fmt;

/// Tunable parameters of every observation model.
///
/// Angles are in radians and distances in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationConfig {
    /// Standard deviation of the bearing error of a feature sighting.
    pub sigma_bearing: f64,
    /// Standard deviation of the elevation error of a feature sighting.
    pub sigma_elevation: f64,
    /// Probability that a feature sighting is a false positive.
    pub feature_p_false: f64,
    /// Number of standard deviations at which a feature still counts as
    /// consistent with a pose.
    pub accept_sigmas: f64,
    /// Sightings of the same kind closer than this are merged.
    pub merge_angle: f64,
    /// Lower bound on the positional noise of a tag sighting.
    pub min_tag_sigma: f64,
    /// Probability that a tag sighting is a false positive.
    pub tag_p_false: f64,
    /// Weight contributed by each aggregated tag detection.
    pub tag_sample_weight: f64,
    /// Detections beyond this count do not add weight.
    pub max_tag_samples: u32,
    /// Decay length of the field-shape potential outside the lines.
    pub outside_field_sigma: f64,
    /// Floor of the field-shape potential.
    pub field_shape_floor: f64,
    /// Factor applied to goalkeeper poses outside the own half.
    pub goalkeeper_outside_factor: f64,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            sigma_bearing: 8f64.to_radians(),
            sigma_elevation: 4f64.to_radians(),
            feature_p_false: 0.1,
            accept_sigmas: 2.0,
            merge_angle: 5f64.to_radians(),
            min_tag_sigma: 0.1,
            tag_p_false: 1e-3,
            tag_sample_weight: 0.5,
            max_tag_samples: 10,
            outside_field_sigma: 0.5,
            field_shape_floor: 1e-3,
            goalkeeper_outside_factor: 0.2,
        }
    }
}

impl ObservationConfig {
    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ObsConfigError> {
        for (name, value) in [
            ("sigma_bearing", self.sigma_bearing),
            ("sigma_elevation", self.sigma_elevation),
            ("accept_sigmas", self.accept_sigmas),
            ("min_tag_sigma", self.min_tag_sigma),
            ("tag_sample_weight", self.tag_sample_weight),
            ("outside_field_sigma", self.outside_field_sigma),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ObsConfigError::NotPositive { name, value });
            }
        }
        if !self.merge_angle.is_finite() || self.merge_angle < 0.0 {
            return Err(ObsConfigError::NotPositive {
                name: "merge_angle",
                value: self.merge_angle,
            });
        }
        for (name, value) in [
            ("feature_p_false", self.feature_p_false),
            ("tag_p_false", self.tag_p_false),
            ("field_shape_floor", self.field_shape_floor),
            ("goalkeeper_outside_factor", self.goalkeeper_outside_factor),
        ] {
            // Floors stay strictly positive.
            if !(value > 0.0 && value < 1.0) {
                return Err(ObsConfigError::NotAProbability { name, value });
            }
        }
        if self.max_tag_samples == 0 {
            return Err(ObsConfigError::ZeroTagSamples);
        }
        Ok(())
    }
}

/// Invalid [`ObservationConfig`].
#[derive(Clone, Debug, PartialEq)]
pub enum ObsConfigError {
    /// A parameter that must be strictly positive is not.
    NotPositive {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A parameter that must lie in the open interval (0, 1) does not.
    NotAProbability {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// `max_tag_samples` is zero.
    ZeroTagSamples,
}

impl fmt::Display for ObsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { name, value } => {
                write!(f, "{name} must be positive and finite, got {value}")
            }
            Self::NotAProbability { name, value } => {
                write!(f, "{name} must be in (0, 1), got {value}")
            }
            Self::ZeroTagSamples => write!(f, "max_tag_samples must be at least 1"),
        }
    }
}

impl Error for ObsConfigError {}
