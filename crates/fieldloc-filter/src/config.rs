//! Filter configuration and errors.

use std::error::Error;
use std::fmt;

/// Parameters of the particle filter.
///
/// Angles are in radians, distances in metres and rates per second.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    /// Number of particles maintained after every step.
    pub particle_count: usize,
    /// Position noise per second of elapsed time, scaled by the noise gain.
    pub xy_noise: f64,
    /// Heading noise per second of elapsed time, scaled by the noise gain.
    pub heading_noise: f64,
    /// Extra position noise per metre of odometry translation.
    pub odom_xy_noise_ratio: f64,
    /// Extra heading noise per radian of odometry rotation.
    pub odom_heading_noise_ratio: f64,
    /// Radius of the disc particles are scattered in after a fall.
    pub fall_xy_radius: f64,
    /// Bound of the heading perturbation after a fall.
    pub fall_heading_noise: f64,
    /// Position noise across the boundary line for a borders reset.
    pub borders_xy_noise: f64,
    /// Heading noise around the inward normal for a borders reset.
    pub borders_heading_noise: f64,
    /// Maximum distance between a particle and its cluster seed.
    pub cluster_radius: f64,
    /// Maximum heading difference between a particle and its cluster seed.
    pub cluster_heading_tolerance: f64,
    /// Upper bound on the number of clusters formed per step.
    pub max_clusters: usize,
    /// Spread of the main cluster at which quality halves.
    pub quality_radius: f64,
    /// Seed of the random generator; 0 seeds from system entropy.
    pub seed: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            particle_count: 5000,
            xy_noise: 0.02,
            heading_noise: 2f64.to_radians(),
            odom_xy_noise_ratio: 0.1,
            odom_heading_noise_ratio: 0.1,
            fall_xy_radius: 0.3,
            fall_heading_noise: 30f64.to_radians(),
            borders_xy_noise: 0.1,
            borders_heading_noise: 10f64.to_radians(),
            cluster_radius: 0.5,
            cluster_heading_tolerance: 30f64.to_radians(),
            max_clusters: 128,
            quality_radius: 0.3,
            seed: 0,
        }
    }
}

impl FilterConfig {
    /// Check every parameter.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.particle_count == 0 {
            return Err(FilterError::ZeroParticles);
        }
        if self.max_clusters == 0 {
            return Err(FilterError::InvalidParameter {
                name: "max_clusters",
                value: 0.0,
            });
        }
        for (name, value) in [
            ("xy_noise", self.xy_noise),
            ("heading_noise", self.heading_noise),
            ("odom_xy_noise_ratio", self.odom_xy_noise_ratio),
            ("odom_heading_noise_ratio", self.odom_heading_noise_ratio),
            ("fall_xy_radius", self.fall_xy_radius),
            ("fall_heading_noise", self.fall_heading_noise),
            ("borders_xy_noise", self.borders_xy_noise),
            ("borders_heading_noise", self.borders_heading_noise),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::InvalidNoise { name, value });
            }
        }
        for (name, value) in [
            ("cluster_radius", self.cluster_radius),
            ("cluster_heading_tolerance", self.cluster_heading_tolerance),
            ("quality_radius", self.quality_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FilterError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Errors from building or resizing a filter.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterError {
    /// A population of zero particles was requested.
    ZeroParticles,
    /// A noise parameter is negative or not finite.
    InvalidNoise {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Another parameter is out of range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroParticles => write!(f, "particle count must be at least 1"),
            Self::InvalidNoise { name, value } => {
                write!(f, "noise '{name}' must be finite and >= 0, got {value}")
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "parameter '{name}' is out of range: {value}")
            }
        }
    }
}

impl Error for FilterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_particles_rejected() {
        let cfg = FilterConfig {
            particle_count: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(FilterError::ZeroParticles));
    }

    #[test]
    fn negative_noise_rejected() {
        let cfg = FilterConfig {
            xy_noise: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(FilterError::InvalidNoise {
                name: "xy_noise",
                ..
            })
        ));
    }

    #[test]
    fn nan_quality_radius_rejected() {
        let cfg = FilterConfig {
            quality_radius: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(FilterError::InvalidParameter { .. })
        ));
    }
}
