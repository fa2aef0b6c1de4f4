//! Reset requests for the particle population.

use std::fmt;

use crate::pose::Pose2D;

/// Noise radii for a custom reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResetNoise {
    /// Standard deviation of the position, metres.
    pub xy: f64,
    /// Standard deviation of the heading, radians.
    pub heading: f64,
}

impl Default for ResetNoise {
    fn default() -> Self {
        Self {
            xy: 0.3,
            heading: 15f64.to_radians(),
        }
    }
}

/// A request to reseed the particle population.
///
/// At most one request is pending in a filter at a time; a new request
/// replaces the previous one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResetRequest {
    /// Spread the population uniformly over the reachable area.
    Uniform,
    /// Gaussian cloud around a known pose.
    Custom {
        /// Centre of the cloud.
        pose: Pose2D,
        /// Spread of the cloud.
        noise: ResetNoise,
    },
    /// Bounded perturbation around the current estimate after a fall.
    Fall,
    /// Spread along the field boundary, facing inwards.
    Borders,
}

impl ResetRequest {
    /// Introspection tag of this request.
    pub fn kind(&self) -> ResetKind {
        match self {
            Self::Uniform => ResetKind::Uniform,
            Self::Custom { .. } => ResetKind::Custom,
            Self::Fall => ResetKind::Fall,
            Self::Borders => ResetKind::Borders,
        }
    }
}

/// Introspection tag for a pending reset slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResetKind {
    /// Nothing pending.
    #[default]
    None,
    /// See [`ResetRequest::Uniform`].
    Uniform,
    /// See [`ResetRequest::Custom`].
    Custom,
    /// See [`ResetRequest::Fall`].
    Fall,
    /// See [`ResetRequest::Borders`].
    Borders,
}

impl fmt::Display for ResetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Uniform => "uniform",
            Self::Custom => "custom",
            Self::Fall => "fall",
            Self::Borders => "borders",
        };
        f.write_str(s)
    }
}
