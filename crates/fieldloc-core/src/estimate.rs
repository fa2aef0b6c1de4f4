//! Odometry displacements and the published estimate.

use smallvec::SmallVec;

use crate::id::Timestamp;
use crate::pose::{normalize_angle, Pose2D};

/// Robot-frame motion between two timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Displacement {
    /// Forward motion, metres.
    pub dx: f64,
    /// Leftward motion, metres.
    pub dy: f64,
    /// Rotation, radians counter-clockwise.
    pub dheading: f64,
}

impl Displacement {
    /// Create a displacement. The rotation is normalized.
    pub fn new(dx: f64, dy: f64, dheading: f64) -> Self {
        Self {
            dx,
            dy,
            dheading: normalize_angle(dheading),
        }
    }

    /// No motion.
    pub const fn zero() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            dheading: 0.0,
        }
    }

    /// Length of the translation part.
    pub fn translation(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Absolute rotation, radians.
    pub fn rotation(&self) -> f64 {
        self.dheading.abs()
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite() && self.dheading.is_finite()
    }
}

/// Weighted mean pose of one particle cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterPosition {
    /// Weighted mean pose of the cluster.
    pub pose: Pose2D,
    /// Share of the total population weight in this cluster.
    pub weight: f64,
}

/// Cluster list carried by a [`PublishedEstimate`].
pub type ClusterList = SmallVec<[ClusterPosition; 4]>;

/// Immutable snapshot of the localization result at the end of a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedEstimate {
    /// Representative pose of the population.
    pub pose: Pose2D,
    /// Confidence in [0, 1].
    pub quality: f64,
    /// Whether `quality` is meaningful: true only when the filter stepped
    /// on the tick that produced this snapshot.
    pub quality_enabled: bool,
    /// Watchdog consistency score in [0, 1].
    pub consistency: f64,
    /// Cluster positions, heaviest first.
    pub clusters: ClusterList,
    /// Tick sequence number that produced this snapshot.
    pub sequence: u64,
    /// Loop time at which this snapshot was produced.
    pub timestamp: Timestamp,
}

impl Default for PublishedEstimate {
    fn default() -> Self {
        Self {
            pose: Pose2D::origin(),
            quality: 0.0,
            quality_enabled: false,
            consistency: 1.0,
            clusters: ClusterList::new(),
            sequence: 0,
            timestamp: Timestamp::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_magnitudes() {
        let d = Displacement::new(3.0, 4.0, -0.5);
        assert_eq!(d.translation(), 5.0);
        assert_eq!(d.rotation(), 0.5);
    }

    #[test]
    fn default_estimate_has_no_quality() {
        let e = PublishedEstimate::default();
        assert_eq!(e.quality, 0.0);
        assert!(!e.quality_enabled);
        assert!(e.clusters.is_empty());
    }
}
