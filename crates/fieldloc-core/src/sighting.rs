//! Raw sightings delivered by the perception pipeline.
//!
//! Sightings are expressed in the robot frame and are converted into
//! scored observations once per tick.

use crate::field::LandmarkKind;
use crate::id::{TagId, Timestamp};
use crate::pose::Point3;

/// A landmark seen by the camera, as pan/tilt angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureSighting {
    /// Which kind of landmark was detected.
    pub kind: LandmarkKind,
    /// Bearing (pan) in the robot frame, radians, counter-clockwise.
    pub bearing: f64,
    /// Elevation (tilt) below the horizon, radians. Positive looks down.
    pub elevation: f64,
    /// Confidence weight, `> 0`.
    pub weight: f64,
}

/// A fiducial tag located in 3D by the perception pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagSighting {
    /// Tag identifier.
    pub id: TagId,
    /// Mean observed position in the robot frame.
    pub position: Point3,
    /// Per-axis standard deviation of the observed position.
    pub std_dev: Point3,
    /// Number of detections aggregated into this sighting.
    pub samples: u32,
}

/// Everything the perception pipeline saw since the last steal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservationBatch {
    /// Feature sightings.
    pub features: Vec<FeatureSighting>,
    /// Tag sightings.
    pub tags: Vec<TagSighting>,
    /// Camera height above the ground, metres.
    pub camera_height: f64,
    /// Capture time of the most recent sighting.
    pub timestamp: Timestamp,
}

impl ObservationBatch {
    /// Whether the batch holds no sighting at all.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.tags.is_empty()
    }

    /// Total number of sightings.
    pub fn len(&self) -> usize {
        self.features.len() + self.tags.len()
    }
}
