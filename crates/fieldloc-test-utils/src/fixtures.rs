//! Reusable maps and sightings.
//!
//! - [`tagged_map`]: default field with tags at given positions.
//! - [`tag_seen_from`]: the sighting a robot at a pose would report.
//! - [`feature_seen_from`]: pan/tilt of a landmark seen from a pose.

use std::sync::Arc;

use fieldloc_core::{
    FeatureSighting, FieldMap, LandmarkKind, ObservationBatch, Point2, Point3, Pose2D, TagId,
    TagSighting, Timestamp,
};

/// Camera height used by the fixtures, metres.
pub const CAMERA_HEIGHT: f64 = 0.6;

/// The default kid-size field.
pub fn standard_map() -> Arc<FieldMap> {
    Arc::new(FieldMap::default())
}

/// The default field with one tag per `(id, x, y)` entry, on the ground.
pub fn tagged_map(tags: &[(u32, f64, f64)]) -> Arc<FieldMap> {
    let map = tags.iter().fold(FieldMap::default(), |map, &(id, x, y)| {
        map.with_tag(TagId(id), Point3::new(x, y, 0.0))
            .unwrap_or_else(|e| panic!("fixture tag {id}: {e}"))
    });
    Arc::new(map)
}

/// Sighting of tag `id` as reported by a robot standing at `pose`.
///
/// # Panics
///
/// Panics if `map` has no tag `id`.
pub fn tag_seen_from(map: &FieldMap, id: u32, pose: &Pose2D, std_dev: f64) -> TagSighting {
    let field = map
        .tag_position(TagId(id))
        .unwrap_or_else(|| panic!("fixture map has no tag {id}"));
    let local = pose.to_local(&Point2::new(field.x, field.y));
    TagSighting {
        id: TagId(id),
        position: Point3::new(local.x, local.y, field.z),
        std_dev: Point3::new(std_dev, std_dev, std_dev),
        samples: 10,
    }
}

/// Sighting of the landmark at `landmark` as seen from `pose`.
pub fn feature_seen_from(kind: LandmarkKind, landmark: Point2, pose: &Pose2D) -> FeatureSighting {
    let local = pose.to_local(&landmark);
    FeatureSighting {
        kind,
        bearing: local.y.atan2(local.x),
        elevation: CAMERA_HEIGHT.atan2(local.norm()),
        weight: 1.0,
    }
}

/// Batch holding only `tags`.
pub fn tag_batch(tags: Vec<TagSighting>, timestamp: Timestamp) -> ObservationBatch {
    ObservationBatch {
        tags,
        camera_height: CAMERA_HEIGHT,
        timestamp,
        ..Default::default()
    }
}

/// Batch holding only `features`.
pub fn feature_batch(features: Vec<FeatureSighting>, timestamp: Timestamp) -> ObservationBatch {
    ObservationBatch {
        features,
        camera_height: CAMERA_HEIGHT,
        timestamp,
        ..Default::default()
    }
}
