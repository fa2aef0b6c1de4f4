//! Benchmark profiles for the fieldloc localization engine.
//!
//! Provides pre-built inputs for benchmarking:
//!
//! - [`reference_map`]: default field with four tags behind the goals
//! - [`reference_config`]: loop configuration with a given population size
//! - [`reference_batch`]: sightings a robot at a pose would report

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use fieldloc_core::{
    FeatureSighting, FieldMap, FieldMapError, LandmarkKind, ObservationBatch, Point2, Point3,
    Pose2D, TagId, TagSighting, Timestamp,
};
use fieldloc_engine::{LocalizationConfig, RunMode};
use fieldloc_filter::FilterConfig;

/// Camera height of the reference robot, metres.
pub const CAMERA_HEIGHT: f64 = 0.6;

/// Maximum distance at which the reference robot sees anything, metres.
pub const VIEW_DISTANCE: f64 = 4.0;

/// Default field with tags 0..4 placed behind the goal corners.
pub fn reference_map() -> Result<Arc<FieldMap>, FieldMapError> {
    let mut map = FieldMap::default();
    let hl = map.half_length() + 0.3;
    let hw = map.half_width() * 0.5;
    for (id, (x, y)) in (0u32..).zip([(hl, hw), (hl, -hw), (-hl, hw), (-hl, -hw)]) {
        map = map.with_tag(TagId(id), Point3::new(x, y, 0.3))?;
    }
    Ok(Arc::new(map))
}

/// Replay-mode configuration with `particles` particles and a fixed seed.
pub fn reference_config(particles: usize, seed: u64) -> LocalizationConfig {
    LocalizationConfig {
        mode: RunMode::Replay,
        period: 0.05,
        filter: FilterConfig {
            particle_count: particles,
            seed,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Every landmark and tag within [`VIEW_DISTANCE`] of `pose`, as the
/// perception pipeline would report them.
pub fn reference_batch(map: &FieldMap, pose: &Pose2D, timestamp: Timestamp) -> ObservationBatch {
    let mut features = Vec::new();
    for kind in LandmarkKind::ALL {
        for landmark in map.landmarks(kind) {
            let local = pose.to_local(landmark);
            let distance = local.norm();
            if distance > VIEW_DISTANCE || distance < 1e-3 {
                continue;
            }
            features.push(FeatureSighting {
                kind,
                bearing: local.y.atan2(local.x),
                elevation: CAMERA_HEIGHT.atan2(distance),
                weight: 1.0,
            });
        }
    }
    let mut tags = Vec::new();
    for id in 0..4 {
        let Some(field) = map.tag_position(TagId(id)) else {
            continue;
        };
        let local = pose.to_local(&Point2::new(field.x, field.y));
        if local.norm() > VIEW_DISTANCE {
            continue;
        }
        tags.push(TagSighting {
            id: TagId(id),
            position: Point3::new(local.x, local.y, field.z),
            std_dev: Point3::new(0.05, 0.05, 0.05),
            samples: 5,
        });
    }
    ObservationBatch {
        features,
        tags,
        camera_height: CAMERA_HEIGHT,
        timestamp,
    }
}
