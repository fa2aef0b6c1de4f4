//! Observation staging area between perception and the loop.
//!
//! Perception threads push sightings as they arrive; the loop steals the
//! whole stage once per tick. Each category sits behind its own mutex so
//! feature and tag producers never contend with each other.

use std::sync::{Mutex, MutexGuard, PoisonError};

use fieldloc_core::{FeatureSighting, ObservationBatch, ObservationSource, TagSighting, Timestamp};

#[derive(Debug, Default)]
struct FeatureStage {
    sightings: Vec<FeatureSighting>,
    camera_height: f64,
    timestamp: Timestamp,
}

/// Sightings gathered since the last steal.
#[derive(Debug, Default)]
pub struct ObservationStaging {
    features: Mutex<FeatureStage>,
    tags: Mutex<Vec<TagSighting>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ObservationStaging {
    /// An empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add feature sightings seen from a camera at `camera_height`.
    pub fn push_features<I>(&self, sightings: I, camera_height: f64, timestamp: Timestamp)
    where
        I: IntoIterator<Item = FeatureSighting>,
    {
        let mut stage = lock(&self.features);
        stage.sightings.extend(sightings);
        stage.camera_height = camera_height;
        stage.timestamp = timestamp;
    }

    /// Add tag sightings.
    pub fn push_tags<I>(&self, sightings: I)
    where
        I: IntoIterator<Item = TagSighting>,
    {
        lock(&self.tags).extend(sightings);
    }

    /// Drop everything staged.
    pub fn clear(&self) {
        *lock(&self.features) = FeatureStage::default();
        lock(&self.tags).clear();
    }

    /// Number of staged sightings.
    pub fn len(&self) -> usize {
        let features = lock(&self.features).sightings.len();
        features + lock(&self.tags).len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObservationSource for ObservationStaging {
    fn steal(&self) -> ObservationBatch {
        let features = std::mem::take(&mut *lock(&self.features));
        let tags = std::mem::take(&mut *lock(&self.tags));
        ObservationBatch {
            features: features.sightings,
            tags,
            camera_height: features.camera_height,
            timestamp: features.timestamp,
        }
    }
}
