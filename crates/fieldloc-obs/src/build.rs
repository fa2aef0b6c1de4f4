//! Turning a raw sighting batch into the observation set of one tick.
//!
//! Feature sightings of the same kind that point in nearly the same
//! direction are merged into one heavier observation. Every tag sighting
//! becomes one observation. The field-shape prior is appended only when
//! at least one other observation exists, so an empty batch yields an
//! empty set and the filter skips its weight update.

use std::sync::Arc;

use fieldloc_core::{FieldMap, ObservationBatch};

use crate::config::ObservationConfig;
use crate::feature::FeatureObservation;
use crate::field_shape::FieldShapeObservation;
use crate::observation::{Observation, ObservationSet};
use crate::tags::TagsObservation;

/// Builds [`ObservationSet`]s against one field map and configuration.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fieldloc_core::{FieldMap, ObservationBatch};
/// use fieldloc_obs::{ObservationConfig, ObservationSetBuilder};
///
/// let builder = ObservationSetBuilder::new(
///     Arc::new(FieldMap::default()),
///     ObservationConfig::default(),
/// )
/// .goalkeeper(true);
/// assert!(builder.build(&ObservationBatch::default()).is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct ObservationSetBuilder {
    map: Arc<FieldMap>,
    config: ObservationConfig,
    goalkeeper: bool,
}

impl ObservationSetBuilder {
    /// Create a builder for a field-player.
    pub fn new(map: Arc<FieldMap>, config: ObservationConfig) -> Self {
        Self {
            map,
            config,
            goalkeeper: false,
        }
    }

    /// Set the goalkeeper flag used by the field-shape prior.
    pub fn goalkeeper(mut self, goalkeeper: bool) -> Self {
        self.goalkeeper = goalkeeper;
        self
    }

    /// The observation configuration in use.
    pub fn config(&self) -> &ObservationConfig {
        &self.config
    }

    /// Merge feature sightings that likely refer to the same landmark.
    pub fn merged_features(&self, batch: &ObservationBatch) -> Vec<FeatureObservation> {
        let mut merged: Vec<FeatureObservation> = Vec::with_capacity(batch.features.len());
        for sighting in &batch.features {
            let obs = FeatureObservation::new(
                sighting,
                batch.camera_height,
                Arc::clone(&self.map),
                &self.config,
            );
            let mut absorbed = false;
            for existing in merged.iter_mut() {
                if existing.is_similar(&obs, self.config.merge_angle) {
                    existing.merge(&obs);
                    absorbed = true;
                    break;
                }
            }
            if !absorbed {
                merged.push(obs);
            }
        }
        merged
    }

    /// Build the observation set for one tick.
    pub fn build(&self, batch: &ObservationBatch) -> ObservationSet {
        let mut set = ObservationSet::new();
        for feature in self.merged_features(batch) {
            set.push(Observation::Feature(feature));
        }
        for tag in &batch.tags {
            if tag.samples == 0 {
                continue;
            }
            set.push(Observation::Tags(TagsObservation::new(
                tag,
                Arc::clone(&self.map),
                &self.config,
            )));
        }
        if !set.is_empty() {
            set.push(Observation::FieldShape(FieldShapeObservation::new(
                self.goalkeeper,
                Arc::clone(&self.map),
                &self.config,
            )));
        }
        log::trace!(
            "built {} observations from {} sightings",
            set.len(),
            batch.len()
        );
        set
    }
}
