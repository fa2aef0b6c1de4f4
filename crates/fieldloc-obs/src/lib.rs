//! Observation models for the fieldloc particle filter.
//!
//! Raw sightings from [`fieldloc_core`] are bound to the field map and
//! turned into [`Observation`]s, a closed set of variants that each
//! expose a potential (likelihood of the sighting from a candidate pose),
//! its logarithm, and the minimum score below which the sighting
//! contradicts the pose.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod build;
pub mod config;
pub mod feature;
pub mod field_shape;
pub mod observation;
mod score;
pub mod tags;

pub use build::ObservationSetBuilder;
pub use config::{ObsConfigError, ObservationConfig};
pub use feature::FeatureObservation;
pub use field_shape::FieldShapeObservation;
pub use observation::{Observation, ObservationSet};
pub use tags::TagsObservation;
