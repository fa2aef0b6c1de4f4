//! Core types and collaborator traits for the fieldloc localization engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! fundamental vocabulary shared by the rest of the workspace: poses and
//! timestamps, the field map with its landmarks, raw sightings delivered by
//! the perception pipeline, reset requests, the published estimate, and the
//! traits through which the engine talks to its external collaborators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod estimate;
pub mod field;
pub mod id;
pub mod pose;
pub mod reset;
pub mod sighting;
pub mod traits;

pub use clock::{MonotonicClock, ReplayClock};
pub use error::FieldMapError;
pub use estimate::{ClusterList, ClusterPosition, Displacement, PublishedEstimate};
pub use field::{FieldDimensions, FieldMap, LandmarkKind, LandmarkSet};
pub use id::{TagId, Timestamp};
pub use pose::{angle_diff, normalize_angle, Point2, Point3, Pose2D};
pub use reset::{ResetKind, ResetNoise, ResetRequest};
pub use sighting::{FeatureSighting, ObservationBatch, TagSighting};
pub use traits::{
    GamePhase, ObservationSource, OdometrySource, PlayGate, RefereeState, ResultSink, TimeSource,
};
