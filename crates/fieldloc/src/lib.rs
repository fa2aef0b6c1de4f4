//! fieldloc: particle-filter self-localization for soccer robots.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! fieldloc sub-crates. For most users, adding `fieldloc` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use fieldloc::prelude::*;
//!
//! struct Standing;
//! impl OdometrySource for Standing {
//!     fn displacement(&self, _from: Timestamp, _to: Timestamp) -> Displacement {
//!         Displacement::zero()
//!     }
//! }
//!
//! struct AlwaysPlaying;
//! impl PlayGate for AlwaysPlaying {
//!     fn is_allowed_to_play(&self) -> Option<bool> { Some(true) }
//!     fn is_fallen(&self) -> bool { false }
//! }
//!
//! let staging = Arc::new(ObservationStaging::new());
//! let collaborators = Collaborators::new(
//!     staging.clone(),
//!     Arc::new(Standing),
//!     Arc::new(AlwaysPlaying),
//! );
//! let mut config = LocalizationConfig::default();
//! config.filter.particle_count = 500;
//! let mut localizer = ReplayLocalizer::new(
//!     config,
//!     Arc::new(FieldMap::default()),
//!     collaborators,
//!     Timestamp::ZERO,
//! )
//! .unwrap();
//!
//! localizer.reset_custom(Pose2D::new(1.0, 0.0, 0.0), 0.05, 0.05);
//! localizer.tick(Timestamp(0.1));
//! let estimate = localizer.latest().unwrap();
//! assert!(estimate.pose.distance(&Pose2D::new(1.0, 0.0, 0.0)) < 0.2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fieldloc-core` | Poses, field map, sightings, resets, collaborator traits |
//! | [`obs`] | `fieldloc-obs` | Feature, tag and field-shape observation models |
//! | [`filter`] | `fieldloc-filter` | The particle filter, resets and clustering |
//! | [`engine`] | `fieldloc-engine` | Localization loop, watchdog, realtime and replay drivers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits and the field map (`fieldloc-core`).
///
/// Contains poses, timestamps, sightings, reset requests, the published
/// estimate, and the collaborator traits ([`types::ObservationSource`],
/// [`types::OdometrySource`], [`types::PlayGate`], [`types::ResultSink`],
/// [`types::TimeSource`]).
pub use fieldloc_core as types;

/// Observation models (`fieldloc-obs`).
///
/// Build an [`obs::ObservationSet`] from a raw batch with an
/// [`obs::ObservationSetBuilder`].
pub use fieldloc_obs as obs;

/// The particle filter (`fieldloc-filter`).
///
/// [`filter::FieldParticleFilter`] with its reset slot, motion model and
/// clustering.
pub use fieldloc_filter as filter;

/// Localization engine (`fieldloc-engine`).
///
/// [`engine::RealtimeLocalizer`] for a background worker thread,
/// [`engine::ReplayLocalizer`] for synchronous stepping.
pub use fieldloc_engine as engine;

/// Common imports for typical fieldloc usage.
///
/// ```rust
/// use fieldloc::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use fieldloc_core::{
        Displacement, FeatureSighting, FieldMap, LandmarkKind, MonotonicClock, ObservationBatch,
        ObservationSource, OdometrySource, PlayGate, Pose2D, PublishedEstimate, RefereeState,
        ReplayClock, ResetKind, ResetRequest, ResultSink, TagId, TagSighting, TimeSource,
        Timestamp,
    };

    // Filter
    pub use fieldloc_filter::{FieldParticleFilter, FilterConfig, Particle};

    // Observations
    pub use fieldloc_obs::ObservationConfig;

    // Engine
    pub use fieldloc_engine::{
        Collaborators, ConfigError, ControlError, LocalizationConfig, ObservationStaging,
        RealtimeLocalizer, ReplayLocalizer, RunMode, ShutdownReport, TickMetrics, TickReport,
    };
}
