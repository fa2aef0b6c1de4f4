//! Localization engine driving the fieldloc particle filter.
//!
//! Provides the [`LocalizationLoop`] that stages sightings, consults the
//! play gate, runs the consistency watchdog and steps the filter, plus two
//! drivers: [`RealtimeLocalizer`] (worker thread on a period) and
//! [`ReplayLocalizer`] (synchronous, caller timestamps).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod mailbox;
pub mod metrics;
pub mod realtime;
pub mod replay;
pub mod staging;
pub mod tick;
pub(crate) mod tick_thread;
pub mod watcher;

pub use config::{ConfigError, LocalizationConfig, NoiseBoostConfig, RunMode, WatcherConfig};
pub use mailbox::EstimateMailbox;
pub use metrics::TickMetrics;
pub use realtime::{ControlError, RealtimeLocalizer, ShutdownReport};
pub use replay::ReplayLocalizer;
pub use staging::ObservationStaging;
pub use tick::{
    noise_gain, Collaborators, ControlCommand, LocalizationLoop, TickBranch, TickReport,
    ODOMETRY_ONLY_GAIN,
};
pub use watcher::{ConsistencyWatcher, WatcherVerdict};
