//! Particle filter field estimator.
//!
//! [`FieldParticleFilter`] tracks the robot pose on the field with a
//! population of weighted particles. Odometry moves the population,
//! observations from [`fieldloc_obs`] reweight it, and systematic
//! resampling keeps its size fixed. A single last-wins reset slot lets
//! callers reseed the population (uniform, around a known pose, after a
//! fall, or along the field borders).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod filter;
pub mod motion;
pub mod particle;
pub mod resample;
pub mod reset;

pub use cluster::{Cluster, ClusterParams, Clustering};
pub use config::{FilterConfig, FilterError};
pub use filter::{FieldParticleFilter, StepOutcome};
pub use motion::{MotionModel, MotionNoise};
pub use particle::Particle;

// Compile-time assertion: the filter is shared behind a mutex across the
// worker and caller threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<FieldParticleFilter>();
};
