//! Scripted collaborators and fixtures for fieldloc development.
//!
//! Provides scripted implementations of the collaborator traits
//! ([`PlayGate`], [`OdometrySource`], [`ObservationSource`],
//! [`ResultSink`]) whose state can be changed from the test thread while
//! the code under test holds them behind an `Arc`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fieldloc_core::{
    Displacement, ObservationBatch, ObservationSource, OdometrySource, PlayGate,
    PublishedEstimate, RefereeState, ResultSink, Timestamp,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Gate ─────────────────────────────────────────────────────────

/// Play gate whose answers are set by the test.
pub struct ScriptedGate {
    allowed: Mutex<Option<bool>>,
    fallen: AtomicBool,
    penalized: AtomicBool,
    serving_penalty: AtomicBool,
}

impl ScriptedGate {
    pub fn new(allowed: Option<bool>) -> Self {
        Self {
            allowed: Mutex::new(allowed),
            fallen: AtomicBool::new(false),
            penalized: AtomicBool::new(false),
            serving_penalty: AtomicBool::new(false),
        }
    }

    /// A gate that always lets the robot play.
    pub fn allowing() -> Self {
        Self::new(Some(true))
    }

    /// A gate that never lets the robot play.
    pub fn forbidding() -> Self {
        Self::new(Some(false))
    }

    pub fn set_allowed(&self, allowed: Option<bool>) {
        *lock(&self.allowed) = allowed;
    }

    pub fn set_fallen(&self, fallen: bool) {
        self.fallen.store(fallen, Ordering::Release);
    }

    /// Answer as the game controller would for `state`.
    pub fn set_referee(&self, state: RefereeState) {
        self.set_allowed(Some(state.allows_play()));
        self.penalized.store(state.penalized, Ordering::Release);
        self.serving_penalty
            .store(state.serving_penalty, Ordering::Release);
    }
}

impl Default for ScriptedGate {
    fn default() -> Self {
        Self::allowing()
    }
}

impl PlayGate for ScriptedGate {
    fn is_allowed_to_play(&self) -> Option<bool> {
        *lock(&self.allowed)
    }

    fn is_fallen(&self) -> bool {
        self.fallen.load(Ordering::Acquire)
    }

    fn is_penalized(&self) -> bool {
        self.penalized.load(Ordering::Acquire)
    }

    fn is_serving_penalty(&self) -> bool {
        self.serving_penalty.load(Ordering::Acquire)
    }
}

// ── Odometry ─────────────────────────────────────────────────────

/// Odometry moving at a constant robot-frame velocity.
///
/// Every query is recorded so tests can check which interval the code
/// under test integrated.
pub struct ScriptedOdometry {
    velocity: Mutex<Displacement>,
    queries: Mutex<Vec<(Timestamp, Timestamp)>>,
}

impl ScriptedOdometry {
    /// Odometry reporting `velocity` per second.
    pub fn constant(velocity: Displacement) -> Self {
        Self {
            velocity: Mutex::new(velocity),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Odometry of a robot standing still.
    pub fn still() -> Self {
        Self::constant(Displacement::zero())
    }

    pub fn set_velocity(&self, velocity: Displacement) {
        *lock(&self.velocity) = velocity;
    }

    /// Every `(from, to)` pair queried so far.
    pub fn queries(&self) -> Vec<(Timestamp, Timestamp)> {
        lock(&self.queries).clone()
    }

    pub fn last_query(&self) -> Option<(Timestamp, Timestamp)> {
        lock(&self.queries).last().copied()
    }
}

impl Default for ScriptedOdometry {
    fn default() -> Self {
        Self::still()
    }
}

impl OdometrySource for ScriptedOdometry {
    fn displacement(&self, from: Timestamp, to: Timestamp) -> Displacement {
        lock(&self.queries).push((from, to));
        let v = *lock(&self.velocity);
        let dt = to.secs_since(from).max(0.0);
        Displacement::new(v.dx * dt, v.dy * dt, v.dheading * dt)
    }
}

// ── Observations ─────────────────────────────────────────────────

/// Observation source replaying queued batches.
///
/// Each steal pops the next queued batch; once the queue is empty it
/// returns the repeating batch, if any, or an empty one.
#[derive(Default)]
pub struct ScriptedObservations {
    queue: Mutex<VecDeque<ObservationBatch>>,
    repeating: Mutex<Option<ObservationBatch>>,
    steals: Mutex<usize>,
}

impl ScriptedObservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, batch: ObservationBatch) {
        lock(&self.queue).push_back(batch);
    }

    pub fn repeat(&self, batch: Option<ObservationBatch>) {
        *lock(&self.repeating) = batch;
    }

    /// Number of steals so far.
    pub fn steals(&self) -> usize {
        *lock(&self.steals)
    }
}

impl ObservationSource for ScriptedObservations {
    fn steal(&self) -> ObservationBatch {
        *lock(&self.steals) += 1;
        if let Some(batch) = lock(&self.queue).pop_front() {
            return batch;
        }
        lock(&self.repeating).clone().unwrap_or_default()
    }
}

// ── Sink ─────────────────────────────────────────────────────────

/// Shared log of published estimates.
#[derive(Clone, Default)]
pub struct EstimateLog(Arc<Mutex<Vec<PublishedEstimate>>>);

impl EstimateLog {
    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<PublishedEstimate> {
        lock(&self.0).last().cloned()
    }

    pub fn all(&self) -> Vec<PublishedEstimate> {
        lock(&self.0).clone()
    }
}

/// Result sink appending every estimate to an [`EstimateLog`].
#[derive(Default)]
pub struct RecordingSink {
    log: EstimateLog,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the log, usable after the sink is moved away.
    pub fn log(&self) -> EstimateLog {
        self.log.clone()
    }
}

impl ResultSink for RecordingSink {
    fn publish(&mut self, estimate: &PublishedEstimate) {
        lock(&self.log.0).push(estimate.clone());
    }
}
