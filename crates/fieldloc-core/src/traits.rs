//! Collaborator traits at the boundary of the localization engine.
//!
//! The engine never talks to perception, odometry, referee or
//! transport code directly. Everything crosses one of these traits, so a
//! live robot, a log replayer and a unit test can all drive the same loop.

use crate::estimate::{Displacement, PublishedEstimate};
use crate::id::Timestamp;
use crate::sighting::ObservationBatch;

/// Supplies the sightings gathered since the previous call.
///
/// `steal` is a destructive read: a sighting is returned at most once.
pub trait ObservationSource: Send + Sync {
    /// Take every pending sighting.
    fn steal(&self) -> ObservationBatch;
}

/// Integrated odometry of the walking engine.
pub trait OdometrySource: Send + Sync {
    /// Robot-frame displacement between `from` and `to`.
    fn displacement(&self, from: Timestamp, to: Timestamp) -> Displacement;
}

/// Referee, fall and penalty state.
pub trait PlayGate: Send + Sync {
    /// Whether the robot may play right now. `None` when the answer is
    /// unavailable (no game controller, service not running).
    fn is_allowed_to_play(&self) -> Option<bool>;

    /// Whether the robot is lying on the ground.
    fn is_fallen(&self) -> bool;

    /// Whether the robot is currently penalized.
    fn is_penalized(&self) -> bool {
        false
    }

    /// Whether the robot is walking back in while serving a penalty.
    fn is_serving_penalty(&self) -> bool {
        false
    }
}

/// Receives every published estimate.
pub trait ResultSink: Send {
    /// Publish one snapshot.
    fn publish(&mut self, estimate: &PublishedEstimate);
}

/// Source of loop time.
pub trait TimeSource: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

// ── Referee decision ─────────────────────────────────────────────

/// Phase of the game as announced by the game controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GamePhase {
    /// Before the game.
    #[default]
    Initial,
    /// Robots walk to their kick-off positions.
    Placing,
    /// Robots must stand still before kick-off.
    Freeze,
    /// Game running.
    Playing,
    /// Half or game over.
    Finished,
}

/// Referee view used to decide whether localization may run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefereeState {
    /// Current game phase.
    pub phase: GamePhase,
    /// Whether this robot is penalized.
    pub penalized: bool,
    /// Whether this robot is re-entering after a penalty.
    pub serving_penalty: bool,
}

impl RefereeState {
    /// Whether the referee lets the robot play (and therefore move on the
    /// field in a way odometry can track).
    ///
    /// Playing robots always may. During placing and freeze the robot may
    /// unless it is penalized and not yet walking back in.
    pub fn allows_play(&self) -> bool {
        let playing = self.phase == GamePhase::Playing && !self.penalized;
        let allowed_phase = matches!(self.phase, GamePhase::Placing | GamePhase::Freeze);
        let sidelined = self.penalized && !self.serving_penalty;
        playing || (allowed_phase && !sidelined)
    }
}
