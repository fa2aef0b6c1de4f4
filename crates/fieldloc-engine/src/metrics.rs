//! Per-tick metrics for the localization loop.
//!
//! [`TickMetrics`] captures timing and counters for a single tick. The
//! cumulative counters carry over from tick to tick.

/// Timing and counters collected during a single tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickMetrics {
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent draining control commands, in microseconds.
    pub control_us: u64,
    /// Time spent building the observation set, in microseconds.
    pub observation_us: u64,
    /// Time spent inside the filter step (lock held), in microseconds.
    pub filter_step_us: u64,
    /// Time spent publishing the estimate, in microseconds.
    pub publish_us: u64,
    /// Raw sightings stolen this tick.
    pub sightings: usize,
    /// Observations fed to the filter this tick.
    pub observations: usize,
    /// Population size after the step.
    pub particles: usize,
    /// Effective sample size before resampling, 0 when the filter did
    /// not weight this tick.
    pub effective_particles: f64,
    /// Noise gain used for the step.
    pub noise_gain: f64,
    /// Cumulative number of ticks run.
    pub ticks: u64,
    /// Cumulative number of ticks skipped by the play gate.
    pub gated_ticks: u64,
    /// Cumulative number of ticks skipped because the robot was fallen.
    pub fallen_ticks: u64,
    /// Cumulative number of ticks skipped waiting for a reset.
    pub grace_ticks: u64,
    /// Cumulative number of resets applied by the filter.
    pub resets_applied: u64,
    /// Cumulative number of Uniform resets requested by the watchdog.
    pub watchdog_resets: u64,
    /// Cumulative number of control commands applied.
    pub control_commands: u64,
    /// Cumulative number of ticks whose time was earlier than the
    /// previous tick's.
    pub backwards_ticks: u64,
    /// Cumulative number of steps whose odometry was not finite.
    pub invalid_odometry: u64,
    /// Cumulative number of steps with a suspicious odometry rotation.
    pub suspicious_rotations: u64,
    /// Cumulative number of steps whose elapsed time was clamped.
    pub clamped_steps: u64,
    /// Cumulative number of steps where every particle had zero likelihood.
    pub degenerate_steps: u64,
}
