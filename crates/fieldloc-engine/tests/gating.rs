//! Integration test: play gate, fall gate and the restart grace period.
//!
//! Drives a [`LocalizationLoop`] tick by tick with a scripted gate and
//! checks which pipeline branch runs, what happens to pending resets and
//! what gets published.

use std::sync::Arc;

use fieldloc_core::{Pose2D, ResetKind, ResetNoise, ResetRequest, Timestamp};
use fieldloc_engine::{Collaborators, LocalizationConfig, LocalizationLoop, TickBranch};
use fieldloc_filter::{FilterConfig, StepOutcome};
use fieldloc_test_utils::fixtures::standard_map;
use fieldloc_test_utils::{RecordingSink, ScriptedGate, ScriptedObservations, ScriptedOdometry};

// ── Harness ──────────────────────────────────────────────────────────

struct Harness {
    localization: LocalizationLoop,
    gate: Arc<ScriptedGate>,
    odometry: Arc<ScriptedOdometry>,
    log: fieldloc_test_utils::EstimateLog,
}

fn harness() -> Harness {
    let gate = Arc::new(ScriptedGate::allowing());
    let odometry = Arc::new(ScriptedOdometry::still());
    let sink = RecordingSink::new();
    let log = sink.log();
    let collaborators = Collaborators::new(
        Arc::new(ScriptedObservations::new()),
        Arc::clone(&odometry) as _,
        Arc::clone(&gate) as _,
    )
    .with_sink(Box::new(sink));
    let config = LocalizationConfig {
        filter: FilterConfig {
            particle_count: 300,
            seed: 11,
            ..Default::default()
        },
        ..Default::default()
    };
    let localization =
        LocalizationLoop::new(config, standard_map(), collaborators, Timestamp::ZERO).unwrap();
    Harness {
        localization,
        gate,
        odometry,
        log,
    }
}

fn custom(x: f64, y: f64, heading: f64) -> ResetRequest {
    ResetRequest::Custom {
        pose: Pose2D::new(x, y, heading),
        noise: ResetNoise {
            xy: 0.02,
            heading: 0.02,
        },
    }
}

// ── Play gate ────────────────────────────────────────────────────────

#[test]
fn closed_gate_cancels_pending_uniform() {
    let mut h = harness();
    h.gate.set_allowed(Some(false));
    h.localization.request_reset(ResetRequest::Uniform, Timestamp(0.5));
    assert_eq!(h.localization.pending_reset(), ResetKind::Uniform);

    let report = h.localization.tick(Timestamp(1.0));
    assert_eq!(report.branch, TickBranch::Gated);
    assert_eq!(h.localization.pending_reset(), ResetKind::None);
    assert_eq!(h.localization.metrics().resets_applied, 0);
}

#[test]
fn closed_gate_applies_pending_custom() {
    let mut h = harness();
    h.gate.set_allowed(Some(false));
    h.localization.request_reset(custom(1.0, 1.0, 0.0), Timestamp(0.5));

    let report = h.localization.tick(Timestamp(1.0));
    assert_eq!(report.branch, TickBranch::Gated);
    assert_eq!(h.localization.pending_reset(), ResetKind::None);
    assert_eq!(h.localization.metrics().resets_applied, 1);

    let published = h.log.last().unwrap();
    assert!(published.pose.distance(&Pose2D::new(1.0, 1.0, 0.0)) < 0.1);
    assert_eq!(published.quality, 1.0);
    assert!(!published.quality_enabled);
}

#[test]
fn last_request_wins_over_custom() {
    let mut h = harness();
    h.gate.set_allowed(Some(false));
    h.localization.request_reset(custom(1.0, 1.0, 0.0), Timestamp(0.5));
    h.localization.request_reset(ResetRequest::Uniform, Timestamp(0.6));
    assert_eq!(h.localization.pending_reset(), ResetKind::Uniform);

    // The Uniform request replaced the Custom one and the gate cancels it.
    h.localization.tick(Timestamp(1.0));
    assert_eq!(h.localization.pending_reset(), ResetKind::None);
    assert_eq!(h.localization.metrics().resets_applied, 0);
}

#[test]
fn indeterminate_gate_blocks_live_mode() {
    let mut h = harness();
    h.gate.set_allowed(None);
    let report = h.localization.tick(Timestamp(1.0));
    assert_eq!(report.branch, TickBranch::Gated);
    assert!(h.odometry.queries().is_empty());
}

// ── Grace period ─────────────────────────────────────────────────────

#[test]
fn reopened_gate_waits_for_a_reset() {
    let mut h = harness();
    h.gate.set_allowed(Some(false));
    h.localization.tick(Timestamp(1.0));

    h.gate.set_allowed(Some(true));
    let report = h.localization.tick(Timestamp(2.0));
    assert_eq!(report.branch, TickBranch::Grace);
    assert!(h.odometry.queries().is_empty());

    // Still inside the grace period: a pending Uniform does not end it.
    h.localization.request_reset(ResetRequest::Uniform, Timestamp(3.0));
    let report = h.localization.tick(Timestamp(5.0));
    assert_eq!(report.branch, TickBranch::Grace);
    assert_eq!(h.localization.pending_reset(), ResetKind::Uniform);

    // Ten seconds after the gate closed the loop runs again.
    let report = h.localization.tick(Timestamp(11.5));
    assert_eq!(report.branch, TickBranch::Stepped);
    assert_eq!(
        report.outcome,
        Some(StepOutcome::ResetApplied(ResetKind::Uniform))
    );
    assert_eq!(h.localization.metrics().grace_ticks, 2);
}

#[test]
fn custom_reset_ends_grace_early() {
    let mut h = harness();
    h.gate.set_allowed(Some(false));
    h.localization.tick(Timestamp(1.0));
    h.gate.set_allowed(Some(true));
    h.localization.request_reset(custom(-2.0, 0.5, 1.0), Timestamp(1.5));

    let report = h.localization.tick(Timestamp(2.0));
    assert_eq!(report.branch, TickBranch::Stepped);
    assert_eq!(
        report.outcome,
        Some(StepOutcome::ResetApplied(ResetKind::Custom))
    );
    // Odometry is integrated from the reset, not from the gated period.
    assert_eq!(
        h.odometry.last_query(),
        Some((Timestamp(1.5), Timestamp(2.0)))
    );

    let report = h.localization.tick(Timestamp(3.0));
    assert_eq!(report.branch, TickBranch::Stepped);
    assert!(h.log.last().unwrap().quality_enabled);
}

// ── Fall gate ────────────────────────────────────────────────────────

#[test]
fn fallen_robot_holds_estimate() {
    let mut h = harness();
    h.localization.request_reset(custom(2.0, -1.0, 0.0), Timestamp(0.0));
    h.localization.tick(Timestamp(0.5));
    let before = h.log.last().unwrap();

    h.gate.set_fallen(true);
    for t in [1.0, 1.5, 2.0] {
        let report = h.localization.tick(Timestamp(t));
        assert_eq!(report.branch, TickBranch::Fallen);
    }
    let held = h.log.last().unwrap();
    assert_eq!(held.pose, before.pose);
    assert_eq!(held.sequence, before.sequence + 3);
    assert!(!held.quality_enabled);
    assert_eq!(h.localization.metrics().fallen_ticks, 3);

    // Getting up integrates odometry over the whole fall.
    h.gate.set_fallen(false);
    h.localization.tick(Timestamp(2.5));
    assert_eq!(
        h.odometry.last_query(),
        Some((Timestamp(0.5), Timestamp(2.5)))
    );
}

#[test]
fn every_tick_publishes_once() {
    let mut h = harness();
    h.localization.tick(Timestamp(0.1));
    h.gate.set_allowed(Some(false));
    h.localization.tick(Timestamp(0.2));
    h.gate.set_allowed(Some(true));
    h.localization.tick(Timestamp(0.3));
    let sequences: Vec<u64> = h.log.all().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(
        h.localization.mailbox().latest().unwrap().sequence,
        3
    );
}
