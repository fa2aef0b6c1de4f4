//! Integration test: log replay through [`ReplayLocalizer`].
//!
//! Sightings are staged the way the perception pipeline would stage them,
//! and the localizer is stepped with log timestamps.

use std::sync::Arc;

use fieldloc_core::{FieldMap, Pose2D, ResetKind, Timestamp};
use fieldloc_engine::{
    Collaborators, LocalizationConfig, ObservationStaging, ReplayLocalizer, RunMode, TickBranch,
    WatcherConfig,
};
use fieldloc_filter::{FilterConfig, StepOutcome};
use fieldloc_test_utils::fixtures::{feature_seen_from, tag_seen_from, tagged_map, CAMERA_HEIGHT};
use fieldloc_test_utils::{ScriptedGate, ScriptedOdometry};

fn replay_config(particles: usize) -> LocalizationConfig {
    LocalizationConfig {
        mode: RunMode::Replay,
        period: 0.1,
        filter: FilterConfig {
            particle_count: particles,
            seed: 42,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn localizer(
    config: LocalizationConfig,
    map: Arc<FieldMap>,
    staging: &Arc<ObservationStaging>,
) -> ReplayLocalizer {
    let collaborators = Collaborators::new(
        Arc::clone(staging) as _,
        Arc::new(ScriptedOdometry::still()),
        Arc::new(ScriptedGate::new(None)),
    );
    ReplayLocalizer::new(config, map, collaborators, Timestamp::ZERO).unwrap()
}

#[test]
fn tight_tag_localizes_in_one_tick() {
    let map = tagged_map(&[(3, 3.0, 1.0)]);
    let staging = Arc::new(ObservationStaging::new());
    let mut loc = localizer(replay_config(5000), Arc::clone(&map), &staging);

    let truth = Pose2D::new(3.0, 1.0, 0.0);
    staging.push_tags([tag_seen_from(&map, 3, &truth, 0.01)]);
    let report = loc.tick(Timestamp(0.1));
    assert_eq!(report.branch, TickBranch::Stepped);
    assert_eq!(report.observations, 2, "tag plus field shape");

    let estimate = loc.latest().unwrap();
    assert!(
        estimate.pose.distance(&truth) < 0.2,
        "estimate {} too far from {}",
        estimate.pose,
        truth
    );
    assert!(estimate.quality_enabled);
    assert!((0.0..=1.0).contains(&estimate.quality));
}

#[test]
fn two_tags_refine_a_rough_guess() {
    let map = tagged_map(&[(1, 3.0, 1.0), (2, 2.0, -1.0)]);
    let staging = Arc::new(ObservationStaging::new());
    let mut loc = localizer(replay_config(1000), Arc::clone(&map), &staging);

    let truth = Pose2D::new(2.0, 0.5, 0.3);
    loc.reset_custom(Pose2D::new(2.3, 0.3, 0.1), 0.3, 0.3);
    let mut t = 0.0;
    for _ in 0..30 {
        t += 0.1;
        staging.push_tags([
            tag_seen_from(&map, 1, &truth, 0.02),
            tag_seen_from(&map, 2, &truth, 0.02),
        ]);
        loc.tick(Timestamp(t));
    }
    let estimate = loc.latest().unwrap();
    assert!(
        estimate.pose.distance(&truth) < 0.2,
        "estimate {} too far from {}",
        estimate.pose,
        truth
    );
    assert!(estimate.quality > 0.0);
}

#[test]
fn tags_do_not_move_the_score() {
    let map = tagged_map(&[(3, 3.0, 1.0)]);
    let staging = Arc::new(ObservationStaging::new());
    let config = LocalizationConfig {
        watcher: WatcherConfig {
            step_cost: 0.0,
            ..Default::default()
        },
        ..replay_config(200)
    };
    let mut loc = localizer(config, Arc::clone(&map), &staging);
    let known = tag_seen_from(&map, 3, &Pose2D::new(0.0, 0.0, 0.0), 0.01);
    let mut unknown = known;
    unknown.id = fieldloc_core::TagId(99);
    staging.push_tags([known, unknown]);
    let report = loc.tick(Timestamp(0.1));
    assert_eq!(report.observations, 3, "two tags plus field shape");
    let verdict = report.verdict.unwrap();
    assert_eq!(verdict.good + verdict.bad, 0);
    assert_eq!(verdict.score, 1.0);
}

#[test]
fn features_are_merged_before_scoring() {
    let map = tagged_map(&[]);
    let staging = Arc::new(ObservationStaging::new());
    let mut loc = localizer(replay_config(200), Arc::clone(&map), &staging);
    let center = map.landmarks(fieldloc_core::LandmarkKind::CenterMark)[0];
    let pose = Pose2D::new(-1.5, 0.0, 0.0);
    let seen = feature_seen_from(fieldloc_core::LandmarkKind::CenterMark, center, &pose);
    staging.push_features([seen, seen], CAMERA_HEIGHT, Timestamp(0.1));
    let report = loc.tick(Timestamp(0.1));
    assert_eq!(report.sightings, 2);
    // One merged feature plus the field shape.
    assert_eq!(report.observations, 2);
}

#[test]
fn reconfigure_swaps_population_size() {
    let map = tagged_map(&[]);
    let staging = Arc::new(ObservationStaging::new());
    let mut loc = localizer(replay_config(300), map, &staging);
    loc.tick(Timestamp(0.1));
    assert_eq!(loc.particles().len(), 300);

    let mut smaller = replay_config(120);
    smaller.odometry_only = true;
    loc.reconfigure(smaller).unwrap();
    let report = loc.tick(Timestamp(0.2));
    assert_eq!(loc.particles().len(), 120);
    assert_eq!(loc.localization().config().filter.particle_count, 120);
    assert_eq!(report.noise_gain, Some(fieldloc_engine::ODOMETRY_ONLY_GAIN));
    assert_eq!(loc.metrics().control_commands, 1);
}

#[test]
fn operator_uniform_reset_restarts_the_boost() {
    let map = tagged_map(&[]);
    let staging = Arc::new(ObservationStaging::new());
    let mut loc = localizer(replay_config(300), map, &staging);
    loc.run_until(Timestamp(8.0), 1.0);
    let calm = loc.tick(Timestamp(9.0)).noise_gain.unwrap();
    assert!(calm < 10.0);

    loc.reset_uniform();
    let report = loc.tick(Timestamp(10.0));
    assert_eq!(
        report.outcome,
        Some(StepOutcome::ResetApplied(ResetKind::Uniform))
    );
    assert_eq!(report.noise_gain, Some(10.0));
    assert_eq!(loc.latest().unwrap().quality, 0.0);
    assert_eq!(loc.localization().watcher().score(), 0.0);
}

#[test]
fn watchdog_resets_once_per_interval() {
    let map = tagged_map(&[]);
    let staging = Arc::new(ObservationStaging::new());
    let config = LocalizationConfig {
        watcher: WatcherConfig {
            step_cost: 0.004,
            reset_interval: 200.0,
            ..Default::default()
        },
        ..replay_config(100)
    };
    let mut loc = localizer(config, map, &staging);
    let reports = loc.run_until(Timestamp(400.0), 1.0);
    assert_eq!(reports.len(), 400);

    let issued: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.verdict.is_some_and(|v| v.reset_issued))
        .map(|(i, _)| i + 1)
        .collect();
    assert_eq!(issued.len(), 1, "watchdog resets at ticks {issued:?}");
    let at = issued[0] - 1;
    assert_eq!(
        reports[at].outcome,
        Some(StepOutcome::ResetApplied(ResetKind::Uniform))
    );
    // The score stays exhausted, but the next reset is not due yet.
    assert!(reports[at + 1..]
        .iter()
        .all(|r| r.verdict.is_some_and(|v| v.score == 0.0)));
    assert_eq!(loc.metrics().watchdog_resets, 1);
    assert_eq!(loc.metrics().resets_applied, 1);
    assert_eq!(loc.localization().pending_reset(), ResetKind::None);
}
