// tests/time_trigger.rs

use std::time::Duration;

use simcheck::exec::Command;
use simcheck::expr::NoFunctions;
use simcheck::sim::UpdateInfo;
use simcheck::trigger::{Condition, TimeCondition, Trigger};
use simcheck::types::{Outcome, TimeType, TriggerType};
use simcheck_test_utils::{RecordingLauncher, StaticWorld, init_tracing};

fn two_second_trigger() -> Trigger {
    Trigger::new(
        "after_two",
        Condition::Time(TimeCondition::new(Duration::from_secs(2), TimeType::Sim)),
    )
}

fn at_ms(ms: u64) -> UpdateInfo {
    StaticWorld::info_at(Duration::from_millis(ms))
}

#[test]
fn fires_exactly_once_at_duration() {
    init_tracing();
    let world = StaticWorld::new(Duration::from_millis(100));
    let launcher = RecordingLauncher::new();
    let mut trigger = two_second_trigger().with_command(Command::Shell("echo hi".into()));

    assert_eq!(trigger.trigger_type(), TriggerType::Time);

    trigger.update(&at_ms(1900), &world, &NoFunctions, &launcher);
    assert!(!trigger.fired());
    assert_eq!(trigger.result(), Outcome::Unset);
    assert_eq!(launcher.launch_count(), 0);

    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert!(trigger.fired());
    assert_eq!(trigger.result(), Outcome::Pass);
    assert_eq!(launcher.launch_count(), 1);

    // Later samples perform no further action.
    trigger.update(&at_ms(2100), &world, &NoFunctions, &launcher);
    trigger.update(&at_ms(5000), &world, &NoFunctions, &launcher);
    assert_eq!(trigger.fire_count(), 1);
    assert_eq!(launcher.launch_count(), 1);
}

#[test]
fn firing_without_expectations_passes() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut trigger = two_second_trigger();

    trigger.update(&at_ms(2500), &world, &NoFunctions, &launcher);
    assert_eq!(trigger.result(), Outcome::Pass);
    // Nothing to launch.
    assert_eq!(launcher.launch_count(), 0);
}

#[test]
fn failing_expectation_fails_without_launching() {
    init_tracing();
    let world = StaticWorld::new(Duration::from_millis(1)).with_entity_at("sphere", 0.0, 0.0, 3.0);
    let launcher = RecordingLauncher::new();
    let mut trigger = two_second_trigger()
        .with_expectation("${{ sphere.pose.z <= 0.5 }}")
        .with_command(Command::Shell("echo should-not-run".into()));

    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert!(trigger.fired());
    assert_eq!(trigger.result(), Outcome::Fail);
    assert_eq!(launcher.launch_count(), 0);
}

#[test]
fn unresolvable_expectation_fails_closed() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut trigger = two_second_trigger()
        .with_expectation("${{ 1 == 1 }}")
        .with_expectation("${{ missing.pose.x == 0 }}")
        .with_command(Command::Shell("echo nope".into()));

    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert_eq!(trigger.result(), Outcome::Fail);
    assert_eq!(launcher.launch_count(), 0);
}

#[test]
fn launch_failure_marks_trigger_failed() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::failing();
    let mut trigger = two_second_trigger()
        .with_expectation("${{ simulation.time >= 2s }}")
        .with_command(Command::Exec {
            argv: vec!["does-not-exist".into()],
            env: vec![],
        });

    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert_eq!(launcher.launch_count(), 1);
    assert_eq!(trigger.result(), Outcome::Fail);
}

#[test]
fn real_time_trigger_uses_wall_clock() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut trigger = Trigger::new(
        "wall",
        Condition::Time(TimeCondition::new(Duration::from_secs(1), TimeType::Real)),
    );

    let sim_ahead = UpdateInfo {
        sim_time: Duration::from_secs(10),
        real_time: Duration::from_millis(500),
        iterations: 1,
    };
    trigger.update(&sim_ahead, &world, &NoFunctions, &launcher);
    assert!(!trigger.fired());

    let real_reached = UpdateInfo {
        real_time: Duration::from_secs(1),
        ..sim_ahead
    };
    trigger.update(&real_reached, &world, &NoFunctions, &launcher);
    assert!(trigger.fired());
}

#[test]
fn reset_allows_the_trigger_to_fire_again() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut trigger = two_second_trigger().with_command(Command::Shell("echo again".into()));

    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert!(trigger.fired());
    assert_eq!(trigger.executables().len(), 1);

    trigger.reset();
    assert!(!trigger.fired());
    assert_eq!(trigger.result(), Outcome::Unset);
    assert!(trigger.executables().is_empty());

    trigger.update(&at_ms(1000), &world, &NoFunctions, &launcher);
    assert!(!trigger.fired());
    trigger.update(&at_ms(2000), &world, &NoFunctions, &launcher);
    assert!(trigger.fired());
    assert_eq!(launcher.launch_count(), 2);
}
