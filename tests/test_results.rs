// tests/test_results.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use simcheck::exec::Command;
use simcheck::scenario::{Report, Test, TestReport};
use simcheck::sim::{UpdateInfo, Vector3};
use simcheck::trigger::{Condition, RegionCondition, TimeCondition, Trigger};
use simcheck::types::{Outcome, TimeType};
use simcheck_test_utils::{RecordingLauncher, StaticWorld, init_tracing};

fn region(name: &str) -> Trigger {
    Trigger::new(
        name,
        Condition::Region(RegionCondition::new(Vector3::ZERO, Vector3::new(2.0, 2.0, 2.0))),
    )
}

fn timer(name: &str, secs: u64) -> Trigger {
    Trigger::new(
        name,
        Condition::Time(TimeCondition::new(Duration::from_secs(secs), TimeType::Sim)),
    )
}

fn at_secs(secs: u64) -> UpdateInfo {
    StaticWorld::info_at(Duration::from_secs(secs))
}

#[test]
fn cross_trigger_contains_and_negation() {
    init_tracing();
    let world = StaticWorld::new(Duration::from_millis(1))
        .with_entity_at("modelA", 0.0, 0.0, 0.0)
        .with_entity_at("modelB", 10.0, 0.0, 0.0);
    let launcher = RecordingLauncher::new();

    let mut test = Test::new("cross")
        .with_trigger(region("trigger1"))
        .unwrap()
        .with_trigger(
            timer("check", 1)
                .with_expectation("${{ trigger1.contains(modelA) }}")
                .with_expectation("${{ !trigger1.contains(modelB) }}")
                .with_command(Command::Shell("echo ok".into())),
        )
        .unwrap()
        .with_trigger(timer("negated", 1).with_expectation("${{ !trigger1.contains(modelA) }}"))
        .unwrap();

    test.update(&at_secs(1), &world, &launcher);

    assert_eq!(test.trigger("trigger1").unwrap().result(), Outcome::Pass);
    assert_eq!(test.trigger("check").unwrap().result(), Outcome::Pass);
    assert_eq!(test.trigger("negated").unwrap().result(), Outcome::Fail);
    assert_eq!(test.result(), Outcome::Fail);
    assert_eq!(launcher.triggers(), vec!["check"]);
}

#[test]
fn triggers_see_siblings_updated_earlier_in_the_same_step() {
    let world = StaticWorld::new(Duration::from_millis(1)).with_entity_at("robot", 0.5, 0.0, 0.0);
    let launcher = RecordingLauncher::new();

    // The region trigger is listed after the checker, so on the first step
    // its containment is still empty when the checker fires.
    let mut late = Test::new("late")
        .with_trigger(timer("checker", 0).with_expectation("${{ zone.contains(robot) }}"))
        .unwrap()
        .with_trigger(region("zone"))
        .unwrap();
    late.update(&at_secs(0), &world, &launcher);
    assert_eq!(late.trigger("checker").unwrap().result(), Outcome::Fail);

    let mut early = Test::new("early")
        .with_trigger(region("zone"))
        .unwrap()
        .with_trigger(timer("checker", 0).with_expectation("${{ zone.contains(robot) }}"))
        .unwrap();
    early.update(&at_secs(0), &world, &launcher);
    assert_eq!(early.trigger("checker").unwrap().result(), Outcome::Pass);
}

#[test]
fn region_trigger_can_query_itself() {
    let world = StaticWorld::new(Duration::from_millis(1)).with_entity_at("sphere", 0.0, 0.0, 0.0);
    let launcher = RecordingLauncher::new();
    let mut test = Test::new("self")
        .with_trigger(region("ground").with_expectation("${{ ground.contains(sphere) }}"))
        .unwrap();

    test.update(&at_secs(0), &world, &launcher);
    assert_eq!(test.result(), Outcome::Pass);
}

#[test]
fn unknown_trigger_or_function_fails_closed() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut test = Test::new("unknown")
        .with_trigger(region("zone"))
        .unwrap()
        .with_trigger(timer("a", 0).with_expectation("${{ nowhere.contains(x) }}"))
        .unwrap()
        .with_trigger(timer("b", 0).with_expectation("${{ zone.touches(x) }}"))
        .unwrap()
        .with_trigger(timer("c", 0).with_expectation("${{ a.contains(x) }}"))
        .unwrap();

    test.update(&at_secs(0), &world, &launcher);
    for name in ["a", "b", "c"] {
        assert_eq!(test.trigger(name).unwrap().result(), Outcome::Fail, "{name}");
    }
}

#[test]
fn duplicate_trigger_names_are_rejected() {
    let result = Test::new("dups")
        .with_trigger(timer("same", 1))
        .unwrap()
        .with_trigger(timer("same", 2));
    assert!(result.is_err());
}

#[test]
fn stop_callback_runs_once_when_all_triggers_fired() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut test = Test::new("stop")
        .with_trigger(timer("one", 1))
        .unwrap()
        .with_trigger(timer("two", 2))
        .unwrap();
    {
        let calls = Arc::clone(&calls);
        test.set_stop_callback(Box::new(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));
    }

    test.update(&at_secs(1), &world, &launcher);
    assert!(!test.all_fired());
    assert_eq!(test.result(), Outcome::Unset);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    test.update(&at_secs(2), &world, &launcher);
    assert!(test.all_fired());
    assert_eq!(test.result(), Outcome::Pass);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    test.update(&at_secs(3), &world, &launcher);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    test.reset();
    test.update(&at_secs(2), &world, &launcher);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn fill_results_reports_unfired_triggers_as_failed_test() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut test = Test::new("partial")
        .with_trigger(timer("early", 1).with_command(Command::Shell("echo".into())))
        .unwrap()
        .with_trigger(timer("never", 100))
        .unwrap();

    test.update(&at_secs(1), &world, &launcher);

    let mut sink: Vec<TestReport> = Vec::new();
    test.fill_results(&mut sink);

    assert_eq!(sink.len(), 1);
    let report = &sink[0];
    assert_eq!(report.name, "partial");
    assert_eq!(report.iteration, 0);
    assert_eq!(report.result, Outcome::Fail);
    assert_eq!(report.triggers.len(), 2);
    assert_eq!(report.triggers[0].result, Outcome::Pass);
    assert_eq!(report.triggers[0].executables, vec!["early-0"]);
    assert!(!report.triggers[1].fired);
    assert_eq!(report.triggers[1].result, Outcome::Unset);
}

#[test]
fn report_serializes_to_toml() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let mut test = Test::new("ok").with_trigger(timer("t", 0)).unwrap();
    test.update(&at_secs(0), &world, &launcher);

    let mut report = Report::new("demo");
    test.fill_results(&mut report);
    report.finalize(1);
    assert!(report.passed);

    let text = report.to_toml().unwrap();
    assert!(text.contains("scenario = \"demo\""), "{text}");
    assert!(text.contains("passed = true"), "{text}");
    assert!(text.contains("[[test]]"), "{text}");
    assert!(text.contains("result = \"pass\""), "{text}");
    assert!(text.contains("type = \"time\""), "{text}");
}
