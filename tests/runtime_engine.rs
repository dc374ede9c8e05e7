// tests/runtime_engine.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use simcheck::build_core;
use simcheck::engine::{CoreCommand, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use simcheck::exec::CommandLauncher;
use simcheck::scenario::Test;
use simcheck::sim::{PlaybackWorld, SimHost};
use simcheck::trigger::{Condition, TimeCondition, Trigger};
use simcheck::types::{Outcome, TimeType};
use simcheck_test_utils::builders::{ModelBuilder, ScenarioBuilder, TriggerBuilder};
use simcheck_test_utils::{RecordingLauncher, StaticWorld, init_tracing, with_timeout};

use crate::common::TestResult;

/// A sphere that drops from z = 5 to z = 0.5 over two seconds.
fn drop_scenario() -> ScenarioBuilder {
    ScenarioBuilder::new("drop")
        .step_size("10ms")
        .max_sim_time("4s")
        .with_model(
            ModelBuilder::new("sphere")
                .at(0.0, 0.0, 5.0)
                .waypoint("2s", 0.0, 0.0, 0.5)
                .build(),
        )
}

fn run_core<W: SimHost>(core: &mut CoreRuntime<W>) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    for _ in 0..100_000 {
        let step = core.step(RuntimeEvent::Tick);
        commands.extend(step.commands);
        if !step.keep_running {
            return commands;
        }
    }
    panic!("core never finished");
}

#[test]
fn playback_scenario_passes_end_to_end() -> TestResult {
    init_tracing();
    let scenario = drop_scenario()
        .with_test(
            "sphere lands",
            vec![
                TriggerBuilder::time("landed", "2s")
                    .expect("${{ sphere.pose.z <= 0.6 }}")
                    .run("echo landed")
                    .build(),
                TriggerBuilder::region("ground", (0.0, 0.0, 0.0), (2.0, 2.0, 2.0))
                    .expect("${{ simulation.time >= 1s }}")
                    .build(),
            ],
        )
        .build();

    let launcher = RecordingLauncher::new();
    let mut core = build_core(&scenario, Arc::new(launcher.clone()))?;
    let commands = run_core(&mut core);

    assert!(core.is_finished());
    assert!(commands.contains(&CoreCommand::StopProcesses));
    assert!(commands.contains(&CoreCommand::IterationFinished { iteration: 0 }));

    let report = core.report();
    assert!(report.passed, "{report:?}");
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].result, Outcome::Pass);
    assert_eq!(launcher.triggers(), vec!["landed"]);

    // Finished early, once every trigger had fired.
    assert!(core.world().info().sim_time < Duration::from_secs(4));
    Ok(())
}

#[test]
fn unfired_trigger_fails_at_max_sim_time() -> TestResult {
    let scenario = drop_scenario()
        .with_test(
            "never",
            vec![TriggerBuilder::region("far", (100.0, 0.0, 0.0), (1.0, 1.0, 1.0)).build()],
        )
        .build();

    let launcher = RecordingLauncher::new();
    let mut core = build_core(&scenario, Arc::new(launcher.clone()))?;
    run_core(&mut core);

    assert_eq!(core.world().info().sim_time, Duration::from_secs(4));
    let report = core.report();
    assert!(!report.passed);
    assert_eq!(report.tests[0].result, Outcome::Fail);
    assert_eq!(report.failed_tests().count(), 1);
    Ok(())
}

#[test]
fn iterations_reset_triggers_between_runs() -> TestResult {
    let scenario = drop_scenario()
        .iterations(3)
        .with_test(
            "repeat",
            vec![TriggerBuilder::time("tick", "100ms").run("echo tick").build()],
        )
        .build();

    let launcher = RecordingLauncher::new();
    let mut core = build_core(&scenario, Arc::new(launcher.clone()))?;
    let commands = run_core(&mut core);

    assert_eq!(launcher.launch_count(), 3);
    let finished: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, CoreCommand::IterationFinished { .. }))
        .collect();
    assert_eq!(finished.len(), 3);

    let report = core.report();
    assert_eq!(report.iterations, 3);
    assert_eq!(report.tests.len(), 3);
    assert_eq!(
        report.tests.iter().map(|t| t.iteration).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(report.passed);
    Ok(())
}

#[test]
fn shutdown_ends_the_iteration_and_stops_processes() {
    let world = StaticWorld::new(Duration::from_millis(1));
    let launcher = RecordingLauncher::new();
    let test = Test::new("long")
        .with_trigger(Trigger::new(
            "later",
            Condition::Time(TimeCondition::new(Duration::from_secs(60), TimeType::Sim)),
        ))
        .unwrap();
    let options = RuntimeOptions {
        max_sim_time: Duration::from_secs(120),
        iterations: 1,
        real_time_factor: 0.0,
    };
    let mut core = CoreRuntime::new("s", world, vec![test], Arc::new(launcher.clone()), options);

    assert!(core.step(RuntimeEvent::Tick).keep_running);
    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(step.commands.contains(&CoreCommand::StopProcesses));
    assert!(core.is_finished());
    assert_eq!(core.report().tests[0].result, Outcome::Fail);

    // Nothing happens after the core finished.
    let step = core.step(RuntimeEvent::Tick);
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
}

#[tokio::test]
async fn runtime_shell_runs_to_completion() -> TestResult {
    init_tracing();
    let scenario = drop_scenario()
        .with_test(
            "quick",
            vec![TriggerBuilder::time("t", "50ms").run("echo quick").build()],
        )
        .build();

    let launcher = RecordingLauncher::new();
    let core = build_core(&scenario, Arc::new(launcher.clone()))?;
    let (_tx, rx) = mpsc::channel::<RuntimeEvent>(8);

    let report = with_timeout(Runtime::new(core, rx).run()).await?;
    assert!(report.passed);
    assert!(launcher.stop_count() >= 1);
    Ok(())
}

#[tokio::test]
async fn runtime_shell_honours_shutdown_requests() -> TestResult {
    let scenario = ScenarioBuilder::new("slow")
        .step_size("1ms")
        .max_sim_time("1h")
        .with_test("never", vec![TriggerBuilder::time("t", "30m").build()])
        .build();

    let launcher = RecordingLauncher::new();
    let core = build_core(&scenario, Arc::new(launcher.clone()))?;
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let report = with_timeout(Runtime::new(core, rx).run()).await?;
    assert!(!report.passed);
    assert_eq!(launcher.stop_count(), 1);
    Ok(())
}

#[test]
fn playback_world_interpolates_keyframes() -> TestResult {
    let scenario = drop_scenario()
        .with_test("t", vec![TriggerBuilder::time("t", "1s").build()])
        .build();
    let mut world = PlaybackWorld::new(&scenario.models, scenario.settings.step_size);

    for _ in 0..100 {
        SimHost::step(&mut world);
    }
    let info = world.info();
    assert_eq!(info.sim_time, Duration::from_secs(1));
    let z = simcheck::sim::Snapshot::world_pose(&world, "sphere")
        .map(|p| p.pos.z)
        .unwrap_or_default();
    assert!((z - 2.75).abs() < 1e-9, "z = {z}");

    SimHost::reset(&mut world);
    assert_eq!(world.info().sim_time, Duration::ZERO);

    let launcher: Arc<dyn CommandLauncher> = Arc::new(RecordingLauncher::new());
    assert!(launcher.stop_all().is_empty());
    Ok(())
}
