// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod expr;
pub mod logging;
pub mod scenario;
pub mod sim;
pub mod trigger;
pub mod types;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConditionSpec, ScenarioFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::{Command, CommandLauncher, CommandRunner, ProcessLauncher, ProcessManager};
use crate::scenario::{Report, Test};
use crate::sim::PlaybackWorld;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - scenario loading
/// - process manager / command runner
/// - playback world, tests and the core runtime
/// - Ctrl-C handling
/// - report output
///
/// Returns whether every test passed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut scenario = load_and_validate(&args.scenario_file)?;
    if let Some(n) = args.iterations {
        scenario.settings.iterations = n;
    }

    if args.dry_run {
        print_dry_run(&scenario);
        return Ok(true);
    }

    fs::create_dir_all(&scenario.settings.log_dir)?;

    let manager = Arc::new(ProcessManager::new());
    if !manager.is_reaping() {
        warn!("running without asynchronous reaping");
    }
    let runner = CommandRunner::new(Arc::clone(&manager), scenario.settings.log_dir.clone());
    let launcher: Arc<dyn CommandLauncher> = Arc::new(ProcessLauncher::new(runner));

    let core = build_core(&scenario, launcher)?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(8);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; requesting shutdown");
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime = Runtime::new(core, rt_rx);
    let report = runtime.run().await?;

    // Anything still running once the loop is done.
    let leftovers = tokio::task::spawn_blocking(move || manager.stop()).await?;
    if !leftovers.is_empty() {
        debug!(count = leftovers.len(), "stopped leftover processes");
    }

    write_report(&args, &report)?;
    for failed in report.failed_tests() {
        warn!(test = %failed.name, iteration = failed.iteration, result = %failed.result, "test did not pass");
    }
    info!(passed = report.passed, tests = report.tests.len(), "scenario finished");
    Ok(report.passed)
}

/// Build tests, the playback world and the core runtime for `scenario`.
pub fn build_core(
    scenario: &ScenarioFile,
    launcher: Arc<dyn CommandLauncher>,
) -> errors::Result<CoreRuntime<PlaybackWorld>> {
    let tests = scenario
        .tests
        .iter()
        .map(Test::load)
        .collect::<errors::Result<Vec<_>>>()?;

    let world = PlaybackWorld::new(&scenario.models, scenario.settings.step_size);
    let options = RuntimeOptions::from(&scenario.settings);
    info!(
        scenario = %scenario.name,
        tests = tests.len(),
        iterations = options.iterations,
        "scenario ready"
    );

    Ok(CoreRuntime::new(
        scenario.name.clone(),
        world,
        tests,
        launcher,
        options,
    ))
}

fn write_report(args: &CliArgs, report: &Report) -> Result<()> {
    let text = report.to_toml()?;
    match &args.report {
        Some(path) => {
            fs::write(path, text)?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Simple dry-run output: print settings, models, tests and triggers.
fn print_dry_run(scenario: &ScenarioFile) {
    let s = &scenario.settings;
    println!("simcheck dry-run: {}", scenario.name);
    if let Some(ref d) = scenario.description {
        println!("  {d}");
    }
    println!("  config.step_size = {:?}", s.step_size);
    println!("  config.max_sim_time = {:?}", s.max_sim_time);
    println!("  config.iterations = {}", s.iterations);
    println!("  config.real_time_factor = {}", s.real_time_factor);
    println!("  config.log_dir = {}", s.log_dir.display());
    println!();

    println!("models ({}):", scenario.models.len());
    for model in &scenario.models {
        println!("  - {} ({} keyframes)", model.name, model.keyframes.len());
    }
    println!();

    println!("tests ({}):", scenario.tests.len());
    for test in &scenario.tests {
        println!("  - {}", test.name);
        for trigger in &test.triggers {
            match trigger.condition {
                ConditionSpec::Time {
                    duration,
                    time_type,
                } => println!(
                    "      [time] {}: after {:?} ({:?})",
                    trigger.name, duration, time_type
                ),
                ConditionSpec::Region { center, size } => println!(
                    "      [region] {}: center {} size {}",
                    trigger.name, center, size
                ),
            }
            for e in &trigger.expectations {
                println!("        expect: {e}");
            }
            for c in &trigger.commands {
                match c {
                    Command::Shell(line) => println!("        run: {line}"),
                    Command::Exec { argv, env } if env.is_empty() => {
                        println!("        exec: {argv:?}")
                    }
                    Command::Exec { argv, env } => println!("        exec: {argv:?} env: {env:?}"),
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
