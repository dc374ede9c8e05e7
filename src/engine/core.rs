// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core owns the simulation host and the tests. For every
//! [`RuntimeEvent`] it advances the simulation, updates every test, and
//! returns a [`CoreStep`] describing what the IO shell should do next.
//!
//! It has no channels and no Tokio types, and the only IO it causes goes
//! through the [`CommandLauncher`] the triggers hand their commands to.
//! Tests drive it directly with a fake world and a recording launcher.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::exec::{CommandLauncher, ExitRecord};
use crate::scenario::{Report, Test};
use crate::sim::SimHost;

use super::{CoreCommand, CoreStep, RuntimeEvent, RuntimeOptions};

pub struct CoreRuntime<W: SimHost> {
    world: W,
    tests: Vec<Test>,
    launcher: Arc<dyn CommandLauncher>,
    options: RuntimeOptions,
    /// Number of tests whose stop callback fired this iteration.
    completed: Arc<AtomicUsize>,
    iteration: u32,
    report: Report,
    finished: bool,
}

impl<W: SimHost> fmt::Debug for CoreRuntime<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("tests", &self.tests)
            .field("options", &self.options)
            .field("iteration", &self.iteration)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<W: SimHost> CoreRuntime<W> {
    pub fn new(
        scenario: impl Into<String>,
        world: W,
        mut tests: Vec<Test>,
        launcher: Arc<dyn CommandLauncher>,
        options: RuntimeOptions,
    ) -> Self {
        let completed = Arc::new(AtomicUsize::new(0));
        for test in &mut tests {
            let completed = Arc::clone(&completed);
            test.set_stop_callback(Box::new(move |name| {
                debug!(test = %name, "test complete");
                completed.fetch_add(1, Ordering::SeqCst);
            }));
        }

        Self {
            world,
            tests,
            launcher,
            options,
            completed,
            iteration: 0,
            report: Report::new(scenario),
            finished: false,
        }
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn launcher(&self) -> &Arc<dyn CommandLauncher> {
        &self.launcher
    }

    /// Attach exit records of stopped processes to the report.
    pub fn record_exits(&mut self, records: Vec<ExitRecord>) {
        self.report.add_exits(records);
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.finished {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
                info: None,
            };
        }

        match event {
            RuntimeEvent::Tick => self.tick(),
            RuntimeEvent::ShutdownRequested => {
                info!(iteration = self.iteration, "shutdown requested; ending iteration");
                let mut commands = self.finish_iteration();
                self.finished = true;
                commands.push(CoreCommand::StopProcesses);
                CoreStep {
                    commands,
                    keep_running: false,
                    info: None,
                }
            }
        }
    }

    fn tick(&mut self) -> CoreStep {
        let info = self.world.step();
        for test in &mut self.tests {
            test.update(&info, &self.world, self.launcher.as_ref());
        }

        let all_complete = self.completed.load(Ordering::SeqCst) >= self.tests.len();
        let timed_out = info.sim_time >= self.options.max_sim_time;
        if !all_complete && !timed_out {
            return CoreStep {
                commands: Vec::new(),
                keep_running: true,
                info: Some(info),
            };
        }

        if timed_out && !all_complete {
            info!(
                iteration = self.iteration,
                sim_time_secs = info.sim_time.as_secs_f64(),
                "max_sim_time reached"
            );
        }

        let mut commands = self.finish_iteration();
        commands.push(CoreCommand::StopProcesses);

        if self.iteration + 1 < self.options.iterations {
            self.iteration += 1;
            self.world.reset();
            for test in &mut self.tests {
                test.reset();
            }
            self.completed.store(0, Ordering::SeqCst);
            info!(iteration = self.iteration, "starting next iteration");
        } else {
            self.finished = true;
        }

        CoreStep {
            commands,
            keep_running: !self.finished,
            info: Some(info),
        }
    }

    fn finish_iteration(&mut self) -> Vec<CoreCommand> {
        for test in &self.tests {
            test.fill_results(&mut self.report);
        }
        self.report.finalize(self.iteration + 1);
        info!(
            iteration = self.iteration,
            passed = self.report.passed,
            "iteration finished"
        );
        vec![CoreCommand::IterationFinished {
            iteration: self.iteration,
        }]
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }
}
