// src/exec/launcher.rs

//! Pluggable command launcher abstraction.
//!
//! Triggers hand their commands to a `CommandLauncher` instead of talking to
//! the process manager directly. This makes it easy to swap in a recording
//! launcher in tests while production uses [`ProcessLauncher`].

use std::sync::Arc;

use tracing::{debug, warn};

use super::process_manager::{ExitRecord, ExitState, ProcessManager};
use super::script::CommandRunner;

/// One command attached to a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A shell command line. All shell commands of a trigger run, in order,
    /// inside one wrapped script.
    Shell(String),
    /// A program spawned directly, with `KEY=VALUE` environment overrides.
    Exec { argv: Vec<String>, env: Vec<String> },
}

/// What happened when a batch of commands was launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchReport {
    /// True if every process was spawned.
    pub ok: bool,
    /// Process-manager names of everything that was started.
    pub executables: Vec<String>,
}

/// Trait abstracting how trigger commands are executed.
pub trait CommandLauncher: Send + Sync {
    /// Start `commands` on behalf of `trigger`. Must not block on the
    /// commands themselves.
    fn launch(&self, trigger: &str, commands: &[Command]) -> LaunchReport;

    /// Exit state of a previously launched executable, if known.
    fn exit_state(&self, _executable: &str) -> Option<ExitState> {
        None
    }

    /// Interrupt everything launched so far and wait for it to exit.
    fn stop_all(&self) -> Vec<ExitRecord> {
        Vec::new()
    }
}

/// Production launcher backed by the [`ProcessManager`].
#[derive(Debug)]
pub struct ProcessLauncher {
    runner: CommandRunner,
}

impl ProcessLauncher {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    pub fn manager(&self) -> &Arc<ProcessManager> {
        self.runner.manager()
    }
}

impl CommandLauncher for ProcessLauncher {
    fn launch(&self, trigger: &str, commands: &[Command]) -> LaunchReport {
        let mut report = LaunchReport {
            ok: true,
            executables: Vec::new(),
        };

        let shell: Vec<String> = commands
            .iter()
            .filter_map(|c| match c {
                Command::Shell(line) => Some(line.clone()),
                Command::Exec { .. } => None,
            })
            .collect();

        if !shell.is_empty() {
            match self.runner.run_shell(trigger, &shell) {
                Some(name) => report.executables.push(name),
                None => report.ok = false,
            }
        }

        for cmd in commands {
            if let Command::Exec { argv, env } = cmd {
                match self.runner.run_exec(trigger, argv, env) {
                    Some(name) => report.executables.push(name),
                    None => report.ok = false,
                }
            }
        }

        if report.ok {
            debug!(trigger = %trigger, executables = ?report.executables, "commands launched");
        } else {
            warn!(trigger = %trigger, "one or more commands failed to start");
        }
        report
    }

    fn exit_state(&self, executable: &str) -> Option<ExitState> {
        self.runner.manager().exit_state(executable)
    }

    fn stop_all(&self) -> Vec<ExitRecord> {
        self.runner.manager().stop()
    }
}
