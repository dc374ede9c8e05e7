// src/engine/mod.rs

//! Orchestration engine for simcheck.
//!
//! This module ties together:
//! - the simulation host that produces a snapshot every step
//! - the tests and their triggers
//! - iteration bookkeeping (end on completion or `max_sim_time`, reset)
//! - the runtime loop that reacts to:
//!   - simulation ticks
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::config::Settings;
use crate::sim::UpdateInfo;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Upper bound on simulated time per iteration.
    pub max_sim_time: Duration,
    /// Number of scenario iterations to run.
    pub iterations: u32,
    /// 0 runs unthrottled; otherwise sim time advances at this multiple
    /// of wall-clock time.
    pub real_time_factor: f64,
}

impl From<&Settings> for RuntimeOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_sim_time: settings.max_sim_time,
            iterations: settings.iterations,
            real_time_factor: settings.real_time_factor,
        }
    }
}

/// Events flowing into the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Advance the simulation by one step.
    Tick,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCommand {
    /// Interrupt every launched process and wait for it.
    StopProcesses,
    /// An iteration finished and its results were recorded.
    IterationFinished { iteration: u32 },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
    /// Timing of the step that was just taken, if any.
    pub info: Option<UpdateInfo>,
}

pub mod core;
pub mod runtime;

pub use core::CoreRuntime;
pub use runtime::Runtime;
