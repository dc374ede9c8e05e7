// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process_manager`] spawns and tracks OS processes and stops them as a
//!   group.
//! - [`reaper`] is the SIGCHLD handler and its lock-free completion queue.
//! - [`script`] wraps shell commands into a signal-aware bash script.
//! - [`launcher`] provides the `CommandLauncher` trait triggers talk to, and
//!   the `ProcessLauncher` used in production.

pub mod launcher;
pub mod process_manager;
pub mod reaper;
pub mod script;

pub use launcher::{Command, CommandLauncher, LaunchReport, ProcessLauncher};
pub use process_manager::{ExitRecord, ExitState, Executable, ProcessManager, SpawnError};
pub use reaper::{Reaper, ReaperError};
pub use script::CommandRunner;
