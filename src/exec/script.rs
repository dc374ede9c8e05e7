// src/exec/script.rs

//! Command runner: wraps shell commands into a generated bash script.
//!
//! The script
//! - appends stdout/stderr to `stdout.log` / `stderr.log` in the log dir,
//! - runs the user commands as a background job so SIGINT can be trapped,
//! - on SIGINT/SIGTERM kills every descendant (walking the process tree from
//!   its own pid) before exiting itself.
//!
//! Each script lives in a fresh temporary directory that is removed when
//! the runner is dropped.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, error};

use super::process_manager::ProcessManager;

pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";

const SCRIPT_HEADER: &str = r#"#!/usr/bin/env bash

list_children ()
{
  local parent=$1
  if [ -r /proc/self/stat ]; then
    local stat line rest fields
    for stat in /proc/[0-9]*/stat; do
      { read -r line < "$stat"; } 2>/dev/null || continue
      rest=${line##*) }
      fields=($rest)
      if [ "${fields[1]}" = "$parent" ]; then
        echo "${stat//[^0-9]/}"
      fi
    done
  else
    ps -o pid= --ppid "$parent"
  fi
}

list_descendants ()
{
  local children pid
  children=$(list_children "$1")
  for pid in $children; do
    list_descendants "$pid"
  done
  echo "$children"
}

on_signal ()
{
  kill $(list_descendants $$) 2>/dev/null
  exit 130
}

trap on_signal INT TERM

# Holds the user commands.
user_script ()
{
"#;

/// Runs trigger commands through the [`ProcessManager`].
#[derive(Debug)]
pub struct CommandRunner {
    manager: Arc<ProcessManager>,
    log_dir: PathBuf,
    script_dirs: Mutex<Vec<TempDir>>,
    seq: AtomicU64,
}

impl CommandRunner {
    pub fn new(manager: Arc<ProcessManager>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager,
            log_dir: log_dir.into(),
            script_dirs: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn next_name(&self, label: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{label}-{n}")
    }

    /// Run `commands` as one wrapped script. Returns the tracked executable
    /// name, or `None` if the script could not be started.
    pub fn run_shell(&self, label: &str, commands: &[String]) -> Option<String> {
        let script = match self.write_script(commands) {
            Ok(path) => path,
            Err(e) => {
                error!(label = %label, error = %e, "unable to write command script");
                return None;
            }
        };

        let name = self.next_name(label);
        let argv = vec![script.to_string_lossy().into_owned()];
        debug!(label = %label, script = %script.display(), "running commands as bash script");
        self.manager.spawn(&name, &argv, &[]).ok().map(|_| name)
    }

    /// Spawn `argv` directly, without the script wrapper.
    pub fn run_exec(&self, label: &str, argv: &[String], envs: &[String]) -> Option<String> {
        let name = self.next_name(label);
        self.manager.spawn(&name, argv, envs).ok().map(|_| name)
    }

    /// Write the wrapped script into a new temporary directory.
    pub fn write_script(&self, commands: &[String]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.log_dir)?;

        let dir = tempfile::Builder::new().prefix("simcheck-script-").tempdir()?;
        let path = dir.path().join("script.bash");
        fs::write(&path, render_script(commands, &self.log_dir))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700))?;

        self.script_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(dir);
        Ok(path)
    }
}

/// Render the full script text for `commands`.
pub fn render_script(commands: &[String], log_dir: &Path) -> String {
    let stdout = shell_quote(&log_dir.join(STDOUT_LOG).to_string_lossy());
    let stderr = shell_quote(&log_dir.join(STDERR_LOG).to_string_lossy());

    let mut script = String::from(SCRIPT_HEADER);
    for cmd in commands {
        script.push_str(cmd);
        script.push('\n');
    }
    // A function body may not be empty.
    if commands.iter().all(|c| c.trim().is_empty()) {
        script.push_str(":\n");
    }
    script.push_str("}\n\n");
    script.push_str("# Run in the background so the trap can fire while we wait.\n");
    script.push_str(&format!("user_script >>{stdout} 2>>{stderr} &\n"));
    script.push_str("wait \"$!\"\n");
    script
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
