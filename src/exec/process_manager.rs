// src/exec/process_manager.rs

//! Spawns, tracks and terminates OS child processes.
//!
//! - [`ProcessManager::spawn`] forks and execs one program, recording it in
//!   the registry under a unique name.
//! - Terminated children are reaped asynchronously by the SIGCHLD
//!   [`Reaper`]; their exit states are folded into the registry lazily.
//! - [`ProcessManager::stop`] interrupts every tracked process and blocks
//!   until all of them have exited.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::{CString, OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork, pipe2};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::reaper::{Reaper, ReaperError};

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,

    #[error("an executable named '{0}' is already tracked")]
    DuplicateName(String),

    #[error("argument contains an interior NUL byte: {0:?}")]
    InvalidArgument(String),

    #[error("unable to find executable '{0}'")]
    NotFound(String),

    #[error("unable to create exec status pipe: {0}")]
    Pipe(Errno),

    #[error("fork failed: {0}")]
    Fork(Errno),

    #[error("unable to run command [{program}]: {source}")]
    Exec { program: String, source: Errno },
}

/// How a tracked process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ExitState {
    Exited(i32),
    Signaled(i32),
    /// Exited, but reaped somewhere we could not read the status from.
    Unknown,
}

impl ExitState {
    pub fn from_raw(status: i32) -> Self {
        if libc::WIFEXITED(status) {
            ExitState::Exited(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            ExitState::Signaled(libc::WTERMSIG(status))
        } else {
            ExitState::Unknown
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

impl From<WaitStatus> for ExitState {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, code) => ExitState::Exited(code),
            WaitStatus::Signaled(_, sig, _) => ExitState::Signaled(sig as i32),
            _ => ExitState::Unknown,
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exited({code})"),
            ExitState::Signaled(sig) => write!(f, "signaled({sig})"),
            ExitState::Unknown => f.write_str("unknown"),
        }
    }
}

/// One spawned OS process.
#[derive(Debug, Clone)]
pub struct Executable {
    /// Bookkeeping name, not necessarily the program name.
    pub name: String,
    pub pid: Pid,
    pub argv: Vec<String>,
    pub envs: Vec<String>,
    /// Reserved; processes are never restarted.
    pub auto_restart: bool,
    pub exit: Option<ExitState>,
}

/// Result of stopping one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitRecord {
    pub name: String,
    pub pid: i32,
    pub state: ExitState,
}

#[derive(Debug, Default)]
struct Registry {
    executables: HashMap<String, Executable>,
    /// Reaped pids not (yet) matched to a registry entry.
    unmatched: HashMap<i32, ExitState>,
    /// Names reserved by in-flight spawns, with the child pid once forked.
    spawning: HashMap<String, Option<i32>>,
    /// Failed-exec children the reaper took before `spawn` could wait.
    discarded: HashSet<i32>,
}

impl Registry {
    /// Forget reaped pids that belong to nothing tracked or in flight.
    fn drop_stray_exits(&mut self) {
        let in_flight: HashSet<i32> = self.spawning.values().flatten().copied().collect();
        let before = self.unmatched.len();
        self.unmatched.retain(|pid, _| in_flight.contains(pid));
        let dropped = before - self.unmatched.len();
        if dropped > 0 {
            debug!(dropped, "discarded exit states of untracked children");
        }
    }
}

/// Tracks every process spawned on behalf of triggers.
#[derive(Debug)]
pub struct ProcessManager {
    registry: Mutex<Registry>,
    reaper: Option<Reaper>,
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessManager {
    /// Create a manager and claim the SIGCHLD reaper.
    ///
    /// If the reaper cannot be installed (another manager owns it, or
    /// `sigaction` fails) the manager still works: children are only
    /// reaped by the blocking waits in [`stop`](Self::stop).
    pub fn new() -> Self {
        let reaper = match Reaper::install() {
            Ok(r) => Some(r),
            Err(ReaperError::AlreadyOwned) => {
                warn!("SIGCHLD reaper owned elsewhere; exited children are reaped on stop only");
                None
            }
            Err(e) => {
                error!(error = %e, "signal setup failed; exited children are reaped on stop only");
                None
            }
        };

        Self {
            registry: Mutex::new(Registry::default()),
            reaper,
        }
    }

    /// True if this manager owns the asynchronous reaper.
    pub fn is_reaping(&self) -> bool {
        self.reaper.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn `argv[0]` with `argv[1..]` as arguments.
    ///
    /// `envs` holds `KEY=VALUE` assignments applied on top of the current
    /// environment; a bare `KEY` removes that variable.
    pub fn spawn(&self, name: &str, argv: &[String], envs: &[String]) -> Result<Pid, SpawnError> {
        let result = self.spawn_inner(name, argv, envs);
        if let Err(ref e) = result {
            error!(executable = %name, cmd = %argv.join(" "), error = %e, "spawn failed");
        }
        result
    }

    fn spawn_inner(&self, name: &str, argv: &[String], envs: &[String]) -> Result<Pid, SpawnError> {
        let Some(program) = argv.first() else {
            return Err(SpawnError::EmptyCommand);
        };

        {
            let mut reg = self.lock();
            if reg.executables.contains_key(name) || reg.spawning.contains_key(name) {
                return Err(SpawnError::DuplicateName(name.to_string()));
            }
            reg.spawning.insert(name.to_string(), None);
        }

        let result = self.fork_exec(name, program, argv, envs);
        if result.is_err() {
            self.lock().spawning.remove(name);
        }
        result
    }

    fn fork_exec(
        &self,
        name: &str,
        program: &str,
        argv: &[String],
        envs: &[String],
    ) -> Result<Pid, SpawnError> {
        let env = merged_env(envs);
        let path = resolve_program(program, env.get(OsStr::new("PATH")).map(OsString::as_os_str))
            .ok_or_else(|| SpawnError::NotFound(program.to_string()))?;

        // Everything the child touches is allocated before fork.
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| SpawnError::InvalidArgument(program.to_string()))?;
        let c_args = argv
            .iter()
            .map(|a| CString::new(a.as_bytes()).map_err(|_| SpawnError::InvalidArgument(a.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let c_env = env
            .iter()
            .map(|(k, v)| {
                let mut kv = k.as_bytes().to_vec();
                kv.push(b'=');
                kv.extend_from_slice(v.as_bytes());
                CString::new(kv).map_err(|_| SpawnError::InvalidArgument(k.to_string_lossy().into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let arg_ptrs = null_terminated(&c_args);
        let env_ptrs = null_terminated(&c_env);

        let (read_fd, write_fd) = pipe2(OFlag::O_CLOEXEC).map_err(SpawnError::Pipe)?;

        // SAFETY: the child branch only calls async-signal-safe functions
        // on memory prepared above, then execs or exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => unsafe {
                libc::setpgid(0, 0);
                // An inherited SIG_IGN would survive exec and make stop hang.
                libc::signal(libc::SIGINT, libc::SIG_DFL);
                libc::signal(libc::SIGTERM, libc::SIG_DFL);
                let mut unblocked: libc::sigset_t = std::mem::zeroed();
                libc::sigemptyset(&mut unblocked);
                libc::sigprocmask(libc::SIG_SETMASK, &unblocked, std::ptr::null_mut());
                libc::execve(c_path.as_ptr(), arg_ptrs.as_ptr(), env_ptrs.as_ptr());
                let err: i32 = Errno::last_raw();
                libc::write(
                    write_fd.as_raw_fd(),
                    (&err as *const i32).cast(),
                    std::mem::size_of::<i32>(),
                );
                libc::_exit(127);
            },
            Ok(ForkResult::Parent { child }) => {
                drop(write_fd);
                if let Some(slot) = self.lock().spawning.get_mut(name) {
                    *slot = Some(child.as_raw());
                }
                if let Some(errno) = read_exec_error(File::from(read_fd)) {
                    self.discard_failed_child(child);
                    return Err(SpawnError::Exec {
                        program: program.to_string(),
                        source: Errno::from_raw(errno),
                    });
                }

                debug!(
                    executable = %name,
                    pid = child.as_raw(),
                    cmd = %argv.join(" "),
                    "forked a process"
                );
                self.record(Executable {
                    name: name.to_string(),
                    pid: child,
                    argv: argv.to_vec(),
                    envs: envs.to_vec(),
                    auto_restart: false,
                    exit: None,
                });
                Ok(child)
            }
            Err(e) => Err(SpawnError::Fork(e)),
        }
    }

    fn record(&self, mut exe: Executable) {
        let mut reg = self.lock();
        self.collect_reaped(&mut reg);
        if let Some(state) = reg.unmatched.remove(&exe.pid.as_raw()) {
            exe.exit = Some(state);
        }
        reg.spawning.remove(&exe.name);
        reg.executables.insert(exe.name.clone(), exe);
    }

    /// Reap a child whose exec failed, so its status can never be matched
    /// to a later process that reuses the pid.
    fn discard_failed_child(&self, child: Pid) {
        loop {
            match waitpid(child, None) {
                Ok(_) => return,
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => break,
                Err(e) => {
                    warn!(pid = child.as_raw(), error = %e, "waitpid failed");
                    return;
                }
            }
        }

        // The reaper got there first.
        let mut reg = self.lock();
        self.collect_reaped(&mut reg);
        if reg.unmatched.remove(&child.as_raw()).is_none() {
            reg.discarded.insert(child.as_raw());
        }
    }

    /// Move everything the reaper has queued into the registry.
    fn collect_reaped(&self, reg: &mut Registry) {
        let Some(reaper) = &self.reaper else {
            return;
        };
        while let Some(reaped) = reaper.pop() {
            if reg.discarded.remove(&reaped.pid) {
                continue;
            }
            let state = ExitState::from_raw(reaped.status);
            match reg
                .executables
                .values_mut()
                .find(|e| e.pid.as_raw() == reaped.pid)
            {
                Some(exe) => {
                    debug!(executable = %exe.name, pid = reaped.pid, %state, "child exited");
                    exe.exit = Some(state);
                }
                None => {
                    reg.unmatched.insert(reaped.pid, state);
                }
            }
        }
    }

    /// Exit state of a tracked process, if it has been reaped.
    pub fn exit_state(&self, name: &str) -> Option<ExitState> {
        let mut reg = self.lock();
        self.collect_reaped(&mut reg);
        reg.executables.get(name).and_then(|e| e.exit)
    }

    pub fn pid(&self, name: &str) -> Option<Pid> {
        self.lock().executables.get(name).map(|e| e.pid)
    }

    /// Names of every tracked executable, running or exited.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().executables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().executables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reaped children that match no tracked process yet.
    pub fn stray_exits(&self) -> usize {
        let mut reg = self.lock();
        self.collect_reaped(&mut reg);
        reg.unmatched.len()
    }

    /// Interrupt every tracked process and wait until all have exited.
    ///
    /// One monitor thread per process blocks in `waitpid`; the registry
    /// lock is held while monitors start and SIGINT is sent, and released
    /// before joining them. Returns one record per stopped process.
    pub fn stop(&self) -> Vec<ExitRecord> {
        let mut reg = self.lock();
        if reg.executables.is_empty() {
            self.collect_reaped(&mut reg);
            reg.drop_stray_exits();
            return Vec::new();
        }

        if let Some(reaper) = &self.reaper {
            if let Err(e) = reaper.suspend() {
                warn!(error = %e, "unable to suspend SIGCHLD reaper");
            }
        }
        self.collect_reaped(&mut reg);

        let targets: Vec<(String, Pid, Option<ExitState>)> = reg
            .executables
            .values()
            .map(|e| (e.name.clone(), e.pid, e.exit))
            .collect();

        let mut records: Vec<ExitRecord> = std::thread::scope(|s| {
            let monitors: Vec<_> = targets
                .iter()
                .map(|(name, pid, known)| {
                    let (pid, known) = (*pid, *known);
                    let name = name.clone();
                    s.spawn(move || ExitRecord {
                        name,
                        pid: pid.as_raw(),
                        state: known.unwrap_or_else(|| wait_for_exit(pid)),
                    })
                })
                .collect();

            for (name, pid, known) in &targets {
                if known.is_some() {
                    continue;
                }
                debug!(executable = %name, pid = pid.as_raw(), "killing the process");
                match kill(*pid, Signal::SIGINT) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => warn!(executable = %name, error = %e, "unable to signal process"),
                }
            }
            drop(reg);

            debug!("waiting for each process to end");
            monitors
                .into_iter()
                .zip(&targets)
                .map(|(m, (name, pid, _))| {
                    m.join().unwrap_or_else(|_| ExitRecord {
                        name: name.clone(),
                        pid: pid.as_raw(),
                        state: ExitState::Unknown,
                    })
                })
                .collect()
        });

        let mut reg = self.lock();
        if let Some(reaper) = &self.reaper {
            if let Err(e) = reaper.resume() {
                warn!(error = %e, "unable to resume SIGCHLD reaper");
            }
        }
        self.collect_reaped(&mut reg);
        for record in records.iter_mut() {
            reg.executables.remove(&record.name);
            if let Some(state) = reg.unmatched.remove(&record.pid) {
                if record.state == ExitState::Unknown {
                    record.state = state;
                }
            }
        }
        reg.drop_stray_exits();

        info!(stopped = records.len(), "all tracked processes have exited");
        records
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Block until `pid` has exited.
fn wait_for_exit(pid: Pid) -> ExitState {
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => {
                return ExitState::from(status);
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            // Already reaped elsewhere.
            Err(Errno::ECHILD) => return ExitState::Unknown,
            Err(e) => {
                warn!(pid = pid.as_raw(), error = %e, "waitpid failed");
                return ExitState::Unknown;
            }
        }
    }
}

/// Read the errno written by a child whose exec failed. `None` means the
/// pipe closed on a successful exec.
fn read_exec_error(mut pipe: File) -> Option<i32> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match pipe.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "unable to read exec status pipe");
                break;
            }
        }
    }
    (filled == buf.len()).then(|| i32::from_ne_bytes(buf))
}

/// The current environment with `KEY=VALUE` overrides applied.
fn merged_env(envs: &[String]) -> BTreeMap<OsString, OsString> {
    let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    for entry in envs {
        match entry.split_once('=') {
            Some((k, v)) => {
                env.insert(k.into(), v.into());
            }
            None => {
                env.remove(OsStr::new(entry));
            }
        }
    }
    env
}

/// Resolve `program` against `PATH` the way `execvp` would.
fn resolve_program(program: &str, path: Option<&OsStr>) -> Option<PathBuf> {
    if program.contains('/') {
        return Some(PathBuf::from(program));
    }
    std::env::split_paths(path?)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn null_terminated(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}
