use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use simcheck::exec::{Command, CommandLauncher, ExitRecord, LaunchReport};

/// One recorded `launch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub trigger: String,
    pub commands: Vec<Command>,
}

/// A fake launcher that:
/// - records every batch of commands instead of spawning anything
/// - reports success, or failure after `set_failing(true)`
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launches: Arc<Mutex<Vec<Launch>>>,
    failing: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let launcher = Self::default();
        launcher.set_failing(true);
        launcher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    /// Names of the triggers that launched, in order.
    pub fn triggers(&self) -> Vec<String> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.trigger.clone())
            .collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CommandLauncher for RecordingLauncher {
    fn launch(&self, trigger: &str, commands: &[Command]) -> LaunchReport {
        let mut launches = self.launches.lock().unwrap();
        let seq = launches.len();
        launches.push(Launch {
            trigger: trigger.to_string(),
            commands: commands.to_vec(),
        });

        if self.failing.load(Ordering::SeqCst) {
            LaunchReport {
                ok: false,
                executables: Vec::new(),
            }
        } else {
            LaunchReport {
                ok: true,
                executables: vec![format!("{trigger}-{seq}")],
            }
        }
    }

    fn stop_all(&self) -> Vec<ExitRecord> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }
}
