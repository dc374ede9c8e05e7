// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::CommandLauncher;
use crate::scenario::Report;
use crate::sim::{SimHost, UpdateInfo};

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Steps between cooperative yields when running unthrottled.
const YIELD_EVERY: u64 = 256;

/// Drives the core simulation loop and reacts to shutdown requests.
///
/// This is a pure IO shell around `CoreRuntime`: it paces steps to the
/// configured real-time factor, polls the event channel between steps, and
/// runs the blocking process shutdown off the async worker threads.
pub struct Runtime<W: SimHost> {
    core: CoreRuntime<W>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl<W: SimHost> fmt::Debug for Runtime<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<W: SimHost> Runtime<W> {
    pub fn new(core: CoreRuntime<W>, event_rx: mpsc::Receiver<RuntimeEvent>) -> Self {
        Self { core, event_rx }
    }

    /// Main loop.
    ///
    /// - Takes a pending `RuntimeEvent` if there is one, otherwise ticks.
    /// - Feeds it into the core runtime.
    /// - Executes the commands the core returns.
    pub async fn run(mut self) -> Result<Report> {
        info!("simcheck runtime started");

        loop {
            let event = match self.event_rx.try_recv() {
                Ok(e) => e,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => RuntimeEvent::Tick,
            };
            if event != RuntimeEvent::Tick {
                debug!(?event, "runtime received event");
            }

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }

            if let Some(info) = step.info {
                self.pace(&info).await;
            }
        }

        info!("runtime exiting");
        Ok(self.core.into_report())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StopProcesses => {
                let launcher: Arc<dyn CommandLauncher> = Arc::clone(self.core.launcher());
                let records = tokio::task::spawn_blocking(move || launcher.stop_all())
                    .await
                    .map_err(|e| anyhow::anyhow!("process shutdown task failed: {e}"))?;

                for record in &records {
                    if !record.state.success() {
                        warn!(executable = %record.name, pid = record.pid, state = %record.state, "process did not exit cleanly");
                    }
                }
                debug!(count = records.len(), "processes stopped");
                self.core.record_exits(records);
            }
            CoreCommand::IterationFinished { iteration } => {
                info!(iteration, "iteration results recorded");
            }
        }
        Ok(())
    }

    async fn pace(&self, info: &UpdateInfo) {
        let factor = self.core.options().real_time_factor;
        if factor > 0.0 {
            let target = info.sim_time.div_f64(factor);
            if target > info.real_time {
                tokio::time::sleep(target - info.real_time).await;
            }
        } else if info.iterations % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }
}
