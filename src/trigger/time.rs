// src/trigger/time.rs

use std::time::Duration;

use tracing::info;

use crate::sim::UpdateInfo;
use crate::types::TimeType;

/// Fires once when the configured clock reaches `duration`.
#[derive(Debug, Clone)]
pub struct TimeCondition {
    duration: Duration,
    time_type: TimeType,
    triggered: bool,
}

impl TimeCondition {
    pub fn new(duration: Duration, time_type: TimeType) -> Self {
        Self {
            duration,
            time_type,
            triggered: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn time_type(&self) -> TimeType {
        self.time_type
    }

    /// Returns 1 on the step the duration is reached, 0 otherwise.
    pub(crate) fn poll(&mut self, trigger: &str, info: &UpdateInfo) -> u32 {
        if self.triggered {
            return 0;
        }

        let elapsed = match self.time_type {
            TimeType::Sim => info.sim_time,
            TimeType::Real => info.real_time,
        };
        if elapsed < self.duration {
            return 0;
        }

        info!(
            trigger = %trigger,
            time_type = ?self.time_type,
            elapsed_secs = elapsed.as_secs_f64(),
            "time trigger fired"
        );
        self.triggered = true;
        1
    }

    pub(crate) fn reset(&mut self) {
        self.triggered = false;
    }
}
