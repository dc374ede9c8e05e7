// src/scenario/results.rs

//! Result records and sinks.
//!
//! Tests push one [`TestReport`] per iteration into a [`ResultSink`]. The
//! bundled [`Report`] sink collects them together with the exit records of
//! every process that was stopped and renders the lot as TOML.

use serde::Serialize;

use crate::exec::ExitRecord;
use crate::types::{Outcome, TriggerType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerReport {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TriggerType,
    pub result: Outcome,
    pub fired: bool,
    pub fire_count: u32,
    pub executables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub name: String,
    pub iteration: u32,
    pub result: Outcome,
    #[serde(rename = "trigger")]
    pub triggers: Vec<TriggerReport>,
}

/// Receives results from tests.
pub trait ResultSink {
    fn record(&mut self, report: TestReport);
}

impl ResultSink for Vec<TestReport> {
    fn record(&mut self, report: TestReport) {
        self.push(report);
    }
}

/// The final scenario report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub scenario: String,
    pub passed: bool,
    pub iterations: u32,
    #[serde(rename = "process")]
    pub processes: Vec<ExitRecord>,
    #[serde(rename = "test")]
    pub tests: Vec<TestReport>,
}

impl Report {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Default::default()
        }
    }

    pub fn add_exits(&mut self, records: impl IntoIterator<Item = ExitRecord>) {
        self.processes.extend(records);
    }

    /// Recompute `passed`: every recorded test passed.
    pub fn finalize(&mut self, iterations: u32) {
        self.iterations = iterations;
        self.passed = !self.tests.is_empty() && self.tests.iter().all(|t| t.result == Outcome::Pass);
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &TestReport> {
        self.tests.iter().filter(|t| t.result != Outcome::Pass)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl ResultSink for Report {
    fn record(&mut self, report: TestReport) {
        self.tests.push(report);
    }
}
