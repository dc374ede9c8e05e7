// src/trigger/mod.rs

//! Triggers: named conditions that check expectations and launch commands
//! when they fire.
//!
//! A [`Trigger`] pairs a [`Condition`] (time or region) with the
//! expectations and commands configured in its `on` list. The condition
//! decides *when* the trigger fires; the trigger decides *what happens*:
//!
//! - every expectation is evaluated and ANDed, any missing result fails;
//! - on success the commands go to a [`CommandLauncher`], and the result is
//!   `pass` if they all started;
//! - on failure the result is `fail` and nothing is launched.
//!
//! Cross-trigger calls such as `ground.contains(sphere)` are resolved
//! through [`functions`].

pub mod functions;
pub mod region;
pub mod time;

use tracing::{debug, info, warn};

use crate::config::model::{ConditionSpec, TriggerSpec};
use crate::exec::{Command, CommandLauncher, LaunchReport};
use crate::expr::{EvalContext, Expectation, ExprError, FunctionResolver};
use crate::sim::{Snapshot, UpdateInfo};
use crate::types::{Outcome, TriggerType};

pub use functions::{Predicate, Siblings};
pub use region::RegionCondition;
pub use time::TimeCondition;

/// The activation condition of a trigger.
#[derive(Debug, Clone)]
pub enum Condition {
    Time(TimeCondition),
    Region(RegionCondition),
}

impl Condition {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            Condition::Time(_) => TriggerType::Time,
            Condition::Region(_) => TriggerType::Region,
        }
    }

    /// Advance the condition by one step and return how many firings the
    /// step produced.
    fn poll(&mut self, trigger: &str, info: &UpdateInfo, world: &dyn Snapshot) -> u32 {
        match self {
            Condition::Time(t) => t.poll(trigger, info),
            Condition::Region(r) => r.poll(trigger, world),
        }
    }

    fn reset(&mut self) {
        match self {
            Condition::Time(t) => t.reset(),
            Condition::Region(r) => r.reset(),
        }
    }
}

impl From<&ConditionSpec> for Condition {
    fn from(spec: &ConditionSpec) -> Self {
        match *spec {
            ConditionSpec::Time {
                duration,
                time_type,
            } => Condition::Time(TimeCondition::new(duration, time_type)),
            ConditionSpec::Region { center, size } => {
                Condition::Region(RegionCondition::new(center, size))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trigger {
    name: String,
    condition: Condition,
    expectations: Vec<Expectation>,
    commands: Vec<Command>,
    result: Outcome,
    fired: bool,
    fire_count: u32,
    executables: Vec<String>,
}

impl Trigger {
    pub fn new(name: impl Into<String>, condition: Condition) -> Self {
        Self {
            name: name.into(),
            condition,
            expectations: Vec::new(),
            commands: Vec::new(),
            result: Outcome::Unset,
            fired: false,
            fire_count: 0,
            executables: Vec::new(),
        }
    }

    /// Build a trigger from its validated configuration.
    pub fn load(spec: &TriggerSpec) -> Self {
        let mut trigger = Trigger::new(spec.name.clone(), Condition::from(&spec.condition));
        for source in &spec.expectations {
            trigger.expectations.push(Expectation::new(source.clone()));
        }
        trigger.commands = spec.commands.clone();

        debug!(
            trigger = %trigger.name,
            kind = %trigger.trigger_type(),
            expectations = trigger.expectations.len(),
            commands = trigger.commands.len(),
            "trigger loaded"
        );
        trigger
    }

    pub fn with_expectation(mut self, source: impl Into<String>) -> Self {
        self.expectations.push(Expectation::new(source));
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.condition.trigger_type()
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn result(&self) -> Outcome {
        self.result
    }

    /// True once the condition has fired at least once this iteration.
    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    /// Names of every executable launched by this trigger this iteration.
    pub fn executables(&self) -> &[String] {
        &self.executables
    }

    /// Call one of this trigger's registered functions.
    pub fn call(&self, function: &str, param: &str) -> Result<bool, ExprError> {
        functions::call(self, function, param)
    }

    /// Advance the trigger by one simulation step.
    ///
    /// `siblings` resolves calls to other triggers of the same test; calls
    /// naming this trigger are resolved against its own state after the
    /// condition has been updated.
    pub fn update(
        &mut self,
        info: &UpdateInfo,
        world: &dyn Snapshot,
        siblings: &dyn FunctionResolver,
        launcher: &dyn CommandLauncher,
    ) {
        let firings = self.condition.poll(&self.name, info, world);

        for _ in 0..firings {
            let (outcome, report) = {
                let resolver = functions::WithSelf {
                    me: &*self,
                    others: siblings,
                };
                let ctx = EvalContext::new(info, world, &resolver);
                self.run_on_commands(&ctx, launcher)
            };
            self.record(outcome, report);
        }
    }

    /// Evaluate every expectation. Fails closed on any missing result.
    pub fn check_expectations(&self, ctx: &EvalContext<'_>) -> bool {
        for expectation in &self.expectations {
            match expectation.evaluate(ctx) {
                Some(true) => {}
                Some(false) => {
                    info!(
                        trigger = %self.name,
                        expectation = %expectation.source(),
                        "expectation not met"
                    );
                    return false;
                }
                None => return false,
            }
        }
        true
    }

    /// Check expectations and, if they hold, launch the commands.
    ///
    /// The launcher is never called when an expectation fails.
    pub fn run_on_commands(
        &self,
        ctx: &EvalContext<'_>,
        launcher: &dyn CommandLauncher,
    ) -> (Outcome, LaunchReport) {
        if !self.check_expectations(ctx) {
            return (Outcome::Fail, LaunchReport::default());
        }

        if self.commands.is_empty() {
            return (
                Outcome::Pass,
                LaunchReport {
                    ok: true,
                    executables: Vec::new(),
                },
            );
        }

        let report = launcher.launch(&self.name, &self.commands);
        if !report.ok {
            warn!(trigger = %self.name, "trigger commands failed to start");
        }
        (Outcome::from_bool(report.ok), report)
    }

    fn record(&mut self, outcome: Outcome, report: LaunchReport) {
        self.fired = true;
        self.fire_count += 1;
        self.result = outcome;
        self.executables.extend(report.executables);
        info!(trigger = %self.name, result = %outcome, "trigger fired");
    }

    /// Clear per-iteration state so the trigger can run again.
    pub fn reset(&mut self) {
        self.condition.reset();
        self.result = Outcome::Unset;
        self.fired = false;
        self.fire_count = 0;
        self.executables.clear();
    }
}
