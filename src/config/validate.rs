// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::model::{
    ConditionSpec, ConfigSection, ModelConfig, ModelSpec, OnEntry, RawScenarioFile, ScenarioFile,
    Settings, TestConfig, TestSpec, TriggerConfig, TriggerSpec,
};
use crate::errors::{Result, SimcheckError};
use crate::exec::Command;
use crate::expr::parse_duration;
use crate::sim::{Pose3, Vector3};
use crate::types::TriggerType;

impl TryFrom<RawScenarioFile> for ScenarioFile {
    type Error = SimcheckError;

    fn try_from(raw: RawScenarioFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tests(&raw)?;
        let settings = validate_settings(&raw.config)?;
        let models = validate_models(&raw.model)?;
        let tests = validate_tests(&raw.test)?;

        Ok(ScenarioFile {
            name: raw.name,
            description: raw.description,
            settings,
            models,
            tests,
        })
    }
}

fn config_error(msg: impl Into<String>) -> SimcheckError {
    SimcheckError::ConfigError(msg.into())
}

fn duration_field(what: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| config_error(format!("{what}: {e}")))
}

fn ensure_has_tests(raw: &RawScenarioFile) -> Result<()> {
    if raw.test.is_empty() {
        return Err(config_error(
            "scenario must contain at least one [[test]] section",
        ));
    }
    Ok(())
}

fn validate_settings(cfg: &ConfigSection) -> Result<Settings> {
    let step_size = duration_field("[config].step_size", &cfg.step_size)?;
    if step_size.is_zero() {
        return Err(config_error("[config].step_size must be > 0"));
    }

    let max_sim_time = duration_field("[config].max_sim_time", &cfg.max_sim_time)?;
    if max_sim_time.is_zero() {
        return Err(config_error("[config].max_sim_time must be > 0"));
    }

    if cfg.iterations == 0 {
        return Err(config_error("[config].iterations must be >= 1 (got 0)"));
    }

    if !cfg.real_time_factor.is_finite() || cfg.real_time_factor < 0.0 {
        return Err(config_error(format!(
            "[config].real_time_factor must be >= 0 (got {})",
            cfg.real_time_factor
        )));
    }

    Ok(Settings {
        step_size,
        max_sim_time,
        iterations: cfg.iterations,
        real_time_factor: cfg.real_time_factor,
        log_dir: cfg.log_dir.clone().unwrap_or_else(std::env::temp_dir),
    })
}

fn validate_models(models: &[ModelConfig]) -> Result<Vec<ModelSpec>> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(models.len());

    for model in models {
        if model.name.trim().is_empty() {
            return Err(config_error("[[model]] name must not be empty"));
        }
        if !seen.insert(model.name.as_str()) {
            return Err(config_error(format!(
                "duplicate model name '{}'",
                model.name
            )));
        }

        let mut current = model.pose.resolve([0.0; 6]);
        let mut keyframes = vec![(Duration::ZERO, pose_from(current))];

        for (i, waypoint) in model.waypoints.iter().enumerate() {
            let at = duration_field(
                &format!("model '{}' waypoint {}", model.name, i),
                &waypoint.time,
            )?;
            let prev = keyframes.last().map(|k| k.0).unwrap_or_default();
            if at <= prev {
                return Err(config_error(format!(
                    "model '{}': waypoint times must be strictly increasing ('{}' after {:?})",
                    model.name, waypoint.time, prev
                )));
            }
            current = waypoint.pose.resolve(current);
            keyframes.push((at, pose_from(current)));
        }

        specs.push(ModelSpec {
            name: model.name.clone(),
            keyframes,
        });
    }
    Ok(specs)
}

fn pose_from(v: [f64; 6]) -> Pose3 {
    Pose3::from_xyz_rpy(v[0], v[1], v[2], v[3], v[4], v[5])
}

fn validate_tests(tests: &[TestConfig]) -> Result<Vec<TestSpec>> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(tests.len());

    for test in tests {
        if test.name.trim().is_empty() {
            return Err(config_error("[[test]] name must not be empty"));
        }
        if !seen.insert(test.name.as_str()) {
            return Err(config_error(format!("duplicate test name '{}'", test.name)));
        }
        if test.triggers.is_empty() {
            return Err(config_error(format!(
                "test '{}' must contain at least one [[test.trigger]]",
                test.name
            )));
        }

        let mut trigger_names = HashSet::new();
        let mut triggers = Vec::with_capacity(test.triggers.len());
        for trigger in &test.triggers {
            if trigger.name.trim().is_empty() {
                return Err(config_error(format!(
                    "test '{}': trigger name must not be empty",
                    test.name
                )));
            }
            if !trigger_names.insert(trigger.name.as_str()) {
                return Err(config_error(format!(
                    "test '{}': duplicate trigger name '{}'",
                    test.name, trigger.name
                )));
            }
            triggers.push(validate_trigger(&test.name, trigger)?);
        }

        specs.push(TestSpec {
            name: test.name.clone(),
            triggers,
        });
    }
    Ok(specs)
}

fn validate_trigger(test: &str, cfg: &TriggerConfig) -> Result<TriggerSpec> {
    let ctx = format!("test '{}' trigger '{}'", test, cfg.name);

    // Infallible: unknown strings become `Undefined`.
    let kind: TriggerType = cfg.kind.parse().unwrap_or(TriggerType::Undefined);
    let condition = match kind {
        TriggerType::Time => {
            let time = cfg
                .time
                .as_ref()
                .ok_or_else(|| config_error(format!("{ctx}: time trigger needs a `time` table")))?;
            ConditionSpec::Time {
                duration: duration_field(&format!("{ctx}: time.duration"), &time.duration)?,
                time_type: time.time_type,
            }
        }
        TriggerType::Region => {
            let geometry = cfg.geometry.unwrap_or_default();
            let size = geometry.bounds.size;
            if size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
                return Err(config_error(format!(
                    "{ctx}: box size must be non-negative (got {}, {}, {})",
                    size.x, size.y, size.z
                )));
            }
            ConditionSpec::Region {
                center: Vector3::from(geometry.pos),
                size: Vector3::from(size),
            }
        }
        TriggerType::Undefined => {
            return Err(config_error(format!(
                "{ctx}: unknown trigger type '{}' (expected \"time\" or \"region\")",
                cfg.kind
            )));
        }
    };

    let mut expectations = Vec::new();
    let mut commands = Vec::new();
    for entry in &cfg.on {
        match entry {
            OnEntry::Expect { expect } => expectations.push(expect.clone()),
            OnEntry::Run { run } => commands.push(Command::Shell(run.clone())),
            OnEntry::Script { script } => commands.extend(
                script
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| Command::Shell(l.to_string())),
            ),
            OnEntry::Exec { exec, env } => {
                if exec.is_empty() || exec[0].trim().is_empty() {
                    return Err(config_error(format!("{ctx}: `exec` needs a program")));
                }
                if let Some(bad) = env.iter().find(|e| e.starts_with('=')) {
                    return Err(config_error(format!(
                        "{ctx}: invalid environment entry '{bad}'"
                    )));
                }
                commands.push(Command::Exec {
                    argv: exec.clone(),
                    env: env.clone(),
                });
            }
        }
    }

    Ok(TriggerSpec {
        name: cfg.name.clone(),
        condition,
        expectations,
        commands,
    })
}
