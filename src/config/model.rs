// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::Command;
use crate::sim::{Pose3, Vector3};
use crate::types::TimeType;

/// Scenario file as read from TOML, before validation.
///
/// ```toml
/// name = "drop test"
///
/// [config]
/// step_size = "1ms"
/// max_sim_time = "10s"
///
/// [[model]]
/// name = "sphere"
/// pose = { z = 5.0 }
/// waypoints = [ { time = "2s", pose = { z = 0.5 } } ]
///
/// [[test]]
/// name = "sphere lands"
///
/// [[test.trigger]]
/// type = "time"
/// name = "after_two_seconds"
/// time = { duration = "2s", type = "sim" }
/// on = [ { expect = "${{ sphere.pose.z <= 0.6 }}" }, { run = "echo landed" } ]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawScenarioFile {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Global run settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Entities played back by the built-in host, from `[[model]]`.
    #[serde(default)]
    pub model: Vec<ModelConfig>,

    /// Tests from `[[test]]`.
    #[serde(default)]
    pub test: Vec<TestConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Simulated time advanced per step.
    #[serde(default = "default_step_size")]
    pub step_size: String,

    /// An iteration ends here even if some triggers have not fired.
    #[serde(default = "default_max_sim_time")]
    pub max_sim_time: String,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// 0 runs as fast as possible; 1 paces steps to wall-clock time.
    #[serde(default)]
    pub real_time_factor: f64,

    /// Directory wrapped scripts append their stdout/stderr logs to.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_step_size() -> String {
    "1ms".to_string()
}

fn default_max_sim_time() -> String {
    "10s".to_string()
}

fn default_iterations() -> u32 {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            max_sim_time: default_max_sim_time(),
            iterations: default_iterations(),
            real_time_factor: 0.0,
            log_dir: None,
        }
    }
}

/// `[[model]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,

    /// Pose at t = 0. Unset fields are zero.
    #[serde(default)]
    pub pose: PoseConfig,

    /// Later keyframes. Unset fields keep the previous keyframe's value.
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PoseConfig {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub roll: Option<f64>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub yaw: Option<f64>,
}

impl PoseConfig {
    /// Fill unset fields from `base` (x, y, z, roll, pitch, yaw).
    pub fn resolve(&self, base: [f64; 6]) -> [f64; 6] {
        [
            self.x.unwrap_or(base[0]),
            self.y.unwrap_or(base[1]),
            self.z.unwrap_or(base[2]),
            self.roll.unwrap_or(base[3]),
            self.pitch.unwrap_or(base[4]),
            self.yaw.unwrap_or(base[5]),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaypointConfig {
    pub time: String,
    #[serde(default)]
    pub pose: PoseConfig,
}

/// `[[test]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    pub name: String,

    #[serde(default, rename = "trigger")]
    pub triggers: Vec<TriggerConfig>,
}

/// `[[test.trigger]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// `"time"` or `"region"`.
    #[serde(rename = "type")]
    pub kind: String,

    pub name: String,

    /// Parameters of a time trigger.
    #[serde(default)]
    pub time: Option<TimeConfig>,

    /// Parameters of a region trigger. Missing means a unit box at the
    /// origin.
    #[serde(default)]
    pub geometry: Option<GeometryConfig>,

    #[serde(default)]
    pub on: Vec<OnEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeConfig {
    pub duration: String,
    #[serde(default, rename = "type")]
    pub time_type: TimeType,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct GeometryConfig {
    #[serde(default)]
    pub pos: Vector3Config,
    #[serde(default, rename = "box")]
    pub bounds: BoxConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoxConfig {
    #[serde(default = "unit_size")]
    pub size: Vector3Config,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self { size: unit_size() }
    }
}

fn unit_size() -> Vector3Config {
    Vector3Config {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq)]
pub struct Vector3Config {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl From<Vector3Config> for Vector3 {
    fn from(v: Vector3Config) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

/// One entry of a trigger's `on` list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OnEntry {
    Expect {
        expect: String,
    },
    Run {
        run: String,
    },
    /// Multi-line block, one shell command per line.
    Script {
        script: String,
    },
    /// Direct spawn without the shell wrapper.
    Exec {
        exec: Vec<String>,
        #[serde(default)]
        env: Vec<String>,
    },
}

// ---- validated model ----

/// A validated scenario, ready to be turned into tests and a world.
#[derive(Debug, Clone)]
pub struct ScenarioFile {
    pub name: String,
    pub description: Option<String>,
    pub settings: Settings,
    pub models: Vec<ModelSpec>,
    pub tests: Vec<TestSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub step_size: Duration,
    pub max_sim_time: Duration,
    pub iterations: u32,
    pub real_time_factor: f64,
    pub log_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_size: Duration::from_millis(1),
            max_sim_time: Duration::from_secs(10),
            iterations: 1,
            real_time_factor: 0.0,
            log_dir: std::env::temp_dir(),
        }
    }
}

/// A model and its keyframes, sorted by time, the first at t = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub keyframes: Vec<(Duration, Pose3)>,
}

impl ModelSpec {
    /// A model that stays put.
    pub fn fixed(name: impl Into<String>, pose: Pose3) -> Self {
        Self {
            name: name.into(),
            keyframes: vec![(Duration::ZERO, pose)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub name: String,
    pub triggers: Vec<TriggerSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSpec {
    pub name: String,
    pub condition: ConditionSpec,
    /// Raw `${{ ... }}` strings, parsed when the trigger is loaded.
    pub expectations: Vec<String>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionSpec {
    Time {
        duration: Duration,
        time_type: TimeType,
    },
    Region {
        center: Vector3,
        size: Vector3,
    },
}
