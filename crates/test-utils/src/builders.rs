#![allow(dead_code)]

use simcheck::config::model::{
    BoxConfig, ConfigSection, GeometryConfig, ModelConfig, OnEntry, PoseConfig, RawScenarioFile,
    ScenarioFile, TestConfig, TimeConfig, TriggerConfig, Vector3Config, WaypointConfig,
};
use simcheck::types::TimeType;

/// Builder for `ScenarioFile` to simplify test setup.
pub struct ScenarioBuilder {
    raw: RawScenarioFile,
}

impl ScenarioBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            raw: RawScenarioFile {
                name: name.to_string(),
                description: None,
                config: ConfigSection::default(),
                model: Vec::new(),
                test: Vec::new(),
            },
        }
    }

    pub fn step_size(mut self, step: &str) -> Self {
        self.raw.config.step_size = step.to_string();
        self
    }

    pub fn max_sim_time(mut self, max: &str) -> Self {
        self.raw.config.max_sim_time = max.to_string();
        self
    }

    pub fn iterations(mut self, n: u32) -> Self {
        self.raw.config.iterations = n;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.raw.model.push(model);
        self
    }

    pub fn with_test(mut self, name: &str, triggers: Vec<TriggerConfig>) -> Self {
        self.raw.test.push(TestConfig {
            name: name.to_string(),
            triggers,
        });
        self
    }

    pub fn raw(self) -> RawScenarioFile {
        self.raw
    }

    pub fn build(self) -> ScenarioFile {
        ScenarioFile::try_from(self.raw).expect("Failed to build valid scenario from builder")
    }
}

/// Builder for `ModelConfig`.
pub struct ModelBuilder {
    model: ModelConfig,
}

impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            model: ModelConfig {
                name: name.to_string(),
                pose: PoseConfig::default(),
                waypoints: Vec::new(),
            },
        }
    }

    pub fn at(mut self, x: f64, y: f64, z: f64) -> Self {
        self.model.pose = xyz(x, y, z);
        self
    }

    /// Move linearly to `(x, y, z)`, arriving at `time`.
    pub fn waypoint(mut self, time: &str, x: f64, y: f64, z: f64) -> Self {
        self.model.waypoints.push(WaypointConfig {
            time: time.to_string(),
            pose: xyz(x, y, z),
        });
        self
    }

    pub fn build(self) -> ModelConfig {
        self.model
    }
}

fn xyz(x: f64, y: f64, z: f64) -> PoseConfig {
    PoseConfig {
        x: Some(x),
        y: Some(y),
        z: Some(z),
        ..PoseConfig::default()
    }
}

/// Builder for `TriggerConfig`.
pub struct TriggerBuilder {
    trigger: TriggerConfig,
}

impl TriggerBuilder {
    fn base(kind: &str, name: &str) -> Self {
        Self {
            trigger: TriggerConfig {
                kind: kind.to_string(),
                name: name.to_string(),
                time: None,
                geometry: None,
                on: Vec::new(),
            },
        }
    }

    /// A simulated-time trigger.
    pub fn time(name: &str, duration: &str) -> Self {
        let mut b = Self::base("time", name);
        b.trigger.time = Some(TimeConfig {
            duration: duration.to_string(),
            time_type: TimeType::Sim,
        });
        b
    }

    /// A region trigger with a box centred at `center` with full edge
    /// lengths `size`.
    pub fn region(name: &str, center: (f64, f64, f64), size: (f64, f64, f64)) -> Self {
        let mut b = Self::base("region", name);
        b.trigger.geometry = Some(GeometryConfig {
            pos: Vector3Config {
                x: center.0,
                y: center.1,
                z: center.2,
            },
            bounds: BoxConfig {
                size: Vector3Config {
                    x: size.0,
                    y: size.1,
                    z: size.2,
                },
            },
        });
        b
    }

    /// Any `type` string, with no parameters.
    pub fn of_kind(kind: &str, name: &str) -> Self {
        Self::base(kind, name)
    }

    pub fn expect(mut self, expectation: &str) -> Self {
        self.trigger.on.push(OnEntry::Expect {
            expect: expectation.to_string(),
        });
        self
    }

    pub fn run(mut self, command: &str) -> Self {
        self.trigger.on.push(OnEntry::Run {
            run: command.to_string(),
        });
        self
    }

    pub fn exec(mut self, argv: &[&str]) -> Self {
        self.trigger.on.push(OnEntry::Exec {
            exec: argv.iter().map(|s| s.to_string()).collect(),
            env: Vec::new(),
        });
        self
    }

    pub fn build(self) -> TriggerConfig {
        self.trigger
    }
}
