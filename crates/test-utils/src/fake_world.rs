use std::collections::BTreeMap;
use std::time::Duration;

use simcheck::sim::{Pose3, SimHost, Snapshot, UpdateInfo, Vector3};

/// A world whose entities only move when the test moves them.
///
/// Every `step()` advances simulated and real time by the same fixed step,
/// so tests are deterministic.
#[derive(Debug, Clone)]
pub struct StaticWorld {
    entities: BTreeMap<String, Pose3>,
    step_size: Duration,
    sim_time: Duration,
    steps: u64,
}

impl StaticWorld {
    pub fn new(step_size: Duration) -> Self {
        Self {
            entities: BTreeMap::new(),
            step_size,
            sim_time: Duration::ZERO,
            steps: 0,
        }
    }

    pub fn with_entity(mut self, name: &str, pose: Pose3) -> Self {
        self.set_pose(name, pose);
        self
    }

    pub fn with_entity_at(self, name: &str, x: f64, y: f64, z: f64) -> Self {
        self.with_entity(name, Pose3::new(Vector3::new(x, y, z), Default::default()))
    }

    pub fn set_pose(&mut self, name: &str, pose: Pose3) {
        self.entities.insert(name.to_string(), pose);
    }

    pub fn move_to(&mut self, name: &str, x: f64, y: f64, z: f64) {
        let rot = self.entities.get(name).map(|p| p.rot).unwrap_or_default();
        self.set_pose(name, Pose3::new(Vector3::new(x, y, z), rot));
    }

    pub fn remove(&mut self, name: &str) {
        self.entities.remove(name);
    }

    pub fn set_time(&mut self, sim_time: Duration) {
        self.sim_time = sim_time;
    }

    /// Timing info for the current state, with real time equal to sim time.
    pub fn info(&self) -> UpdateInfo {
        UpdateInfo {
            sim_time: self.sim_time,
            real_time: self.sim_time,
            iterations: self.steps,
        }
    }

    /// Timing info at an arbitrary simulated time.
    pub fn info_at(sim_time: Duration) -> UpdateInfo {
        UpdateInfo {
            sim_time,
            real_time: Duration::ZERO,
            iterations: 0,
        }
    }
}

impl Snapshot for StaticWorld {
    fn entity_names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    fn world_pose(&self, name: &str) -> Option<Pose3> {
        self.entities.get(name).copied()
    }
}

impl SimHost for StaticWorld {
    fn step(&mut self) -> UpdateInfo {
        self.sim_time += self.step_size;
        self.steps += 1;
        self.info()
    }

    fn reset(&mut self) {
        self.sim_time = Duration::ZERO;
        self.steps = 0;
    }
}
