// src/sim/playback.rs

//! Keyframe playback host.
//!
//! Stands in for a real simulation engine: every model follows a list of
//! timed keyframes and its pose is linearly interpolated between them. This
//! is enough to drive triggers end-to-end from the CLI without linking a
//! physics engine.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::model::ModelSpec;

use super::pose::Pose3;
use super::snapshot::{SimHost, Snapshot, UpdateInfo};

#[derive(Debug, Clone)]
struct Track {
    name: String,
    /// Sorted by time; the first keyframe is at t = 0.
    keyframes: Vec<(Duration, Pose3)>,
}

impl Track {
    fn pose_at(&self, t: Duration) -> Pose3 {
        let Some(first) = self.keyframes.first() else {
            return Pose3::default();
        };

        let mut prev = first;
        for next in self.keyframes.iter().skip(1) {
            if t < next.0 {
                let span = (next.0 - prev.0).as_secs_f64();
                let alpha = if span > 0.0 {
                    (t.saturating_sub(prev.0)).as_secs_f64() / span
                } else {
                    1.0
                };
                return Pose3::new(
                    prev.1.pos.lerp(next.1.pos, alpha),
                    prev.1.rot.nlerp(next.1.rot, alpha),
                );
            }
            prev = next;
        }
        prev.1
    }
}

/// A world whose entities move along scripted keyframes.
#[derive(Debug)]
pub struct PlaybackWorld {
    tracks: Vec<Track>,
    step_size: Duration,
    sim_time: Duration,
    iterations: u64,
    started: Instant,
}

impl PlaybackWorld {
    pub fn new(models: &[ModelSpec], step_size: Duration) -> Self {
        let tracks = models
            .iter()
            .map(|m| Track {
                name: m.name.clone(),
                keyframes: m.keyframes.clone(),
            })
            .collect();

        Self {
            tracks,
            step_size,
            sim_time: Duration::ZERO,
            iterations: 0,
            started: Instant::now(),
        }
    }

    /// Advance simulated time by one step and return the new timing info.
    pub fn step(&mut self) -> UpdateInfo {
        self.sim_time += self.step_size;
        self.iterations += 1;
        self.info()
    }

    pub fn info(&self) -> UpdateInfo {
        UpdateInfo {
            sim_time: self.sim_time,
            real_time: self.started.elapsed(),
            iterations: self.iterations,
        }
    }

    pub fn step_size(&self) -> Duration {
        self.step_size
    }

    /// Rewind to t = 0 for a new iteration.
    pub fn reset(&mut self) {
        debug!("rewinding playback world");
        self.sim_time = Duration::ZERO;
        self.iterations = 0;
        self.started = Instant::now();
    }
}

impl Snapshot for PlaybackWorld {
    fn entity_names(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.name.clone()).collect()
    }

    fn world_pose(&self, name: &str) -> Option<Pose3> {
        self.tracks
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.pose_at(self.sim_time))
    }
}

impl SimHost for PlaybackWorld {
    fn step(&mut self) -> UpdateInfo {
        PlaybackWorld::step(self)
    }

    fn reset(&mut self) {
        PlaybackWorld::reset(self)
    }
}
