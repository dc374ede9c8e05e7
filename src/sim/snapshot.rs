// src/sim/snapshot.rs

//! The queryable view of simulation state handed to triggers each step.

use std::time::Duration;

use super::pose::Pose3;

/// Timing information for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UpdateInfo {
    /// Simulated time elapsed since the iteration started.
    pub sim_time: Duration,
    /// Wall-clock time elapsed since the iteration started.
    pub real_time: Duration,
    /// Number of steps taken in this iteration.
    pub iterations: u64,
}

/// Read-only access to the entities of a running simulation.
///
/// The host simulation implements this; triggers and the expression
/// evaluator only ever read through it.
pub trait Snapshot {
    /// Names of every entity that currently has a world pose.
    fn entity_names(&self) -> Vec<String>;

    /// World pose of the named entity, or `None` if it does not exist.
    fn world_pose(&self, name: &str) -> Option<Pose3>;
}

/// A simulation the engine can drive step by step.
pub trait SimHost: Snapshot {
    /// Advance by one step and report the new timing.
    fn step(&mut self) -> UpdateInfo;

    /// Rewind to the start of a new iteration.
    fn reset(&mut self);
}
