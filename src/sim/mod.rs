// src/sim/mod.rs

//! Simulation-side types: poses, the per-step snapshot interface, and the
//! keyframe playback host used by the CLI.

pub mod playback;
pub mod pose;
pub mod snapshot;

pub use playback::PlaybackWorld;
pub use pose::{AxisAlignedBox, Pose3, PoseField, Quaternion, Vector3};
pub use snapshot::{SimHost, Snapshot, UpdateInfo};
