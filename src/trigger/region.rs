// src/trigger/region.rs

use std::collections::HashSet;

use tracing::{debug, info};

use crate::sim::{AxisAlignedBox, Snapshot, Vector3};

/// Fires each time an entity enters an axis-aligned box.
#[derive(Debug, Clone)]
pub struct RegionCondition {
    region: AxisAlignedBox,
    contained: HashSet<String>,
}

impl RegionCondition {
    /// Box centred on `center`; `size` holds full edge lengths.
    pub fn new(center: Vector3, size: Vector3) -> Self {
        Self {
            region: AxisAlignedBox::from_center_size(center, size),
            contained: HashSet::new(),
        }
    }

    pub fn region(&self) -> &AxisAlignedBox {
        &self.region
    }

    /// True if `name` is inside the region as of the last update.
    pub fn contains(&self, name: &str) -> bool {
        self.contained.contains(name)
    }

    pub fn contained(&self) -> impl Iterator<Item = &str> {
        self.contained.iter().map(String::as_str)
    }

    /// Update membership; returns how many entities entered this step.
    pub(crate) fn poll(&mut self, trigger: &str, world: &dyn Snapshot) -> u32 {
        let names = world.entity_names();
        let mut entered = 0;

        for name in &names {
            let Some(pose) = world.world_pose(name) else {
                continue;
            };

            if self.region.contains(pose.pos) {
                if self.contained.insert(name.clone()) {
                    info!(trigger = %trigger, entity = %name, pos = %pose.pos, "entity entered region");
                    entered += 1;
                }
            } else if self.contained.remove(name) {
                debug!(trigger = %trigger, entity = %name, "entity left region");
            }
        }

        // Entities that vanished from the world are no longer inside.
        self.contained.retain(|n| names.contains(n));
        entered
    }

    pub(crate) fn reset(&mut self) {
        self.contained.clear();
    }
}
