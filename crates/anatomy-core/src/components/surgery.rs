//! Surgery and regeneration state stored on bodies.

use std::collections::HashMap;

use anatomy_logic::layers::PartProgress;
use anatomy_logic::regeneration::RegrowthQueue;
use hecs::Entity;

/// Performed steps per operated part of one body.
#[derive(Debug, Clone, Default)]
pub struct SurgeryProgress {
    pub parts: HashMap<Entity, PartProgress>,
}

impl SurgeryProgress {
    /// Progress of a part; untouched parts have none.
    pub fn part(&self, part: Entity) -> PartProgress {
        self.parts.get(&part).cloned().unwrap_or_default()
    }
}

/// Pending regrowth for a body of a regenerating species.
/// Removed once nothing is pending.
#[derive(Debug, Clone, Default)]
pub struct RegenerationTracker {
    pub queue: RegrowthQueue,
}
