//! Integrity bookkeeping components.

use anatomy_logic::integrity::{BoostTable, PenaltyCategory, PenaltyEntry};

/// Maximum integrity a body tolerates before boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityCapacity {
    pub max: i32,
}

/// Situational penalties attached to a body.
#[derive(Debug, Clone, Default)]
pub struct IntegritySurgeryContext {
    pub entries: Vec<PenaltyEntry>,
}

impl IntegritySurgeryContext {
    pub fn push(&mut self, entry: PenaltyEntry) {
        self.entries.push(entry);
    }

    pub fn has_category(&self, category: &PenaltyCategory) -> bool {
        self.entries.iter().any(|e| &e.category == category)
    }

    /// Remove every entry of a category. Returns how many went.
    pub fn clear_category(&mut self, category: &PenaltyCategory) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| &e.category != category);
        before - self.entries.len()
    }

    /// Remove every entry repaired by `operation`.
    pub fn clear_repaired_by(&mut self, operation: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.repair_operation.as_deref() != Some(operation));
        before - self.entries.len()
    }
}

/// Time-limited capacity boosts stored on an organ, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct ImmunityBoosts {
    pub table: BoostTable,
}
