//! Integrity arithmetic.
//!
//! Integrity is a body-wide budget: installed organs *use* it, penalties add
//! to that usage, and capacity (plus any active boosts) bounds it. This
//! module holds the value types shared by the aggregators: penalty entries
//! with their display tree, per-source boost tables, and the final report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag used to bulk-clear contextual penalties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PenaltyCategory {
    /// Wounds left by open surgical layers on one part (part entity bits).
    OpenLayers { part: u64 },
    /// Surgery performed with non-sterile tools.
    Unsanitary,
    /// Damage from an improvised surgical method.
    ImprovisedTool,
    /// Flat penalty of an installed part or organ.
    Installed,
    Other(String),
}

/// One line of the penalty breakdown, with optional nested detail lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyEntry {
    pub reason: String,
    pub category: PenaltyCategory,
    pub amount: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PenaltyEntry>,
    /// Operation whose completion removes this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_operation: Option<String>,
}

impl PenaltyEntry {
    pub fn new(reason: impl Into<String>, category: PenaltyCategory, amount: i32) -> Self {
        Self {
            reason: reason.into(),
            category,
            amount,
            children: Vec::new(),
            repair_operation: None,
        }
    }

    /// Group entry whose amount is the sum of its children.
    pub fn group(reason: impl Into<String>, category: PenaltyCategory, children: Vec<PenaltyEntry>) -> Self {
        let amount = children.iter().map(|c| c.amount).sum();
        Self {
            reason: reason.into(),
            category,
            amount,
            children,
            repair_operation: None,
        }
    }

    pub fn with_repair(mut self, operation: impl Into<String>) -> Self {
        self.repair_operation = Some(operation.into());
        self
    }
}

/// Result of penalty aggregation: clamped total plus the display tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    pub total: i32,
    pub entries: Vec<PenaltyEntry>,
}

impl PenaltyBreakdown {
    /// Only top-level amounts count; children are display detail.
    /// The total never drops below zero.
    pub fn from_entries(entries: Vec<PenaltyEntry>) -> Self {
        let total = entries.iter().map(|e| e.amount).sum::<i32>().max(0);
        Self { total, entries }
    }
}

/// A time-limited capacity increase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImmunityBoost {
    pub amount: i32,
    /// Absolute sim time (seconds) at which the boost stops counting.
    pub expires_at: f64,
}

impl ImmunityBoost {
    pub fn is_active(&self, now: f64) -> bool {
        now < self.expires_at
    }
}

/// Boosts keyed by source (usually a reagent id). Re-applying a source
/// replaces its entry; distinct sources sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostTable {
    boosts: BTreeMap<String, ImmunityBoost>,
}

impl BoostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, source: impl Into<String>, amount: i32, expires_at: f64) {
        self.boosts
            .insert(source.into(), ImmunityBoost { amount, expires_at });
    }

    pub fn remove(&mut self, source: &str) -> Option<ImmunityBoost> {
        self.boosts.remove(source)
    }

    pub fn get(&self, source: &str) -> Option<&ImmunityBoost> {
        self.boosts.get(source)
    }

    pub fn active_total(&self, now: f64) -> i32 {
        self.boosts
            .values()
            .filter(|b| b.is_active(now))
            .map(|b| b.amount)
            .sum()
    }

    pub fn active_count(&self, now: f64) -> usize {
        self.boosts.values().filter(|b| b.is_active(now)).count()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn prune(&mut self, now: f64) -> usize {
        let before = self.boosts.len();
        self.boosts.retain(|_, b| b.is_active(now));
        before - self.boosts.len()
    }
}

/// The three integrity quantities a rejection evaluator compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub usage: i32,
    pub penalty: i32,
    /// Max integrity plus active boosts.
    pub capacity: i32,
}

impl IntegrityReport {
    pub fn load(&self) -> i32 {
        self.usage + self.penalty
    }

    pub fn is_rejecting(&self) -> bool {
        self.load() > self.capacity
    }

    /// How far over capacity the body is, zero when within budget.
    pub fn excess(&self) -> i32 {
        (self.load() - self.capacity).max(0)
    }
}
