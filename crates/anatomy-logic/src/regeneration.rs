//! Pending regrowth bookkeeping.
//!
//! A regenerating body keeps one entry per lost organ category. Entries
//! become due after a fixed delay. A due entry gets exactly one restoration
//! attempt: success removes it, failure marks it abandoned and it stays
//! parked until another removal of the same category schedules it afresh.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRegrowth {
    pub category: String,
    /// Sim time (seconds) the organ was lost.
    pub started_at: f64,
    pub abandoned: bool,
}

impl PendingRegrowth {
    /// Due once strictly more than `delay` seconds have passed.
    pub fn is_due(&self, now: f64, delay: f64) -> bool {
        !self.abandoned && now - self.started_at > delay
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegrowthQueue {
    entries: Vec<PendingRegrowth>,
}

impl RegrowthQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a category, replacing any existing (possibly abandoned) entry.
    pub fn schedule(&mut self, category: impl Into<String>, now: f64) {
        let category = category.into();
        self.entries.retain(|e| e.category != category);
        self.entries.push(PendingRegrowth {
            category,
            started_at: now,
            abandoned: false,
        });
    }

    /// Categories due for an attempt, in scheduling order.
    pub fn due(&self, now: f64, delay: f64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_due(now, delay))
            .map(|e| e.category.clone())
            .collect()
    }

    /// Successful restoration: drop the entry.
    pub fn complete(&mut self, category: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.category != category);
        before != self.entries.len()
    }

    /// Failed restoration: keep the entry but stop attempting it.
    pub fn abandon(&mut self, category: &str) {
        for entry in self.entries.iter_mut().filter(|e| e.category == category) {
            entry.abandoned = true;
        }
    }

    pub fn get(&self, category: &str) -> Option<&PendingRegrowth> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn entries(&self) -> &[PendingRegrowth] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
