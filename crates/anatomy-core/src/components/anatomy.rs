//! Containment components: bodies, parts, organs and tools.
//!
//! Ownership runs downward through the `parts`/`organs`/`contents` lists.
//! The `body`/`parent` fields are non-owning back-references maintained
//! only by the graph systems; never write them directly.

use std::collections::BTreeSet;

use hecs::Entity;

/// Root anatomical entity.
#[derive(Debug, Clone)]
pub struct Body {
    pub species: String,
    /// Attached parts in insertion order.
    pub parts: Vec<Entity>,
    pub max_parts: usize,
}

impl Body {
    pub fn new(species: impl Into<String>, max_parts: usize) -> Self {
        Self {
            species: species.into(),
            parts: Vec::new(),
            max_parts,
        }
    }

    pub fn is_full(&self) -> bool {
        self.parts.len() >= self.max_parts
    }
}

/// Torso, head or limb.
#[derive(Debug, Clone)]
pub struct BodyPart {
    pub category: String,
    /// Set exactly while listed in that body's `parts`.
    pub body: Option<Entity>,
    /// Directly contained organs in insertion order.
    pub organs: Vec<Entity>,
    /// Organ categories this part has a slot for.
    pub slots: Vec<String>,
    pub capacity: usize,
}

impl BodyPart {
    pub fn new(category: impl Into<String>, slots: Vec<String>, capacity: usize) -> Self {
        Self {
            category: category.into(),
            body: None,
            organs: Vec::new(),
            slots,
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.organs.len() >= self.capacity
    }

    pub fn has_slot(&self, category: &str) -> bool {
        self.slots.iter().any(|s| s == category)
    }
}

/// Leaf anatomical unit; may host nested organs.
#[derive(Debug, Clone)]
pub struct Organ {
    pub category: String,
    /// Prototype id this organ was spawned from.
    pub prototype: String,
    /// Containing part or host organ.
    pub parent: Option<Entity>,
    pub contents: Vec<Entity>,
    pub capacity: usize,
    pub allow_duplicates: bool,
}

impl Organ {
    pub fn new(category: impl Into<String>, prototype: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            prototype: prototype.into(),
            parent: None,
            contents: Vec::new(),
            capacity: 0,
            allow_duplicates: false,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn allowing_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }
}

/// Intrinsic integrity cost answered for this organ by the default cost provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityCost(pub i32);

/// Flat penalty contributed by merely having this part/organ installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityPenalty(pub i32);

/// Something a surgeon can hold.
#[derive(Debug, Clone, Default)]
pub struct Tool {
    pub qualities: BTreeSet<String>,
    pub sterile: bool,
}

impl Tool {
    pub fn new<I, S>(qualities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            qualities: qualities.into_iter().map(Into::into).collect(),
            sterile: true,
        }
    }

    pub fn unsterile(mut self) -> Self {
        self.sterile = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_slots() {
        let part = BodyPart::new("arm-left", vec!["hand-left".to_string()], 1);
        assert!(part.has_slot("hand-left"));
        assert!(!part.has_slot("hand-right"));
        assert!(!part.is_full());
    }

    #[test]
    fn test_tool_builder() {
        let tool = Tool::new(["slicing", "sharp"]).unsterile();
        assert!(tool.qualities.contains("slicing"));
        assert!(!tool.sterile);
    }
}
