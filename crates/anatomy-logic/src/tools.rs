//! Surgery operations and tool method selection.
//!
//! An operation lists the capability sets that qualify as the proper
//! (primary) way of doing it, and optionally an improvised method that is
//! slower and may leave an integrity penalty behind. A tool qualifies for a
//! capability set when it has every quality in that set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A set of tool qualities that must all be present.
pub type CapabilitySet = BTreeSet<String>;

/// Non-primary way of performing an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovisedMethod {
    pub qualities: Vec<CapabilitySet>,
    /// Multiplier on step duration (>= 1.0 means slower).
    #[serde(default = "default_speed_modifier")]
    pub speed_modifier: f32,
    /// Integrity penalty left on the body when this method is used.
    #[serde(default)]
    pub penalty: i32,
    /// Operation that removes the penalty again.
    #[serde(default)]
    pub repair_operation: Option<String>,
}

fn default_speed_modifier() -> f32 {
    1.0
}

/// Configuration for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeryOperation {
    pub id: String,
    /// Capability sets that count as the proper tool. Empty means no tool needed.
    #[serde(default)]
    pub primary: Vec<CapabilitySet>,
    #[serde(default)]
    pub improvised: Option<ImprovisedMethod>,
}

/// Which way an operation is being performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolMethod {
    Primary,
    Improvised {
        speed_modifier: f32,
        penalty: i32,
        repair_operation: Option<String>,
    },
}

impl ToolMethod {
    pub fn speed_modifier(&self) -> f32 {
        match self {
            ToolMethod::Primary => 1.0,
            ToolMethod::Improvised { speed_modifier, .. } => *speed_modifier,
        }
    }

    pub fn is_improvised(&self) -> bool {
        matches!(self, ToolMethod::Improvised { .. })
    }
}

fn qualifies(sets: &[CapabilitySet], qualities: &BTreeSet<String>) -> bool {
    sets.iter().any(|set| set.is_subset(qualities))
}

impl SurgeryOperation {
    pub fn needs_tool(&self) -> bool {
        !self.primary.is_empty()
    }

    /// Pick the method a tool with `qualities` would use. Primary wins when
    /// both match. `None` means the tool cannot perform this operation.
    pub fn select_method(&self, qualities: &BTreeSet<String>) -> Option<ToolMethod> {
        if !self.needs_tool() || qualifies(&self.primary, qualities) {
            return Some(ToolMethod::Primary);
        }
        self.improvised
            .as_ref()
            .filter(|m| qualifies(&m.qualities, qualities))
            .map(|m| ToolMethod::Improvised {
                speed_modifier: m.speed_modifier,
                penalty: m.penalty,
                repair_operation: m.repair_operation.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> CapabilitySet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn incise() -> SurgeryOperation {
        SurgeryOperation {
            id: "incise".to_string(),
            primary: vec![set(&["slicing"])],
            improvised: Some(ImprovisedMethod {
                qualities: vec![set(&["sharp"])],
                speed_modifier: 2.0,
                penalty: 2,
                repair_operation: Some("mend".to_string()),
            }),
        }
    }

    #[test]
    fn test_primary_preferred() {
        let op = incise();
        let method = op.select_method(&set(&["slicing", "sharp"]));
        assert_eq!(method, Some(ToolMethod::Primary));
    }

    #[test]
    fn test_improvised_fallback() {
        let op = incise();
        let method = op.select_method(&set(&["sharp"])).unwrap();
        assert!(method.is_improvised());
        assert_eq!(method.speed_modifier(), 2.0);
        match method {
            ToolMethod::Improvised { penalty, repair_operation, .. } => {
                assert_eq!(penalty, 2);
                assert_eq!(repair_operation.as_deref(), Some("mend"));
            }
            ToolMethod::Primary => panic!("expected improvised"),
        }
    }

    #[test]
    fn test_wrong_tool() {
        let op = incise();
        assert!(op.select_method(&set(&["heating"])).is_none());
        assert!(op.select_method(&BTreeSet::new()).is_none());
    }

    #[test]
    fn test_multi_quality_set() {
        let op = SurgeryOperation {
            id: "x".to_string(),
            primary: vec![set(&["clamping", "grasping"])],
            improvised: None,
        };
        assert!(op.select_method(&set(&["clamping"])).is_none());
        assert!(op.select_method(&set(&["clamping", "grasping", "sharp"])).is_some());
    }
}
