//! Surgical layer ordering and per-part progress.
//!
//! Every body part is accessed through three ordered layers. A layer is
//! reachable only once every shallower layer is complete, and a layer is
//! complete once every *required* step configured for it has been performed
//! on that part. The rules here are pure; the ECS side stores one
//! [`PartProgress`] per operated part and asks [`LayerRequirements`] what is
//! allowed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{StepKind, SurgeryStep};

/// Surgery step identifier (catalog key).
pub type StepId = String;

/// Surgical access layer, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurgeryLayer {
    Skin,
    Tissue,
    Organ,
}

impl SurgeryLayer {
    pub const ALL: [SurgeryLayer; 3] = [SurgeryLayer::Skin, SurgeryLayer::Tissue, SurgeryLayer::Organ];

    /// Layers that must be complete before this one is reachable.
    pub fn shallower(self) -> impl Iterator<Item = SurgeryLayer> {
        Self::ALL.into_iter().filter(move |l| *l < self)
    }

    /// Layers below this one.
    pub fn deeper(self) -> impl Iterator<Item = SurgeryLayer> {
        Self::ALL.into_iter().filter(move |l| *l > self)
    }

    pub fn label(self) -> &'static str {
        match self {
            SurgeryLayer::Skin => "skin",
            SurgeryLayer::Tissue => "tissue",
            SurgeryLayer::Organ => "organ",
        }
    }
}

/// Progress state of one layer on one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerState {
    /// Nothing performed yet, or a shallower layer is still closed.
    NotReached,
    /// Some steps performed, required set not yet satisfied.
    InProgress,
    /// Every required step performed; the layer is open.
    Complete,
}

/// Performed step ids per layer for a single body part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartProgress {
    performed: BTreeMap<SurgeryLayer, BTreeSet<StepId>>,
}

impl PartProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_performed(&self, layer: SurgeryLayer, step: &str) -> bool {
        self.performed
            .get(&layer)
            .is_some_and(|steps| steps.contains(step))
    }

    /// Performed steps of a layer, in id order.
    pub fn performed(&self, layer: SurgeryLayer) -> impl Iterator<Item = &str> {
        self.performed
            .get(&layer)
            .into_iter()
            .flat_map(|steps| steps.iter().map(String::as_str))
    }

    pub fn has_progress(&self, layer: SurgeryLayer) -> bool {
        self.performed.get(&layer).is_some_and(|s| !s.is_empty())
    }

    /// Record a step. Returns false if it was already recorded.
    pub fn record(&mut self, layer: SurgeryLayer, step: impl Into<StepId>) -> bool {
        self.performed.entry(layer).or_default().insert(step.into())
    }

    /// Close a layer: forget its progress and everything below it.
    /// Returns how many step records were dropped.
    pub fn close(&mut self, layer: SurgeryLayer) -> usize {
        let mut dropped = 0;
        for l in std::iter::once(layer).chain(layer.deeper()) {
            if let Some(steps) = self.performed.remove(&l) {
                dropped += steps.len();
            }
        }
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.performed.values().all(BTreeSet::is_empty)
    }
}

/// Required step ids per layer, derived from the catalog's step table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerRequirements {
    required: BTreeMap<SurgeryLayer, BTreeSet<StepId>>,
}

impl LayerRequirements {
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a SurgeryStep>) -> Self {
        let mut required: BTreeMap<SurgeryLayer, BTreeSet<StepId>> = BTreeMap::new();
        for step in steps {
            if step.required {
                required.entry(step.layer).or_default().insert(step.id.clone());
            }
        }
        Self { required }
    }

    pub fn required(&self, layer: SurgeryLayer) -> impl Iterator<Item = &str> {
        self.required
            .get(&layer)
            .into_iter()
            .flat_map(|steps| steps.iter().map(String::as_str))
    }

    /// Whether a layer needs any step at all to be opened.
    pub fn has_requirements(&self, layer: SurgeryLayer) -> bool {
        self.required.get(&layer).is_some_and(|s| !s.is_empty())
    }

    fn satisfied(&self, progress: &PartProgress, layer: SurgeryLayer) -> bool {
        self.required(layer).all(|step| progress.has_performed(layer, step))
    }

    pub fn is_reachable(&self, progress: &PartProgress, layer: SurgeryLayer) -> bool {
        layer.shallower().all(|l| self.satisfied(progress, l))
    }

    pub fn state(&self, progress: &PartProgress, layer: SurgeryLayer) -> LayerState {
        if !self.is_reachable(progress, layer) {
            LayerState::NotReached
        } else if self.satisfied(progress, layer) {
            LayerState::Complete
        } else if progress.has_progress(layer) {
            LayerState::InProgress
        } else {
            LayerState::NotReached
        }
    }

    pub fn is_open(&self, progress: &PartProgress, layer: SurgeryLayer) -> bool {
        self.state(progress, layer) == LayerState::Complete
    }

    /// Layers that are open and needed steps to open; these are the ones
    /// that leave a wound behind.
    pub fn open_wounds(&self, progress: &PartProgress) -> Vec<SurgeryLayer> {
        SurgeryLayer::ALL
            .into_iter()
            .filter(|l| self.has_requirements(*l) && self.is_open(progress, *l))
            .collect()
    }

    /// Layer-ordering gate for a step. Organ presence and tool checks live
    /// with the entity store; this only answers "may this step happen now
    /// given what has been performed on the part".
    pub fn check_step(&self, progress: &PartProgress, step: &SurgeryStep) -> Result<(), String> {
        if !self.is_reachable(progress, step.layer) {
            let blocking = step
                .layer
                .shallower()
                .find(|l| !self.satisfied(progress, *l))
                .unwrap_or(step.layer);
            return Err(format!(
                "the {} layer must be opened before {}",
                blocking.label(),
                step.name
            ));
        }

        for needed in &step.requires {
            if !progress.has_performed(step.layer, needed) {
                return Err(format!("{} requires {} first", step.name, needed));
            }
        }

        match step.kind {
            StepKind::Open => {
                if progress.has_performed(step.layer, &step.id) {
                    return Err(format!("{} has already been done", step.name));
                }
            }
            StepKind::Close => {
                if !self.is_open(progress, step.layer) || !self.has_requirements(step.layer) {
                    return Err(format!("the {} layer is not open", step.layer.label()));
                }
                if step
                    .layer
                    .deeper()
                    .any(|l| self.has_requirements(l) && self.required(l).any(|s| progress.has_performed(l, s)))
                {
                    return Err("close the deeper layers first".to_string());
                }
            }
            StepKind::RemoveOrgan | StepKind::InsertOrgan | StepKind::Repair => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, layer: SurgeryLayer, kind: StepKind, required: bool, requires: &[&str]) -> SurgeryStep {
        SurgeryStep {
            id: id.to_string(),
            name: id.to_string(),
            layer,
            kind,
            required,
            requires: requires.iter().map(|s| s.to_string()).collect(),
            operation: "op".to_string(),
            duration: 1.0,
        }
    }

    fn table() -> Vec<SurgeryStep> {
        vec![
            step("incision", SurgeryLayer::Skin, StepKind::Open, true, &[]),
            step("retract-skin", SurgeryLayer::Skin, StepKind::Open, true, &["incision"]),
            step("close-skin", SurgeryLayer::Skin, StepKind::Close, false, &[]),
            step("clamp", SurgeryLayer::Tissue, StepKind::Open, true, &[]),
            step("close-tissue", SurgeryLayer::Tissue, StepKind::Close, false, &[]),
            step("remove", SurgeryLayer::Organ, StepKind::RemoveOrgan, false, &[]),
        ]
    }

    #[test]
    fn test_layer_order() {
        assert!(SurgeryLayer::Skin < SurgeryLayer::Tissue);
        assert!(SurgeryLayer::Tissue < SurgeryLayer::Organ);
        assert_eq!(SurgeryLayer::Organ.shallower().count(), 2);
        assert_eq!(SurgeryLayer::Skin.deeper().count(), 2);
    }

    #[test]
    fn test_organ_step_rejected_until_skin_done() {
        let steps = table();
        let req = LayerRequirements::from_steps(&steps);
        let mut progress = PartProgress::new();

        let remove = &steps[5];
        assert!(req.check_step(&progress, remove).is_err());

        progress.record(SurgeryLayer::Skin, "incision");
        assert!(req.check_step(&progress, remove).is_err());

        progress.record(SurgeryLayer::Skin, "retract-skin");
        // Tissue still closed
        let err = req.check_step(&progress, remove).unwrap_err();
        assert!(err.contains("tissue"));

        progress.record(SurgeryLayer::Tissue, "clamp");
        assert!(req.check_step(&progress, remove).is_ok());
    }

    #[test]
    fn test_states() {
        let steps = table();
        let req = LayerRequirements::from_steps(&steps);
        let mut progress = PartProgress::new();

        assert_eq!(req.state(&progress, SurgeryLayer::Skin), LayerState::NotReached);
        progress.record(SurgeryLayer::Skin, "incision");
        assert_eq!(req.state(&progress, SurgeryLayer::Skin), LayerState::InProgress);
        progress.record(SurgeryLayer::Skin, "retract-skin");
        assert_eq!(req.state(&progress, SurgeryLayer::Skin), LayerState::Complete);
        assert_eq!(req.state(&progress, SurgeryLayer::Tissue), LayerState::NotReached);
        assert!(req.is_reachable(&progress, SurgeryLayer::Tissue));
        assert!(!req.is_reachable(&progress, SurgeryLayer::Organ));
        assert_eq!(req.open_wounds(&progress), vec![SurgeryLayer::Skin]);
    }

    #[test]
    fn test_requires_within_layer() {
        let steps = table();
        let req = LayerRequirements::from_steps(&steps);
        let progress = PartProgress::new();
        let err = req.check_step(&progress, &steps[1]).unwrap_err();
        assert!(err.contains("incision"));
    }

    #[test]
    fn test_open_step_not_repeatable() {
        let steps = table();
        let req = LayerRequirements::from_steps(&steps);
        let mut progress = PartProgress::new();
        progress.record(SurgeryLayer::Skin, "incision");
        assert!(req.check_step(&progress, &steps[0]).is_err());
    }

    #[test]
    fn test_close_requires_deeper_closed() {
        let steps = table();
        let req = LayerRequirements::from_steps(&steps);
        let mut progress = PartProgress::new();
        let close_skin = &steps[2];

        assert!(req.check_step(&progress, close_skin).is_err());

        progress.record(SurgeryLayer::Skin, "incision");
        progress.record(SurgeryLayer::Skin, "retract-skin");
        assert!(req.check_step(&progress, close_skin).is_ok());

        progress.record(SurgeryLayer::Tissue, "clamp");
        assert!(req.check_step(&progress, close_skin).is_err());

        // Organ-layer records never block closing
        progress.record(SurgeryLayer::Organ, "remove");
        assert!(req.check_step(&progress, &steps[4]).is_ok());
        assert_eq!(progress.close(SurgeryLayer::Tissue), 2);
        assert!(req.check_step(&progress, close_skin).is_ok());
    }
}
