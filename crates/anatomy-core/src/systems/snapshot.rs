//! Surgery display snapshot - what an operating table UI would show

use anatomy_logic::catalog::AnatomyCatalog;
use anatomy_logic::integrity::{IntegrityReport, PenaltyBreakdown};
use anatomy_logic::layers::{LayerState, StepId, SurgeryLayer};
use hecs::{Entity, World};
use serde::Serialize;

use crate::components::{Body, BodyPart, Organ};
use crate::systems::integrity::compute_total_penalty;
use crate::systems::surgery::{available_steps, part_progress};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSnapshot {
    pub layer: SurgeryLayer,
    pub state: LayerState,
    pub open: bool,
    pub performed: Vec<StepId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganSnapshot {
    pub id: u64,
    pub category: String,
    pub prototype: String,
    pub contents: Vec<OrganSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartSnapshot {
    pub id: u64,
    pub category: String,
    pub layers: Vec<LayerSnapshot>,
    pub organs: Vec<OrganSnapshot>,
    pub empty_slots: Vec<String>,
    /// Only filled for the selected part.
    pub available_steps: Vec<StepId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurgerySnapshot {
    pub body: u64,
    pub species: String,
    pub selected: Option<u64>,
    pub parts: Vec<PartSnapshot>,
    pub penalties: PenaltyBreakdown,
    /// Filled in by the engine, which owns the cost providers.
    pub integrity: Option<IntegrityReport>,
}

impl SurgerySnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn part(&self, id: Entity) -> Option<&PartSnapshot> {
        let id = id.to_bits().get();
        self.parts.iter().find(|p| p.id == id)
    }
}

fn organ_snapshot(world: &World, organ: Entity) -> Option<OrganSnapshot> {
    let o = world.get::<&Organ>(organ).ok()?;
    Some(OrganSnapshot {
        id: organ.to_bits().get(),
        category: o.category.clone(),
        prototype: o.prototype.clone(),
        contents: o
            .contents
            .iter()
            .filter_map(|c| organ_snapshot(world, *c))
            .collect(),
    })
}

/// Build the display state of a body. `selected` picks the part whose
/// available steps are listed; it never affects recorded progress.
pub fn surgery_snapshot(
    world: &World,
    catalog: &AnatomyCatalog,
    body: Entity,
    selected: Option<Entity>,
) -> Option<SurgerySnapshot> {
    let (species, parts) = {
        let b = world.get::<&Body>(body).ok()?;
        (b.species.clone(), b.parts.clone())
    };
    let requirements = catalog.requirements();

    let parts = parts
        .into_iter()
        .filter_map(|part| {
            let p = world.get::<&BodyPart>(part).ok()?;
            let progress = part_progress(world, body, part);

            let layers = SurgeryLayer::ALL
                .into_iter()
                .map(|layer| LayerSnapshot {
                    layer,
                    state: requirements.state(&progress, layer),
                    open: requirements.is_open(&progress, layer),
                    performed: progress.performed(layer).map(str::to_string).collect(),
                })
                .collect();

            let organs: Vec<OrganSnapshot> = p
                .organs
                .iter()
                .filter_map(|o| organ_snapshot(world, *o))
                .collect();
            let empty_slots = p
                .slots
                .iter()
                .filter(|slot| !organs.iter().any(|o| &o.category == *slot))
                .cloned()
                .collect();

            let available_steps = if selected == Some(part) {
                available_steps(world, catalog, body, part)
            } else {
                Vec::new()
            };

            Some(PartSnapshot {
                id: part.to_bits().get(),
                category: p.category.clone(),
                layers,
                organs,
                empty_slots,
                available_steps,
            })
        })
        .collect();

    Some(SurgerySnapshot {
        body: body.to_bits().get(),
        species,
        selected: selected.map(|s| s.to_bits().get()),
        parts,
        penalties: compute_total_penalty(world, body),
        integrity: None,
    })
}
