//! Static content catalog: organ, species, step and operation prototypes.
//!
//! The catalog is read-only configuration. The built-in content lives in
//! `data/catalog.json`; other content sets load through
//! [`AnatomyCatalog::from_json`]. Loading checks that every cross reference
//! (step → operation, species → organ, repair → operation) resolves, so the
//! engine can treat a missing lookup at runtime as "not configured" rather
//! than as corruption.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layers::{LayerRequirements, StepId, SurgeryLayer};
use crate::tools::SurgeryOperation;

const BUILTIN_CATALOG_JSON: &str = include_str!("../data/catalog.json");

/// Errors produced while loading or checking a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("`{owner}` references unknown organ prototype `{organ}`")]
    UnknownOrgan { owner: String, organ: String },
    #[error("`{owner}` references unknown operation `{operation}`")]
    UnknownOperation { owner: String, operation: String },
    #[error("step `{step}` requires unknown step `{requires}`")]
    UnknownStep { step: String, requires: String },
    #[error("step `{step}` is misconfigured: {reason}")]
    InvalidStep { step: String, reason: String },
    #[error("species `{species}` is misconfigured: {reason}")]
    InvalidSpecies { species: String, reason: String },
}

/// What completing a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Advances its layer towards open.
    Open,
    /// Closes its layer (and forgets everything below it).
    Close,
    RemoveOrgan,
    InsertOrgan,
    /// Clears penalties linked to its operation.
    Repair,
}

impl StepKind {
    pub fn targets_organ(self) -> bool {
        matches!(self, StepKind::RemoveOrgan | StepKind::InsertOrgan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeryStep {
    pub id: StepId,
    pub name: String,
    pub layer: SurgeryLayer,
    pub kind: StepKind,
    /// Counts towards opening its layer.
    #[serde(default)]
    pub required: bool,
    /// Steps of the same layer that must already be performed.
    #[serde(default)]
    pub requires: Vec<StepId>,
    pub operation: String,
    /// Base duration in seconds.
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganPrototype {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub integrity_cost: i32,
    #[serde(default)]
    pub integrity_penalty: i32,
    #[serde(default)]
    pub allow_duplicates: bool,
    /// Nested organ prototypes spawned inside this one.
    #[serde(default)]
    pub contents: Vec<String>,
    #[serde(default)]
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPrototype {
    pub category: String,
    /// Organ categories this part has a slot for.
    pub slots: Vec<String>,
    pub capacity: usize,
    #[serde(default)]
    pub integrity_penalty: i32,
    /// Organ prototypes installed at spawn.
    #[serde(default)]
    pub organs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesPrototype {
    pub id: String,
    pub max_integrity: i32,
    pub max_parts: usize,
    pub parts: Vec<PartPrototype>,
    #[serde(default)]
    pub regenerates: bool,
    /// Organ categories that grow back after removal.
    #[serde(default)]
    pub regenerable: BTreeSet<String>,
    /// Organ prototype grown for each category.
    #[serde(default)]
    pub regrowth: BTreeMap<String, String>,
}

impl SpeciesPrototype {
    pub fn regenerates_category(&self, category: &str) -> bool {
        self.regenerates && self.regenerable.contains(category)
    }
}

/// Balance numbers. Integrity values are integers, times are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityTuning {
    /// Penalty per open layer that leaves a wound.
    pub open_layer_penalty: i32,
    pub unsanitary_penalty: i32,
    pub regeneration_delay: f64,
}

impl Default for IntegrityTuning {
    fn default() -> Self {
        Self {
            open_layer_penalty: 1,
            unsanitary_penalty: 2,
            regeneration_delay: 300.0,
        }
    }
}

/// On-disk layout; ids are unique within each list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    organs: Vec<OrganPrototype>,
    #[serde(default)]
    species: Vec<SpeciesPrototype>,
    #[serde(default)]
    steps: Vec<SurgeryStep>,
    #[serde(default)]
    operations: Vec<SurgeryOperation>,
    #[serde(default)]
    tuning: IntegrityTuning,
}

/// Indexed, validated catalog.
#[derive(Debug, Clone)]
pub struct AnatomyCatalog {
    organs: BTreeMap<String, OrganPrototype>,
    species: BTreeMap<String, SpeciesPrototype>,
    steps: BTreeMap<StepId, SurgeryStep>,
    step_order: Vec<StepId>,
    operations: BTreeMap<String, SurgeryOperation>,
    requirements: LayerRequirements,
    pub tuning: IntegrityTuning,
}

fn index<T>(
    kind: &'static str,
    items: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<BTreeMap<String, T>, CatalogError> {
    let mut map = BTreeMap::new();
    for item in items {
        let key = id(&item).to_string();
        if map.contains_key(&key) {
            return Err(CatalogError::DuplicateId { kind, id: key });
        }
        map.insert(key, item);
    }
    Ok(map)
}

impl AnatomyCatalog {
    /// The content shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let step_order = file.steps.iter().map(|s| s.id.clone()).collect();
        let requirements = LayerRequirements::from_steps(&file.steps);
        let catalog = Self {
            organs: index("organ", file.organs, |o| o.id.as_str())?,
            species: index("species", file.species, |s| s.id.as_str())?,
            steps: index("step", file.steps, |s| s.id.as_str())?,
            step_order,
            operations: index("operation", file.operations, |o| o.id.as_str())?,
            requirements,
            tuning: file.tuning,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every cross reference.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for step in self.steps.values() {
            if !self.operations.contains_key(&step.operation) {
                return Err(CatalogError::UnknownOperation {
                    owner: step.id.clone(),
                    operation: step.operation.clone(),
                });
            }
            for needed in &step.requires {
                let Some(other) = self.steps.get(needed) else {
                    return Err(CatalogError::UnknownStep {
                        step: step.id.clone(),
                        requires: needed.clone(),
                    });
                };
                if other.layer != step.layer {
                    return Err(CatalogError::InvalidStep {
                        step: step.id.clone(),
                        reason: format!("requirement `{}` is on another layer", needed),
                    });
                }
            }
            if step.kind.targets_organ() && step.layer != SurgeryLayer::Organ {
                return Err(CatalogError::InvalidStep {
                    step: step.id.clone(),
                    reason: "organ steps belong to the organ layer".to_string(),
                });
            }
            if step.required && step.kind != StepKind::Open {
                return Err(CatalogError::InvalidStep {
                    step: step.id.clone(),
                    reason: "only open steps can be required".to_string(),
                });
            }
            if step.duration < 0.0 {
                return Err(CatalogError::InvalidStep {
                    step: step.id.clone(),
                    reason: "negative duration".to_string(),
                });
            }
        }

        for op in self.operations.values() {
            if let Some(repair) = op.improvised.as_ref().and_then(|m| m.repair_operation.as_ref()) {
                if !self.operations.contains_key(repair) {
                    return Err(CatalogError::UnknownOperation {
                        owner: op.id.clone(),
                        operation: repair.clone(),
                    });
                }
            }
        }

        for organ in self.organs.values() {
            for nested in &organ.contents {
                if !self.organs.contains_key(nested) {
                    return Err(CatalogError::UnknownOrgan {
                        owner: organ.id.clone(),
                        organ: nested.clone(),
                    });
                }
            }
        }

        for species in self.species.values() {
            if species.parts.len() > species.max_parts {
                return Err(CatalogError::InvalidSpecies {
                    species: species.id.clone(),
                    reason: "more parts than max_parts".to_string(),
                });
            }
            for part in &species.parts {
                for organ in &part.organs {
                    if !self.organs.contains_key(organ) {
                        return Err(CatalogError::UnknownOrgan {
                            owner: format!("{}/{}", species.id, part.category),
                            organ: organ.clone(),
                        });
                    }
                }
            }
            for (category, organ) in &species.regrowth {
                let Some(proto) = self.organs.get(organ) else {
                    return Err(CatalogError::UnknownOrgan {
                        owner: species.id.clone(),
                        organ: organ.clone(),
                    });
                };
                if &proto.category != category {
                    return Err(CatalogError::InvalidSpecies {
                        species: species.id.clone(),
                        reason: format!("regrowth for `{}` grows a `{}`", category, proto.category),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn organ(&self, id: &str) -> Option<&OrganPrototype> {
        self.organs.get(id)
    }

    pub fn species(&self, id: &str) -> Option<&SpeciesPrototype> {
        self.species.get(id)
    }

    pub fn step(&self, id: &str) -> Option<&SurgeryStep> {
        self.steps.get(id)
    }

    pub fn operation(&self, id: &str) -> Option<&SurgeryOperation> {
        self.operations.get(id)
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = &SurgeryStep> {
        self.step_order.iter().filter_map(|id| self.steps.get(id))
    }

    pub fn requirements(&self) -> &LayerRequirements {
        &self.requirements
    }

    /// Organ prototype that grows back for `category` on `species`.
    pub fn regrowth_prototype(&self, species: &str, category: &str) -> Option<&OrganPrototype> {
        self.species(species)?
            .regrowth
            .get(category)
            .and_then(|id| self.organ(id))
    }
}
