//! Integration tests for catalog loading and the rules driven by it.
//!
//! Exercises: JSON → AnatomyCatalog → LayerRequirements / tool methods
//!
//! All tests are pure logic, no ECS.

use std::collections::BTreeSet;

use anatomy_logic::catalog::{AnatomyCatalog, CatalogError, StepKind};
use anatomy_logic::constants::{operations, organ_categories, qualities, species, steps};
use anatomy_logic::layers::{LayerState, PartProgress, SurgeryLayer};
use anatomy_logic::tools::ToolMethod;

// ── Helpers ────────────────────────────────────────────────────────────

fn tool(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Smallest catalog that loads: one operation, one open step.
fn minimal(extra_steps: &str, extra_organs: &str, species_json: &str) -> String {
    format!(
        r#"{{
            "operations": [ {{ "id": "cut", "primary": [["slicing"]] }} ],
            "steps": [
                {{ "id": "open", "name": "open", "layer": "Skin", "kind": "open",
                   "required": true, "operation": "cut", "duration": 1.0 }}
                {extra_steps}
            ],
            "organs": [ {{ "id": "heart", "category": "heart" }} {extra_organs} ],
            "species": [ {species_json} ]
        }}"#
    )
}

// ── Built-in content ───────────────────────────────────────────────────

#[test]
fn builtin_round_trip_through_steps() {
    let catalog = AnatomyCatalog::builtin().unwrap();
    let requirements = catalog.requirements();
    let mut progress = PartProgress::new();

    for id in [steps::INCISION, steps::RETRACT_SKIN, steps::CLAMP_VESSELS, steps::RETRACT_TISSUE] {
        let step = catalog.step(id).unwrap();
        requirements.check_step(&progress, step).unwrap();
        progress.record(step.layer, step.id.clone());
    }

    for layer in SurgeryLayer::ALL {
        assert_eq!(requirements.state(&progress, layer), LayerState::Complete, "{layer:?}");
    }
    assert_eq!(
        requirements.open_wounds(&progress),
        vec![SurgeryLayer::Skin, SurgeryLayer::Tissue]
    );
}

#[test]
fn builtin_step_order_is_declaration_order() {
    let catalog = AnatomyCatalog::builtin().unwrap();
    let ids: Vec<&str> = catalog.steps().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.first(), Some(&steps::INCISION));
    assert_eq!(ids.last(), Some(&steps::CLOSE_SKIN));
    assert!(catalog.steps().any(|s| s.kind == StepKind::Repair));
}

#[test]
fn builtin_tool_methods() {
    let catalog = AnatomyCatalog::builtin().unwrap();
    let incise = catalog.operation(operations::INCISE).unwrap();

    assert_eq!(
        incise.select_method(&tool(&[qualities::SLICING, qualities::SHARP])),
        Some(ToolMethod::Primary)
    );
    let improvised = incise.select_method(&tool(&[qualities::SHARP])).unwrap();
    assert!(improvised.is_improvised());
    assert_eq!(improvised.speed_modifier(), 2.0);
    assert_eq!(incise.select_method(&tool(&[qualities::HEATING])), None);

    let seal = catalog.operation(operations::SEAL).unwrap();
    assert_eq!(seal.select_method(&tool(&[qualities::SUTURING])), Some(ToolMethod::Primary));
    assert_eq!(seal.select_method(&tool(&[qualities::CAUTERIZING])), Some(ToolMethod::Primary));
}

#[test]
fn builtin_regrowth_matches_categories() {
    let catalog = AnatomyCatalog::builtin().unwrap();
    let salamander = catalog.species(species::SALAMANDER).unwrap();
    assert!(salamander.regenerates_category(organ_categories::ARM_LEFT));
    assert!(!salamander.regenerates_category(organ_categories::CORE));

    let head = catalog
        .regrowth_prototype(species::SALAMANDER, organ_categories::HEAD)
        .unwrap();
    assert_eq!(head.category, organ_categories::HEAD);
    assert_eq!(head.contents.len(), 1);

    let human = catalog.species(species::HUMAN).unwrap();
    assert!(!human.regenerates_category(organ_categories::HAND_LEFT));
    assert!(catalog
        .regrowth_prototype(species::HUMAN, organ_categories::HAND_LEFT)
        .is_none());
}

// ── Loading errors ─────────────────────────────────────────────────────

#[test]
fn minimal_catalog_loads_with_default_tuning() {
    let catalog = AnatomyCatalog::from_json(&minimal("", "", "")).unwrap();
    assert_eq!(catalog.tuning.open_layer_penalty, 1);
    assert_eq!(catalog.tuning.regeneration_delay, 300.0);
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(
        AnatomyCatalog::from_json("{ not json"),
        Err(CatalogError::Json(_))
    ));
}

#[test]
fn duplicate_ids_are_rejected() {
    let json = minimal("", r#", { "id": "heart", "category": "heart" }"#, "");
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::DuplicateId { kind: "organ", .. })
    ));
}

#[test]
fn unknown_operation_is_rejected() {
    let json = minimal(
        r#", { "id": "close", "name": "close", "layer": "Skin", "kind": "close",
               "operation": "glue", "duration": 1.0 }"#,
        "",
        "",
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::UnknownOperation { operation, .. }) if operation == "glue"
    ));
}

#[test]
fn requirement_on_other_layer_is_rejected() {
    let json = minimal(
        r#", { "id": "deep", "name": "deep", "layer": "Tissue", "kind": "open",
               "required": true, "requires": ["open"], "operation": "cut", "duration": 1.0 }"#,
        "",
        "",
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::InvalidStep { step, .. }) if step == "deep"
    ));
}

#[test]
fn organ_step_outside_organ_layer_is_rejected() {
    let json = minimal(
        r#", { "id": "yank", "name": "yank", "layer": "Skin", "kind": "remove_organ",
               "operation": "cut", "duration": 1.0 }"#,
        "",
        "",
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::InvalidStep { step, .. }) if step == "yank"
    ));
}

#[test]
fn species_with_unknown_organ_is_rejected() {
    let json = minimal(
        "",
        "",
        r#"{ "id": "blob", "max_integrity": 5, "max_parts": 1,
             "parts": [ { "category": "torso", "slots": ["liver"], "capacity": 1, "organs": ["liver"] } ] }"#,
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::UnknownOrgan { organ, .. }) if organ == "liver"
    ));
}

#[test]
fn regrowth_of_wrong_category_is_rejected() {
    let json = minimal(
        "",
        "",
        r#"{ "id": "newt", "max_integrity": 5, "max_parts": 1, "regenerates": true,
             "regenerable": ["tail"], "regrowth": { "tail": "heart" },
             "parts": [ { "category": "torso", "slots": ["heart"], "capacity": 1 } ] }"#,
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::InvalidSpecies { species, .. }) if species == "newt"
    ));
}

#[test]
fn too_many_parts_is_rejected() {
    let json = minimal(
        "",
        "",
        r#"{ "id": "hydra", "max_integrity": 5, "max_parts": 1,
             "parts": [ { "category": "torso", "slots": [], "capacity": 1 },
                        { "category": "head", "slots": [], "capacity": 1 } ] }"#,
    );
    assert!(matches!(
        AnatomyCatalog::from_json(&json),
        Err(CatalogError::InvalidSpecies { .. })
    ));
}
