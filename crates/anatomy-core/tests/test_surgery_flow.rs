//! End-to-end tests through the engine: spawn → operate → integrity → regrowth.
//!
//! Each test drives `AnatomyEngine::update` the way a host loop would and
//! only looks at the engine's public accessors.

use anatomy_core::engine::AnatomyEngine;
use anatomy_core::error::{AnatomyError, SurgeryError};
use anatomy_core::prelude::*;
use anatomy_core::systems::all_organs;
use anatomy_logic::catalog::AnatomyCatalog;
use anatomy_logic::constants::{organ_categories, part_categories, qualities, species, steps};
use anatomy_logic::layers::SurgeryLayer;
use hecs::Entity;

// ── Helpers ────────────────────────────────────────────────────────────

fn engine() -> AnatomyEngine {
    AnatomyEngine::new(AnatomyCatalog::builtin().unwrap())
}

fn kit(engine: &mut AnatomyEngine) -> Entity {
    engine.spawn_tool(
        [
            qualities::SLICING,
            qualities::RETRACTING,
            qualities::CLAMPING,
            qualities::EXTRACTING,
            qualities::IMPLANTING,
            qualities::SUTURING,
        ],
        true,
    )
}

fn run(engine: &mut AnatomyEngine, seconds: u32) {
    for _ in 0..seconds {
        engine.update(1.0);
    }
}

/// Request a step and let it finish.
fn operate(engine: &mut AnatomyEngine, tool: Entity, part: Entity, step: &str, organ: Option<Entity>) {
    let surgeon = engine.world.spawn(());
    engine
        .request_step(surgeon, Some(tool), part, step, organ)
        .unwrap_or_else(|e| panic!("{step}: {e}"));
    run(engine, 8);
}

fn open_to_organs(engine: &mut AnatomyEngine, tool: Entity, part: Entity) {
    for step in [steps::INCISION, steps::RETRACT_SKIN, steps::CLAMP_VESSELS, steps::RETRACT_TISSUE] {
        operate(engine, tool, part, step, None);
    }
}

fn categories(engine: &AnatomyEngine, body: Entity) -> Vec<String> {
    let mut out: Vec<String> = all_organs(&engine.world, body)
        .map(|o| engine.world.get::<&Organ>(o).unwrap().category.clone())
        .collect();
    out.sort();
    out
}

// ── Integrity ──────────────────────────────────────────────────────────

#[test]
fn human_with_two_hands_is_healthy() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    assert!(engine.organ(body, organ_categories::HAND_LEFT).is_some());
    assert!(engine.organ(body, organ_categories::HAND_RIGHT).is_some());

    run(&mut engine, 3);
    let report = engine.integrity(body).unwrap();
    assert_eq!(report.usage, 0);
    assert_eq!(report.penalty.total, 0);
    assert!(!report.is_rejecting());
}

#[test]
fn usage_is_idempotent() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let head = engine.part(body, part_categories::HEAD).unwrap();
    let eyes = engine.organ(body, organ_categories::EYES).unwrap();
    engine.remove_organ(head, eyes).unwrap();
    let cyber = engine.spawn_organ("cyber-eyes").unwrap();
    engine.insert_organ(head, cyber).unwrap();

    let first = engine.usage(body);
    let second = engine.usage(body);
    assert_eq!(first, 2);
    assert_eq!(first, second);
}

#[test]
fn boost_refresh_does_not_stack() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let heart = engine.organ(body, organ_categories::HEART).unwrap();

    engine.apply_reagent_boost(heart, "immunosuppressant", 3, 20.0).unwrap();
    engine.apply_reagent_boost(heart, "immunosuppressant", 3, 20.0).unwrap();
    assert_eq!(engine.capacity(body), 13);

    engine.apply_reagent_boost(heart, "antirejection-serum", 2, 5.0).unwrap();
    assert_eq!(engine.capacity(body), 15);

    run(&mut engine, 6);
    assert_eq!(engine.capacity(body), 13);
    run(&mut engine, 20);
    assert_eq!(engine.capacity(body), 10);
}

#[test]
fn transplanted_limb_leaves_boosts_behind() {
    let mut engine = engine();
    let donor = engine.spawn_body(species::HUMAN).unwrap();
    let patient = engine.spawn_body(species::HUMAN).unwrap();
    let hand = engine.organ(donor, organ_categories::HAND_LEFT).unwrap();
    engine.apply_reagent_boost(hand, "omnizine", 5, 1000.0).unwrap();
    assert_eq!(engine.capacity(donor), 15);

    let stump = engine.part(patient, part_categories::ARM_LEFT).unwrap();
    engine.detach_part(patient, stump).unwrap();
    let before = engine.capacity(patient);

    let arm = engine.part(donor, part_categories::ARM_LEFT).unwrap();
    engine.transfer_part(arm, patient).unwrap();
    assert_eq!(engine.organ(patient, organ_categories::HAND_LEFT), Some(hand));
    assert_eq!(engine.capacity(patient), before);
    assert_eq!(engine.capacity(donor), 10);
}

#[test]
fn boost_can_be_ended_early() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let heart = engine.organ(body, organ_categories::HEART).unwrap();
    engine.apply_reagent_boost(heart, "immunosuppressant", 3, 60.0).unwrap();
    engine.apply_reagent_boost(heart, "saline", 1, 60.0).unwrap();

    assert!(engine.remove_boost(heart, "immunosuppressant"));
    assert_eq!(engine.capacity(body), 11);
    assert!(!engine.remove_boost(heart, "immunosuppressant"));
}

// ── Surgery ────────────────────────────────────────────────────────────

#[test]
fn deep_step_on_closed_part_is_rejected() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let torso = engine.part(body, part_categories::TORSO).unwrap();
    let tool = kit(&mut engine);
    let surgeon = engine.world.spawn(());

    let err = engine
        .request_step(surgeon, Some(tool), torso, steps::CLAMP_VESSELS, None)
        .unwrap_err();
    let SurgeryError::ValidationRejected(reason) = err;
    assert!(reason.contains("skin"), "{reason}");
    assert_eq!(engine.available_steps(body, torso), vec![steps::INCISION.to_string()]);
}

#[test]
fn implant_swap_and_close() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let torso = engine.part(body, part_categories::TORSO).unwrap();
    let tool = kit(&mut engine);

    open_to_organs(&mut engine, tool, torso);
    assert_eq!(engine.penalty(body).total, 2);

    let heart = engine.organ(body, organ_categories::HEART).unwrap();
    operate(&mut engine, tool, torso, steps::REMOVE_ORGAN, Some(heart));
    let cyber = engine.spawn_organ("cyber-heart").unwrap();
    operate(&mut engine, tool, torso, steps::INSERT_ORGAN, Some(cyber));
    assert_eq!(engine.usage(body), 4);

    operate(&mut engine, tool, torso, steps::CLOSE_TISSUE, None);
    operate(&mut engine, tool, torso, steps::CLOSE_SKIN, None);
    assert_eq!(engine.penalty(body).total, 0);

    let snapshot = engine.snapshot(body, Some(torso)).unwrap();
    let view = snapshot.part(torso).unwrap();
    assert!(view.layers.iter().all(|l| !l.open && l.performed.is_empty()));
    assert_eq!(view.available_steps, vec![steps::INCISION.to_string()]);
    assert_eq!(snapshot.integrity.unwrap().usage, 4);
}

#[test]
fn duplicate_category_leaves_graph_unchanged() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let torso = engine.part(body, part_categories::TORSO).unwrap();
    let before = categories(&engine, body);

    let spare = engine.spawn_organ("cyber-heart").unwrap();
    assert_eq!(
        engine.insert_organ(torso, spare),
        Err(AnatomyError::DuplicateCategory(organ_categories::HEART.to_string()))
    );
    assert_eq!(categories(&engine, body), before);
    assert_eq!(engine.world.get::<&Organ>(spare).unwrap().parent, None);

    // Transferring a part whose organs clash is refused too.
    let other = engine.spawn_body(species::HUMAN).unwrap();
    let other_arm = engine.part(other, part_categories::ARM_LEFT).unwrap();
    let leg = engine.part(body, part_categories::LEG_LEFT).unwrap();
    engine.detach_part(body, leg).unwrap();
    assert_eq!(
        engine.transfer_part(other_arm, body),
        Err(AnatomyError::DuplicateCategory(organ_categories::HAND_LEFT.to_string()))
    );
    assert_eq!(engine.parts(other).len(), 6);
    assert_eq!(engine.parts(body).len(), 5);
}

#[test]
fn stale_completion_is_dropped() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let torso = engine.part(body, part_categories::TORSO).unwrap();
    let tool = kit(&mut engine);
    open_to_organs(&mut engine, tool, torso);

    let heart = engine.organ(body, organ_categories::HEART).unwrap();
    let surgeon = engine.world.spawn(());
    let action = engine
        .request_step(surgeon, Some(tool), torso, steps::REMOVE_ORGAN, Some(heart))
        .unwrap();
    assert!(engine.pending_action(action).is_some());

    // Someone else takes the heart out and puts in an implant first.
    engine.remove_organ(torso, heart).unwrap();
    let cyber = engine.spawn_organ("cyber-heart").unwrap();
    engine.insert_organ(torso, cyber).unwrap();

    run(&mut engine, 8);
    assert!(engine.pending_action(action).is_none());
    assert_eq!(engine.organ(body, organ_categories::HEART), Some(cyber));
}

#[test]
fn detached_part_drops_its_pending_step() {
    let mut engine = engine();
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let torso = engine.part(body, part_categories::TORSO).unwrap();
    let arm = engine.part(body, part_categories::ARM_RIGHT).unwrap();
    let tool = kit(&mut engine);
    let surgeon = engine.world.spawn(());

    engine.request_step(surgeon, Some(tool), torso, steps::INCISION, None).unwrap();
    let on_arm = engine.request_step(surgeon, Some(tool), arm, steps::INCISION, None).unwrap();
    engine.detach_part(body, arm).unwrap();
    run(&mut engine, 4);

    assert!(engine.pending_action(on_arm).is_none());
    let snapshot = engine.snapshot(body, None).unwrap();
    let skin = &snapshot.part(torso).unwrap().layers[0];
    assert_eq!(skin.layer, SurgeryLayer::Skin);
    assert_eq!(skin.performed, vec![steps::INCISION.to_string()]);
}

// ── Regeneration ───────────────────────────────────────────────────────

#[test]
fn salamander_regrows_after_delay() {
    let mut engine = engine();
    let delay = engine.catalog.tuning.regeneration_delay as u32;
    let body = engine.spawn_body(species::SALAMANDER).unwrap();
    let part = engine.part(body, part_categories::LEG_RIGHT).unwrap();
    let leg = engine.organ(body, organ_categories::LEG_RIGHT).unwrap();
    engine.remove_organ(part, leg).unwrap();

    run(&mut engine, delay - 2);
    assert!(engine.organ(body, organ_categories::LEG_RIGHT).is_none());

    run(&mut engine, 5);
    let regrown = engine.organ(body, organ_categories::LEG_RIGHT).unwrap();
    assert_ne!(regrown, leg);
    assert!(engine.world.get::<&RegenerationTracker>(body).is_err());
}

#[test]
fn human_does_not_regrow() {
    let mut engine = engine();
    let delay = engine.catalog.tuning.regeneration_delay as u32;
    let body = engine.spawn_body(species::HUMAN).unwrap();
    let arm = engine.part(body, part_categories::ARM_LEFT).unwrap();
    let hand = engine.organ(body, organ_categories::HAND_LEFT).unwrap();
    engine.remove_organ(arm, hand).unwrap();

    run(&mut engine, delay + 5);
    assert!(engine.organ(body, organ_categories::HAND_LEFT).is_none());
    assert!(engine.world.get::<&RegenerationTracker>(body).is_err());
}
