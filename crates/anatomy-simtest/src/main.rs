//! Anatomy Headless Simulation Harness
//!
//! Drives the engine through surgery, integrity and regeneration scenarios
//! plus a seeded random stress run. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p anatomy-simtest
//!   cargo run -p anatomy-simtest -- --verbose --seed 7 --iterations 500

use std::path::PathBuf;

use anatomy_core::engine::AnatomyEngine;
use anatomy_core::generation::spawn_random_tool;
use anatomy_core::systems::{all_organs, verify_containment, RejectionLog};
use anatomy_core::components::{Body, BodyPart, Organ, RegenerationTracker};
use anatomy_logic::catalog::AnatomyCatalog;
use anatomy_logic::constants::{organ_categories, part_categories, qualities, species, steps};
use anatomy_logic::layers::SurgeryLayer;
use clap::Parser;
use hecs::Entity;
use log::{Level, LevelFilter, Metadata, Record};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "anatomy-simtest")]
#[command(about = "Headless scenarios for the anatomy engine")]
struct Args {
    /// Print every check and engine log output
    #[arg(short, long)]
    verbose: bool,

    /// Seed for the random stress run
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Ticks in the random stress run
    #[arg(short, long, default_value_t = 300)]
    iterations: usize,

    /// Load the catalog from a JSON file instead of the built-in content
    #[arg(long)]
    catalog: Option<PathBuf>,
}

// ── Logging ─────────────────────────────────────────────────────────────

struct StdoutLogger;

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("    [{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let args = Args::parse();
    if args.verbose && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
    println!("=== Anatomy Simulation Harness ===\n");

    let catalog = match load_catalog(&args) {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("  ✗ catalog_load: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog content
    results.extend(validate_catalog(&catalog));

    // 2. Idle bodies
    results.extend(validate_idle_bodies(&catalog));

    // 3. Surgery state machine
    results.extend(validate_surgery(&catalog));

    // 4. Integrity and boosts
    results.extend(validate_integrity(&catalog));

    // 5. Regeneration
    results.extend(validate_regeneration(&catalog));

    // 6. Seeded stress run
    results.extend(validate_stress(&catalog, args.seed, args.iterations));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!("\n=== RESULT: {}/{} passed, {} failed ===", passed, total, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_catalog(args: &Args) -> Result<AnatomyCatalog, String> {
    match &args.catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
            AnatomyCatalog::from_json(&json).map_err(|e| e.to_string())
        }
        None => AnatomyCatalog::builtin().map_err(|e| e.to_string()),
    }
}

fn surgical_kit(engine: &mut AnatomyEngine) -> Entity {
    engine.spawn_tool(
        [
            qualities::SLICING,
            qualities::RETRACTING,
            qualities::CLAMPING,
            qualities::EXTRACTING,
            qualities::IMPLANTING,
            qualities::SUTURING,
            qualities::CAUTERIZING,
        ],
        true,
    )
}

/// Request a step and run the engine until its action has finished.
fn operate(
    engine: &mut AnatomyEngine,
    tool: Entity,
    part: Entity,
    step: &str,
    organ: Option<Entity>,
) -> Result<(), String> {
    let surgeon = engine.world.spawn(());
    let id = engine
        .request_step(surgeon, Some(tool), part, step, organ)
        .map_err(|e| e.to_string())?;
    while engine.pending_action(id).is_some() {
        engine.update(0.5);
    }
    engine.update(0.5);
    Ok(())
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &AnatomyCatalog) -> Vec<TestResult> {
    println!("--- Catalog ---");
    let mut results = Vec::new();

    let missing: Vec<&str> = [species::HUMAN, species::SALAMANDER]
        .into_iter()
        .filter(|s| catalog.species(s).is_none())
        .collect();
    results.push(check(
        "catalog_species",
        missing.is_empty(),
        if missing.is_empty() {
            "human and salamander present".to_string()
        } else {
            format!("missing species: {:?}", missing)
        },
    ));

    let step_count = catalog.steps().count();
    let unconfigured: Vec<&str> = catalog
        .steps()
        .filter(|s| catalog.operation(&s.operation).is_none())
        .map(|s| s.id.as_str())
        .collect();
    results.push(check(
        "catalog_step_operations",
        unconfigured.is_empty(),
        format!("{} steps, {} without an operation", step_count, unconfigured.len()),
    ));

    let requirements = catalog.requirements();
    results.push(check(
        "catalog_layer_requirements",
        requirements.has_requirements(SurgeryLayer::Skin)
            && requirements.has_requirements(SurgeryLayer::Tissue)
            && !requirements.has_requirements(SurgeryLayer::Organ),
        "skin and tissue need opening, organ layer is free",
    ));

    results
}

// ── 2. Idle bodies ──────────────────────────────────────────────────────

fn validate_idle_bodies(catalog: &AnatomyCatalog) -> Vec<TestResult> {
    println!("--- Idle Bodies ---");
    let mut results = Vec::new();
    let mut engine = AnatomyEngine::new(catalog.clone());

    let body = match engine.spawn_body(species::HUMAN) {
        Ok(body) => body,
        Err(e) => {
            results.push(check("idle_spawn_human", false, e.to_string()));
            return results;
        }
    };

    let hands = engine.organ(body, organ_categories::HAND_LEFT).is_some()
        && engine.organ(body, organ_categories::HAND_RIGHT).is_some();
    results.push(check("idle_two_hands", hands, "human spawns with both hands"));

    for _ in 0..20 {
        engine.update(1.0);
    }
    let report = engine.integrity(body);
    results.push(check(
        "idle_zero_integrity",
        report.is_some_and(|r| r.usage == 0 && r.penalty == 0 && !r.is_rejecting()),
        format!("{:?}", report),
    ));

    let contained = verify_containment(&engine.world, body);
    results.push(check(
        "idle_containment",
        contained.is_ok(),
        match contained {
            Ok(()) => "graph consistent".to_string(),
            Err(v) => v.to_string(),
        },
    ));

    results
}

// ── 3. Surgery ──────────────────────────────────────────────────────────

fn validate_surgery(catalog: &AnatomyCatalog) -> Vec<TestResult> {
    println!("--- Surgery ---");
    let mut results = Vec::new();
    let mut engine = AnatomyEngine::new(catalog.clone());
    let Ok(body) = engine.spawn_body(species::HUMAN) else {
        results.push(check("surgery_spawn", false, "human did not spawn"));
        return results;
    };
    let Some(torso) = engine.part(body, part_categories::TORSO) else {
        results.push(check("surgery_spawn", false, "human has no torso"));
        return results;
    };
    let kit = surgical_kit(&mut engine);
    let surgeon = engine.world.spawn(());

    let early = engine.request_step(surgeon, Some(kit), torso, steps::CLAMP_VESSELS, None);
    results.push(check(
        "surgery_layer_order",
        early.is_err(),
        match early {
            Ok(_) => "clamping before the skin was open was accepted".to_string(),
            Err(e) => e.to_string(),
        },
    ));

    let mut opened = Ok(());
    for step in [steps::INCISION, steps::RETRACT_SKIN, steps::CLAMP_VESSELS, steps::RETRACT_TISSUE] {
        opened = opened.and_then(|()| operate(&mut engine, kit, torso, step, None));
    }
    let penalty = engine.penalty(body).total;
    results.push(check(
        "surgery_open_penalty",
        opened.is_ok() && penalty == 2 * catalog.tuning.open_layer_penalty,
        format!("{:?}, penalty {}", opened, penalty),
    ));

    // Stale completion: the heart is taken out by other means mid-action.
    let stale_ok = match engine.organ(body, organ_categories::HEART) {
        Some(heart) => {
            let id = engine.request_step(surgeon, Some(kit), torso, steps::REMOVE_ORGAN, Some(heart));
            let removed = engine.remove_organ(torso, heart).is_ok();
            for _ in 0..10 {
                engine.update(1.0);
            }
            let organ_layer = engine
                .snapshot(body, None)
                .and_then(|s| s.part(torso).cloned())
                .map(|p| p.layers.iter().all(|l| l.layer != SurgeryLayer::Organ || l.performed.is_empty()))
                .unwrap_or(false);
            id.is_ok() && removed && organ_layer && engine.insert_organ(torso, heart).is_ok()
        }
        None => false,
    };
    results.push(check(
        "surgery_stale_completion",
        stale_ok,
        "completion after the organ vanished changed nothing",
    ));

    let swapped = engine
        .organ(body, organ_categories::HEART)
        .ok_or_else(|| "no heart".to_string())
        .and_then(|heart| operate(&mut engine, kit, torso, steps::REMOVE_ORGAN, Some(heart)))
        .and_then(|()| engine.spawn_organ("cyber-heart").map_err(|e| e.to_string()))
        .and_then(|cyber| operate(&mut engine, kit, torso, steps::INSERT_ORGAN, Some(cyber)));
    let usage = engine.usage(body);
    results.push(check(
        "surgery_heart_swap",
        swapped.is_ok() && usage == 4,
        format!("{:?}, usage {}", swapped, usage),
    ));

    let closed = operate(&mut engine, kit, torso, steps::CLOSE_TISSUE, None)
        .and_then(|()| operate(&mut engine, kit, torso, steps::CLOSE_SKIN, None));
    let penalty = engine.penalty(body).total;
    results.push(check(
        "surgery_close",
        closed.is_ok() && penalty == 0,
        format!("{:?}, penalty {}", closed, penalty),
    ));

    // Improvised cut, then mend.
    let knife = engine.spawn_tool([qualities::SHARP], true);
    let Some(head) = engine.part(body, part_categories::HEAD) else {
        results.push(check("surgery_improvised", false, "human has no head"));
        return results;
    };
    let cut = operate(&mut engine, knife, head, steps::INCISION, None)
        .and_then(|()| operate(&mut engine, kit, head, steps::RETRACT_SKIN, None));
    let before = engine.penalty(body).total;
    let mended = operate(&mut engine, kit, head, steps::MEND_TISSUE, None);
    let after = engine.penalty(body).total;
    results.push(check(
        "surgery_improvised_repair",
        cut.is_ok() && mended.is_ok() && before > after && after == catalog.tuning.open_layer_penalty,
        format!("penalty {} -> {}", before, after),
    ));

    results
}

// ── 4. Integrity ────────────────────────────────────────────────────────

fn validate_integrity(catalog: &AnatomyCatalog) -> Vec<TestResult> {
    println!("--- Integrity ---");
    let mut results = Vec::new();
    let mut engine = AnatomyEngine::new(catalog.clone());
    engine.register_rejection_handler(Box::new(RejectionLog::new()));
    let Ok(body) = engine.spawn_body(species::HUMAN) else {
        results.push(check("integrity_spawn", false, "human did not spawn"));
        return results;
    };

    let first = engine.usage(body);
    let second = engine.usage(body);
    let p1 = engine.penalty(body);
    let p2 = engine.penalty(body);
    results.push(check(
        "integrity_idempotent",
        first == second && p1 == p2,
        format!("usage {} / {}, penalty {} / {}", first, second, p1.total, p2.total),
    ));

    let Some(heart) = engine.organ(body, organ_categories::HEART) else {
        results.push(check("integrity_boosts", false, "no heart"));
        return results;
    };
    let base = engine.capacity(body);
    let _ = engine.apply_reagent_boost(heart, "omnizine", 3, 60.0);
    let _ = engine.apply_reagent_boost(heart, "omnizine", 3, 60.0);
    let boosted = engine.capacity(body);
    results.push(check(
        "integrity_boost_refresh",
        boosted == base + 3,
        format!("capacity {} -> {}", base, boosted),
    ));

    for _ in 0..61 {
        engine.update(1.0);
    }
    let expired = engine.capacity(body);
    results.push(check(
        "integrity_boost_expiry",
        expired == base,
        format!("capacity after expiry {}", expired),
    ));

    let overload = install_cyberware(&mut engine, body);
    engine.update(1.0);
    let rejecting = engine.rejecting().iter().any(|(b, _)| *b == body);
    results.push(check(
        "integrity_rejection",
        overload.is_ok() && rejecting,
        format!("{:?}, report {:?}", overload, engine.integrity(body)),
    ));

    results
}

/// Swap the natural heart, eyes and hands for implants.
fn install_cyberware(engine: &mut AnatomyEngine, body: Entity) -> Result<(), String> {
    for (category, part, prototype) in [
        (organ_categories::HEART, part_categories::TORSO, "cyber-heart"),
        (organ_categories::EYES, part_categories::HEAD, "cyber-eyes"),
        (organ_categories::HAND_LEFT, part_categories::ARM_LEFT, "cyber-hand-left"),
        (organ_categories::HAND_RIGHT, part_categories::ARM_RIGHT, "cyber-hand-right"),
    ] {
        let part = engine.part(body, part).ok_or("missing part")?;
        let old = engine.organ(body, category).ok_or("missing organ")?;
        engine.remove_organ(part, old).map_err(|e| e.to_string())?;
        let new = engine.spawn_organ(prototype).map_err(|e| e.to_string())?;
        engine.insert_organ(part, new).map_err(|e| e.to_string())?;
    }
    Ok(())
}

// ── 5. Regeneration ─────────────────────────────────────────────────────

fn validate_regeneration(catalog: &AnatomyCatalog) -> Vec<TestResult> {
    println!("--- Regeneration ---");
    let mut results = Vec::new();
    let mut engine = AnatomyEngine::new(catalog.clone());
    let delay = catalog.tuning.regeneration_delay as f32;
    let Ok(body) = engine.spawn_body(species::SALAMANDER) else {
        results.push(check("regen_spawn", false, "salamander did not spawn"));
        return results;
    };

    let lost = engine
        .part(body, part_categories::ARM_LEFT)
        .zip(engine.organ(body, organ_categories::ARM_LEFT))
        .is_some_and(|(part, limb)| engine.remove_organ(part, limb).is_ok());
    engine.update(1.0);
    engine.update(delay - 2.0);
    let early = engine.organ(body, organ_categories::ARM_LEFT).is_none();
    engine.update(3.0);
    let regrown = engine.organ(body, organ_categories::ARM_LEFT).is_some();
    let cleaned = engine.world.get::<&RegenerationTracker>(body).is_err();
    results.push(check(
        "regen_after_delay",
        lost && early && regrown && cleaned,
        format!("lost {}, absent before delay {}, regrown {}", lost, early, regrown),
    ));

    // Occupied slot at the due time: attempt once, then park.
    let Some(part) = engine.part(body, part_categories::ARM_RIGHT) else {
        results.push(check("regen_abandon", false, "no right arm"));
        return results;
    };
    let parked = match engine.organ(body, organ_categories::ARM_RIGHT) {
        Some(limb) => {
            let removed = engine.remove_organ(part, limb).is_ok();
            engine.update(1.0);
            let reinserted = engine.insert_organ(part, limb).is_ok();
            engine.update(delay + 1.0);
            let abandoned = engine
                .world
                .get::<&RegenerationTracker>(body)
                .ok()
                .and_then(|t| t.queue.get(organ_categories::ARM_RIGHT).map(|e| e.abandoned))
                .unwrap_or(false);
            removed && reinserted && abandoned
        }
        None => false,
    };
    results.push(check(
        "regen_abandon",
        parked,
        "failed regrowth stays pending and is not retried",
    ));

    results
}

// ── 6. Stress ───────────────────────────────────────────────────────────

fn organ_entities(engine: &AnatomyEngine, body: Entity) -> Vec<Entity> {
    all_organs(&engine.world, body).collect()
}

fn unique_categories(engine: &AnatomyEngine, body: Entity) -> bool {
    let mut seen = std::collections::HashSet::new();
    organ_entities(engine, body).into_iter().all(|o| {
        engine
            .world
            .get::<&Organ>(o)
            .map(|o| o.allow_duplicates || seen.insert(o.category.clone()))
            .unwrap_or(false)
    })
}

fn validate_stress(catalog: &AnatomyCatalog, seed: u64, iterations: usize) -> Vec<TestResult> {
    println!("--- Stress (seed {}, {} ticks) ---", seed, iterations);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = AnatomyEngine::new(catalog.clone());

    let bodies: Vec<Entity> = [species::HUMAN, species::HUMAN, species::SALAMANDER]
        .into_iter()
        .filter_map(|s| engine.spawn_body(s).ok())
        .collect();
    let tools: Vec<Entity> = (0..8)
        .map(|_| spawn_random_tool(&mut engine.world, &engine.catalog, &mut rng))
        .collect();
    let kit = surgical_kit(&mut engine);
    let surgeon = engine.world.spawn(());
    let step_ids: Vec<String> = catalog.steps().map(|s| s.id.clone()).collect();
    let mut loose: Vec<Entity> = Vec::new();

    let mut requests = 0;
    let mut accepted = 0;
    let mut structural_errors = 0;
    let mut failure: Option<String> = None;

    for tick in 0..iterations {
        match rng.gen_range(0..4) {
            // Random surgery request with a random tool
            0 | 1 => {
                let body = bodies[rng.gen_range(0..bodies.len())];
                let parts = engine.parts(body);
                if let (Some(part), Some(step)) = (parts.choose(&mut rng), step_ids.choose(&mut rng)) {
                    let tool = if rng.gen_bool(0.5) { kit } else { tools[rng.gen_range(0..tools.len())] };
                    let organ = engine
                        .world
                        .get::<&BodyPart>(*part)
                        .ok()
                        .and_then(|p| p.organs.choose(&mut rng).copied())
                        .or_else(|| loose.choose(&mut rng).copied());
                    requests += 1;
                    if engine.request_step(surgeon, Some(tool), *part, step, organ).is_ok() {
                        accepted += 1;
                    }
                }
            }
            // Yank an organ out, or put a loose one somewhere
            2 => {
                let body = bodies[rng.gen_range(0..bodies.len())];
                if rng.gen_bool(0.5) {
                    let organs = organ_entities(&engine, body);
                    if let Some(organ) = organs.choose(&mut rng) {
                        let parent = engine.world.get::<&Organ>(*organ).ok().and_then(|o| o.parent);
                        let is_direct = parent.is_some_and(|p| engine.world.get::<&BodyPart>(p).is_ok());
                        if let (Some(part), true) = (parent, is_direct) {
                            match engine.remove_organ(part, *organ) {
                                Ok(()) => loose.push(*organ),
                                Err(_) => structural_errors += 1,
                            }
                        }
                    }
                } else if let Some(idx) = (!loose.is_empty()).then(|| rng.gen_range(0..loose.len())) {
                    let parts = engine.parts(body);
                    if let Some(part) = parts.choose(&mut rng) {
                        let organ = loose[idx];
                        let still_loose = engine
                            .world
                            .get::<&Organ>(organ)
                            .map(|o| o.parent.is_none())
                            .unwrap_or(false);
                        if !still_loose {
                            loose.swap_remove(idx);
                        } else if engine.insert_organ(*part, organ).is_ok() {
                            loose.swap_remove(idx);
                        } else {
                            structural_errors += 1;
                        }
                    }
                }
            }
            // Move a whole part between bodies
            _ => {
                let from = bodies[rng.gen_range(0..bodies.len())];
                let to = bodies[rng.gen_range(0..bodies.len())];
                if let Some(part) = engine.parts(from).choose(&mut rng) {
                    if engine.transfer_part(*part, to).is_err() {
                        structural_errors += 1;
                    }
                }
            }
        }

        engine.update(rng.gen_range(0.1..3.0));

        for body in &bodies {
            if let Err(v) = verify_containment(&engine.world, *body) {
                failure = Some(format!("tick {}: {}", tick, v));
            } else if !unique_categories(&engine, *body) {
                failure = Some(format!("tick {}: duplicate organ category in {:?}", tick, body));
            } else {
                let first = engine.usage(*body);
                let second = engine.usage(*body);
                if first != second {
                    failure = Some(format!("tick {}: usage not idempotent", tick));
                }
            }
        }
        if failure.is_some() {
            break;
        }
    }

    results.push(check(
        "stress_invariants",
        failure.is_none(),
        failure.unwrap_or_else(|| {
            format!(
                "{} requests ({} accepted), {} rejected structural edits",
                requests, accepted, structural_errors
            )
        }),
    ));

    let part_owners_ok = engine.world.query::<&BodyPart>().iter().all(|(part, p)| match p.body {
        Some(body) => engine
            .world
            .get::<&Body>(body)
            .map(|b| b.parts.contains(&part))
            .unwrap_or(false),
        None => true,
    });
    results.push(check(
        "stress_part_back_references",
        part_owners_ok,
        "every part back-reference matches its body",
    ));

    results
}
