//! Integrity aggregates - usage, penalties, capacity and boosts.
//!
//! All three totals are recomputed from the anatomy graph on every query.
//! Nothing here caches, so there is no invalidation path to forget when the
//! graph or the penalty context changes.

use anatomy_logic::integrity::{
    BoostTable, IntegrityReport, PenaltyBreakdown, PenaltyCategory, PenaltyEntry,
};
use hecs::{Entity, World};

use crate::components::{
    Body, BodyPart, ImmunityBoosts, IntegrityCapacity, IntegrityPenalty, IntegritySurgeryContext,
    Organ,
};
use crate::error::AnatomyError;
use crate::events::CostProviders;
use crate::systems::graph::all_organs;

/// Sum of the intrinsic cost of every organ installed in `body`.
pub fn compute_usage(world: &World, providers: &CostProviders, body: Entity) -> i32 {
    all_organs(world, body)
        .map(|organ| providers.request(world, organ))
        .sum()
}

/// Flat penalties of installed parts/organs plus every contextual entry.
pub fn compute_total_penalty(world: &World, body: Entity) -> PenaltyBreakdown {
    let mut entries = Vec::new();

    let parts = world
        .get::<&Body>(body)
        .map(|b| b.parts.clone())
        .unwrap_or_default();
    for part in parts {
        let Ok(penalty) = world.get::<&IntegrityPenalty>(part) else {
            continue;
        };
        if penalty.0 != 0 {
            let name = world
                .get::<&BodyPart>(part)
                .map(|p| p.category.clone())
                .unwrap_or_default();
            entries.push(PenaltyEntry::new(name, PenaltyCategory::Installed, penalty.0));
        }
    }

    for organ in all_organs(world, body) {
        let Ok(penalty) = world.get::<&IntegrityPenalty>(organ) else {
            continue;
        };
        if penalty.0 != 0 {
            let name = world
                .get::<&Organ>(organ)
                .map(|o| o.prototype.clone())
                .unwrap_or_default();
            entries.push(PenaltyEntry::new(name, PenaltyCategory::Installed, penalty.0));
        }
    }

    if let Ok(context) = world.get::<&IntegritySurgeryContext>(body) {
        entries.extend(context.entries.iter().cloned());
    }

    PenaltyBreakdown::from_entries(entries)
}

fn with_context<R>(
    world: &mut World,
    body: Entity,
    f: impl FnOnce(&mut IntegritySurgeryContext) -> R,
) -> Result<R, AnatomyError> {
    if world.get::<&Body>(body).is_err() {
        return Err(AnatomyError::MissingEntity(body));
    }
    if world.get::<&IntegritySurgeryContext>(body).is_err() {
        world
            .insert_one(body, IntegritySurgeryContext::default())
            .map_err(|_| AnatomyError::MissingEntity(body))?;
    }
    let mut context = world
        .get::<&mut IntegritySurgeryContext>(body)
        .map_err(|_| AnatomyError::MissingEntity(body))?;
    Ok(f(&mut *context))
}

/// Append a situational penalty entry to a body.
pub fn apply_contextual_penalty(
    world: &mut World,
    body: Entity,
    entry: PenaltyEntry,
) -> Result<(), AnatomyError> {
    with_context(world, body, |context| context.push(entry))
}

/// Drop every contextual entry of a category. Returns how many were removed.
pub fn clear_contextual_penalties(
    world: &mut World,
    body: Entity,
    category: &PenaltyCategory,
) -> Result<usize, AnatomyError> {
    with_context(world, body, |context| context.clear_category(category))
}

/// Drop every contextual entry that `operation` repairs.
pub fn clear_repairable_penalties(
    world: &mut World,
    body: Entity,
    operation: &str,
) -> Result<usize, AnatomyError> {
    with_context(world, body, |context| context.clear_repaired_by(operation))
}

/// Max integrity plus every active boost on the body's organs.
pub fn effective_capacity(world: &World, body: Entity, now: f64) -> i32 {
    let max = world
        .get::<&IntegrityCapacity>(body)
        .map(|c| c.max)
        .unwrap_or(0);
    let boosts: i32 = all_organs(world, body)
        .filter_map(|organ| {
            world
                .get::<&ImmunityBoosts>(organ)
                .ok()
                .map(|b| b.table.active_total(now))
        })
        .sum();
    max + boosts
}

/// Apply or refresh a boost from `source` on an organ.
pub fn add_boost(
    world: &mut World,
    organ: Entity,
    source: &str,
    amount: i32,
    expires_at: f64,
) -> Result<(), AnatomyError> {
    if world.get::<&Organ>(organ).is_err() {
        return Err(AnatomyError::MissingEntity(organ));
    }
    if let Ok(mut boosts) = world.get::<&mut ImmunityBoosts>(organ) {
        boosts.table.apply(source, amount, expires_at);
        return Ok(());
    }
    let mut table = BoostTable::new();
    table.apply(source, amount, expires_at);
    world
        .insert_one(organ, ImmunityBoosts { table })
        .map_err(|_| AnatomyError::MissingEntity(organ))
}

/// Drop one source's boost. False when the organ had no such boost.
pub fn remove_boost(world: &mut World, organ: Entity, source: &str) -> bool {
    world
        .get::<&mut ImmunityBoosts>(organ)
        .map(|mut b| b.table.remove(source).is_some())
        .unwrap_or(false)
}

/// Metabolism hook: a reagent in the bloodstream boosts the organ
/// metabolizing it for `duration` seconds.
pub fn apply_reagent_boost(
    world: &mut World,
    organ: Entity,
    reagent: &str,
    amount: i32,
    duration: f64,
    now: f64,
) -> Result<(), AnatomyError> {
    add_boost(world, organ, reagent, amount, now + duration)
}

/// Lazily drop expired boosts everywhere. Returns how many entries went.
pub fn prune_expired_boosts(world: &mut World, now: f64) -> usize {
    let mut pruned = 0;
    let mut emptied = Vec::new();
    for (entity, boosts) in world.query_mut::<&mut ImmunityBoosts>() {
        pruned += boosts.table.prune(now);
        if boosts.table.is_empty() {
            emptied.push(entity);
        }
    }
    for entity in emptied {
        let _ = world.remove_one::<ImmunityBoosts>(entity);
    }
    pruned
}

/// The three quantities a rejection evaluator compares.
pub fn evaluate_integrity(
    world: &World,
    providers: &CostProviders,
    body: Entity,
    now: f64,
) -> Option<IntegrityReport> {
    world.get::<&Body>(body).ok()?;
    Some(IntegrityReport {
        usage: compute_usage(world, providers, body),
        penalty: compute_total_penalty(world, body).total,
        capacity: effective_capacity(world, body, now),
    })
}
