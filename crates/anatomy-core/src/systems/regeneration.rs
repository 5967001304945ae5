//! Limb regeneration - regrowing removed organs on regenerating species

use anatomy_logic::catalog::AnatomyCatalog;
use hecs::{Entity, World};

use crate::components::{Body, BodyPart, Organ, RegenerationTracker};
use crate::error::RegrowthError;
use crate::events::{AnatomyNotification, NotificationQueue};
use crate::generation::spawn_organ;
use crate::systems::graph::{all_organs, insert_organ, organ_subtree};

/// Schedule regrowth for every regenerable organ the notifications report
/// as removed from a body. Returns how many entries were scheduled.
pub fn observe_removals(
    world: &mut World,
    catalog: &AnatomyCatalog,
    notifications: &[AnatomyNotification],
    now: f64,
) -> usize {
    let mut scheduled = 0;
    for note in notifications {
        let AnatomyNotification::OrganRemoved {
            body: Some(body),
            category,
            ..
        } = note
        else {
            continue;
        };
        let Some(species) = world.get::<&Body>(*body).ok().map(|b| b.species.clone()) else {
            continue;
        };
        let regenerates = catalog
            .species(&species)
            .is_some_and(|s| s.regenerates_category(category));
        if !regenerates {
            continue;
        }

        if world.get::<&RegenerationTracker>(*body).is_err()
            && world.insert_one(*body, RegenerationTracker::default()).is_err()
        {
            continue;
        }
        if let Ok(mut tracker) = world.get::<&mut RegenerationTracker>(*body) {
            tracker.queue.schedule(category.clone(), now);
        }
        log::info!("{:?}: {} will regrow", body, category);
        scheduled += 1;
    }
    scheduled
}

/// Attempt every due regrowth once. Returns how many organs grew back.
pub fn regeneration_system(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    now: f64,
) -> usize {
    let delay = catalog.tuning.regeneration_delay;
    let due: Vec<(Entity, Vec<String>)> = world
        .query::<&RegenerationTracker>()
        .iter()
        .map(|(body, tracker)| (body, tracker.queue.due(now, delay)))
        .filter(|(_, categories)| !categories.is_empty())
        .collect();

    let mut restored = 0;
    for (body, categories) in due {
        for category in categories {
            let outcome = restore_single_limb(world, notes, catalog, body, &category);
            let Ok(mut tracker) = world.get::<&mut RegenerationTracker>(body) else {
                break;
            };
            match outcome {
                Ok(_) => {
                    tracker.queue.complete(&category);
                    restored += 1;
                    log::info!("{:?}: regrew {}", body, category);
                }
                Err(err) => {
                    tracker.queue.abandon(&category);
                    log::debug!("{:?}: {} will not regrow: {}", body, category, err);
                }
            }
        }
    }

    let empty: Vec<Entity> = world
        .query::<&RegenerationTracker>()
        .iter()
        .filter(|(_, tracker)| tracker.queue.is_empty())
        .map(|(body, _)| body)
        .collect();
    for body in empty {
        let _ = world.remove_one::<RegenerationTracker>(body);
    }

    restored
}

/// Grow one organ of `category` into the first part with a free slot for it.
pub fn restore_single_limb(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    body: Entity,
    category: &str,
) -> Result<Entity, RegrowthError> {
    let (species, parts) = world
        .get::<&Body>(body)
        .map(|b| (b.species.clone(), b.parts.clone()))
        .map_err(|_| RegrowthError::MissingBody(body))?;

    let present = all_organs(world, body).any(|o| {
        world
            .get::<&Organ>(o)
            .map(|o| o.category == category)
            .unwrap_or(false)
    });
    if present {
        return Err(RegrowthError::SlotOccupied(category.to_string()));
    }

    let part = parts
        .into_iter()
        .find(|p| {
            world
                .get::<&BodyPart>(*p)
                .map(|p| p.has_slot(category) && !p.is_full())
                .unwrap_or(false)
        })
        .ok_or_else(|| RegrowthError::NoFreeSlot(category.to_string()))?;

    let prototype = catalog
        .regrowth_prototype(&species, category)
        .ok_or_else(|| RegrowthError::NoPrototype {
            species: species.clone(),
            category: category.to_string(),
        })?;

    let organ = spawn_organ(world, notes, catalog, &prototype.id)?;
    if let Err(err) = insert_organ(world, notes, part, organ) {
        let doomed: Vec<Entity> = organ_subtree(world, organ).collect();
        for entity in doomed {
            let _ = world.despawn(entity);
        }
        return Err(err.into());
    }
    Ok(organ)
}
