//! Body and organ spawning

use anatomy_logic::catalog::{AnatomyCatalog, PartPrototype};
use hecs::{Entity, EntityBuilder, World};

use crate::components::*;
use crate::error::AnatomyError;
use crate::events::NotificationQueue;
use crate::systems::{attach_part, despawn_body, insert_nested_organ, insert_organ, organ_subtree};

/// Spawn a loose organ from its prototype, nested contents included.
pub fn spawn_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    prototype: &str,
) -> Result<Entity, AnatomyError> {
    let proto = catalog
        .organ(prototype)
        .ok_or_else(|| AnatomyError::UnknownOrgan(prototype.to_string()))?;

    let mut organ = Organ::new(proto.category.clone(), proto.id.clone()).with_capacity(proto.capacity);
    if proto.allow_duplicates {
        organ = organ.allowing_duplicates();
    }

    let mut builder = EntityBuilder::new();
    builder.add(organ);
    if proto.integrity_cost != 0 {
        builder.add(IntegrityCost(proto.integrity_cost));
    }
    if proto.integrity_penalty != 0 {
        builder.add(IntegrityPenalty(proto.integrity_penalty));
    }
    let entity = world.spawn(builder.build());

    for content in &proto.contents {
        let nested = spawn_organ(world, notes, catalog, content).and_then(|child| {
            insert_nested_organ(world, notes, entity, child).map_err(|err| {
                despawn_tree(world, child);
                err
            })
        });
        if let Err(err) = nested {
            despawn_tree(world, entity);
            return Err(err);
        }
    }

    Ok(entity)
}

fn despawn_tree(world: &mut World, organ: Entity) {
    let doomed: Vec<Entity> = organ_subtree(world, organ).collect();
    for entity in doomed {
        let _ = world.despawn(entity);
    }
}

/// Spawn a complete body of `species` with every part and organ its
/// prototype lists. On error nothing is left behind.
pub fn spawn_body(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    species: &str,
) -> Result<Entity, AnatomyError> {
    let proto = catalog
        .species(species)
        .ok_or_else(|| AnatomyError::UnknownSpecies(species.to_string()))?;

    let body = world.spawn((
        Body::new(proto.id.clone(), proto.max_parts),
        IntegrityCapacity {
            max: proto.max_integrity,
        },
        SurgeryProgress::default(),
        IntegritySurgeryContext::default(),
    ));

    let mut staged = NotificationQueue::new();
    let result = populate_body(world, &mut staged, catalog, &proto.parts, body);

    match result {
        Ok(()) => {
            for note in staged.drain() {
                notes.push(note);
            }
            log::info!("spawned {} body {:?}", proto.id, body);
            Ok(body)
        }
        Err(err) => {
            despawn_body(world, body)?;
            Err(err)
        }
    }
}

fn populate_body(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    parts: &[PartPrototype],
    body: Entity,
) -> Result<(), AnatomyError> {
    for part_proto in parts {
        let mut builder = EntityBuilder::new();
        builder.add(BodyPart::new(
            part_proto.category.clone(),
            part_proto.slots.clone(),
            part_proto.capacity,
        ));
        if part_proto.integrity_penalty != 0 {
            builder.add(IntegrityPenalty(part_proto.integrity_penalty));
        }
        let part = world.spawn(builder.build());
        if let Err(err) = attach_part(world, notes, body, part) {
            let _ = world.despawn(part);
            return Err(err);
        }

        for organ_id in &part_proto.organs {
            let organ = spawn_organ(world, notes, catalog, organ_id)?;
            if let Err(err) = insert_organ(world, notes, part, organ) {
                despawn_tree(world, organ);
                return Err(err);
            }
        }
    }
    Ok(())
}
