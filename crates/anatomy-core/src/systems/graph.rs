//! Anatomy graph - containment of parts in bodies and organs in parts.
//!
//! Every mutation checks its preconditions before touching anything, so a
//! returned error means the world is exactly as it was. Successful
//! mutations push structural notifications; attaching or detaching a part
//! also reports each organ it carries as inserted into / removed from the
//! body.

use std::collections::HashSet;

use hecs::{Entity, World};

use crate::components::{Body, BodyPart, ImmunityBoosts, Organ};
use crate::error::{AnatomyError, InvariantViolation};
use crate::events::{AnatomyNotification, NotificationQueue};

/// Depth-first walk over organs, nested contents included.
/// Finite, and restartable by asking for a new walk.
pub struct OrganWalk<'w> {
    world: &'w World,
    stack: Vec<Entity>,
}

impl<'w> OrganWalk<'w> {
    fn new(world: &'w World, mut roots: Vec<Entity>) -> Self {
        roots.reverse();
        Self { world, stack: roots }
    }
}

impl Iterator for OrganWalk<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        while let Some(entity) = self.stack.pop() {
            if let Ok(organ) = self.world.get::<&Organ>(entity) {
                self.stack.extend(organ.contents.iter().rev());
                return Some(entity);
            }
        }
        None
    }
}

/// Every organ installed in a body.
pub fn all_organs(world: &World, body: Entity) -> OrganWalk<'_> {
    let roots = world
        .get::<&Body>(body)
        .map(|b| {
            b.parts
                .iter()
                .filter_map(|p| world.get::<&BodyPart>(*p).ok().map(|part| part.organs.clone()))
                .flatten()
                .collect()
        })
        .unwrap_or_default();
    OrganWalk::new(world, roots)
}

/// Every organ inside one part.
pub fn organs_in_part(world: &World, part: Entity) -> OrganWalk<'_> {
    let roots = world
        .get::<&BodyPart>(part)
        .map(|p| p.organs.clone())
        .unwrap_or_default();
    OrganWalk::new(world, roots)
}

/// An organ and everything nested in it.
pub fn organ_subtree(world: &World, organ: Entity) -> OrganWalk<'_> {
    OrganWalk::new(world, vec![organ])
}

/// Part an organ ultimately sits in.
pub fn owning_part(world: &World, organ: Entity) -> Option<Entity> {
    let mut current = organ;
    loop {
        if world.get::<&BodyPart>(current).is_ok() {
            return Some(current);
        }
        current = world.get::<&Organ>(current).ok()?.parent?;
    }
}

/// Body a part or organ belongs to.
pub fn body_of(world: &World, entity: Entity) -> Option<Entity> {
    let part = owning_part(world, entity)?;
    world.get::<&BodyPart>(part).ok()?.body
}

fn category_of(world: &World, organ: Entity) -> Option<(String, bool)> {
    world
        .get::<&Organ>(organ)
        .ok()
        .map(|o| (o.category.clone(), o.allow_duplicates))
}

/// Organs sharing a uniqueness scope with `container`: the whole body if
/// the container is installed in one, otherwise its detached root tree.
fn scope_organs(world: &World, container: Entity) -> Vec<Entity> {
    if let Some(part) = owning_part(world, container) {
        return match body_of(world, part) {
            Some(body) => all_organs(world, body).collect(),
            None => organs_in_part(world, part).collect(),
        };
    }
    let mut root = container;
    while let Some(parent) = world.get::<&Organ>(root).ok().and_then(|o| o.parent) {
        root = parent;
    }
    organ_subtree(world, root).collect()
}

/// First category of `incoming` that would duplicate one in `existing`.
fn duplicate_category(world: &World, existing: &[Entity], incoming: &[Entity]) -> Option<String> {
    let taken: HashSet<String> = existing
        .iter()
        .filter_map(|e| category_of(world, *e))
        .map(|(category, _)| category)
        .collect();
    incoming
        .iter()
        .filter_map(|e| category_of(world, *e))
        .find(|(category, allow)| !allow && taken.contains(category))
        .map(|(category, _)| category)
}

/// Attach a detached part to a body.
pub fn attach_part(
    world: &mut World,
    notes: &mut NotificationQueue,
    body: Entity,
    part: Entity,
) -> Result<(), AnatomyError> {
    {
        let b = world
            .get::<&Body>(body)
            .map_err(|_| AnatomyError::MissingEntity(body))?;
        let p = world
            .get::<&BodyPart>(part)
            .map_err(|_| AnatomyError::MissingEntity(part))?;
        if p.body.is_some() || b.parts.contains(&part) {
            return Err(AnatomyError::AlreadyContained(part));
        }
        if b.is_full() {
            return Err(AnatomyError::CapacityExceeded(body));
        }
    }

    let existing: Vec<Entity> = all_organs(world, body).collect();
    let incoming: Vec<Entity> = organs_in_part(world, part).collect();
    if let Some(category) = duplicate_category(world, &existing, &incoming) {
        return Err(AnatomyError::DuplicateCategory(category));
    }

    if let Ok(mut b) = world.get::<&mut Body>(body) {
        b.parts.push(part);
    }
    if let Ok(mut p) = world.get::<&mut BodyPart>(part) {
        p.body = Some(body);
    }

    notes.push(AnatomyNotification::PartAttached { body, part });
    for organ in direct_organs(world, part) {
        notify_subtree(world, notes, Some(body), organ, part, true);
    }
    Ok(())
}

/// Detach a part from its body. The part keeps its organs.
pub fn detach_part(
    world: &mut World,
    notes: &mut NotificationQueue,
    body: Entity,
    part: Entity,
) -> Result<(), AnatomyError> {
    {
        let b = world
            .get::<&Body>(body)
            .map_err(|_| AnatomyError::MissingEntity(body))?;
        let p = world
            .get::<&BodyPart>(part)
            .map_err(|_| AnatomyError::MissingEntity(part))?;
        if p.body != Some(body) || !b.parts.contains(&part) {
            return Err(AnatomyError::NotContained {
                child: part,
                container: body,
            });
        }
    }

    if let Ok(mut b) = world.get::<&mut Body>(body) {
        b.parts.retain(|p| *p != part);
    }
    if let Ok(mut p) = world.get::<&mut BodyPart>(part) {
        p.body = None;
    }

    notes.push(AnatomyNotification::PartDetached { body, part });
    for organ in direct_organs(world, part) {
        notify_subtree(world, notes, Some(body), organ, part, false);
    }
    let carried: Vec<Entity> = organs_in_part(world, part).collect();
    drop_boosts(world, carried);
    Ok(())
}

/// Move a part from its current body (if any) to `to` in one step.
/// Everything is checked against the target first; on error neither body changes.
pub fn transfer_part(
    world: &mut World,
    notes: &mut NotificationQueue,
    part: Entity,
    to: Entity,
) -> Result<(), AnatomyError> {
    let from = world
        .get::<&BodyPart>(part)
        .map_err(|_| AnatomyError::MissingEntity(part))?
        .body;
    if from == Some(to) {
        return Err(AnatomyError::AlreadyContained(part));
    }
    {
        let target = world
            .get::<&Body>(to)
            .map_err(|_| AnatomyError::MissingEntity(to))?;
        if target.is_full() {
            return Err(AnatomyError::CapacityExceeded(to));
        }
    }
    let existing: Vec<Entity> = all_organs(world, to).collect();
    let incoming: Vec<Entity> = organs_in_part(world, part).collect();
    if let Some(category) = duplicate_category(world, &existing, &incoming) {
        return Err(AnatomyError::DuplicateCategory(category));
    }

    if let Some(from) = from {
        detach_part(world, notes, from, part)?;
    }
    attach_part(world, notes, to, part)
}

/// Insert a loose organ into a part.
pub fn insert_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    part: Entity,
    organ: Entity,
) -> Result<(), AnatomyError> {
    {
        let p = world
            .get::<&BodyPart>(part)
            .map_err(|_| AnatomyError::MissingEntity(part))?;
        if p.is_full() {
            return Err(AnatomyError::CapacityExceeded(part));
        }
    }
    check_insertable(world, part, organ)?;

    if let Ok(mut p) = world.get::<&mut BodyPart>(part) {
        p.organs.push(organ);
    }
    finish_insert(world, notes, part, organ);
    Ok(())
}

/// Insert a loose organ inside another organ.
pub fn insert_nested_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    host: Entity,
    organ: Entity,
) -> Result<(), AnatomyError> {
    if organ_subtree(world, organ).any(|o| o == host) {
        return Err(AnatomyError::AlreadyContained(host));
    }
    {
        let h = world
            .get::<&Organ>(host)
            .map_err(|_| AnatomyError::MissingEntity(host))?;
        if h.contents.len() >= h.capacity {
            return Err(AnatomyError::CapacityExceeded(host));
        }
    }
    check_insertable(world, host, organ)?;

    if let Ok(mut h) = world.get::<&mut Organ>(host) {
        h.contents.push(organ);
    }
    finish_insert(world, notes, host, organ);
    Ok(())
}

fn check_insertable(world: &World, container: Entity, organ: Entity) -> Result<(), AnatomyError> {
    {
        let o = world
            .get::<&Organ>(organ)
            .map_err(|_| AnatomyError::MissingEntity(organ))?;
        if o.parent.is_some() {
            return Err(AnatomyError::AlreadyContained(organ));
        }
    }
    let existing = scope_organs(world, container);
    let incoming: Vec<Entity> = organ_subtree(world, organ).collect();
    if let Some(category) = duplicate_category(world, &existing, &incoming) {
        return Err(AnatomyError::DuplicateCategory(category));
    }
    Ok(())
}

fn finish_insert(world: &mut World, notes: &mut NotificationQueue, container: Entity, organ: Entity) {
    if let Ok(mut o) = world.get::<&mut Organ>(organ) {
        o.parent = Some(container);
    }
    let body = body_of(world, container);
    notify_subtree(world, notes, body, organ, container, true);
}

/// Remove an organ directly contained in a part.
pub fn remove_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    part: Entity,
    organ: Entity,
) -> Result<(), AnatomyError> {
    let contained = world
        .get::<&BodyPart>(part)
        .map_err(|_| AnatomyError::MissingEntity(part))?
        .organs
        .contains(&organ);
    if !contained || parent_of(world, organ) != Some(part) {
        return Err(AnatomyError::NotContained {
            child: organ,
            container: part,
        });
    }

    let body = body_of(world, part);
    if let Ok(mut p) = world.get::<&mut BodyPart>(part) {
        p.organs.retain(|o| *o != organ);
    }
    finish_remove(world, notes, body, part, organ);
    Ok(())
}

/// Remove an organ nested inside another organ.
pub fn remove_nested_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    host: Entity,
    organ: Entity,
) -> Result<(), AnatomyError> {
    let contained = world
        .get::<&Organ>(host)
        .map_err(|_| AnatomyError::MissingEntity(host))?
        .contents
        .contains(&organ);
    if !contained || parent_of(world, organ) != Some(host) {
        return Err(AnatomyError::NotContained {
            child: organ,
            container: host,
        });
    }

    let body = body_of(world, host);
    if let Ok(mut h) = world.get::<&mut Organ>(host) {
        h.contents.retain(|o| *o != organ);
    }
    finish_remove(world, notes, body, host, organ);
    Ok(())
}

/// Remove an organ from whatever contains it.
pub fn detach_organ(
    world: &mut World,
    notes: &mut NotificationQueue,
    organ: Entity,
) -> Result<(), AnatomyError> {
    let parent = parent_of(world, organ).ok_or(AnatomyError::MissingEntity(organ))?;
    if world.get::<&BodyPart>(parent).is_ok() {
        remove_organ(world, notes, parent, organ)
    } else {
        remove_nested_organ(world, notes, parent, organ)
    }
}

fn parent_of(world: &World, organ: Entity) -> Option<Entity> {
    world.get::<&Organ>(organ).ok()?.parent
}

fn finish_remove(
    world: &mut World,
    notes: &mut NotificationQueue,
    body: Option<Entity>,
    container: Entity,
    organ: Entity,
) {
    if let Ok(mut o) = world.get::<&mut Organ>(organ) {
        o.parent = None;
    }
    notify_subtree(world, notes, body, organ, container, false);
    let subtree: Vec<Entity> = organ_subtree(world, organ).collect();
    drop_boosts(world, subtree);
}

/// Boosts belong to the body the organ was feeding.
fn drop_boosts(world: &mut World, organs: Vec<Entity>) {
    for organ in organs {
        let _ = world.remove_one::<ImmunityBoosts>(organ);
    }
}

fn direct_organs(world: &World, part: Entity) -> Vec<Entity> {
    world
        .get::<&BodyPart>(part)
        .map(|p| p.organs.clone())
        .unwrap_or_default()
}

/// Report an organ and everything nested in it. The root reports
/// `root_container`; nested organs report their host.
fn notify_subtree(
    world: &World,
    notes: &mut NotificationQueue,
    body: Option<Entity>,
    root: Entity,
    root_container: Entity,
    inserted: bool,
) {
    for organ in organ_subtree(world, root) {
        let Ok(o) = world.get::<&Organ>(organ) else {
            continue;
        };
        let container = if organ == root {
            root_container
        } else {
            o.parent.unwrap_or(root_container)
        };
        let category = o.category.clone();
        notes.push(if inserted {
            AnatomyNotification::OrganInserted {
                body,
                container,
                organ,
                category,
            }
        } else {
            AnatomyNotification::OrganRemoved {
                body,
                container,
                organ,
                category,
            }
        });
    }
}

/// Despawn a body with every part and organ it holds.
pub fn despawn_body(world: &mut World, body: Entity) -> Result<usize, AnatomyError> {
    let parts = world
        .get::<&Body>(body)
        .map_err(|_| AnatomyError::MissingEntity(body))?
        .parts
        .clone();
    let mut doomed: Vec<Entity> = all_organs(world, body).collect();
    doomed.extend(parts);
    doomed.push(body);
    let count = doomed.len();
    for entity in doomed {
        let _ = world.despawn(entity);
    }
    Ok(count)
}

/// Check every back-reference under a body against the containers that
/// hold it.
pub fn verify_containment(world: &World, body: Entity) -> Result<(), InvariantViolation> {
    let violation = |entity: Entity, detail: &str| InvariantViolation {
        entity,
        detail: detail.to_string(),
    };

    let parts = world
        .get::<&Body>(body)
        .map_err(|_| violation(body, "not a body"))?
        .parts
        .clone();

    let mut seen = HashSet::new();
    for part in parts {
        if !seen.insert(part) {
            return Err(violation(part, "part listed twice"));
        }
        let p = world
            .get::<&BodyPart>(part)
            .map_err(|_| violation(part, "listed part is not a body part"))?;
        if p.body != Some(body) {
            return Err(violation(part, "part back-reference disagrees with body"));
        }

        let mut stack: Vec<(Entity, Entity)> = p.organs.iter().map(|o| (part, *o)).collect();
        while let Some((container, organ)) = stack.pop() {
            if !seen.insert(organ) {
                return Err(violation(organ, "organ contained twice"));
            }
            let o = world
                .get::<&Organ>(organ)
                .map_err(|_| violation(organ, "contained entity is not an organ"))?;
            if o.parent != Some(container) {
                return Err(violation(organ, "organ parent disagrees with container"));
            }
            stack.extend(o.contents.iter().map(|c| (organ, *c)));
        }
    }
    Ok(())
}
