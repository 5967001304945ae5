//! Surgical tool spawning

use std::collections::BTreeSet;

use anatomy_logic::catalog::AnatomyCatalog;
use hecs::{Entity, World};
use rand::seq::IteratorRandom;
use rand::Rng;

use crate::components::Tool;

/// Spawn a tool with the given qualities.
pub fn spawn_tool<I, S>(world: &mut World, qualities: I, sterile: bool) -> Entity
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tool = Tool::new(qualities);
    if !sterile {
        tool = tool.unsterile();
    }
    world.spawn((tool,))
}

/// Spawn a tool that fully covers every operation the catalog knows.
pub fn spawn_surgical_kit(world: &mut World, catalog: &AnatomyCatalog) -> Entity {
    let qualities: BTreeSet<String> = catalog
        .steps()
        .filter_map(|step| catalog.operation(&step.operation))
        .flat_map(|op| op.primary.iter().flatten().cloned())
        .collect();
    spawn_tool(world, qualities, true)
}

/// Spawn a tool with one to three qualities drawn from every capability set
/// the catalog mentions (primary and improvised). About one in five is
/// unsterile.
pub fn spawn_random_tool(world: &mut World, catalog: &AnatomyCatalog, rng: &mut impl Rng) -> Entity {
    let pool: BTreeSet<String> = catalog
        .steps()
        .filter_map(|step| catalog.operation(&step.operation))
        .flat_map(|op| {
            let improvised = op.improvised.iter().flat_map(|m| m.qualities.iter());
            op.primary.iter().chain(improvised).flatten().cloned().collect::<Vec<_>>()
        })
        .collect();

    let count = rng.gen_range(1..=3);
    let qualities = pool.into_iter().choose_multiple(rng, count);
    let sterile = rng.gen_bool(0.8);
    spawn_tool(world, qualities, sterile)
}
