//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.

mod anatomy;
mod integrity;
mod surgery;

pub use anatomy::*;
pub use integrity::*;
pub use surgery::*;
