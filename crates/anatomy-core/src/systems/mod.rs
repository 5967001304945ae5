//! Systems - logic that operates on components

mod graph;
mod integrity;
mod rejection;
mod do_after;
mod surgery;
mod regeneration;
mod snapshot;

pub use graph::*;
pub use integrity::*;
pub use rejection::*;
pub use do_after::*;
pub use surgery::*;
pub use regeneration::*;
pub use snapshot::*;
