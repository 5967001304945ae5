//! Anatomy Core - Body Graph, Surgery and Integrity Engine
//!
//! An ECS-based model of bodies made of parts and organs, a layered surgery
//! state machine that mutates them, and the integrity aggregates derived
//! from what is installed.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Bodies, body parts, organs, tools
//! - **Components**: Pure data attached to entities (Body, BodyPart, Organ, IntegrityCapacity, ...)
//! - **Systems**: Logic that queries and updates components
//! - **Events**: Request/response structs passed to registered collaborators
//!
//! # Example
//!
//! ```rust,no_run
//! use anatomy_core::prelude::*;
//! use anatomy_logic::catalog::AnatomyCatalog;
//!
//! let catalog = AnatomyCatalog::builtin().expect("catalog");
//! let mut engine = AnatomyEngine::new(catalog);
//! let body = engine.spawn_body("human").expect("species");
//!
//! loop {
//!     engine.update(1.0 / 30.0);
//!     let report = engine.integrity(body);
//!     # let _ = report;
//! }
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod events;
pub mod generation;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::AnatomyEngine;
    pub use crate::error::{AnatomyError, RegrowthError, SurgeryError};
}
