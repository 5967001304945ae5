//! Error types for graph mutation and surgery requests.

use hecs::Entity;
use thiserror::Error;

/// A graph mutation that would break a containment invariant.
/// Mutations returning this error have not changed anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnatomyError {
    #[error("entity {0:?} does not exist or lacks the expected component")]
    MissingEntity(Entity),
    #[error("container {0:?} is full")]
    CapacityExceeded(Entity),
    #[error("body already has an organ of category `{0}`")]
    DuplicateCategory(String),
    #[error("{0:?} is already contained elsewhere")]
    AlreadyContained(Entity),
    #[error("{child:?} is not contained in {container:?}")]
    NotContained { child: Entity, container: Entity },
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),
    #[error("unknown organ prototype `{0}`")]
    UnknownOrgan(String),
}

/// A surgery request that must not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurgeryError {
    #[error("surgery step rejected: {0}")]
    ValidationRejected(String),
}

/// The containment graph disagrees with itself. This is a programming
/// fault, never a gameplay outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("containment invariant violated at {entity:?}: {detail}")]
pub struct InvariantViolation {
    pub entity: Entity,
    pub detail: String,
}

/// Why a pending regrowth could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegrowthError {
    #[error("body {0:?} no longer exists")]
    MissingBody(Entity),
    #[error("an organ of category `{0}` is already present")]
    SlotOccupied(String),
    #[error("no part has a free `{0}` slot")]
    NoFreeSlot(String),
    #[error("species `{species}` has no regrowth prototype for `{category}`")]
    NoPrototype { species: String, category: String },
    #[error(transparent)]
    Structural(#[from] AnatomyError),
}
