//! Well-known string ids used by the built-in catalog.
//!
//! Content is data-driven, so nothing in the engine matches on these values;
//! they exist so tests and the harness can name built-in content without
//! scattering string literals.

/// Organ categories (anatomical slot tags).
pub mod organ_categories {
    pub const BRAIN: &str = "brain";
    pub const EYES: &str = "eyes";
    pub const HEART: &str = "heart";
    pub const LUNGS: &str = "lungs";
    pub const LIVER: &str = "liver";
    pub const STOMACH: &str = "stomach";
    pub const KIDNEYS: &str = "kidneys";
    pub const HAND_LEFT: &str = "hand-left";
    pub const HAND_RIGHT: &str = "hand-right";
    pub const FOOT_LEFT: &str = "foot-left";
    pub const FOOT_RIGHT: &str = "foot-right";
    /// Composite organ used by simplified species.
    pub const CORE: &str = "core";
    pub const HEAD: &str = "head";
    pub const ARM_LEFT: &str = "arm-left";
    pub const ARM_RIGHT: &str = "arm-right";
    pub const LEG_LEFT: &str = "leg-left";
    pub const LEG_RIGHT: &str = "leg-right";
}

/// Body part categories.
pub mod part_categories {
    pub const TORSO: &str = "torso";
    pub const HEAD: &str = "head";
    pub const ARM_LEFT: &str = "arm-left";
    pub const ARM_RIGHT: &str = "arm-right";
    pub const LEG_LEFT: &str = "leg-left";
    pub const LEG_RIGHT: &str = "leg-right";
}

/// Species ids.
pub mod species {
    pub const HUMAN: &str = "human";
    /// Regenerating species with composite core organs.
    pub const SALAMANDER: &str = "salamander";
}

/// Tool qualities referenced by the built-in operations.
pub mod qualities {
    pub const SLICING: &str = "slicing";
    pub const SHARP: &str = "sharp";
    pub const RETRACTING: &str = "retracting";
    pub const PRYING: &str = "prying";
    pub const CLAMPING: &str = "clamping";
    pub const PINCHING: &str = "pinching";
    pub const EXTRACTING: &str = "extracting";
    pub const GRASPING: &str = "grasping";
    pub const IMPLANTING: &str = "implanting";
    pub const SUTURING: &str = "suturing";
    pub const CAUTERIZING: &str = "cauterizing";
    pub const HEATING: &str = "heating";
}

/// Built-in surgery step ids.
pub mod steps {
    pub const INCISION: &str = "incision";
    pub const RETRACT_SKIN: &str = "retract-skin";
    pub const CLAMP_VESSELS: &str = "clamp-vessels";
    pub const RETRACT_TISSUE: &str = "retract-tissue";
    pub const REMOVE_ORGAN: &str = "remove-organ";
    pub const INSERT_ORGAN: &str = "insert-organ";
    pub const MEND_TISSUE: &str = "mend-tissue";
    pub const CLOSE_TISSUE: &str = "close-tissue";
    pub const CLOSE_SKIN: &str = "close-skin";
}

/// Built-in operation ids.
pub mod operations {
    pub const INCISE: &str = "incise";
    pub const RETRACT: &str = "retract";
    pub const CLAMP: &str = "clamp";
    pub const EXTRACT: &str = "extract";
    pub const IMPLANT: &str = "implant";
    pub const MEND: &str = "mend";
    pub const SEAL: &str = "seal";
}
