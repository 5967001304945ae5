//! Pure anatomy and surgery logic.
//!
//! This crate holds every rule that does not need an entity store: surgical
//! layer ordering, integrity arithmetic, tool method selection, the
//! regeneration queue and the static content catalog. Functions take plain
//! data and return results, so the ECS engine in `anatomy-core` and the
//! headless harness can share them.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Organ, species, step and operation prototypes; JSON loading |
//! | [`constants`] | Organ categories, tool qualities and built-in step ids |
//! | [`integrity`] | Penalty entries, boost tables, rejection comparison |
//! | [`layers`] | Skin/Tissue/Organ ordering, per-part progress, step gating |
//! | [`regeneration`] | Pending regrowth entries and due/abandon bookkeeping |
//! | [`tools`] | Surgery operations and primary/improvised method selection |

pub mod catalog;
pub mod constants;
pub mod integrity;
pub mod layers;
pub mod regeneration;
pub mod tools;
