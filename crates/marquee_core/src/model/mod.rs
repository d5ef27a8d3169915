//! Item domain model.
//!
//! # Responsibility
//! - Define the stored item record and its create/patch inputs.
//! - Keep field constraints next to the data they constrain.
//!
//! # Invariants
//! - Every stored item is identified by a positive, never reused `ItemId`.
//! - Deletion is physical; there are no tombstones.

pub mod item;
pub mod runtime;
