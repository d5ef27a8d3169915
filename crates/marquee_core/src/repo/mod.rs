//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the item data access contract.
//! - Isolate SQLite query details from the caller layer.
//!
//! # Invariants
//! - Repositories never re-run business validation; callers validate first.
//! - Repository APIs return semantic errors (`NotFound`, `EditConflict`) in
//!   addition to backend transport errors.

pub mod item_repo;
