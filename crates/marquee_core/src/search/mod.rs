//! Title relevance search helpers.
//!
//! # Responsibility
//! - Turn caller free text into a safe FTS5 match expression.
//!
//! # See also
//! - `db/migrations/0002_item_search.sql` for the `items_fts` index.

pub mod fts;
