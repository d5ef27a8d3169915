//! Core record store for marquee items.
//! This crate is the single source of truth for item invariants.

pub mod config;
pub mod db;
pub mod filters;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod validator;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use db::{open_store_pool, open_store_pool_in_memory, DbError, ItemPool};
pub use filters::{calculate_metadata, validate_filters, Filters, Metadata, ITEM_SORT_SAFELIST};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::item::{validate_item, Item, ItemId, ItemPatch, NewItem};
pub use model::runtime::{Runtime, RuntimeParseError};
pub use repo::item_repo::{ItemPage, ItemRepository, SqliteItemRepository, StoreError, StoreResult};
pub use service::item_service::{ItemService, ListQuery, ServiceError};
pub use validator::{ValidationErrors, Validator};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
