//! Item use-case service.
//!
//! # Responsibility
//! - Validate caller input before any store operation runs.
//! - Apply partial updates onto a freshly fetched item.
//! - Translate store errors into caller-facing error kinds.
//!
//! # Invariants
//! - Validation failures never reach the repository.
//! - Conflicts are reported, never retried here.

use crate::filters::Filters;
use crate::model::item::{Item, ItemId, ItemPatch, NewItem};
use crate::repo::item_repo::{ItemPage, ItemRepository, StoreError};
use crate::validator::ValidationErrors;
use log::info;
use thiserror::Error;

/// Caller-facing error for item use-cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input violated field constraints.
    #[error("failed validation: {0}")]
    Validation(ValidationErrors),
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    /// Backend failure. Detail is for logs, not for end users.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            StoreError::EditConflict => Self::EditConflict,
            other => Self::Store(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Title search, tag filter and paging for the list use-case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Free text matched against titles. Empty means no filter.
    pub search_text: String,
    /// Tags every returned item must carry. Empty means no filter.
    pub tags: Vec<String>,
    pub filters: Filters,
}

/// Item service facade over a repository implementation.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates and stores a new item.
    pub fn create_item(&self, input: NewItem) -> Result<Item, ServiceError> {
        let mut item = Item::from(input);
        item.validate()?;
        self.repo.insert(&mut item)?;
        info!(
            "event=item_create module=service status=ok id={} version={}",
            item.id, item.version
        );
        Ok(item)
    }

    pub fn show_item(&self, id: ItemId) -> Result<Item, ServiceError> {
        Ok(self.repo.get(id)?)
    }

    /// Applies `patch` onto the current item and saves it with a version check.
    ///
    /// When `expected_version` is given and the stored version differs, the
    /// update is refused as a conflict before any write is attempted.
    pub fn update_item(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        expected_version: Option<i32>,
    ) -> Result<Item, ServiceError> {
        let mut item = self.repo.get(id)?;

        if let Some(expected) = expected_version {
            if expected != item.version {
                return Err(ServiceError::EditConflict);
            }
        }

        patch.apply_to(&mut item);
        item.validate()?;
        self.repo.update(&mut item)?;
        info!(
            "event=item_update module=service status=ok id={} version={}",
            item.id, item.version
        );
        Ok(item)
    }

    pub fn delete_item(&self, id: ItemId) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=item_delete module=service status=ok id={}", id);
        Ok(())
    }

    /// Validates filters, then fetches one page of matching items.
    pub fn list_items(&self, query: &ListQuery) -> Result<ItemPage, ServiceError> {
        query.filters.validate()?;
        Ok(self
            .repo
            .list(&query.search_text, &query.tags, &query.filters)?)
    }
}
