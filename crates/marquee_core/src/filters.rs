//! List filter parameters and pagination metadata.
//!
//! # Responsibility
//! - Describe the requested page, page size and sort key.
//! - Map a safelisted sort key onto a fixed column/direction pair.
//! - Derive pagination metadata from a total row count.
//!
//! # Invariants
//! - A sort key reaches SQL only after it is found in the caller's safelist,
//!   and only as a value drawn from [`SortColumn`], never as raw input.
//! - Zero matching rows yields zeroed derived metadata, not an error.

use crate::validator::{permitted_value, ValidationErrors, Validator};
use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_SORT: &str = "id";
pub const MAX_PAGE: u32 = 10_000_000;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort keys accepted by the item list use-case.
pub const ITEM_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// Sortable item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    Year,
    Runtime,
}

impl SortColumn {
    /// Resolves a bare column name (no direction prefix).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "year" => Some(Self::Year),
            "runtime" => Some(Self::Runtime),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Year => "year",
            Self::Runtime => "runtime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Requested page, page size and sort key, plus the keys the caller allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: u32,
    pub page_size: u32,
    /// Column name, optionally prefixed with `-` for descending order.
    pub sort: String,
    pub sort_safelist: Vec<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: DEFAULT_SORT.to_string(),
            sort_safelist: ITEM_SORT_SAFELIST.iter().map(|key| key.to_string()).collect(),
        }
    }
}

impl Filters {
    /// Returns the safelisted column and direction for `sort`.
    ///
    /// `None` means the key is either absent from the safelist or names no
    /// known column; callers must refuse to build a query in that case.
    pub fn sort_order(&self) -> Option<(SortColumn, SortDirection)> {
        if !permitted_value(self.sort.as_str(), &self.sort_safelist) {
            return None;
        }
        let (key, direction) = match self.sort.strip_prefix('-') {
            Some(key) => (key, SortDirection::Desc),
            None => (self.sort.as_str(), SortDirection::Asc),
        };
        SortColumn::from_key(key).map(|column| (column, direction))
    }

    pub fn sort_column(&self) -> Option<SortColumn> {
        self.sort_order().map(|(column, _)| column)
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        validate_filters(&mut v, self);
        v.finish()
    }
}

/// Checks page bounds and the sort safelist.
pub fn validate_filters(v: &mut Validator, filters: &Filters) {
    v.check(filters.page > 0, "page", "must be greater than zero");
    v.check(filters.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(filters.page_size > 0, "page_size", "must be greater than zero");
    v.check(
        filters.page_size <= MAX_PAGE_SIZE,
        "page_size",
        "must be a maximum of 100",
    );
    v.check(
        permitted_value(filters.sort.as_str(), &filters.sort_safelist),
        "sort",
        "invalid sort value",
    );
}

/// Pagination summary returned alongside one page of items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

/// Derives pagination metadata.
///
/// With no matching rows the page and page size echo the request while the
/// derived fields stay zero.
pub fn calculate_metadata(total_records: u64, page: u32, page_size: u32) -> Metadata {
    if total_records == 0 || page_size == 0 {
        return Metadata {
            current_page: page,
            page_size,
            ..Metadata::default()
        };
    }

    let last_page = total_records.div_ceil(u64::from(page_size));
    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        total_records,
    }
}
