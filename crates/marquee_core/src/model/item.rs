//! Item domain model.
//!
//! # Responsibility
//! - Define the stored record and its write-side inputs.
//! - Own the field constraints every write must satisfy.
//!
//! # Invariants
//! - `id`, `created_at` and `version` are assigned by the store.
//! - `version` increases by exactly one per successful update.
//! - `tags` keeps entry order but holds no duplicates (case-sensitive).

use crate::model::runtime::Runtime;
use crate::validator::{unique, ValidationErrors, Validator};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned primary key. Valid ids start at 1.
pub type ItemId = i64;

pub const TITLE_MAX_BYTES: usize = 500;
pub const EARLIEST_YEAR: i32 = 1888;
pub const MIN_TAGS: usize = 1;
pub const MAX_TAGS: usize = 5;

/// Canonical stored item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Zero until the store assigns an id on insert.
    pub id: ItemId,
    /// Internal bookkeeping; never part of the external representation.
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
    pub title: String,
    /// Zero means "not provided".
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Optimistic-concurrency token. Zero until inserted.
    pub version: i32,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

impl Item {
    /// Builds an unsaved item from its mutable fields.
    pub fn new(title: impl Into<String>, year: i32, runtime: Runtime, tags: Vec<String>) -> Self {
        Self {
            title: title.into(),
            year,
            runtime,
            tags,
            ..Self::default()
        }
    }

    /// Runs every field check against the current calendar year.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        validate_item(&mut v, self);
        v.finish()
    }
}

/// Create-request payload: the four caller-supplied fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<NewItem> for Item {
    fn from(value: NewItem) -> Self {
        Item::new(value.title, value.year, value.runtime, value.tags)
    }
}

/// Partial update request. `None` means "leave unchanged", so an explicit
/// zero is never confused with an omitted field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.year.is_none() && self.runtime.is_none() && self.tags.is_none()
    }

    /// Copies every present field onto `item`.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(year) = self.year {
            item.year = year;
        }
        if let Some(runtime) = self.runtime {
            item.runtime = runtime;
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
    }
}

/// Checks item field constraints against the current UTC year.
pub fn validate_item(v: &mut Validator, item: &Item) {
    validate_item_for_year(v, item, Utc::now().year());
}

/// Checks item field constraints with an explicit "current" year.
pub fn validate_item_for_year(v: &mut Validator, item: &Item, current_year: i32) {
    v.check(!item.title.is_empty(), "title", "must be provided");
    v.check(
        item.title.len() <= TITLE_MAX_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(item.year != 0, "year", "must be provided");
    v.check(item.year >= EARLIEST_YEAR, "year", "must be greater than 1888");
    v.check(item.year <= current_year, "year", "must not be in the future");

    v.check(!item.runtime.is_zero(), "runtime", "must be provided");
    v.check(item.runtime.minutes() > 0, "runtime", "must be a positive integer");

    v.check(item.tags.len() >= MIN_TAGS, "tags", "must contain at least 1 tag");
    v.check(item.tags.len() <= MAX_TAGS, "tags", "must not contain more than 5 tags");
    v.check(unique(&item.tags), "tags", "must not contain duplicate values");
}

#[cfg(test)]
mod tests {
    use super::{validate_item_for_year, Item, ItemPatch, NewItem};
    use crate::model::runtime::Runtime;
    use crate::validator::Validator;

    fn valid_item() -> Item {
        Item::new("Alpha", 2000, Runtime(90), vec!["drama".to_string()])
    }

    fn check(item: &Item) -> Result<(), crate::ValidationErrors> {
        let mut v = Validator::new();
        validate_item_for_year(&mut v, item, 2026);
        v.finish()
    }

    #[test]
    fn valid_item_passes() {
        check(&valid_item()).unwrap();
    }

    #[test]
    fn all_violations_are_reported_at_once() {
        let item = Item::new("", 0, Runtime(0), Vec::new());
        let errors = check(&item).unwrap_err();
        assert_eq!(errors.get("title"), Some("must be provided"));
        assert_eq!(errors.get("year"), Some("must be provided"));
        assert_eq!(errors.get("runtime"), Some("must be provided"));
        assert_eq!(errors.get("tags"), Some("must contain at least 1 tag"));
    }

    #[test]
    fn title_limit_is_measured_in_bytes() {
        let mut item = valid_item();
        item.title = "é".repeat(251);
        assert_eq!(
            check(&item).unwrap_err().get("title"),
            Some("must not be more than 500 bytes long")
        );
        item.title = "a".repeat(500);
        check(&item).unwrap();
    }

    #[test]
    fn year_bounds() {
        let mut item = valid_item();
        item.year = 1887;
        assert_eq!(check(&item).unwrap_err().get("year"), Some("must be greater than 1888"));
        item.year = 1888;
        check(&item).unwrap();
        item.year = 2027;
        assert_eq!(check(&item).unwrap_err().get("year"), Some("must not be in the future"));
    }

    #[test]
    fn negative_runtime_is_rejected() {
        let mut item = valid_item();
        item.runtime = Runtime(-5);
        assert_eq!(
            check(&item).unwrap_err().get("runtime"),
            Some("must be a positive integer")
        );
    }

    #[test]
    fn tag_count_and_uniqueness() {
        let mut item = valid_item();
        item.tags = (0..6).map(|i| format!("t{i}")).collect();
        assert_eq!(
            check(&item).unwrap_err().get("tags"),
            Some("must not contain more than 5 tags")
        );
        item.tags = vec!["drama".into(), "drama".into()];
        assert_eq!(
            check(&item).unwrap_err().get("tags"),
            Some("must not contain duplicate values")
        );
        item.tags = vec!["Drama".into(), "drama".into()];
        check(&item).unwrap();
    }

    #[test]
    fn serialized_form_hides_created_at_and_formats_runtime() {
        let mut item = valid_item();
        item.id = 7;
        item.version = 1;
        item.created_at = Some(chrono::Utc::now());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "title": "Alpha",
                "year": 2000,
                "runtime": "90 mins",
                "tags": ["drama"],
                "version": 1
            })
        );
    }

    #[test]
    fn serialized_form_omits_unset_fields() {
        let json = serde_json::to_value(Item::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 0, "title": "", "version": 0 })
        );
    }

    #[test]
    fn new_item_rejects_malformed_runtime() {
        let err = serde_json::from_str::<NewItem>(
            r#"{"title":"Alpha","year":2000,"runtime":90,"tags":["drama"]}"#,
        )
        .unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let patch: ItemPatch = serde_json::from_str(r#"{"year": 1999}"#).unwrap();
        let mut item = valid_item();
        patch.apply_to(&mut item);
        assert_eq!(item.year, 1999);
        assert_eq!(item.title, "Alpha");
        assert_eq!(item.runtime, Runtime(90));
        assert!(!patch.is_empty());
        assert!(ItemPatch::default().is_empty());
    }

    #[test]
    fn patch_can_set_explicit_zero() {
        let patch = ItemPatch {
            year: Some(0),
            ..ItemPatch::default()
        };
        let mut item = valid_item();
        patch.apply_to(&mut item);
        assert_eq!(item.year, 0);
        assert_eq!(check(&item).unwrap_err().get("year"), Some("must be provided"));
    }
}
