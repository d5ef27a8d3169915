use marquee_core::db::open_store_pool_in_memory;
use marquee_core::{
    Filters, Item, ItemRepository, Metadata, Runtime, SqliteItemRepository, StoreConfig,
    StoreError,
};

fn repo() -> SqliteItemRepository {
    let config = StoreConfig::default();
    let pool = open_store_pool_in_memory(&config).unwrap();
    SqliteItemRepository::new(pool, &config)
}

fn insert(repo: &SqliteItemRepository, title: &str, year: i32, runtime: i32, tags: &[&str]) -> Item {
    let mut item = Item::new(
        title,
        year,
        Runtime(runtime),
        tags.iter().map(|tag| tag.to_string()).collect(),
    );
    repo.insert(&mut item).unwrap();
    item
}

fn page(page: u32, page_size: u32, sort: &str) -> Filters {
    Filters {
        page,
        page_size,
        sort: sort.to_string(),
        ..Filters::default()
    }
}

fn titles(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.title.as_str()).collect()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn unfiltered_list_pages_through_every_row_by_id() {
    let repo = repo();
    let inserted: Vec<Item> = (0..25)
        .map(|idx| insert(&repo, &format!("Item {idx:02}"), 2000, 90, &["drama"]))
        .collect();

    let mut seen = Vec::new();
    for (page_no, expected_len) in [(1, 10), (2, 10), (3, 5)] {
        let result = repo.list("", &[], &page(page_no, 10, "id")).unwrap();
        assert_eq!(result.items.len(), expected_len);
        assert_eq!(
            result.metadata,
            Metadata {
                current_page: page_no,
                page_size: 10,
                first_page: 1,
                last_page: 3,
                total_records: 25,
            }
        );
        seen.extend(result.items.into_iter().map(|item| item.id));
    }

    let expected: Vec<i64> = inserted.iter().map(|item| item.id).collect();
    assert_eq!(seen, expected);
}

#[test]
fn no_matches_returns_empty_page_with_zeroed_metadata() {
    let repo = repo();
    insert(&repo, "Alpha", 2000, 90, &["drama"]);

    let result = repo.list("nonexistent", &[], &page(2, 10, "id")).unwrap();
    assert!(result.items.is_empty());
    assert_eq!(
        result.metadata,
        Metadata {
            current_page: 2,
            page_size: 10,
            ..Metadata::default()
        }
    );
}

#[test]
fn title_search_requires_every_term() {
    let repo = repo();
    insert(&repo, "The Black Panther", 2018, 134, &["action"]);
    insert(&repo, "Black Swan", 2010, 108, &["drama"]);
    insert(&repo, "Pink Panther", 2006, 93, &["comedy"]);

    let result = repo.list("panther", &[], &page(1, 20, "id")).unwrap();
    assert_eq!(titles(&result.items), vec!["The Black Panther", "Pink Panther"]);

    let result = repo.list("BLACK panther", &[], &page(1, 20, "id")).unwrap();
    assert_eq!(titles(&result.items), vec!["The Black Panther"]);
    assert_eq!(result.metadata.total_records, 1);
}

#[test]
fn search_follows_title_updates() {
    let repo = repo();
    let mut item = insert(&repo, "Working Title", 2000, 90, &["drama"]);
    item.title = "Final Cut".to_string();
    repo.update(&mut item).unwrap();

    assert!(repo.list("working", &[], &Filters::default()).unwrap().items.is_empty());
    assert_eq!(
        repo.list("final", &[], &Filters::default()).unwrap().items.len(),
        1
    );
}

#[test]
fn search_text_with_fts_syntax_is_treated_as_plain_terms() {
    let repo = repo();
    insert(&repo, "Alpha Beta", 2000, 90, &["drama"]);

    for text in ["a:b", "\"unterminated", "alpha OR", "NEAR(alpha"] {
        let result = repo.list(text, &[], &Filters::default());
        assert!(result.is_ok(), "`{text}` should not fail: {result:?}");
    }
}

#[test]
fn whitespace_only_search_text_matches_nothing() {
    let repo = repo();
    insert(&repo, "Alpha", 2000, 90, &["drama"]);

    let result = repo.list("   ", &[], &Filters::default()).unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.metadata.total_records, 0);

    let result = repo.list("", &[], &Filters::default()).unwrap();
    assert_eq!(titles(&result.items), vec!["Alpha"]);
}

#[test]
fn tag_filter_requires_superset_with_exact_case() {
    let repo = repo();
    insert(&repo, "Both", 2000, 90, &["drama", "comedy"]);
    insert(&repo, "Drama only", 2000, 90, &["drama"]);
    insert(&repo, "Capitalized", 2000, 90, &["Drama", "comedy"]);

    let result = repo
        .list("", &tags(&["drama", "comedy"]), &page(1, 20, "id"))
        .unwrap();
    assert_eq!(titles(&result.items), vec!["Both"]);

    let result = repo.list("", &tags(&["drama"]), &page(1, 20, "id")).unwrap();
    assert_eq!(titles(&result.items), vec!["Both", "Drama only"]);

    let result = repo
        .list("", &tags(&["drama", "drama"]), &page(1, 20, "id"))
        .unwrap();
    assert_eq!(result.metadata.total_records, 2);

    let result = repo.list("", &tags(&["dram"]), &page(1, 20, "id")).unwrap();
    assert!(result.items.is_empty());
}

#[test]
fn search_and_tag_filter_combine() {
    let repo = repo();
    insert(&repo, "Night Train", 1990, 100, &["thriller"]);
    insert(&repo, "Night Garden", 1995, 80, &["family"]);

    let result = repo
        .list("night", &tags(&["family"]), &page(1, 20, "id"))
        .unwrap();
    assert_eq!(titles(&result.items), vec!["Night Garden"]);
}

#[test]
fn sort_key_and_direction_with_id_tie_break() {
    let repo = repo();
    let a = insert(&repo, "Charlie", 2001, 120, &["drama"]);
    let b = insert(&repo, "Alpha", 2001, 90, &["drama"]);
    let c = insert(&repo, "Bravo", 1999, 90, &["drama"]);

    let by_title = repo.list("", &[], &page(1, 20, "title")).unwrap();
    assert_eq!(titles(&by_title.items), vec!["Alpha", "Bravo", "Charlie"]);

    let by_year_desc = repo.list("", &[], &page(1, 20, "-year")).unwrap();
    let ids: Vec<i64> = by_year_desc.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);

    let by_runtime = repo.list("", &[], &page(1, 20, "runtime")).unwrap();
    let ids: Vec<i64> = by_runtime.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);

    let by_id_desc = repo.list("", &[], &page(1, 20, "-id")).unwrap();
    let ids: Vec<i64> = by_id_desc.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);
}

#[test]
fn unsafelisted_sort_key_is_refused_before_querying() {
    let repo = repo();
    insert(&repo, "Alpha", 2000, 90, &["drama"]);

    let injected = Filters {
        sort: "year; DROP TABLE items".to_string(),
        ..Filters::default()
    };
    let err = repo.list("", &[], &injected).unwrap_err();
    assert!(matches!(err, StoreError::UnsafeSort(ref key) if key == "year; DROP TABLE items"));

    let safelisted_unknown = Filters {
        sort: "created_at".to_string(),
        sort_safelist: tags(&["created_at"]),
        ..Filters::default()
    };
    assert!(matches!(
        repo.list("", &[], &safelisted_unknown),
        Err(StoreError::UnsafeSort(_))
    ));

    assert_eq!(repo.list("", &[], &Filters::default()).unwrap().items.len(), 1);
}

#[test]
fn page_past_the_end_is_empty() {
    let repo = repo();
    for idx in 0..3 {
        insert(&repo, &format!("Item {idx}"), 2000, 90, &["drama"]);
    }

    let result = repo.list("", &[], &page(5, 2, "id")).unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.metadata.current_page, 5);
    assert_eq!(result.metadata.total_records, 0);
}
