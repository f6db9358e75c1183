//! End-to-end engine behaviour over the fixture dataset

use crate::common::TestEngine;
use fedsearch::core::engine::Indexable;
use fedsearch::core::error::FedError;
use fedsearch::core::types::{CallerContext, EntityKind, SearchOptions};

#[test]
fn test_empty_query_matches_everything_on_one_backend() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "", 0, 10, &SearchOptions::new().with_backends([2]))
        .unwrap();

    assert!(page.is_success(), "unexpected error: {}", page.error);
    assert_eq!(page.query, "all");
    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 3);
}

#[test]
fn test_default_options_search_every_backend() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "", 0, 20, &SearchOptions::new())
        .unwrap();

    assert_eq!(page.total, 11);
    // Backends run in declaration order
    assert_eq!(page.records.first().map(|r| r.backend_id), Some(1));
    assert_eq!(page.records.last().map(|r| r.backend_id), Some(2));
}

#[test]
fn test_consecutive_pages_are_contiguous() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let options = SearchOptions::new();

    let whole = t.engine.query(&mut ctx, "foo", 0, 8, &options).unwrap();
    let first = t.engine.query(&mut ctx, "foo", 0, 4, &options).unwrap();
    let second = t.engine.query(&mut ctx, "foo", 4, 4, &options).unwrap();

    assert_eq!(whole.total, 10);
    let ids = |page: &fedsearch::ResultPage| {
        page.records
            .iter()
            .map(|r| (r.backend_id, r.record_id, r.rank))
            .collect::<Vec<_>>()
    };
    let mut joined = ids(&first);
    joined.extend(ids(&second));
    assert_eq!(joined, ids(&whole));
    assert_eq!(second.offset, 4);
    assert_eq!(second.records.first().map(|r| r.rank), Some(4));
}

#[test]
fn test_page_size_is_clamped() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 0, &SearchOptions::new())
        .unwrap();
    assert_eq!(page.records.len(), 10, "0 means the default page size");
}

#[test]
fn test_date_range_filters_records() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let options = SearchOptions::new().with_backends([1]).with_date_range(
        vec!["Created".to_string(), "Modified".to_string()],
        chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
        None,
    );

    let page = t.engine.query(&mut ctx, "", 0, 10, &options).unwrap();

    let ids: Vec<u64> = page.records.iter().map(|r| r.record_id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_suggestions_match_distinct_proposals() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "*:foo", 0, 10, &SearchOptions::new())
        .unwrap();

    let values: Vec<&str> = page
        .suggestions
        .iter()
        .map(|s| s.proposed_value.as_str())
        .collect();
    assert_eq!(values, vec!["fu", "bar"]);
    assert!(page.suggestions.iter().all(|s| s.original_term == "foo"));

    let panel = page.proposals.expect("panel should be rendered");
    assert!(panel.contains("<div class='proposals'>"));
    assert!(panel.contains("Proposals for term &quot;foo&quot;"));
    assert!(!panel.contains("<h1"), "single group has no backend heading");
}

#[test]
fn test_suggestions_survive_cache_reuse() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let options = SearchOptions::new();

    let first = t.engine.query(&mut ctx, "*:foo", 0, 5, &options).unwrap();
    let executions = t.backend.execution_count();
    let second = t.engine.query(&mut ctx, "*:foo", 5, 5, &options).unwrap();

    assert_eq!(t.backend.execution_count(), executions);
    assert_eq!(first.suggestions, second.suggestions);
    assert_eq!(first.proposals, second.proposals);
}

#[test]
fn test_plain_query_has_no_proposals() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 5, &SearchOptions::new())
        .unwrap();

    assert!(page.suggestions.is_empty());
    assert!(page.proposals.is_none());
}

#[test]
fn test_failed_backend_is_skipped() {
    let t = TestEngine::new();
    t.backend.set_available(2, false);
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 20, &SearchOptions::new())
        .unwrap();

    assert!(page.is_success());
    assert_eq!(page.total, 7);
    assert!(page.records.iter().all(|r| r.backend_id == 1));
}

#[test]
fn test_all_backends_failing_yields_error_page() {
    let t = TestEngine::new();
    t.backend.set_available(1, false);
    t.backend.set_available(2, false);
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 20, &SearchOptions::new())
        .unwrap();

    assert_eq!(page.error, "Unable to execute query");
    assert!(page.records.is_empty());
    assert_eq!(page.total, 0);

    // Nothing was cached for the failed query
    let entry = t.engine.session_entry(&ctx).unwrap().unwrap();
    assert_eq!(entry.query, "");
}

#[test]
fn test_failed_recompute_does_not_reuse_cleared_cursor() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let options = SearchOptions::new().with_backends([1]);

    let first = t.engine.query(&mut ctx, "foo", 0, 20, &options).unwrap();
    assert_eq!(first.records.len(), 7);

    t.backend.set_available(1, false);
    let failed = t.engine.query(&mut ctx, "bar", 0, 20, &options).unwrap();
    assert_eq!(failed.error, "Unable to execute query");

    // The earlier "foo" row must not be served from the emptied cursor
    t.backend.set_available(1, true);
    let again = t.engine.query(&mut ctx, "foo", 0, 20, &options).unwrap();
    assert!(again.is_success(), "unexpected error: {}", again.error);
    assert_eq!(again.total, 7);
    assert_eq!(again.records.len(), 7);
}

#[test]
fn test_huge_offset_yields_empty_page() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "", usize::MAX, 10, &SearchOptions::new())
        .unwrap();

    assert!(page.is_success(), "unexpected error: {}", page.error);
    assert!(page.records.is_empty());
    assert!(page.total > 0);
}

#[test]
fn test_error_page_is_localized() {
    let t = TestEngine::new();
    t.backend.set_available(1, false);
    t.backend.set_available(2, false);
    let mut ctx = CallerContext::for_user(1);
    let mut options = SearchOptions::new();
    options.locale = "fr_FR".to_string();

    let page = t.engine.query(&mut ctx, "foo", 0, 20, &options).unwrap();
    assert_eq!(page.error, "Impossible d'executer la requete");
}

#[test]
fn test_unparsable_query_yields_error_page() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo AND (", 0, 20, &SearchOptions::new())
        .unwrap();

    assert!(!page.is_success());
    assert_eq!(t.backend.execution_count(), 0);
}

#[test]
fn test_unreachable_server_is_fatal() {
    let t = TestEngine::new();
    t.backend.set_reachable(false);
    let mut ctx = CallerContext::for_user(1);

    let err = t
        .engine
        .query(&mut ctx, "foo", 0, 20, &SearchOptions::new())
        .unwrap_err();
    assert!(matches!(err, FedError::Connection(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_removed_record_is_skipped_but_ranks_hold() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let options = SearchOptions::new().with_backends([1]);

    t.engine.query(&mut ctx, "foo", 0, 10, &options).unwrap();
    t.engine
        .remove(Indexable::Record {
            backend: 1,
            record: 2,
        })
        .unwrap();

    // Same text inside the window: the cursor is reused
    let page = t.engine.query(&mut ctx, "foo", 0, 10, &options).unwrap();

    assert_eq!(page.total, 7);
    let ranks: Vec<usize> = page.records.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![0, 2, 3, 4, 5, 6]);
}

#[test]
fn test_group_mode_returns_stories_only() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);
    let mut options = SearchOptions::new();
    options.search_mode = fedsearch::SearchMode::RecordGroup;

    let page = t.engine.query(&mut ctx, "", 0, 10, &options).unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].kind, EntityKind::Story);
    assert_eq!(page.records[0].record_id, 8);
}

#[test]
fn test_excerpt_highlights_query_terms() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(1);

    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 1, &SearchOptions::new().with_backends([2]))
        .unwrap();
    let record = &page.records[0];

    let excerpt = t
        .engine
        .excerpt(&ctx, record, &["Title".to_string(), "Missing".to_string()])
        .unwrap();

    assert_eq!(excerpt.len(), 1);
    assert_eq!(
        excerpt["Title"].get(&1).map(String::as_str),
        Some("[[em]]foo[[/em]] beta 1")
    );
}

#[test]
fn test_update_flags_record_for_reindex() {
    let t = TestEngine::new();

    t.engine
        .update(Indexable::Record {
            backend: 1,
            record: 5,
        })
        .unwrap();
    assert_eq!(t.backend.record_status(1, 5), Some(4));

    t.engine
        .remove(Indexable::Story {
            backend: 1,
            record: 8,
        })
        .unwrap();
    assert_eq!(t.backend.record_status(1, 8), None);
}

#[test]
fn test_feed_entries_cannot_be_indexed() {
    let t = TestEngine::new();

    let err = t.engine.add(Indexable::FeedEntry { id: 12 }).unwrap_err();
    assert!(matches!(err, FedError::UnsupportedOperation(_)));
    assert!(!err.is_fatal());
}

#[test]
fn test_metadata_surface() {
    let t = TestEngine::new();

    assert_eq!(t.engine.name(), "fedsearch");
    assert_eq!(
        t.engine.available_types(),
        vec![EntityKind::Record, EntityKind::Story]
    );
    assert_eq!(t.engine.available_date_fields(), vec!["Created", "Modified"]);
    assert_eq!(t.engine.available_order("en")[0].0, "desc");
    assert_eq!(t.engine.available_sort("fr")[0].1, "Pas de tri");
    assert!(t.engine.has_stemming());
    assert!(!t.engine.is_stemming_enabled());
    assert!(t.engine.autocomplete("fo").is_empty());

    let status = t.engine.status().unwrap();
    assert_eq!(status[0], ("engine".to_string(), "memory".to_string()));
}
