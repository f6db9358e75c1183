//! Session cache behaviour through the engine

use crate::common::{start_time, TestEngine};
use chrono::Duration;
use fedsearch::core::cache::{CacheStore, FileCacheStore};
use fedsearch::core::config::Config;
use fedsearch::core::types::{CallerContext, SearchOptions};
use std::sync::Arc;
use tempfile::TempDir;

fn alpha_only() -> SearchOptions {
    SearchOptions::new().with_backends([1])
}

/// Config whose housekeeping sweep never fires during a test
fn long_sweep_config() -> Config {
    let mut config = Config::default();
    config.cache.sweep_after_secs = 365 * 24 * 3600;
    config
}

#[test]
fn test_same_query_within_window_reuses_entry() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(7);

    t.engine
        .query(&mut ctx, "foo", 0, 5, &alpha_only())
        .unwrap();
    let before = t.engine.session_entry(&ctx).unwrap().unwrap();
    let executions = t.backend.execution_count();

    t.clock.advance(Duration::minutes(5));
    let page = t
        .engine
        .query(&mut ctx, "foo", 0, 5, &alpha_only())
        .unwrap();

    let after = t.engine.session_entry(&ctx).unwrap().unwrap();
    assert_eq!(before, after, "reused entry must be untouched");
    assert_eq!(t.backend.execution_count(), executions);
    assert_eq!(page.total, before.total);
    assert_eq!(page.duration, before.duration);
}

#[test]
fn test_different_query_recomputes() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(7);

    t.engine
        .query(&mut ctx, "foo", 0, 5, &alpha_only())
        .unwrap();
    t.engine
        .query(&mut ctx, "bar", 0, 5, &alpha_only())
        .unwrap();

    let entry = t.engine.session_entry(&ctx).unwrap().unwrap();
    assert_eq!(entry.query, "bar");
    assert_eq!(entry.total, 1);
    assert_eq!(t.backend.execution_count(), 2);
}

#[test]
fn test_entry_older_than_window_recomputes() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(7);

    t.engine
        .query(&mut ctx, "foo", 0, 5, &alpha_only())
        .unwrap();
    t.clock.advance(Duration::minutes(11));
    t.engine
        .query(&mut ctx, "foo", 0, 5, &alpha_only())
        .unwrap();

    assert_eq!(t.backend.execution_count(), 2);
    let entry = t.engine.session_entry(&ctx).unwrap().unwrap();
    assert_eq!(entry.query_time, start_time() + Duration::minutes(11));
}

#[test]
fn test_clear_all_with_cutoff_keeps_recent_sessions() {
    let t = TestEngine::with_config(&long_sweep_config());
    let now = start_time();

    let mut old = CallerContext::for_user(1);
    t.clock.set(now - Duration::days(60));
    t.engine.query(&mut old, "foo", 0, 5, &alpha_only()).unwrap();

    t.clock.set(now);
    let mut recent = Vec::new();
    for user in 2..=10 {
        let mut ctx = CallerContext::for_user(user);
        t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();
        recent.push(ctx);
    }
    assert_eq!(t.engine.cache().entries().unwrap().len(), 10);
    let survivors_before: Vec<_> = recent
        .iter()
        .map(|ctx| t.engine.session_entry(ctx).unwrap().unwrap())
        .collect();

    let removed = t
        .engine
        .clear_all_cache(Some(now - Duration::days(30)))
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(t.engine.cache().entries().unwrap().len(), 9);
    assert!(t.engine.session_entry(&old).unwrap().is_none());
    assert!(!t.backend.has_session(old.session_id.as_deref().unwrap()));
    let survivors_after: Vec<_> = recent
        .iter()
        .map(|ctx| t.engine.session_entry(ctx).unwrap().unwrap())
        .collect();
    assert_eq!(survivors_before, survivors_after);
}

#[test]
fn test_clear_all_without_cutoff_removes_everything() {
    let t = TestEngine::new();
    for user in 1..=3 {
        let mut ctx = CallerContext::for_user(user);
        t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();
    }

    assert_eq!(t.engine.clear_all_cache(None).unwrap(), 3);
    assert!(t.engine.cache().entries().unwrap().is_empty());
    assert_eq!(t.backend.session_count(), 0);

    // Idempotent
    assert_eq!(t.engine.clear_all_cache(None).unwrap(), 0);
}

#[test]
fn test_swept_session_is_recreated() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(4);

    t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();
    let first = ctx.session_id.clone().unwrap();

    // Past the housekeeping window: the next query sweeps the old session
    t.clock.advance(Duration::hours(2));
    let page = t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();

    let second = ctx.session_id.clone().unwrap();
    assert_ne!(first, second);
    assert!(page.is_success());
    assert_eq!(page.total, 7);
    assert!(t.engine.cache().entry(&first).unwrap().is_none());
}

#[test]
fn test_clear_cache_only_drops_own_session() {
    let t = TestEngine::new();
    let mut mine = CallerContext::for_user(1);
    let mut other = CallerContext::for_user(2);
    t.engine.query(&mut mine, "foo", 0, 5, &alpha_only()).unwrap();
    t.engine.query(&mut other, "foo", 0, 5, &alpha_only()).unwrap();
    let my_session = mine.session_id.clone().unwrap();

    t.engine.clear_cache(&mut mine).unwrap();

    assert!(mine.session_id.is_none());
    assert!(t.engine.cache().entry(&my_session).unwrap().is_none());
    assert!(!t.backend.has_session(&my_session));
    assert!(t.engine.session_entry(&other).unwrap().is_some());

    // No session: no-op
    t.engine.clear_cache(&mut mine).unwrap();
}

#[test]
fn test_concurrent_queries_on_one_session_execute_once() {
    let t = TestEngine::new();
    let mut ctx = CallerContext::for_user(9);
    t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();
    assert_eq!(t.backend.execution_count(), 1);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = Arc::clone(&t.engine);
            let mut ctx = ctx.clone();
            scope.spawn(move || {
                let page = engine.query(&mut ctx, "bar", 0, 5, &alpha_only()).unwrap();
                assert_eq!(page.total, 1);
            });
        }
    });

    assert_eq!(t.backend.execution_count(), 2);
}

#[test]
fn test_file_store_persists_entries() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("cache.json");
    let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(&path));
    let t = TestEngine::with_store(&Config::default(), store);
    let mut ctx = CallerContext::for_user(3);

    t.engine.query(&mut ctx, "foo", 0, 5, &alpha_only()).unwrap();

    let reopened = FileCacheStore::new(&path);
    let entry = reopened
        .get(ctx.session_id.as_deref().unwrap())
        .unwrap()
        .expect("entry should be on disk");
    assert_eq!(entry.query, "foo");
    assert_eq!(entry.total, 7);
}
