//! Session-scoped result cache
//!
//! Each backend session owns one [`SessionCacheEntry`] holding the last
//! executed query text, when it ran, and its aggregate duration and
//! total. A request reuses the entry unless it is stale: different text
//! or older than the staleness window.
//!
//! The read-decide-write sequence for one session is serialized through
//! [`SessionCache::serialized`]; different sessions never contend.

pub mod store;

use crate::core::backend::IndexBackend;
use crate::core::clock::Clock;
use crate::core::error::Result;
use crate::core::types::{CallerContext, SessionCacheEntry};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

pub use store::{CacheStore, FileCacheStore, MemoryCacheStore};

/// Entries older than this are recomputed
pub const DEFAULT_STALE_AFTER_SECS: u64 = 600;

/// Housekeeping sweep cutoff applied before every query
pub const DEFAULT_SWEEP_AFTER_SECS: u64 = 3600;

/// Staleness by content or age. A missing entry is always stale.
pub fn is_stale(
    entry: Option<&SessionCacheEntry>,
    query_text: &str,
    now: DateTime<Utc>,
    max_age: Duration,
) -> bool {
    match entry {
        None => true,
        Some(entry) => entry.query != query_text || now - entry.query_time > max_age,
    }
}

/// Outcome of the cache decision for one request
#[derive(Debug, Clone, PartialEq)]
pub enum CacheDecision {
    Reuse(SessionCacheEntry),
    Recompute,
}

pub struct SessionCache {
    store: Arc<dyn CacheStore>,
    backend: Arc<dyn IndexBackend>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        backend: Arc<dyn IndexBackend>,
        clock: Arc<dyn Clock>,
        stale_after: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            clock,
            stale_after,
            locks: DashMap::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` while holding the lock of `session_id`
    pub fn serialized<T>(&self, session_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    pub fn entry(&self, session_id: &str) -> Result<Option<SessionCacheEntry>> {
        self.store.get(session_id)
    }

    pub fn entries(&self) -> Result<Vec<SessionCacheEntry>> {
        self.store.list()
    }

    /// Row for a newly created backend session
    pub fn register(&self, session_id: &str) -> Result<()> {
        if self.store.get(session_id)?.is_none() {
            self.store
                .upsert(SessionCacheEntry::created(session_id, self.now()))?;
        }
        Ok(())
    }

    /// Decide reuse vs. recompute; never writes
    pub fn decide(&self, session_id: &str, query_text: &str, force: bool) -> Result<CacheDecision> {
        let entry = self.store.get(session_id)?;
        let stale = force || is_stale(entry.as_ref(), query_text, self.now(), self.stale_after);

        tracing::debug!(
            session = %session_id,
            query = %query_text,
            stale,
            forced = force,
            "Cache decision"
        );

        match entry {
            Some(entry) if !stale => Ok(CacheDecision::Reuse(entry)),
            _ => Ok(CacheDecision::Recompute),
        }
    }

    /// Single write path after a real execution
    pub fn record_execution(
        &self,
        session_id: &str,
        query_text: &str,
        duration: f64,
        total: u64,
    ) -> Result<SessionCacheEntry> {
        let now = self.now();
        let mut entry = self
            .store
            .get(session_id)?
            .unwrap_or_else(|| SessionCacheEntry::created(session_id, now));
        entry.query = query_text.to_string();
        entry.query_time = now;
        entry.duration = duration;
        entry.total = total;
        entry.last_access = now;

        self.store.upsert(entry.clone())?;
        Ok(entry)
    }

    /// Mark the row as describing no cursor, so the next request for any
    /// text recomputes. Used after the cursor was cleared but nothing was
    /// executed into it.
    pub fn invalidate(&self, session_id: &str) -> Result<()> {
        let now = self.now();
        let mut entry = self
            .store
            .get(session_id)?
            .unwrap_or_else(|| SessionCacheEntry::created(session_id, now));
        entry.query.clear();
        entry.duration = 0.0;
        entry.total = 0;
        entry.last_access = now;

        self.store.upsert(entry)?;
        tracing::debug!(session = %session_id, "Cache row invalidated");
        Ok(())
    }

    /// Close the caller's backend session and drop its row.
    /// No-op when the caller has no session.
    pub fn clear_session(&self, ctx: &mut CallerContext) -> Result<()> {
        let Some(session_id) = ctx.session_id.take() else {
            return Ok(());
        };
        self.serialized(&session_id, || {
            self.backend.close_session(&session_id);
            self.store.remove(&session_id)
        })?;
        self.release_lock(&session_id);
        tracing::info!(session = %session_id, "Session cache cleared");
        Ok(())
    }

    /// Close and drop every session with `last_access <= cutoff`
    /// (default: now). Returns the number of rows removed.
    pub fn clear_all(&self, cutoff: Option<DateTime<Utc>>) -> Result<usize> {
        let cutoff = cutoff.unwrap_or_else(|| self.now());
        let expired = self.store.expired(cutoff)?;

        let mut removed = 0;
        for session_id in &expired {
            let swept = self.serialized(session_id, || -> Result<bool> {
                // A request may have touched the row while we waited
                let still_expired = self
                    .store
                    .get(session_id)?
                    .is_some_and(|entry| entry.last_access <= cutoff);
                if !still_expired {
                    return Ok(false);
                }
                self.backend.close_session(session_id);
                self.store.remove(session_id)
            })?;
            if swept {
                removed += 1;
            }
            self.release_lock(session_id);
        }

        if removed > 0 {
            tracing::info!(removed, cutoff = %cutoff, "Expired sessions swept");
        }
        Ok(removed)
    }

    /// Forget the session's lock unless another request still holds or
    /// awaits it.
    fn release_lock(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
