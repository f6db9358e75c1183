//! Persistence of session cache rows.
//!
//! One logical table keyed by session id. `MemoryCacheStore` keeps rows
//! in process; `FileCacheStore` keeps them in a JSON file, so rows left by
//! earlier CLI invocations stay visible to `status` and get closed by
//! `sweep`. A row is only reused while its backend session is alive.

use crate::core::error::{FedError, Result};
use crate::core::types::SessionCacheEntry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Storage of [`SessionCacheEntry`] rows
pub trait CacheStore: Send + Sync {
    fn get(&self, session_id: &str) -> Result<Option<SessionCacheEntry>>;

    /// Insert or replace the row for `entry.session_id`
    fn upsert(&self, entry: SessionCacheEntry) -> Result<()>;

    /// Returns true when a row was removed
    fn remove(&self, session_id: &str) -> Result<bool>;

    /// Session ids with `last_access <= cutoff`
    fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;

    /// All rows, ordered by session id
    fn list(&self) -> Result<Vec<SessionCacheEntry>>;
}

fn expired_ids<'a>(
    rows: impl Iterator<Item = &'a SessionCacheEntry>,
    cutoff: DateTime<Utc>,
) -> Vec<String> {
    rows.filter(|e| e.last_access <= cutoff)
        .map(|e| e.session_id.clone())
        .collect()
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    rows: RwLock<BTreeMap<String, SessionCacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionCacheEntry>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(session_id).cloned())
    }

    fn upsert(&self, entry: SessionCacheEntry) -> Result<()> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.insert(entry.session_id.clone(), entry);
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<bool> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        Ok(rows.remove(session_id).is_some())
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(expired_ids(rows.values(), cutoff))
    }

    fn list(&self) -> Result<Vec<SessionCacheEntry>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.values().cloned().collect())
    }
}

/// JSON file store, rewritten on every mutation
#[derive(Debug)]
pub struct FileCacheStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, SessionCacheEntry>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            FedError::Storage(format!(
                "Corrupt cache file {}: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, rows: &BTreeMap<String, SessionCacheEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(rows)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn with_rows<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, SessionCacheEntry>) -> (T, bool),
    ) -> Result<T> {
        let _guard = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows = self.load()?;
        let (out, dirty) = f(&mut rows);
        if dirty {
            self.save(&rows)?;
        }
        Ok(out)
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionCacheEntry>> {
        self.with_rows(|rows| (rows.get(session_id).cloned(), false))
    }

    fn upsert(&self, entry: SessionCacheEntry) -> Result<()> {
        self.with_rows(|rows| {
            rows.insert(entry.session_id.clone(), entry);
            ((), true)
        })
    }

    fn remove(&self, session_id: &str) -> Result<bool> {
        self.with_rows(|rows| {
            let removed = rows.remove(session_id).is_some();
            (removed, removed)
        })
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        self.with_rows(|rows| (expired_ids(rows.values(), cutoff), false))
    }

    fn list(&self) -> Result<Vec<SessionCacheEntry>> {
        self.with_rows(|rows| (rows.values().cloned().collect(), false))
    }
}
