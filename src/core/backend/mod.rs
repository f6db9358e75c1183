//! Index backend interface
//!
//! The engine talks to its index through [`IndexBackend`]: connection,
//! per-user sessions with a server-side result cursor, query execution
//! and paging. [`MemoryBackend`] is an in-process implementation loaded
//! from a JSON dataset.

pub mod memory;

use crate::core::catalog::BackendCatalog;
use crate::core::error::Result;
use crate::core::query::{Expr, ThesaurusSource};
use crate::core::types::{
    BackendExecutionResult, BackendId, CollectionId, EntityKind, RecordId, UserId,
};
use serde::{Deserialize, Serialize};

pub use memory::MemoryBackend;

/// Parameters of the backend connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// One compiled query to run against one backend
#[derive(Debug, Clone)]
pub struct ExecuteRequest<'a> {
    pub session_id: &'a str,
    pub backend: BackendId,
    /// Authorized collections of this backend
    pub collections: &'a [CollectionId],
    pub query: &'a Expr,
    pub secret: &'a str,
    pub user_id: UserId,
    /// Restrict matches to record groups
    pub group_only: bool,
    /// `+`/`-`, then `0`, then the field name; empty for no sort
    pub sort_spec: &'a str,
    /// Collections of this backend where business fields are searchable
    pub business_collections: &'a [CollectionId],
    /// Set only when stemming was requested
    pub stemming_locale: Option<&'a str>,
}

/// Markers wrapped around matched terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub open: String,
    pub close: String,
}

impl Highlight {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// A field value carried by a fetched hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitField {
    pub meta_id: u64,
    pub name: String,
    pub value: String,
}

/// One ranked hit as returned by [`IndexBackend::fetch_page`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHit {
    pub backend_id: BackendId,
    pub record_id: RecordId,
    /// `None` when the record no longer resolves in the index
    pub collection_id: Option<CollectionId>,
    pub kind: EntityKind,
    pub title: Option<String>,
    pub fields: Vec<HitField>,
}

/// Operations the engine depends on
pub trait IndexBackend: ThesaurusSource {
    /// Backend, collection and field metadata
    fn catalog(&self) -> BackendCatalog;

    fn connect(&self, params: &ConnectionParams) -> Result<()>;

    /// Re-attach to an existing session; false when it is gone
    fn open_session(&self, session_id: &str, user_id: UserId) -> bool;

    fn create_session(&self, user_id: UserId) -> Result<String>;

    /// `Ok(None)` when the backend returned no result for this query
    fn execute(&self, request: &ExecuteRequest<'_>) -> Result<Option<BackendExecutionResult>>;

    /// Hits `start..start + count` of the session cursor (1-based start).
    /// `None` when the backend has no usable result structure.
    fn fetch_page(
        &self,
        session_id: &str,
        start: usize,
        count: usize,
        highlight: Option<&Highlight>,
    ) -> Option<Vec<RawHit>>;

    /// Drop the session's accumulated result cursor
    fn clear_results(&self, session_id: &str);

    fn close_session(&self, session_id: &str);

    /// Ordered key/value diagnostics
    fn status_info(&self) -> Vec<(String, String)>;

    /// Flag a record for re-indexing
    fn mark_for_reindex(&self, backend: BackendId, record: RecordId) -> Result<()>;

    fn remove_record(&self, backend: BackendId, record: RecordId) -> Result<()>;
}
