//! Core data types for the federated search engine.
//!
//! Search options, cache rows, per-backend execution statistics and the
//! result page handed back to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of an independently indexed backend
pub type BackendId = u32;

/// Identifier of a collection (unique across all backends)
pub type CollectionId = u32;

/// Native record identifier inside a backend
pub type RecordId = u64;

/// Authenticated user identifier
pub type UserId = u64;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Prefix used in backend sort specs
    pub fn prefix(self) -> char {
        match self {
            SortOrder::Asc => '+',
            SortOrder::Desc => '-',
        }
    }
}

/// Search mode: plain documents or record groups (stories)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Document,
    RecordGroup,
}

/// Per-backend status bit authorization map.
///
/// `bits[bit][backend] = value` requires the record status bit to equal
/// `value` on that backend. Bits below 4 are reserved for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFilter {
    bits: BTreeMap<u32, BTreeMap<BackendId, bool>>,
}

impl StatusFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `bit` to be `value` on `backend`
    pub fn require(mut self, bit: u32, backend: BackendId, value: bool) -> Self {
        self.bits.entry(bit).or_default().insert(backend, value);
        self
    }

    /// Declare `bit` as filterable without constraining any backend
    pub fn declare(mut self, bit: u32) -> Self {
        self.bits.entry(bit).or_default();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// `None` when the bit is not part of the filter at all,
    /// `Some(None)` when declared but unconstrained for this backend.
    pub fn lookup(&self, bit: u32, backend: BackendId) -> Option<Option<bool>> {
        self.bits
            .get(&bit)
            .map(|per_backend| per_backend.get(&backend).copied())
    }
}

/// Immutable per-call search options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Restrict to one record type (`image`, `video`, ...)
    pub record_type: Option<String>,

    /// Targeted backends, in declaration order
    pub backends: Vec<BackendId>,

    /// Collections the caller is authorized to search
    pub collections: Vec<CollectionId>,

    /// Restrict matching to these fields
    pub fields: Vec<String>,

    /// Date-capable fields used for the date range
    pub date_fields: Vec<String>,

    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,

    pub status: StatusFilter,

    pub sort_by: Option<String>,
    pub sort_order: SortOrder,

    pub stemming: bool,
    pub locale: String,

    pub search_mode: SearchMode,

    /// Collections where business fields are searchable
    pub business_fields_on: Vec<CollectionId>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self {
            locale: "en".to_string(),
            ..Self::default()
        }
    }

    pub fn with_backends(mut self, backends: impl IntoIterator<Item = BackendId>) -> Self {
        self.backends = backends.into_iter().collect();
        self
    }

    pub fn with_collections(mut self, collections: impl IntoIterator<Item = CollectionId>) -> Self {
        self.collections = collections.into_iter().collect();
        self
    }

    pub fn with_date_range(
        mut self,
        fields: Vec<String>,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    ) -> Self {
        self.date_fields = fields;
        self.min_date = min;
        self.max_date = max;
        self
    }

    pub fn has_date_range(&self) -> bool {
        self.min_date.is_some() || self.max_date.is_some()
    }
}

/// One row of the session cache table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCacheEntry {
    pub session_id: String,
    /// Most recently executed query text
    pub query: String,
    pub query_time: DateTime<Utc>,
    /// Accumulated backend elapsed time, in seconds
    pub duration: f64,
    pub total: u64,
    pub last_access: DateTime<Utc>,
}

impl SessionCacheEntry {
    /// Fresh row for a newly created session (never executed)
    pub fn created(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            query: String::new(),
            query_time: now,
            duration: 0.0,
            total: 0,
            last_access: now,
        }
    }
}

/// Per-backend execution statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendExecutionResult {
    /// Elapsed time in seconds
    pub elapsed: f64,
    pub hit_count: u64,
}

/// Alternate term offered to refine a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub original_term: String,
    pub proposed_value: String,
    pub hit_count: u64,
}

/// Kind of indexed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Record,
    Story,
}

/// A record resolved from a ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub backend_id: BackendId,
    pub collection_id: CollectionId,
    pub record_id: RecordId,
    /// 0-based position in the overall result order
    pub rank: usize,
    pub kind: EntityKind,
    pub title: Option<String>,
}

/// Paginated, assembled search result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultPage {
    pub records: Vec<DomainRecord>,
    pub query: String,
    /// Elapsed backend time, in seconds
    pub duration: f64,
    pub offset: usize,
    pub available: u64,
    pub total: u64,
    /// Empty on success
    pub error: String,
    pub suggestions: Vec<Suggestion>,
    pub proposals: Option<String>,
}

impl ResultPage {
    /// Non-fatal failure page: no records, populated error text
    pub fn failed(query: impl Into<String>, offset: usize, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            offset,
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Caller-side session state (stand-in for the web session)
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub user_id: Option<UserId>,
    /// Backend session bound to this caller
    pub session_id: Option<String>,
    /// Force recomputation on the next query
    pub force_refresh: bool,
}

impl CallerContext {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
