//! In-process index backend.
//!
//! Records, field descriptors and thesauri are loaded from a JSON
//! dataset. Compiled trees are evaluated record by record; each session
//! keeps a result cursor that accumulates hits across backends in
//! execution order, like a real index server would.

use crate::core::backend::{
    ConnectionParams, ExecuteRequest, Highlight, HitField, IndexBackend, RawHit,
};
use crate::core::catalog::{BackendCatalog, BackendDescriptor, FieldKind};
use crate::core::error::{FedError, Result};
use crate::core::query::{CompareOp, Expr, Thesaurus, ThesaurusSource};
use crate::core::types::{
    BackendExecutionResult, BackendId, CollectionId, EntityKind, RecordId, UserId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

const DEMO_DATASET: &str = include_str!("../../../data/demo-dataset.json");

/// Status bits reserved for indexing state
const INDEX_STATE_MASK: u64 = 0b111;
/// "To be re-indexed" flag
const REINDEX_FLAG: u64 = 0b100;

/// A field value of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    pub name: String,
    pub value: String,
}

fn default_record_type() -> String {
    "image".to_string()
}

fn default_kind() -> EntityKind {
    EntityKind::Record
}

/// A record as held by the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record_id: RecordId,
    pub collection_id: CollectionId,
    #[serde(default = "default_record_type")]
    pub record_type: String,
    #[serde(default = "default_kind")]
    pub kind: EntityKind,
    #[serde(default)]
    pub status: u64,
    #[serde(default)]
    pub fields: Vec<StoredField>,
}

impl StoredRecord {
    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    fn title(&self) -> Option<String> {
        self.values("Title").next().map(str::to_string)
    }
}

/// One backend of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendData {
    #[serde(flatten)]
    pub descriptor: BackendDescriptor,
    #[serde(default)]
    pub thesaurus: Option<Thesaurus>,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

/// Serialized form of the whole index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub backends: Vec<BackendData>,
}

struct Index {
    descriptor: BackendDescriptor,
    thesaurus: Option<Arc<Thesaurus>>,
    records: Vec<StoredRecord>,
}

#[derive(Debug, Clone, Copy)]
struct CursorHit {
    backend: BackendId,
    record: RecordId,
}

struct Cursor {
    user_id: UserId,
    hits: Vec<CursorHit>,
    /// Terms to highlight, with the stemming locale used to match them
    terms: Vec<String>,
    stemming: Option<String>,
}

pub struct MemoryBackend {
    indexes: RwLock<Vec<Index>>,
    sessions: Mutex<HashMap<String, Cursor>>,
    unavailable: RwLock<HashSet<BackendId>>,
    reachable: AtomicBool,
    connected: AtomicBool,
    next_session: AtomicU64,
    executions: AtomicUsize,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryBackend {
    pub fn new(dataset: Dataset) -> Self {
        let indexes = dataset
            .backends
            .into_iter()
            .map(|b| Index {
                descriptor: b.descriptor,
                thesaurus: b.thesaurus.map(Arc::new),
                records: b.records,
            })
            .collect();

        Self {
            indexes: RwLock::new(indexes),
            sessions: Mutex::new(HashMap::new()),
            unavailable: RwLock::new(HashSet::new()),
            reachable: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            next_session: AtomicU64::new(1),
            executions: AtomicUsize::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::new(dataset))
    }

    /// Load a dataset file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            FedError::Configuration(format!(
                "Cannot read backend dataset {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// Small bundled dataset used when no catalog is configured
    pub fn demo() -> Result<Self> {
        Self::from_json(DEMO_DATASET)
    }

    /// Toggle a single backend; an unavailable backend fails execution
    pub fn set_available(&self, backend: BackendId, available: bool) {
        let mut unavailable = write(&self.unavailable);
        if available {
            unavailable.remove(&backend);
        } else {
            unavailable.insert(backend);
        }
    }

    /// Simulate the whole server being down
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, AtomicOrdering::SeqCst);
    }

    /// Number of `execute` calls that reached an index
    pub fn execution_count(&self) -> usize {
        self.executions.load(AtomicOrdering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        lock(&self.sessions).contains_key(session_id)
    }

    /// Records currently in a session cursor
    pub fn cursor_len(&self, session_id: &str) -> Option<usize> {
        lock(&self.sessions).get(session_id).map(|c| c.hits.len())
    }

    /// Raw status word of a record
    pub fn record_status(&self, backend: BackendId, record: RecordId) -> Option<u64> {
        read(&self.indexes)
            .iter()
            .find(|i| i.descriptor.id == backend)
            .and_then(|i| i.records.iter().find(|r| r.record_id == record))
            .map(|r| r.status)
    }

    fn is_available(&self, backend: BackendId) -> bool {
        self.reachable.load(AtomicOrdering::SeqCst) && !read(&self.unavailable).contains(&backend)
    }
}

impl ThesaurusSource for MemoryBackend {
    fn thesaurus(&self, backend: BackendId) -> Result<Option<Arc<Thesaurus>>> {
        if !self.is_available(backend) {
            return Err(FedError::Connection(format!(
                "backend {backend} is unavailable"
            )));
        }
        Ok(read(&self.indexes)
            .iter()
            .find(|i| i.descriptor.id == backend)
            .and_then(|i| i.thesaurus.clone()))
    }
}

impl IndexBackend for MemoryBackend {
    fn catalog(&self) -> BackendCatalog {
        BackendCatalog::new(
            read(&self.indexes)
                .iter()
                .map(|i| i.descriptor.clone())
                .collect(),
        )
    }

    fn connect(&self, params: &ConnectionParams) -> Result<()> {
        if !self.reachable.load(AtomicOrdering::SeqCst) {
            return Err(FedError::Connection(format!(
                "cannot reach {}:{}",
                params.host, params.port
            )));
        }
        self.connected.store(true, AtomicOrdering::SeqCst);
        tracing::debug!(host = %params.host, database = %params.database, "Memory backend connected");
        Ok(())
    }

    fn open_session(&self, session_id: &str, user_id: UserId) -> bool {
        lock(&self.sessions)
            .get(session_id)
            .is_some_and(|c| c.user_id == user_id)
    }

    fn create_session(&self, user_id: UserId) -> Result<String> {
        if !self.connected.load(AtomicOrdering::SeqCst) {
            return Err(FedError::Session("backend is not connected".to_string()));
        }
        let id = format!(
            "mem-{:08x}",
            self.next_session.fetch_add(1, AtomicOrdering::SeqCst)
        );
        lock(&self.sessions).insert(
            id.clone(),
            Cursor {
                user_id,
                hits: Vec::new(),
                terms: Vec::new(),
                stemming: None,
            },
        );
        Ok(id)
    }

    fn execute(&self, request: &ExecuteRequest<'_>) -> Result<Option<BackendExecutionResult>> {
        if !self.is_available(request.backend) {
            return Err(FedError::QueryExecution {
                backend: request.backend,
                message: "backend unavailable".to_string(),
            });
        }

        let indexes = read(&self.indexes);
        let Some(index) = indexes.iter().find(|i| i.descriptor.id == request.backend) else {
            return Ok(None);
        };

        let mut sessions = lock(&self.sessions);
        let Some(cursor) = sessions.get_mut(request.session_id) else {
            return Err(FedError::QueryExecution {
                backend: request.backend,
                message: format!("unknown session {}", request.session_id),
            });
        };

        self.executions.fetch_add(1, AtomicOrdering::SeqCst);
        let started = Instant::now();

        let stemmer = request.stemming_locale.map(Stemmer::for_locale);
        let mut matched: Vec<&StoredRecord> = index
            .records
            .iter()
            .filter(|r| request.collections.contains(&r.collection_id))
            .filter(|r| !request.group_only || r.kind == EntityKind::Story)
            .filter(|r| {
                Matcher {
                    descriptor: &index.descriptor,
                    record: r,
                    business: request.business_collections.contains(&r.collection_id),
                    stemmer,
                }
                .matches(request.query, None)
            })
            .collect();

        if let Some((order, field)) = parse_sort_spec(request.sort_spec) {
            let kind = index
                .descriptor
                .field(field)
                .map(|f| f.kind)
                .unwrap_or_default();
            let descending = order == '-';
            matched.sort_by(|a, b| {
                compare_sort_keys(
                    a.values(field).next(),
                    b.values(field).next(),
                    kind,
                    descending,
                )
            });
        }

        let hit_count = matched.len() as u64;
        cursor.hits.extend(matched.iter().map(|r| CursorHit {
            backend: request.backend,
            record: r.record_id,
        }));
        for term in request.query.positive_terms() {
            if !cursor.terms.contains(&term) {
                cursor.terms.push(term);
            }
        }
        cursor.stemming = request.stemming_locale.map(str::to_string);

        Ok(Some(BackendExecutionResult {
            elapsed: started.elapsed().as_secs_f64(),
            hit_count,
        }))
    }

    fn fetch_page(
        &self,
        session_id: &str,
        start: usize,
        count: usize,
        highlight: Option<&Highlight>,
    ) -> Option<Vec<RawHit>> {
        if start == 0 || !self.reachable.load(AtomicOrdering::SeqCst) {
            return None;
        }

        let sessions = lock(&self.sessions);
        let cursor = sessions.get(session_id)?;
        let indexes = read(&self.indexes);
        let stemmer = cursor.stemming.as_deref().map(Stemmer::for_locale);

        let hits = cursor
            .hits
            .iter()
            .skip(start - 1)
            .take(count)
            .map(|hit| {
                let record = indexes
                    .iter()
                    .find(|i| i.descriptor.id == hit.backend)
                    .and_then(|i| i.records.iter().find(|r| r.record_id == hit.record));

                match record {
                    Some(record) => RawHit {
                        backend_id: hit.backend,
                        record_id: hit.record,
                        collection_id: Some(record.collection_id),
                        kind: record.kind,
                        title: record.title(),
                        fields: record
                            .fields
                            .iter()
                            .enumerate()
                            .map(|(i, f)| HitField {
                                meta_id: i as u64 + 1,
                                name: f.name.clone(),
                                value: match highlight {
                                    Some(h) => highlight_value(&f.value, &cursor.terms, stemmer, h),
                                    None => f.value.clone(),
                                },
                            })
                            .collect(),
                    },
                    None => RawHit {
                        backend_id: hit.backend,
                        record_id: hit.record,
                        collection_id: None,
                        kind: EntityKind::Record,
                        title: None,
                        fields: Vec::new(),
                    },
                }
            })
            .collect();

        Some(hits)
    }

    fn clear_results(&self, session_id: &str) {
        if let Some(cursor) = lock(&self.sessions).get_mut(session_id) {
            cursor.hits.clear();
            cursor.terms.clear();
            cursor.stemming = None;
        }
    }

    fn close_session(&self, session_id: &str) {
        lock(&self.sessions).remove(session_id);
    }

    fn status_info(&self) -> Vec<(String, String)> {
        let indexes = read(&self.indexes);
        let records: usize = indexes.iter().map(|i| i.records.len()).sum();
        vec![
            ("engine".to_string(), "memory".to_string()),
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
            (
                "connected".to_string(),
                self.connected.load(AtomicOrdering::SeqCst).to_string(),
            ),
            ("backends".to_string(), indexes.len().to_string()),
            ("records".to_string(), records.to_string()),
            ("sessions".to_string(), self.session_count().to_string()),
            ("executions".to_string(), self.execution_count().to_string()),
        ]
    }

    fn mark_for_reindex(&self, backend: BackendId, record: RecordId) -> Result<()> {
        let mut indexes = write(&self.indexes);
        let stored = indexes
            .iter_mut()
            .find(|i| i.descriptor.id == backend)
            .and_then(|i| i.records.iter_mut().find(|r| r.record_id == record))
            .ok_or_else(|| {
                FedError::Storage(format!("record {record} not found on backend {backend}"))
            })?;
        stored.status = (stored.status & !INDEX_STATE_MASK) | REINDEX_FLAG;
        Ok(())
    }

    fn remove_record(&self, backend: BackendId, record: RecordId) -> Result<()> {
        let mut indexes = write(&self.indexes);
        let index = indexes
            .iter_mut()
            .find(|i| i.descriptor.id == backend)
            .ok_or_else(|| FedError::Storage(format!("unknown backend {backend}")))?;
        let before = index.records.len();
        index.records.retain(|r| r.record_id != record);
        if index.records.len() == before {
            return Err(FedError::Storage(format!(
                "record {record} not found on backend {backend}"
            )));
        }
        Ok(())
    }
}

/// Suffix-stripping stemmer for the supported locales
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stemmer {
    English,
    French,
    Identity,
}

impl Stemmer {
    fn for_locale(locale: &str) -> Self {
        match locale.get(..2).map(str::to_ascii_lowercase).as_deref() {
            Some("en") => Stemmer::English,
            Some("fr") => Stemmer::French,
            _ => Stemmer::Identity,
        }
    }

    fn stem(self, word: &str) -> String {
        let suffixes: &[&str] = match self {
            Stemmer::English => &["ing", "ed", "es", "s"],
            Stemmer::French => &["ment", "es", "s", "x", "e"],
            Stemmer::Identity => &[],
        };
        for suffix in suffixes {
            if word.len() > suffix.len() + 2 {
                if let Some(root) = word.strip_suffix(suffix) {
                    return root.to_string();
                }
            }
        }
        word.to_string()
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn word_matches(token: &str, pattern: &str, stemmer: Option<Stemmer>) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        return token.starts_with(prefix);
    }
    match stemmer {
        Some(s) => s.stem(token) == s.stem(pattern),
        None => token == pattern,
    }
}

struct Matcher<'a> {
    descriptor: &'a BackendDescriptor,
    record: &'a StoredRecord,
    business: bool,
    stemmer: Option<Stemmer>,
}

impl Matcher<'_> {
    fn searchable<'s>(&'s self, scope: Option<&'s [String]>) -> impl Iterator<Item = &'s str> + 's {
        self.record
            .fields
            .iter()
            .filter(move |f| {
                let visible = self
                    .descriptor
                    .field(&f.name)
                    .map_or(true, |d| !d.business || self.business);
                let in_scope =
                    scope.map_or(true, |s| s.iter().any(|n| n.eq_ignore_ascii_case(&f.name)));
                visible && in_scope
            })
            .map(|f| f.value.as_str())
    }

    fn matches(&self, expr: &Expr, scope: Option<&[String]>) -> bool {
        match expr {
            Expr::All => true,
            Expr::Term(term) => self.has_term(term, scope),
            Expr::Vocabulary { field, term } => match field {
                Some(field) => self.has_term(term, Some(std::slice::from_ref(field))),
                None => self.has_term(term, scope),
            },
            Expr::Phrase(phrase) => self.has_phrase(phrase, scope),
            Expr::Compare { field, op, value } => self.compare(field, *op, value),
            Expr::And(children) => children.iter().all(|c| self.matches(c, scope)),
            Expr::Or(children) => children.iter().any(|c| self.matches(c, scope)),
            Expr::Except(lhs, rhs) => self.matches(lhs, scope) && !self.matches(rhs, scope),
            Expr::In { expr, fields } => self.matches(expr, Some(fields.as_slice())),
            Expr::Group(inner) => self.matches(inner, scope),
        }
    }

    fn has_term(&self, term: &str, scope: Option<&[String]>) -> bool {
        let pattern = term.to_lowercase();
        self.searchable(scope)
            .any(|value| tokens(value).iter().any(|t| word_matches(t, &pattern, self.stemmer)))
    }

    fn has_phrase(&self, phrase: &str, scope: Option<&[String]>) -> bool {
        let wanted = tokens(phrase);
        if wanted.is_empty() {
            return false;
        }
        self.searchable(scope).any(|value| {
            tokens(value).windows(wanted.len()).any(|window| {
                window
                    .iter()
                    .zip(&wanted)
                    .all(|(t, w)| word_matches(t, w, self.stemmer))
            })
        })
    }

    fn compare(&self, field: &str, op: CompareOp, value: &str) -> bool {
        if field.eq_ignore_ascii_case("recordstatus") {
            let ok = status_matches(self.record.status, value);
            return if op == CompareOp::Ne { !ok } else { ok };
        }
        if field.eq_ignore_ascii_case("recordtype") {
            let ordering = self
                .record
                .record_type
                .to_lowercase()
                .cmp(&value.to_lowercase());
            return op.accepts(ordering);
        }

        let kind = self
            .descriptor
            .field(field)
            .map(|f| f.kind)
            .unwrap_or_default();
        self.record
            .values(field)
            .filter_map(|v| compare_values(v, value, kind))
            .any(|ordering| op.accepts(ordering))
    }
}

/// `value` is a bit string, rightmost character is bit 0
fn status_matches(status: u64, bits: &str) -> bool {
    bits.chars().rev().enumerate().all(|(bit, c)| {
        let set = bit < 64 && status & (1 << bit) != 0;
        match c {
            '0' => !set,
            '1' => set,
            _ => true,
        }
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

fn compare_values(left: &str, right: &str, kind: FieldKind) -> Option<Ordering> {
    match kind {
        FieldKind::Date => Some(parse_date(left)?.cmp(&parse_date(right)?)),
        FieldKind::Number => {
            let l: f64 = left.trim().parse().ok()?;
            let r: f64 = right.trim().parse().ok()?;
            l.partial_cmp(&r)
        }
        FieldKind::Text => Some(left.to_lowercase().cmp(&right.to_lowercase())),
    }
}

/// Records without a value sort last in both directions
fn compare_sort_keys(
    a: Option<&str>,
    b: Option<&str>,
    kind: FieldKind,
    descending: bool,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b, kind).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `-0Shot` is `('-', "Shot")`
fn parse_sort_spec(spec: &str) -> Option<(char, &str)> {
    let mut chars = spec.chars();
    let order = chars.next().filter(|c| matches!(c, '+' | '-'))?;
    let field = chars.as_str().strip_prefix('0')?;
    (!field.is_empty()).then_some((order, field))
}

fn highlight_value(value: &str, terms: &[String], stemmer: Option<Stemmer>, hl: &Highlight) -> String {
    let patterns: Vec<String> = terms.iter().flat_map(|t| tokens_keep_star(t)).collect();
    if patterns.is_empty() {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut word_start: Option<usize> = None;
    let flush = |out: &mut String, word: &str| {
        let lower = word.to_lowercase();
        if patterns.iter().any(|p| word_matches(&lower, p, stemmer)) {
            out.push_str(&hl.open);
            out.push_str(word);
            out.push_str(&hl.close);
        } else {
            out.push_str(word);
        }
    };

    for (i, c) in value.char_indices() {
        if c.is_alphanumeric() {
            word_start.get_or_insert(i);
        } else {
            if let Some(start) = word_start.take() {
                flush(&mut out, &value[start..i]);
            }
            out.push(c);
        }
    }
    if let Some(start) = word_start {
        flush(&mut out, &value[start..]);
    }
    out
}

/// Like `tokens`, but keeps a trailing wildcard on the last word
fn tokens_keep_star(term: &str) -> Vec<String> {
    let mut words = tokens(term);
    if term.ends_with('*') {
        if let Some(last) = words.last_mut() {
            last.push('*');
        }
    }
    words
}
