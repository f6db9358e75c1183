//! Search engine facade
//!
//! Orchestrates one query request: connect, sweep expired sessions,
//! attach the caller's backend session, decide reuse vs. recompute,
//! compile and execute on recompute, then assemble the requested page
//! with suggestions. All per-request compilation state lives in a
//! [`CompiledRequest`] value and is dropped when the call returns.

use crate::core::assembler::{Excerpt, ResultAssembler};
use crate::core::backend::{ConnectionParams, Highlight, IndexBackend, MemoryBackend};
use crate::core::cache::{CacheDecision, CacheStore, FileCacheStore, MemoryCacheStore, SessionCache};
use crate::core::catalog::BackendCatalog;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{CacheStoreKind, Config};
use crate::core::error::{FedError, Result};
use crate::core::executor::{ExecutionOutcome, FederatedExecutor};
use crate::core::i18n::{Message, Translator};
use crate::core::query::{CompiledRequest, QueryCompiler};
use crate::core::suggest::SuggestionBuilder;
use crate::core::types::{
    BackendId, CallerContext, DomainRecord, EntityKind, RecordId, ResultPage, SearchOptions,
    SessionCacheEntry,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ENGINE_NAME: &str = "fedsearch";

/// Something that can be (re-)indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexable {
    Record { backend: BackendId, record: RecordId },
    Story { backend: BackendId, record: RecordId },
    FeedEntry { id: u64 },
}

/// Engine-level settings taken from [`Config`]
#[derive(Debug, Clone)]
struct Settings {
    connection: ConnectionParams,
    secret: String,
    sweep_after: Duration,
    highlight: Highlight,
    default_per_page: usize,
    max_per_page: usize,
    max_query_length: usize,
    stemming_enabled: bool,
    default_sort: String,
}

impl Settings {
    fn from_config(config: &Config) -> Self {
        Self {
            connection: ConnectionParams {
                host: config.backend.host.clone(),
                port: config.backend.port,
                user: config.backend.user.clone(),
                password: config.backend.password.clone(),
                database: config.backend.database.clone(),
            },
            secret: config.backend.secret_key.clone(),
            sweep_after: secs(config.cache.sweep_after_secs),
            highlight: Highlight::new(
                config.search.highlight_open.clone(),
                config.search.highlight_close.clone(),
            ),
            default_per_page: config.search.default_per_page,
            max_per_page: config.search.max_per_page,
            max_query_length: config.search.max_query_length,
            stemming_enabled: config.search.stemming_enabled,
            default_sort: config.search.default_sort.clone(),
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

pub struct SearchEngine {
    backend: Arc<dyn IndexBackend>,
    catalog: BackendCatalog,
    cache: SessionCache,
    settings: Settings,
    connected: AtomicBool,
}

impl SearchEngine {
    pub fn new(
        backend: Arc<dyn IndexBackend>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let catalog = backend.catalog();
        let cache = SessionCache::new(
            store,
            Arc::clone(&backend),
            clock,
            secs(config.cache.stale_after_secs),
        );
        Self {
            backend,
            catalog,
            cache,
            settings: Settings::from_config(config),
            connected: AtomicBool::new(false),
        }
    }

    /// Engine over the in-process backend and the configured cache store
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = match &config.backend.catalog_path {
            Some(path) => MemoryBackend::load(path)?,
            None => MemoryBackend::demo()?,
        };

        let store: Arc<dyn CacheStore> = match config.cache.store {
            CacheStoreKind::Memory => Arc::new(MemoryCacheStore::new()),
            CacheStoreKind::File => {
                let path = config.cache.path.clone().ok_or_else(|| {
                    FedError::Configuration("File cache store requires a path".to_string())
                })?;
                Arc::new(FileCacheStore::new(path))
            }
        };

        Ok(Self::new(
            Arc::new(backend),
            store,
            Arc::new(SystemClock),
            config,
        ))
    }

    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Connect to the backend once
    pub fn initialize(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.catalog.is_empty() {
            return Err(FedError::Configuration(
                "Backend exposes no searchable database".to_string(),
            ));
        }
        self.backend.connect(&self.settings.connection)?;
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(
            host = %self.settings.connection.host,
            backends = self.catalog.backends().len(),
            "Search engine initialized"
        );
        Ok(())
    }

    /// Attach the caller to a backend session, creating one if needed
    pub fn check_session(&self, ctx: &mut CallerContext) -> Result<String> {
        let user_id = ctx
            .user_id
            .ok_or_else(|| FedError::Session("no authenticated user".to_string()))?;

        if let Some(session_id) = ctx.session_id.as_deref() {
            if self.backend.open_session(session_id, user_id) {
                self.cache.register(session_id)?;
                return Ok(session_id.to_string());
            }
            tracing::debug!(session = %session_id, "Backend session gone, creating a new one");
        }

        let session_id = self
            .backend
            .create_session(user_id)
            .map_err(|e| FedError::Session(format!("unable to create backend session: {e}")))?;
        self.cache.register(&session_id)?;
        ctx.session_id = Some(session_id.clone());
        tracing::info!(session = %session_id, user = user_id, "Backend session created");
        Ok(session_id)
    }

    /// Unset backends/collections mean "everything in the catalog"
    fn effective_options(&self, options: &SearchOptions) -> SearchOptions {
        let mut options = options.clone();
        if options.backends.is_empty() {
            options.backends = self.catalog.backend_ids();
        }
        if options.collections.is_empty() {
            options.collections = self
                .catalog
                .backends()
                .iter()
                .flat_map(|b| b.collections.iter().map(|c| c.id))
                .collect();
        }
        if options.sort_by.is_none() && !self.settings.default_sort.is_empty() {
            options.sort_by = Some(self.settings.default_sort.clone());
        }
        options
    }

    fn compile(&self, text: &str, options: &SearchOptions) -> CompiledRequest {
        QueryCompiler::new(&self.catalog, self.backend.as_ref()).compile(text, options)
    }

    /// Run a query and return the page `[offset, offset + per_page)`
    pub fn query(
        &self,
        ctx: &mut CallerContext,
        text: &str,
        offset: usize,
        per_page: usize,
        options: &SearchOptions,
    ) -> Result<ResultPage> {
        if text.chars().count() > self.settings.max_query_length {
            return Err(FedError::parse(
                self.settings.max_query_length,
                format!(
                    "query exceeds {} characters",
                    self.settings.max_query_length
                ),
            ));
        }
        let per_page = match per_page {
            0 => self.settings.default_per_page,
            n => n.min(self.settings.max_per_page),
        };

        self.initialize()?;
        self.cache
            .clear_all(Some(self.cache.now() - self.settings.sweep_after))?;
        let session_id = self.check_session(ctx)?;

        let options = self.effective_options(options);
        let translator = Translator::for_locale(&options.locale);
        let force = std::mem::take(&mut ctx.force_refresh);
        let user_id = ctx.user_id.unwrap_or_default();

        let outcome = self.cache.serialized(&session_id, || {
            self.resolve_entry(&session_id, user_id, text, &options, force)
        })?;

        let (request, entry) = match outcome {
            Resolved::Entry(request, entry) => (request, entry),
            Resolved::Failed(request) => {
                return Ok(ResultPage::failed(
                    request.query_text,
                    offset,
                    translator.trans(&Message::UnableToExecuteQuery),
                ));
            }
        };

        let assembler = ResultAssembler::new(self.backend.as_ref(), &self.catalog);
        let mut page = assembler.assemble(&session_id, &entry, offset, per_page, translator);

        let suggestions = SuggestionBuilder::new(translator);
        page.suggestions = suggestions.suggestions(&request);
        page.proposals = suggestions.panel(&request);

        tracing::info!(
            session = %session_id,
            query = %page.query,
            offset,
            records = page.records.len(),
            total = page.total,
            "Page assembled"
        );
        Ok(page)
    }

    fn resolve_entry(
        &self,
        session_id: &str,
        user_id: u64,
        text: &str,
        options: &SearchOptions,
        force: bool,
    ) -> Result<Resolved> {
        let request = self.compile(text, options);

        match self.cache.decide(session_id, &request.query_text, force)? {
            CacheDecision::Reuse(entry) => Ok(Resolved::Entry(request, entry)),
            CacheDecision::Recompute => {
                self.backend.clear_results(session_id);
                let executor =
                    FederatedExecutor::new(self.backend.as_ref(), &self.catalog, &self.settings.secret);
                match executor.run(&request, options, session_id, user_id, &self.cache)? {
                    ExecutionOutcome::Executed { entry, .. } => Ok(Resolved::Entry(request, entry)),
                    ExecutionOutcome::AllFailed(_) => Ok(Resolved::Failed(request)),
                }
            }
        }
    }

    /// Force the next query of this caller to recompute
    pub fn reset_cache(&self, ctx: &mut CallerContext) {
        ctx.force_refresh = true;
    }

    /// Close the caller's session and drop its cache row
    pub fn clear_cache(&self, ctx: &mut CallerContext) -> Result<()> {
        self.cache.clear_session(ctx)
    }

    /// Close and drop every session idle since `cutoff` (default: now)
    pub fn clear_all_cache(&self, cutoff: Option<DateTime<Utc>>) -> Result<usize> {
        self.cache.clear_all(cutoff)
    }

    /// Highlighted field values of a record from the caller's last query
    pub fn excerpt(
        &self,
        ctx: &CallerContext,
        record: &DomainRecord,
        fields: &[String],
    ) -> Result<Excerpt> {
        let Some(session_id) = ctx.session_id.as_deref() else {
            return Ok(Excerpt::new());
        };
        let assembler = ResultAssembler::new(self.backend.as_ref(), &self.catalog);
        Ok(assembler.excerpt(session_id, record.rank, fields, &self.settings.highlight))
    }

    pub fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    pub fn available_types(&self) -> Vec<EntityKind> {
        vec![EntityKind::Record, EntityKind::Story]
    }

    pub fn available_date_fields(&self) -> Vec<String> {
        self.catalog.date_fields()
    }

    /// `(key, label)` pairs; the empty key means no sort
    pub fn available_sort(&self, locale: &str) -> Vec<(String, String)> {
        let translator = Translator::for_locale(locale);
        std::iter::once((String::new(), translator.trans(&Message::NoSort)))
            .chain(self.catalog.sort_fields().into_iter().map(|f| (f.clone(), f)))
            .collect()
    }

    pub fn available_order(&self, locale: &str) -> Vec<(String, String)> {
        let translator = Translator::for_locale(locale);
        vec![
            ("desc".to_string(), translator.trans(&Message::Descending)),
            ("asc".to_string(), translator.trans(&Message::Ascending)),
        ]
    }

    pub fn default_sort(&self) -> &str {
        &self.settings.default_sort
    }

    pub fn is_stemming_enabled(&self) -> bool {
        self.settings.stemming_enabled
    }

    pub fn has_stemming(&self) -> bool {
        true
    }

    /// Backend diagnostics
    pub fn status(&self) -> Result<Vec<(String, String)>> {
        self.initialize()?;
        Ok(self.backend.status_info())
    }

    pub fn autocomplete(&self, _query: &str) -> Vec<String> {
        Vec::new()
    }

    pub fn add(&self, item: Indexable) -> Result<()> {
        self.update(item)
    }

    /// Flag for re-indexing
    pub fn update(&self, item: Indexable) -> Result<()> {
        match item {
            Indexable::Record { backend, record } | Indexable::Story { backend, record } => {
                self.backend.mark_for_reindex(backend, record)
            }
            Indexable::FeedEntry { .. } => Err(feed_entry_unsupported()),
        }
    }

    pub fn remove(&self, item: Indexable) -> Result<()> {
        match item {
            Indexable::Record { backend, record } | Indexable::Story { backend, record } => {
                self.backend.remove_record(backend, record)
            }
            Indexable::FeedEntry { .. } => Err(feed_entry_unsupported()),
        }
    }

    /// Cache row of a caller's session
    pub fn session_entry(&self, ctx: &CallerContext) -> Result<Option<SessionCacheEntry>> {
        match ctx.session_id.as_deref() {
            Some(id) => self.cache.entry(id),
            None => Ok(None),
        }
    }
}

enum Resolved {
    Entry(CompiledRequest, SessionCacheEntry),
    Failed(CompiledRequest),
}

fn feed_entry_unsupported() -> FedError {
    FedError::UnsupportedOperation("feed entry indexing is not supported by this engine".to_string())
}
