//! Federated execution of compiled per-backend queries.

use crate::core::backend::{ExecuteRequest, IndexBackend};
use crate::core::cache::SessionCache;
use crate::core::catalog::BackendCatalog;
use crate::core::error::{FedError, Result};
use crate::core::query::{BackendPlan, CompiledRequest};
use crate::core::types::{
    BackendExecutionResult, BackendId, CollectionId, SearchMode, SearchOptions, SessionCacheEntry,
    UserId,
};

/// Aggregate of one federated run
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    /// Backends that returned a result, in execution order
    pub results: Vec<(BackendId, BackendExecutionResult)>,
    /// Backends that returned nothing
    pub empty: Vec<BackendId>,
    /// Backends whose query did not compile
    pub unparsed: Vec<BackendId>,
    /// Backends that failed during execution
    pub failures: Vec<(BackendId, FedError)>,
}

impl ExecutionSummary {
    pub fn duration(&self) -> f64 {
        self.results.iter().map(|(_, r)| r.elapsed).sum()
    }

    pub fn total(&self) -> u64 {
        self.results.iter().map(|(_, r)| r.hit_count).sum()
    }

    /// True when some backend was targeted but none produced a result
    pub fn all_failed(&self) -> bool {
        self.results.is_empty()
            && (!self.failures.is_empty() || !self.empty.is_empty() || !self.unparsed.is_empty())
    }
}

/// Result of [`FederatedExecutor::run`]
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The cache row was rewritten
    Executed {
        entry: SessionCacheEntry,
        summary: ExecutionSummary,
    },
    /// No backend yielded a result; the cache row was invalidated
    AllFailed(ExecutionSummary),
}

/// `+0Field` / `-0Field`, empty when no sort field is set
pub fn sort_spec(options: &SearchOptions) -> String {
    match options.sort_by.as_deref().filter(|s| !s.is_empty()) {
        Some(field) => format!("{}0{}", options.sort_order.prefix(), field),
        None => String::new(),
    }
}

pub struct FederatedExecutor<'a> {
    backend: &'a dyn IndexBackend,
    catalog: &'a BackendCatalog,
    secret: &'a str,
}

impl<'a> FederatedExecutor<'a> {
    pub fn new(backend: &'a dyn IndexBackend, catalog: &'a BackendCatalog, secret: &'a str) -> Self {
        Self {
            backend,
            catalog,
            secret,
        }
    }

    fn business_collections(&self, backend: BackendId, options: &SearchOptions) -> Vec<CollectionId> {
        let Some(descriptor) = self.catalog.get(backend) else {
            return Vec::new();
        };
        options
            .business_fields_on
            .iter()
            .copied()
            .filter(|c| descriptor.has_collection(*c))
            .collect()
    }

    fn execute_plan(
        &self,
        plan: &BackendPlan,
        options: &SearchOptions,
        session_id: &str,
        user_id: UserId,
        sort: &str,
    ) -> Result<Option<BackendExecutionResult>> {
        let business = self.business_collections(plan.backend, options);
        let request = ExecuteRequest {
            session_id,
            backend: plan.backend,
            collections: &plan.collections,
            query: &plan.query.tree,
            secret: self.secret,
            user_id,
            group_only: options.search_mode == SearchMode::RecordGroup,
            sort_spec: sort,
            business_collections: &business,
            stemming_locale: options.stemming.then_some(options.locale.as_str()),
        };
        self.backend.execute(&request)
    }

    /// Execute every plan in declaration order
    pub fn execute(
        &self,
        request: &CompiledRequest,
        options: &SearchOptions,
        session_id: &str,
        user_id: UserId,
    ) -> ExecutionSummary {
        let sort = sort_spec(options);
        let mut summary = ExecutionSummary {
            unparsed: request.failures.iter().map(|(b, _)| *b).collect(),
            ..ExecutionSummary::default()
        };

        for plan in &request.plans {
            match self.execute_plan(plan, options, session_id, user_id, &sort) {
                Ok(Some(result)) => {
                    tracing::debug!(
                        backend = plan.backend,
                        hits = result.hit_count,
                        elapsed = result.elapsed,
                        "Backend executed"
                    );
                    summary.results.push((plan.backend, result));
                }
                Ok(None) => {
                    tracing::warn!(backend = plan.backend, "Backend returned no result");
                    summary.empty.push(plan.backend);
                }
                Err(e) => {
                    tracing::warn!(backend = plan.backend, error = %e, "Backend execution failed");
                    summary.failures.push((plan.backend, e));
                }
            }
        }

        summary
    }

    /// Execute and persist the aggregate into the session's cache row
    pub fn run(
        &self,
        request: &CompiledRequest,
        options: &SearchOptions,
        session_id: &str,
        user_id: UserId,
        cache: &SessionCache,
    ) -> Result<ExecutionOutcome> {
        let summary = self.execute(request, options, session_id, user_id);

        if summary.all_failed() {
            tracing::warn!(
                query = %request.query_text,
                failures = summary.failures.len(),
                unparsed = summary.unparsed.len(),
                "No backend produced a result"
            );
            // The cursor was cleared before execution
            cache.invalidate(session_id)?;
            return Ok(ExecutionOutcome::AllFailed(summary));
        }

        let entry = cache.record_execution(
            session_id,
            &request.query_text,
            summary.duration(),
            summary.total(),
        )?;

        tracing::info!(
            session = %session_id,
            query = %request.query_text,
            backends = summary.results.len(),
            total = entry.total,
            duration = entry.duration,
            "Query executed"
        );

        Ok(ExecutionOutcome::Executed { entry, summary })
    }
}
