//! Compilation of free text + options into per-backend expression trees.
//!
//! The result is a request-scoped [`CompiledRequest`]: nothing here is
//! kept on the engine between calls.

use crate::core::catalog::BackendCatalog;
use crate::core::error::FedError;
use crate::core::query::ast::Expr;
use crate::core::query::normalize::normalize;
use crate::core::query::parser::parse;
use crate::core::query::thesaurus::{expand, TermExpansion, Thesaurus, ThesaurusSource};
use crate::core::types::{BackendId, CollectionId, SearchOptions, StatusFilter};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

/// Query text used when the caller sends nothing
pub const MATCH_ALL: &str = "all";

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_.\-]+$").unwrap());

/// Lowest status bit a caller may filter on
const FIRST_STATUS_BIT: u32 = 4;
const LAST_STATUS_BIT: u32 = 32;

/// A parsed and normalized query for one backend (or the combined tree)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Query string the tree was parsed from
    pub source: String,
    pub tree: Expr,
    /// The tree carries an explicit vocabulary operator
    pub needs_thesaurus: bool,
}

/// Execution plan for one backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendPlan {
    pub backend: BackendId,
    /// Authorized collections of this backend
    pub collections: Vec<CollectionId>,
    pub query: CompiledQuery,
}

/// A proposed replacement value for a query term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedQuery {
    pub term: String,
    pub value: String,
    pub hits: u64,
}

/// Proposals for one term, with its prepared markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermProposal {
    pub term: String,
    pub markup: String,
}

/// Proposals contributed by one backend's thesaurus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalGroup {
    pub backend: BackendId,
    pub name: String,
    pub terms: Vec<TermProposal>,
}

/// Proposal metadata of the combined tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Proposals {
    /// Rendered combined query
    pub query: String,
    /// One entry per distinct proposed value, in backend order
    pub queries: Vec<ProposedQuery>,
    pub groups: Vec<ProposalGroup>,
}

/// Everything one query request needs after compilation
#[derive(Debug, Default)]
pub struct CompiledRequest {
    /// Normalized query text (cache key)
    pub query_text: String,
    /// Combined tree, used for suggestions only
    pub main: Option<CompiledQuery>,
    /// Backends to execute, in declaration order
    pub plans: Vec<BackendPlan>,
    /// Backends whose compilation failed
    pub failures: Vec<(BackendId, FedError)>,
    pub proposals: Proposals,
}

/// Empty text becomes the match-all sentinel; a record-type restriction
/// is appended before per-backend specialization.
pub fn normalize_query_text(raw: &str, options: &SearchOptions) -> String {
    let mut query = if raw.trim().is_empty() {
        MATCH_ALL.to_string()
    } else {
        raw.to_string()
    };
    if let Some(record_type) = options.record_type.as_deref().filter(|t| !t.is_empty()) {
        query.push_str(" AND recordtype=");
        query.push_str(record_type);
    }
    query
}

/// Compact status bit string for `backend`, or `None` when nothing is
/// constrained. Position `i` from the right is bit `i`; `x` means
/// "not applicable". Leading `x` are trimmed.
pub fn status_bits(status: &StatusFilter, backend: BackendId) -> Option<String> {
    if status.is_empty() {
        return None;
    }

    let mut bits = String::from("xxxx");
    for bit in FIRST_STATUS_BIT..=LAST_STATUS_BIT {
        let value = match status.lookup(bit, backend) {
            Some(Some(true)) => '1',
            Some(Some(false)) => '0',
            _ => 'x',
        };
        bits.insert(0, value);
    }

    let trimmed = bits.trim_start_matches('x');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn valid_fields<'a>(fields: &'a [String]) -> Vec<&'a str> {
    fields
        .iter()
        .map(String::as_str)
        .filter(|name| {
            let ok = FIELD_NAME.is_match(name);
            if !ok {
                tracing::warn!(field = %name, "Ignoring field with unsupported characters");
            }
            ok
        })
        .collect()
}

/// ` IN (f1 OR f2)` restriction, without the leading space
pub fn field_clause(fields: &[String]) -> Option<String> {
    let names = valid_fields(fields);
    (!names.is_empty()).then(|| format!("IN ({})", names.join(" OR ")))
}

/// `AND ( f1 >= d OR f2 >= d )` date clause
pub fn date_clause(fields: &[String], op: &str, date: NaiveDate) -> Option<String> {
    let names = valid_fields(fields);
    if names.is_empty() {
        return None;
    }
    let date = date.format("%Y-%m-%d").to_string();
    let parts: Vec<String> = names
        .iter()
        .map(|name| format!("{name} {op} {date}"))
        .collect();
    Some(format!("AND ( {} )", parts.join(" OR ")))
}

/// Per-backend query string: base query plus status, field and date clauses
pub fn backend_query_string(base: &str, options: &SearchOptions, backend: BackendId) -> String {
    let mut query = base.to_string();

    if let Some(bits) = status_bits(&options.status, backend) {
        query.push_str(&format!(" AND (recordstatus={bits})"));
    }
    if let Some(clause) = field_clause(&options.fields) {
        query.push(' ');
        query.push_str(&clause);
    }
    if options.has_date_range() {
        if let Some(min) = options.min_date {
            if let Some(clause) = date_clause(&options.date_fields, ">=", min) {
                query.push(' ');
                query.push_str(&clause);
            }
        }
        if let Some(max) = options.max_date {
            if let Some(clause) = date_clause(&options.date_fields, "<=", max) {
                query.push(' ');
                query.push_str(&clause);
            }
        }
    }

    query
}

/// Parse and normalize one query string
pub fn compile_query(source: &str) -> Result<CompiledQuery, FedError> {
    let tree = normalize(parse(source)?);
    let needs_thesaurus = tree.contains_vocabulary();
    Ok(CompiledQuery {
        source: source.to_string(),
        tree,
        needs_thesaurus,
    })
}

pub struct QueryCompiler<'a> {
    catalog: &'a BackendCatalog,
    thesauri: &'a dyn ThesaurusSource,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a BackendCatalog, thesauri: &'a dyn ThesaurusSource) -> Self {
        Self { catalog, thesauri }
    }

    pub fn compile(&self, raw: &str, options: &SearchOptions) -> CompiledRequest {
        let query_text = normalize_query_text(raw, options);

        let mut main = match compile_query(&query_text) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(query = %query_text, error = %e, "Combined query does not parse");
                None
            }
        };

        let mut plans = Vec::new();
        let mut failures = Vec::new();
        let mut groups = Vec::new();
        let mut main_thesauri: Vec<Arc<Thesaurus>> = Vec::new();

        for &backend in &options.backends {
            let Some(descriptor) = self.catalog.get(backend) else {
                tracing::warn!(backend, "Targeted backend is not in the catalog");
                continue;
            };

            let collections = self
                .catalog
                .authorized_collections(backend, &options.collections);
            if collections.is_empty() {
                tracing::debug!(backend, "No authorized collection, backend skipped");
                continue;
            }

            let source = backend_query_string(&query_text, options, backend);
            tracing::debug!(backend, query = %source, "Backend query");

            let mut compiled = match compile_query(&source) {
                Ok(compiled) => compiled,
                Err(e) => {
                    tracing::warn!(backend, error = %e, "Query does not parse for backend");
                    failures.push((backend, e));
                    continue;
                }
            };

            if compiled.needs_thesaurus {
                if let Some(thesaurus) = self.fetch_thesaurus(backend) {
                    let mut log = Vec::new();
                    compiled.tree = expand(compiled.tree, &[thesaurus.as_ref()], &mut log);

                    groups.push(ProposalGroup {
                        backend,
                        name: descriptor.name.clone(),
                        terms: log.iter().map(term_proposal).collect(),
                    });
                    main_thesauri.push(thesaurus);
                }
            }

            plans.push(BackendPlan {
                backend,
                collections,
                query: compiled,
            });
        }

        let mut main_log = Vec::new();
        if let Some(main) = main.as_mut() {
            if main.needs_thesaurus && !main_thesauri.is_empty() {
                let refs: Vec<&Thesaurus> = main_thesauri.iter().map(Arc::as_ref).collect();
                main.tree = expand(main.tree.clone(), &refs, &mut main_log);
            }
        }
        let queries = proposed_queries(&main_log);

        let proposals = Proposals {
            query: main.as_ref().map(|m| m.tree.to_string()).unwrap_or_default(),
            queries,
            groups,
        };

        tracing::info!(
            query = %query_text,
            backends = plans.len(),
            failures = failures.len(),
            proposals = proposals.queries.len(),
            "Query compiled"
        );

        CompiledRequest {
            query_text,
            main,
            plans,
            failures,
            proposals,
        }
    }

    fn fetch_thesaurus(&self, backend: BackendId) -> Option<Arc<Thesaurus>> {
        match self.thesauri.thesaurus(backend) {
            Ok(thesaurus) => thesaurus,
            Err(e) => {
                tracing::warn!(backend, error = %e, "Thesaurus unavailable, expansion skipped");
                None
            }
        }
    }
}

/// One proposed query per distinct alternative value, in log order
fn proposed_queries(log: &[TermExpansion]) -> Vec<ProposedQuery> {
    let mut queries: Vec<ProposedQuery> = Vec::new();
    for expansion in log {
        for alt in &expansion.alternatives {
            if !queries.iter().any(|q| q.value == alt.value) {
                queries.push(ProposedQuery {
                    term: expansion.term.clone(),
                    value: alt.value.clone(),
                    hits: alt.hits,
                });
            }
        }
    }
    queries
}

fn term_proposal(expansion: &TermExpansion) -> TermProposal {
    let field = expansion.field.as_deref().unwrap_or("*");
    let mut markup = String::from("<ul class=\"thesaurus\">");
    for alt in &expansion.alternatives {
        markup.push_str(&format!(
            "<li><a class=\"proposal\" data-query=\"{}:{}\">{}</a> <span class=\"hits\">({})</span></li>",
            escape_html(field),
            escape_html(&alt.value),
            escape_html(&alt.value),
            alt.hits
        ));
    }
    markup.push_str("</ul>");

    TermProposal {
        term: expansion.term.clone(),
        markup,
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
