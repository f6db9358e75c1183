//! Query compilation against the fixture catalog

use crate::common::fixture_backend;
use chrono::NaiveDate;
use fedsearch::core::backend::IndexBackend;
use fedsearch::core::query::{BackendPlan, CompiledRequest, QueryCompiler, MATCH_ALL};
use fedsearch::core::types::{BackendId, SearchOptions, StatusFilter};

fn backend_plan(request: &CompiledRequest, backend: BackendId) -> Option<&BackendPlan> {
    request.plans.iter().find(|p| p.backend == backend)
}

fn all_options() -> SearchOptions {
    SearchOptions::new()
        .with_backends([1, 2])
        .with_collections([1, 2, 3])
}

#[test]
fn test_date_range_over_two_date_fields() {
    let backend = fixture_backend();
    let catalog = backend.catalog();
    let options = SearchOptions::new()
        .with_backends([1])
        .with_collections([1])
        .with_date_range(
            vec!["Created".to_string(), "Modified".to_string()],
            NaiveDate::from_ymd_opt(2020, 1, 1),
            None,
        );

    let request = QueryCompiler::new(&catalog, backend.as_ref()).compile("", &options);
    let plan = backend_plan(&request, 1).expect("backend 1 should be planned");

    assert!(plan
        .query
        .source
        .ends_with("AND ( Created >= 2020-01-01 OR Modified >= 2020-01-01 )"));
    assert_eq!(request.query_text, MATCH_ALL);
}

#[test]
fn test_compilation_is_deterministic() {
    let backend = fixture_backend();
    let catalog = backend.catalog();
    let compiler = QueryCompiler::new(&catalog, backend.as_ref());
    let options = all_options();

    let first = compiler.compile("*:foo AND item EXCEPT 3", &options);
    let second = compiler.compile("*:foo AND item EXCEPT 3", &options);

    assert_eq!(first.plans, second.plans);
    assert_eq!(first.proposals, second.proposals);
}

#[test]
fn test_unauthorized_backend_is_skipped() {
    let backend = fixture_backend();
    let catalog = backend.catalog();
    let options = SearchOptions::new()
        .with_backends([1, 2])
        .with_collections([3]);

    let request = QueryCompiler::new(&catalog, backend.as_ref()).compile("foo", &options);

    assert!(backend_plan(&request, 1).is_none());
    assert_eq!(backend_plan(&request, 2).map(|p| p.collections.clone()), Some(vec![3]));
}

#[test]
fn test_status_clause_is_per_backend() {
    let backend = fixture_backend();
    let catalog = backend.catalog();
    let mut options = all_options();
    options.status = StatusFilter::new().require(4, 1, true);

    let request = QueryCompiler::new(&catalog, backend.as_ref()).compile("foo", &options);

    assert_eq!(
        backend_plan(&request, 1).map(|p| p.query.source.as_str()),
        Some("foo AND (recordstatus=1xxxx)")
    );
    assert_eq!(backend_plan(&request, 2).map(|p| p.query.source.as_str()), Some("foo"));
}

#[test]
fn test_parse_error_only_affects_compilation() {
    let backend = fixture_backend();
    let catalog = backend.catalog();

    let request =
        QueryCompiler::new(&catalog, backend.as_ref()).compile("foo AND (bar", &all_options());

    assert!(request.main.is_none());
    assert!(request.plans.is_empty());
    assert_eq!(request.failures.len(), 2);
    assert!(request.failures.iter().all(|(_, e)| e.is_per_backend()));
}

#[test]
fn test_thesaurus_proposals_only_from_backends_with_vocabulary() {
    let backend = fixture_backend();
    let catalog = backend.catalog();

    let request = QueryCompiler::new(&catalog, backend.as_ref()).compile("*:foo", &all_options());

    let values: Vec<&str> = request
        .proposals
        .queries
        .iter()
        .map(|q| q.value.as_str())
        .collect();
    assert_eq!(values, vec!["fu", "bar"]);
    assert_eq!(request.proposals.groups.len(), 1);
    assert_eq!(request.proposals.groups[0].name, "alpha");
    assert!(request.main.as_ref().is_some_and(|m| m.needs_thesaurus));
}

#[test]
fn test_unavailable_thesaurus_leaves_query_unexpanded() {
    let backend = fixture_backend();
    let catalog = backend.catalog();
    backend.set_available(1, false);

    let request = QueryCompiler::new(&catalog, backend.as_ref()).compile("*:foo", &all_options());

    assert!(request.proposals.queries.is_empty());
    assert!(backend_plan(&request, 1).is_some());
}
