//! Tests for the query CLI command
//!
//! Runs against the bundled demo dataset (photos + documents).

use crate::cli::test_helpers::query_args;
use crate::common::create_test_services;
use fedsearch::cli::commands::query::{execute, run_query, OrderArg};
use fedsearch::cli::OutputFormat;

#[tokio::test]
async fn test_query_human() {
    let services = create_test_services();

    let result = execute(query_args("sea"), &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Query should succeed: {:?}", result.err());
}

#[tokio::test]
async fn test_query_json() {
    let services = create_test_services();

    let result = execute(query_args("*:sea"), &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "JSON query should succeed: {:?}", result.err());
}

#[test]
fn test_empty_query_on_one_backend() {
    let services = create_test_services();
    let mut args = query_args("");
    args.backends = vec![2];

    let output = run_query(&args, &services).unwrap();

    assert!(output.error.is_empty());
    assert_eq!(output.query, "all");
    assert_eq!(output.total, 2);
    assert!(output.session.is_some());
}

#[test]
fn test_second_page_offset() {
    let services = create_test_services();
    let mut args = query_args("");
    args.page = 2;
    args.per_page = 3;

    let output = run_query(&args, &services).unwrap();

    assert_eq!(output.offset, 3);
    assert_eq!(output.total, 7);
    assert_eq!(output.records.len(), 3);
    assert_eq!(output.records[0].record.rank, 3);
}

#[test]
fn test_record_type_restriction() {
    let services = create_test_services();
    let mut args = query_args("");
    args.record_type = Some("video".to_string());

    let output = run_query(&args, &services).unwrap();

    assert_eq!(output.query, "all AND recordtype=video");
    assert_eq!(output.total, 1);
    assert_eq!(output.records[0].record.record_id, 104);
}

#[test]
fn test_sort_by_date_ascending() {
    let services = create_test_services();
    let mut args = query_args("");
    args.backends = vec![2];
    args.sort_by = Some("Published".to_string());
    args.order = OrderArg::Asc;

    let output = run_query(&args, &services).unwrap();

    let ids: Vec<u64> = output.records.iter().map(|r| r.record.record_id).collect();
    assert_eq!(ids, vec![202, 201]);
}

#[test]
fn test_excerpt_is_highlighted() {
    let services = create_test_services();
    let mut args = query_args("sea");
    args.backends = vec![2];
    args.excerpt = vec!["Title".to_string()];

    let output = run_query(&args, &services).unwrap();

    assert_eq!(output.records.len(), 1);
    assert_eq!(
        output.records[0].excerpt["Title"].get(&1).map(String::as_str),
        Some("Coastal erosion and [[em]]sea[[/em]] levels")
    );
}

#[test]
fn test_thesaurus_suggestions() {
    let services = create_test_services();
    let mut args = query_args("*:sea");
    args.backends = vec![1];

    let output = run_query(&args, &services).unwrap();

    let values: Vec<&str> = output
        .suggestions
        .iter()
        .map(|s| s.proposed_value.as_str())
        .collect();
    assert_eq!(values, vec!["ocean", "beach", "harbour"]);
    assert!(output.proposals.is_some());
}

#[test]
fn test_business_field_needs_opt_in() {
    let services = create_test_services();
    let mut args = query_args("exclusive");
    args.backends = vec![1];

    let hidden = run_query(&args, &services).unwrap();
    assert_eq!(hidden.total, 0);

    args.business = vec![10];
    let visible = run_query(&args, &services).unwrap();
    assert_eq!(visible.total, 1);
    assert_eq!(visible.records[0].record.record_id, 102);
}

#[test]
fn test_status_filter_requires_bit() {
    let services = create_test_services();
    let mut args = query_args("");
    args.backends = vec![1];
    args.status = vec![(4, 1, true)];

    let output = run_query(&args, &services).unwrap();

    assert_eq!(output.total, 1);
    assert_eq!(output.records[0].record.record_id, 101);
}

#[test]
fn test_query_too_long_fails() {
    let services = create_test_services();
    let text = "sea ".repeat(200);

    assert!(run_query(&query_args(&text), &services).is_err());
}

#[test]
fn test_unparsable_query_reports_error() {
    let services = create_test_services();

    let output = run_query(&query_args("sea AND ("), &services).unwrap();

    assert_eq!(output.error, "Unable to execute query");
    assert!(output.records.is_empty());
}

#[test]
fn test_page_beyond_addressable_range_fails() {
    let services = create_test_services();
    let mut args = query_args("sea");
    args.page = usize::MAX;
    args.per_page = 5;

    assert!(run_query(&args, &services).is_err());
}
