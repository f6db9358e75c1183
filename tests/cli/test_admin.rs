//! Tests for the sweep, status and show-config commands

use crate::cli::test_helpers::query_args;
use crate::common::create_test_services;
use fedsearch::cli::commands::config::{self, ConfigArgs};
use fedsearch::cli::commands::query::run_query;
use fedsearch::cli::commands::status::{self, StatusArgs};
use fedsearch::cli::commands::sweep::{self, SweepArgs};
use fedsearch::cli::OutputFormat;
use fedsearch::core::config::CacheStoreKind;
use fedsearch::core::{Config, Services};
use tempfile::TempDir;

#[tokio::test]
async fn test_sweep_removes_all_sessions() {
    let services = create_test_services();
    run_query(&query_args("sea"), &services).unwrap();
    run_query(&query_args("peak"), &services).unwrap();
    assert_eq!(services.engine.cache().entries().unwrap().len(), 2);

    let args = SweepArgs {
        older_than_secs: None,
    };
    let result = sweep::execute(args, &services, OutputFormat::Json).await;

    assert!(result.is_ok(), "Sweep should succeed: {:?}", result.err());
    assert!(services.engine.cache().entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_sweep_with_age_keeps_fresh_sessions() {
    let services = create_test_services();
    run_query(&query_args("sea"), &services).unwrap();

    let args = SweepArgs {
        older_than_secs: Some(3600),
    };
    sweep::execute(args, &services, OutputFormat::Human)
        .await
        .unwrap();

    assert_eq!(services.engine.cache().entries().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_human_and_json() {
    let services = create_test_services();
    run_query(&query_args("sea"), &services).unwrap();

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let result = status::execute(StatusArgs { sessions: true }, &services, format).await;
        assert!(result.is_ok(), "Status should succeed: {:?}", result.err());
    }
}

#[tokio::test]
async fn test_show_config() {
    let services = create_test_services();

    for (all, format) in [(false, OutputFormat::Human), (true, OutputFormat::Json)] {
        let result = config::execute(ConfigArgs { all }, &services, format).await;
        assert!(result.is_ok(), "show-config should succeed: {:?}", result.err());
    }
}

#[tokio::test]
async fn test_file_store_rows_survive_for_later_sweep() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.cache.store = CacheStoreKind::File;
    config.cache.path = Some(temp_dir.path().join("cache.json"));

    let first = Services::new(config.clone()).unwrap();
    run_query(&query_args("sea"), &first).unwrap();
    drop(first);

    let later = std::sync::Arc::new(Services::new(config).unwrap());
    assert_eq!(later.engine.cache().entries().unwrap().len(), 1);

    let args = SweepArgs {
        older_than_secs: None,
    };
    sweep::execute(args, &later, OutputFormat::Json)
        .await
        .unwrap();

    assert!(later.engine.cache().entries().unwrap().is_empty());
}
