// Test helper functions

use chrono::{DateTime, TimeZone, Utc};
use fedsearch::core::backend::MemoryBackend;
use fedsearch::core::cache::{CacheStore, MemoryCacheStore};
use fedsearch::core::clock::ManualClock;
use fedsearch::core::config::Config;
use fedsearch::core::engine::SearchEngine;
use fedsearch::core::services::Services;
use std::sync::Arc;

/// Two backends: `alpha` (id 1, 8 records, thesaurus, two date fields)
/// and `beta` (id 2, 3 records)
#[allow(dead_code)]
pub const FIXTURE_DATASET: &str = include_str!("../fixtures/dataset.json");

#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn fixture_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::from_json(FIXTURE_DATASET).expect("fixture dataset should load"))
}

/// Engine over the fixture dataset with a manually driven clock
#[allow(dead_code)]
pub struct TestEngine {
    pub engine: Arc<SearchEngine>,
    pub backend: Arc<MemoryBackend>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn CacheStore>,
}

#[allow(dead_code)]
impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self::with_store(config, Arc::new(MemoryCacheStore::new()))
    }

    pub fn with_store(config: &Config, store: Arc<dyn CacheStore>) -> Self {
        let backend = fixture_backend();
        let clock = Arc::new(ManualClock::new(start_time()));
        let engine = SearchEngine::new(backend.clone(), store.clone(), clock.clone(), config);
        Self {
            engine: Arc::new(engine),
            backend,
            clock,
            store,
        }
    }
}

/// Services over the bundled demo dataset, wrapped in Arc
/// (matching CLI execute() signatures)
#[allow(dead_code)]
pub fn create_test_services() -> Arc<Services> {
    Arc::new(Services::new(Config::default()).expect("Failed to create services"))
}
