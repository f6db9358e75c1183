//! Unified service container for fedsearch
//!
//! Provides shared access to the search engine and configuration.

use crate::core::config::Config;
use crate::core::engine::SearchEngine;
use crate::core::error::Result;
use std::sync::Arc;

/// Unified services container
///
/// CLI commands use this same struct for engine access.
#[derive(Clone)]
pub struct Services {
    /// Search engine facade (compiler, executor, cache, assembler)
    pub engine: Arc<SearchEngine>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services from configuration
    pub fn new(config: Config) -> Result<Self> {
        let engine = Arc::new(SearchEngine::from_config(&config)?);

        Ok(Self {
            engine,
            config: Arc::new(config),
        })
    }

    /// Wrap an already built engine
    pub fn with_engine(engine: SearchEngine, config: Config) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}
