//! Configuration management for the federated search engine.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::cache::{DEFAULT_STALE_AFTER_SECS, DEFAULT_SWEEP_AFTER_SECS};
use crate::core::error::{FedError, Result};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Index backend connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Shared secret passed with every execution
    #[serde(default)]
    pub secret_key: String,

    /// JSON dataset for the in-process backend (bundled demo when unset)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Where session cache rows live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStoreKind {
    #[default]
    Memory,
    File,
}

/// Session cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub store: CacheStoreKind,

    /// Cache file for the `file` store (XDG state dir when unset)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Entries older than this are recomputed
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Sessions idle for longer than this are swept before each query
    #[serde(default = "default_sweep_after")]
    pub sweep_after_secs: u64,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Default page size
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,

    /// Maximum page size
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,

    /// Maximum query string length
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    #[serde(default)]
    pub stemming_enabled: bool,

    /// Default sort field, empty for no sort
    #[serde(default)]
    pub default_sort: String,

    #[serde(default = "default_locale")]
    pub default_locale: String,

    #[serde(default = "default_highlight_open")]
    pub highlight_open: String,

    #[serde(default = "default_highlight_close")]
    pub highlight_close: String,
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_database() -> String {
    "phrasea".to_string()
}

fn default_stale_after() -> u64 {
    DEFAULT_STALE_AFTER_SECS
}

fn default_sweep_after() -> u64 {
    DEFAULT_SWEEP_AFTER_SECS
}

fn default_per_page() -> usize {
    10
}

fn default_max_per_page() -> usize {
    100
}

fn default_max_query_length() -> usize {
    500
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_highlight_open() -> String {
    "[[em]]".to_string()
}

fn default_highlight_close() -> String {
    "[[/em]]".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            database: default_database(),
            secret_key: String::new(),
            catalog_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: CacheStoreKind::default(),
            path: None,
            stale_after_secs: default_stale_after(),
            sweep_after_secs: default_sweep_after(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            max_query_length: default_max_query_length(),
            stemming_enabled: false,
            default_sort: String::new(),
            default_locale: default_locale(),
            highlight_open: default_highlight_open(),
            highlight_close: default_highlight_close(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| FedError::Configuration(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. FEDSEARCH_CONFIG env var
    /// 2. XDG config file (~/.config/fedsearch/config.toml)
    /// 3. ./fedsearch.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("FEDSEARCH_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("fedsearch.toml").exists() {
                Self::from_file("fedsearch.toml")?
            } else {
                Self::default()
            }
        };

        config.merge_env();

        // File store without an explicit path lives in the XDG state dir
        if config.cache.store == CacheStoreKind::File && config.cache.path.is_none() {
            config.cache.path = Some(xdg.cache_file());
        }

        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Backend configuration
        if let Ok(host) = env::var("FEDSEARCH_BACKEND_HOST") {
            self.backend.host = host;
        }
        if let Some(port) = parse_env("FEDSEARCH_BACKEND_PORT") {
            self.backend.port = port;
        }
        if let Ok(user) = env::var("FEDSEARCH_BACKEND_USER") {
            self.backend.user = user;
        }
        if let Ok(password) = env::var("FEDSEARCH_BACKEND_PASSWORD") {
            self.backend.password = password;
        }
        if let Ok(database) = env::var("FEDSEARCH_BACKEND_DATABASE") {
            self.backend.database = database;
        }
        if let Ok(secret) = env::var("FEDSEARCH_SECRET_KEY") {
            self.backend.secret_key = secret;
        }
        if let Ok(path) = env::var("FEDSEARCH_CATALOG") {
            self.backend.catalog_path = Some(PathBuf::from(path));
        }

        // Cache configuration
        if let Ok(store) = env::var("FEDSEARCH_CACHE_STORE") {
            match store.to_ascii_lowercase().as_str() {
                "memory" => self.cache.store = CacheStoreKind::Memory,
                "file" => self.cache.store = CacheStoreKind::File,
                other => tracing::warn!(value = %other, "Ignoring unknown FEDSEARCH_CACHE_STORE"),
            }
        }
        if let Ok(path) = env::var("FEDSEARCH_CACHE_PATH") {
            self.cache.path = Some(PathBuf::from(path));
        }
        if let Some(secs) = parse_env("FEDSEARCH_STALE_AFTER_SECS") {
            self.cache.stale_after_secs = secs;
        }
        if let Some(secs) = parse_env("FEDSEARCH_SWEEP_AFTER_SECS") {
            self.cache.sweep_after_secs = secs;
        }

        // Search configuration
        if let Some(n) = parse_env("FEDSEARCH_DEFAULT_PER_PAGE") {
            self.search.default_per_page = n;
        }
        if let Some(n) = parse_env("FEDSEARCH_MAX_PER_PAGE") {
            self.search.max_per_page = n;
        }
        if let Some(n) = parse_env("FEDSEARCH_MAX_QUERY_LENGTH") {
            self.search.max_query_length = n;
        }
        if let Some(enabled) = parse_env("FEDSEARCH_STEMMING") {
            self.search.stemming_enabled = enabled;
        }
        if let Ok(locale) = env::var("FEDSEARCH_LOCALE") {
            self.search.default_locale = locale;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.backend.host.trim().is_empty() {
            return Err(FedError::Configuration(
                "Backend host must be set".to_string(),
            ));
        }

        if self.backend.database.trim().is_empty() {
            return Err(FedError::Configuration(
                "Backend database must be set".to_string(),
            ));
        }

        if self.cache.stale_after_secs == 0 {
            return Err(FedError::Configuration(
                "Cache staleness window must be non-zero".to_string(),
            ));
        }

        if self.cache.sweep_after_secs == 0 {
            return Err(FedError::Configuration(
                "Session sweep window must be non-zero".to_string(),
            ));
        }

        if self.cache.store == CacheStoreKind::File && self.cache.path.is_none() {
            return Err(FedError::Configuration(
                "File cache store requires a path".to_string(),
            ));
        }

        if self.search.default_per_page == 0 {
            return Err(FedError::Configuration(
                "Default page size must be non-zero".to_string(),
            ));
        }

        if self.search.default_per_page > self.search.max_per_page {
            return Err(FedError::Configuration(
                "Default page size cannot exceed max page size".to_string(),
            ));
        }

        if self.search.max_query_length == 0 {
            return Err(FedError::Configuration(
                "Max query length must be non-zero".to_string(),
            ));
        }

        if self.search.highlight_open.is_empty() || self.search.highlight_close.is_empty() {
            return Err(FedError::Configuration(
                "Highlight markers must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Log configuration (redacting sensitive values)
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!(
            "  Backend: {}@{}:{}/{}",
            self.backend.user,
            self.backend.host,
            self.backend.port,
            self.backend.database
        );
        tracing::info!(
            "  Backend password: {}",
            if self.backend.password.is_empty() {
                "(none)"
            } else {
                "****"
            }
        );
        tracing::info!("  Catalog: {:?}", self.backend.catalog_path);
        tracing::info!("  Cache store: {:?}", self.cache.store);
        tracing::info!("  Cache path: {:?}", self.cache.path);
        tracing::info!("  Stale after: {}s", self.cache.stale_after_secs);
        tracing::info!("  Sweep after: {}s", self.cache.sweep_after_secs);
        tracing::info!("  Default per page: {}", self.search.default_per_page);
        tracing::info!("  Max per page: {}", self.search.max_per_page);
        tracing::info!("  Max query length: {}", self.search.max_query_length);
        tracing::info!("  Stemming enabled: {}", self.search.stemming_enabled);
        tracing::info!("  Default locale: {}", self.search.default_locale);
    }
}
