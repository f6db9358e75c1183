//! Config command - show current configuration

use crate::cli::OutputFormat;
use crate::core::config::CacheStoreKind;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show all configuration including search defaults
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    pub backend: BackendSection,
    pub cache: CacheSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSection>,
}

#[derive(Debug, Serialize)]
pub struct BackendSection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub catalog: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheSection {
    pub store: CacheStoreKind,
    pub path: Option<String>,
    pub stale_after_secs: u64,
    pub sweep_after_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchSection {
    pub default_per_page: usize,
    pub max_per_page: usize,
    pub max_query_length: usize,
    pub stemming_enabled: bool,
    pub default_sort: String,
    pub default_locale: String,
}

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &services.config;

    let xdg = crate::core::xdg::XdgDirs::new();

    let response = ConfigResponse {
        config_file: xdg.config_file().to_string_lossy().into_owned(),
        backend: BackendSection {
            host: config.backend.host.clone(),
            port: config.backend.port,
            database: config.backend.database.clone(),
            catalog: config
                .backend
                .catalog_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        },
        cache: CacheSection {
            store: config.cache.store,
            path: config
                .cache
                .path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            stale_after_secs: config.cache.stale_after_secs,
            sweep_after_secs: config.cache.sweep_after_secs,
        },
        search: args.all.then(|| SearchSection {
            default_per_page: config.search.default_per_page,
            max_per_page: config.search.max_per_page,
            max_query_length: config.search.max_query_length,
            stemming_enabled: config.search.stemming_enabled,
            default_sort: config.search.default_sort.clone(),
            default_locale: config.search.default_locale.clone(),
        }),
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  backend:");
            println!("    host: {}", response.backend.host);
            println!("    port: {}", response.backend.port);
            println!("    database: {}", response.backend.database);
            println!(
                "    catalog: {}",
                response.backend.catalog.as_deref().unwrap_or("(built-in demo)")
            );
            println!("  cache:");
            println!("    store: {:?}", response.cache.store);
            println!(
                "    path: {}",
                response.cache.path.as_deref().unwrap_or("(none)")
            );
            println!("    stale_after_secs: {}", response.cache.stale_after_secs);
            println!("    sweep_after_secs: {}", response.cache.sweep_after_secs);
            if let Some(search) = &response.search {
                println!("  search:");
                println!("    default_per_page: {}", search.default_per_page);
                println!("    max_per_page: {}", search.max_per_page);
                println!("    max_query_length: {}", search.max_query_length);
                println!("    stemming_enabled: {}", search.stemming_enabled);
                println!("    default_sort: {:?}", search.default_sort);
                println!("    default_locale: {}", search.default_locale);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
