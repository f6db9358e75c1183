//! Status command - backend diagnostics and cached sessions

use crate::cli::output::{self, colors};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::types::SessionCacheEntry;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also list cached sessions
    #[arg(long, short = 's')]
    pub sessions: bool,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub engine: String,
    pub version: String,
    pub stemming_enabled: bool,
    pub backend: Vec<(String, String)>,
    pub backends: Vec<BackendSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<SessionCacheEntry>,
}

#[derive(Debug, Serialize)]
pub struct BackendSummary {
    pub id: u32,
    pub name: String,
    pub collections: usize,
    pub fields: usize,
}

/// Execute the status command
pub async fn execute(
    args: StatusArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = &services.engine;

    let output = StatusOutput {
        engine: engine.name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stemming_enabled: engine.is_stemming_enabled(),
        backend: engine.status()?,
        backends: engine
            .catalog()
            .backends()
            .iter()
            .map(|b| BackendSummary {
                id: b.id,
                name: b.name.clone(),
                collections: b.collections.len(),
                fields: b.fields.len(),
            })
            .collect(),
        sessions: if args.sessions {
            engine.cache().entries()?
        } else {
            Vec::new()
        },
    };

    match format {
        OutputFormat::Human => print_human(&output),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_human(output: &StatusOutput) {
    output::print_header(&format!("{} v{}", output.engine, output.version));
    for (key, value) in &output.backend {
        println!("  {}: {}", colors::label(key), value);
    }

    println!("\n{}", colors::label("Backends:"));
    for backend in &output.backends {
        println!(
            "  [{}] {} {}",
            colors::number(&backend.id.to_string()),
            backend.name,
            colors::dim(&format!(
                "({} collection(s), {} field(s))",
                backend.collections, backend.fields
            ))
        );
    }

    if !output.sessions.is_empty() {
        println!("\n{}", colors::label("Cached sessions:"));
        for entry in &output.sessions {
            println!(
                "  {} {} {} {}",
                colors::session_id(&entry.session_id),
                colors::dim(&format!("\"{}\"", entry.query)),
                colors::number(&entry.total.to_string()),
                output::format_relative_time_colored(&entry.last_access)
            );
        }
    }
}
