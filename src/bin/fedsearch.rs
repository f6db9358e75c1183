//! fedsearch CLI - command-line interface for federated search
//!
//! # Examples
//!
//! ```bash
//! # Search every backend of the built-in demo catalog
//! fedsearch query "sea OR mountain"
//!
//! # Second page, photos backend only, with thesaurus expansion
//! fedsearch query "*:sea" --backend 1 --page 2 --per-page 5
//!
//! # Drop sessions idle for more than an hour
//! fedsearch sweep --older-than-secs 3600
//!
//! # Backend status and cached sessions
//! fedsearch status --sessions
//! ```

use clap::Parser;
use fedsearch::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = std::env::var("FEDSEARCH_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("fedsearch=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr); // stdout carries command output

    if std::env::var("FEDSEARCH_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.with_ansi(false).compact().init();
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
