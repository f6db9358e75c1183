//! CLI adapter for fedsearch
//!
//! Command-line front end over the search engine. Depends on `core/`
//! only; every command goes through the shared [`Services`] container.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     core/        |
//! |  (domain logic)  |
//! +--------+---------+
//!          |
//!          v
//! +------------------+
//! |      cli/        |
//! | (clap adapter)   |
//! +------------------+
//! ```
//!
//! [`Services`]: crate::core::services::Services

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// fedsearch - federated boolean search
///
/// Compile a boolean query against every configured backend, execute it,
/// and page through the merged results. Results are cached per session.
#[derive(Parser, Debug)]
#[command(name = "fedsearch")]
#[command(author = "RHOBIMD HEALTH")]
#[command(version)]
#[command(about = "Federated boolean search with a session result cache", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query and print one page of results
    Query(commands::QueryArgs),

    /// Close and drop idle cached sessions
    Sweep(commands::SweepArgs),

    /// Show backend status and cached sessions
    Status(commands::StatusArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  fedsearch completions bash > ~/.local/share/bash-completion/completions/fedsearch
    ///   zsh:   fedsearch completions zsh > ~/.zfunc/_fedsearch
    ///   fish:  fedsearch completions fish > ~/.config/fish/completions/fedsearch.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        command => command,
    };

    let xdg = XdgDirs::new();
    xdg.log_paths();

    // Load configuration
    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    // Create services
    let services = Arc::new(Services::new(config)?);

    // Execute command
    match command {
        Commands::Query(args) => commands::query::execute(args, &services, cli.format).await,
        Commands::Sweep(args) => commands::sweep::execute(args, &services, cli.format).await,
        Commands::Status(args) => commands::status::execute(args, &services, cli.format).await,
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => Ok(()),
    }
}
