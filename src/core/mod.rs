//! Core domain logic
//!
//! Everything here is independent of the command line front end.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Domain data structures
//! - **xdg**: XDG directory handling
//! - **catalog**: Backend, collection and field metadata
//! - **query**: Query language, thesaurus expansion and compilation
//! - **backend**: Index backend seam and the in-process implementation
//! - **executor**: Per-backend execution and aggregation
//! - **cache**: Session-scoped result cache
//! - **assembler**: Result page assembly
//! - **suggest**: Suggestions and the proposal panel
//! - **engine**: Request orchestration
//! - **services**: Unified service container

pub mod assembler;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod i18n;
pub mod query;
pub mod services;
pub mod suggest;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use engine::{Indexable, SearchEngine};
pub use error::{FedError, Result};
pub use services::Services;
