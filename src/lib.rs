//! fedsearch - federated boolean query compiler with a session-scoped
//! result cache
//!
//! A query in a small boolean language is compiled against several
//! independently indexed backends, executed on each, and the ranked
//! results are paged out of a per-session cursor. Results are cached
//! per session so that paging through the same query never re-executes
//! it on the backends.
//!
//! # Architecture
//!
//! - **core**: Domain logic
//!   - config, error, types, xdg, catalog, clock, i18n
//!   - query (lexer, parser, thesaurus expansion, compiler)
//!   - backend (index backend trait, in-process backend)
//!   - executor, cache, assembler, suggest
//!   - engine (request orchestration), services
//!
//! - **cli**: Command-line adapter (depends on core)

// Core domain logic
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::engine::{Indexable, SearchEngine};
pub use core::error::{FedError, Result};
pub use core::services::Services;
pub use core::types::*;
