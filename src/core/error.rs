//! Error types and error handling for the federated search engine.
//!
//! Fatal errors (configuration, connection, session) abort a whole
//! operation. Per-backend errors (query execution, parse) are absorbed
//! by the compiler and executor, which skip the offending backend.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, FedError>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum FedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Query execution failed on backend {backend}: {message}")]
    QueryExecution { backend: u32, message: String },

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FedError {
    /// Shorthand for a parse error at a byte position
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        FedError::Parse {
            position,
            message: message.into(),
        }
    }

    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Errors that abort the whole operation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FedError::Configuration(_) | FedError::Connection(_) | FedError::Session(_)
        )
    }

    /// Errors scoped to a single backend during federation
    pub fn is_per_backend(&self) -> bool {
        matches!(self, FedError::QueryExecution { .. } | FedError::Parse { .. })
    }
}
