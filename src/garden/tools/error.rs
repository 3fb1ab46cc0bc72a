use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases of a sync run. Every
/// variant is fatal to the run that raised it.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading snapshots or writing the cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failures bubbled up from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when a name or location tag does not follow the tag convention.
    #[error("malformed tag '{tag}': {reason}")]
    Decode { tag: String, reason: String },

    /// Raised when paginating the remote table fails.
    #[error("failed to fetch table '{table}': {message}")]
    Fetch { table: String, message: String },

    /// Raised when a create, update, or delete call returns an error payload.
    #[error("{action} of {record} failed: {message}")]
    Write {
        action: String,
        record: String,
        message: String,
    },

    /// Raised when credentials, table identifiers, or sync settings are
    /// missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn decode(tag: &str, reason: impl Into<String>) -> Self {
        ToolError::Decode {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ToolError {
    fn from(error: figment::Error) -> Self {
        ToolError::Config(error.to_string())
    }
}
