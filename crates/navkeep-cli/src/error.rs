//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// No session record stored under the requested key
    #[error("No session record under `{key}` in {path}")]
    RecordNotFound {
        /// Storage key
        key: String,
        /// Storage file
        path: String,
    },

    /// Selector matched nothing
    #[error("No element matches `{selector}`")]
    NoMatch {
        /// The selector that was queried
        selector: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Navkeep library error
    #[error("Navkeep error: {0}")]
    Navkeep(#[from] navkeep::NavkeepError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a no-match error
    #[must_use]
    pub fn no_match(selector: impl Into<String>) -> Self {
        Self::NoMatch {
            selector: selector.into(),
        }
    }
}
