//! Result and error types for navkeep.

use thiserror::Error;

/// Result type for navkeep operations
pub type NavkeepResult<T> = Result<T, NavkeepError>;

/// Errors that can occur in navkeep
#[derive(Debug, Error)]
pub enum NavkeepError {
    /// Selector could not be parsed
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        /// The offending selector text
        selector: String,
        /// What the parser rejected
        reason: String,
    },

    /// Operation requires an element node
    #[error("Node is not an element: {message}")]
    NotAnElement {
        /// Error message
        message: String,
    },

    /// Tree mutation would produce an invalid hierarchy
    #[error("Hierarchy request error: {message}")]
    HierarchyRequest {
        /// Error message
        message: String,
    },

    /// Session storage backend failed
    #[error("Session storage error: {message}")]
    Storage {
        /// Error message
        message: String,
    },

    /// Persisted session record has an unknown shape
    #[error("Session record error: {message}")]
    SessionRecord {
        /// Error message
        message: String,
    },

    /// Privileged-context channel failed
    #[error("Privileged channel error: {message}")]
    Channel {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Page fixture could not be built
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl NavkeepError {
    /// Create an invalid selector error
    #[must_use]
    pub fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a hierarchy request error
    #[must_use]
    pub fn hierarchy(message: impl Into<String>) -> Self {
        Self::HierarchyRequest {
            message: message.into(),
        }
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a channel error
    #[must_use]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display() {
        let err = NavkeepError::invalid_selector("div >", "dangling combinator");
        assert_eq!(
            err.to_string(),
            "Invalid selector `div >`: dangling combinator"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = NavkeepError::Timeout { ms: 5000 };
        assert_eq!(err.to_string(), "Operation timed out after 5000ms");
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: NavkeepError = json_err.into();
        assert!(matches!(err, NavkeepError::Json(_)));
    }
}
