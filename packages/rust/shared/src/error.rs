//! Error types for listscribe.
//!
//! Library crates use [`ListscribeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all listscribe operations.
#[derive(Debug, thiserror::Error)]
pub enum ListscribeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page.
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// HTML or URL parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Generation-service error (request, transport, or malformed response).
    #[error("generation service error: {0}")]
    GenAi(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Dataset reading/writing error (bad JSON, bad CSV, schema mismatch).
    #[error("dataset error: {message}")]
    Dataset { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ListscribeError>;

impl ListscribeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error carrying the URL it happened on.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a dataset error from any displayable message.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ListscribeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ListscribeError::fetch("https://example.org", "timed out");
        assert!(err.to_string().contains("https://example.org"));
        assert!(err.to_string().contains("timed out"));
    }
}
