//! Error types for link extraction and argument validation.

use thiserror::Error;

/// Maximum URL length to accept (standard browser limit).
pub const MAX_URL_LENGTH: usize = 2000;

/// Errors raised for truly malformed extraction input.
///
/// An empty extraction result is never an error; it is reported as
/// "0 files found".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The requested file type is not a usable extension.
    #[error("invalid file type '{value}': {reason}\n  Suggestion: {suggestion}")]
    InvalidFileType {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// The page URL is malformed or cannot be fetched over HTTP.
    #[error("invalid URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    InvalidUrl {
        /// The URL that failed validation.
        url: String,
        /// Why the URL is invalid.
        reason: String,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// The page URL cannot serve as a base for resolving relative links.
    #[error("URL '{url}' cannot be used as a base for relative links")]
    CannotBeABase {
        /// The offending base URL.
        url: String,
    },
}

impl ExtractionError {
    /// Creates an `InvalidFileType` error.
    #[must_use]
    pub fn invalid_file_type(value: &str, reason: &'static str) -> Self {
        Self::InvalidFileType {
            value: value.to_string(),
            reason,
            suggestion: "Pass a bare extension such as `pdf` or `zip`",
        }
    }

    /// Creates an `InvalidUrl` error for a non-web URL scheme.
    #[must_use]
    pub fn unsupported_scheme(url: &str, scheme: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme '{scheme}' is not supported"),
            suggestion: "Use http:// or https:// URLs",
        }
    }

    /// Creates an `InvalidUrl` error for a malformed URL.
    #[must_use]
    pub fn malformed(url: &str, parse_error: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: parse_error.to_string(),
            suggestion: "Check the URL format and try again",
        }
    }

    /// Creates an `InvalidUrl` error for a URL without a host.
    #[must_use]
    pub fn no_host(url: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
            suggestion: "Include a domain, e.g. https://example.com/files",
        }
    }

    /// Creates an `InvalidUrl` error for an over-long URL.
    #[must_use]
    pub fn too_long(url: &str) -> Self {
        let preview: String = url.chars().take(60).collect();
        Self::InvalidUrl {
            url: format!("{preview}..."),
            reason: format!("{} chars exceeds the {MAX_URL_LENGTH} char limit", url.len()),
            suggestion: "Check for extraneous content pasted into the URL",
        }
    }
}
