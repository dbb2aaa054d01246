//! Error types for Snyk API operations.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during Snyk API operations.
#[derive(Debug, Error)]
pub enum SnykError {
    /// Missing or inconsistent client configuration (credential, version,
    /// descriptor table). Never retried.
    #[error("Snyk configuration error: {0}")]
    Configuration(String),

    /// Network-level failure: timeout, connection reset, TLS.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a 4xx/5xx status.
    #[error("Snyk API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Vendor error body, decoded when it was JSON.
        body: Value,
        /// Seconds from `Retry-After`, when the API sent one.
        retry_after_secs: Option<u64>,
    },

    /// A single-resource fetch answered 404.
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// A response violated the pagination or envelope contract.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A record could not be converted into a model.
    #[error("Failed to hydrate field '{field}': {reason}")]
    Hydration { field: String, reason: String },
}

impl SnykError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn hydration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Hydration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for HTTP 429 responses.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }

    /// Whether a caller-side retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<url::ParseError> for SnykError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("invalid URL: {err}"))
    }
}

/// Result type alias for Snyk operations.
pub type Result<T> = core::result::Result<T, SnykError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> SnykError {
        SnykError::Api {
            status,
            message: "boom".to_string(),
            body: Value::Null,
            retry_after_secs: None,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!SnykError::config("no version").is_retryable());
        assert!(!SnykError::protocol("bad cursor").is_retryable());
    }

    #[test]
    fn test_rate_limited() {
        assert!(api(429).is_rate_limited());
        assert!(!api(500).is_rate_limited());
    }

    #[test]
    fn test_not_found_status() {
        let err = SnykError::NotFound {
            resource: "targets".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "targets 'abc' not found");
    }

    #[test]
    fn test_hydration_display_names_field() {
        let err = SnykError::hydration("id", "missing");
        assert!(err.to_string().contains("'id'"));
    }
}
