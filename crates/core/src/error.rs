//! Error types for Lectern.
//!
//! This module defines a unified error enum that covers all error categories
//! in the engine: configuration, I/O, corpus, provider routing, output
//! parsing, quota and persistence errors.

use thiserror::Error;

/// Unified error type for Lectern.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reference corpus could not be read. Retrieval treats this as an
    /// empty corpus rather than a failure.
    #[error("Reference corpus unavailable: {0}")]
    CorpusUnavailable(String),

    /// No provider can serve the request at all
    #[error("No available generation providers configured.")]
    NoProviderAvailable,

    /// A forced provider cannot be used; carries the availability reason
    #[error("{reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Network error, non-2xx response or malformed response body
    #[error("{provider} request failed: {message}")]
    ProviderCallFailed { provider: String, message: String },

    /// Output scored below the automatic-mode quality floor
    #[error("{provider} output quality {score:.3} below floor {floor:.3}")]
    QualityBelowFloor {
        provider: String,
        score: f64,
        floor: f64,
    },

    /// The call was cancelled or timed out
    #[error("{provider} request cancelled")]
    Cancelled { provider: String },

    /// Generated output did not match the expected structure
    #[error("Output parse failed: {0}")]
    OutputParseFailed(String),

    /// Platform-funded generation is exhausted for this principal
    #[error("Platform quota exhausted for {principal}; a caller-supplied key is required")]
    QuotaExhausted { principal: String },

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error comes from a single provider attempt.
    ///
    /// Automatic routing absorbs these and moves on to the next candidate.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            AppError::ProviderCallFailed { .. }
                | AppError::QualityBelowFloor { .. }
                | AppError::Cancelled { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_message() {
        let err = AppError::NoProviderAvailable;
        assert_eq!(err.to_string(), "No available generation providers configured.");
    }

    #[test]
    fn test_provider_unavailable_uses_reason() {
        let err = AppError::ProviderUnavailable {
            provider: "minimax".to_string(),
            reason: "BYO key required.".to_string(),
        };
        assert_eq!(err.to_string(), "BYO key required.");
        assert!(!err.is_provider_failure());
    }

    #[test]
    fn test_provider_failure_classification() {
        let call = AppError::ProviderCallFailed {
            provider: "google".to_string(),
            message: "500".to_string(),
        };
        let quality = AppError::QualityBelowFloor {
            provider: "google".to_string(),
            score: 0.2,
            floor: 0.65,
        };
        assert!(call.is_provider_failure());
        assert!(quality.is_provider_failure());
        assert!(!AppError::NoProviderAvailable.is_provider_failure());
    }
}
