//! Error types for maven-rlm.

use thiserror::Error;

/// Result type alias using maven-rlm's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during RLM processing.
#[derive(Error, Debug)]
pub enum Error {
    /// LLM API error
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// LLM error (simple variant)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Sub-call exceeded its deadline
    #[error("Sub-call timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Unknown strategy name passed to the string entry point
    #[error("Unknown strategy: {0}. Use: map_reduce, search_extract, iterative, smart")]
    UnknownStrategy(String),

    /// Search-extract found nothing to process
    #[error("No matching sections found")]
    NoMatches,

    /// Invalid search or chunking pattern
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Adaptive classification returned an unrecognized token
    #[error("Strategy classification failed: {0}")]
    Classification(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_secs: u64) -> Self {
        Self::Timeout { duration_secs }
    }

    /// Create an invalid-pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_strategy_message() {
        let err = Error::UnknownStrategy("bogus".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Unknown strategy: bogus"));
        assert!(msg.contains("map_reduce"));
    }

    #[test]
    fn test_no_matches_message() {
        assert_eq!(Error::NoMatches.to_string(), "No matching sections found");
    }
}
