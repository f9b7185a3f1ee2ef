//! Engine configuration with environment-driven defaults.
//!
//! Mirrors the `MAVEN_RLM_*` environment variables of the Maven deployment.
//! Every field has a sensible default so a plain `RlmConfig::default()` is a
//! working configuration.

use serde::{Deserialize, Serialize};

/// Default model for recursive sub-calls.
pub const DEFAULT_SUB_MODEL: &str = "claude-sonnet-4-20250514";
/// Default model for final synthesis.
pub const DEFAULT_ROOT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for an [`RlmEngine`](crate::engine::RlmEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlmConfig {
    /// Model for recursive sub-calls (smaller/cheaper model)
    pub sub_model: String,
    /// Model for final synthesis
    pub root_model: String,
    /// Max characters per sub-call context chunk
    pub max_chunk_chars: usize,
    /// Max recursive depth. Advisory: sub-calls are plain model calls, so
    /// the effective depth is 1 by construction.
    pub max_depth: u32,
    /// Max sub-calls per query (cost control)
    pub max_sub_calls: usize,
    /// Deadline for each sub-call, in seconds
    pub timeout_secs: u64,
    /// Concurrent in-flight calls during the map phase (1 = sequential)
    pub max_concurrency: usize,
}

impl Default for RlmConfig {
    fn default() -> Self {
        Self {
            sub_model: DEFAULT_SUB_MODEL.to_string(),
            root_model: DEFAULT_ROOT_MODEL.to_string(),
            max_chunk_chars: 200_000,
            max_depth: 1,
            max_sub_calls: 50,
            timeout_secs: 60,
            max_concurrency: 4,
        }
    }
}

impl RlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `MAVEN_RLM_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sub_model: std::env::var("MAVEN_RLM_SUB_MODEL").unwrap_or(defaults.sub_model),
            root_model: std::env::var("MAVEN_RLM_ROOT_MODEL").unwrap_or(defaults.root_model),
            max_chunk_chars: env_parse("MAVEN_RLM_CHUNK_SIZE", defaults.max_chunk_chars),
            max_depth: env_parse("MAVEN_RLM_MAX_DEPTH", defaults.max_depth),
            max_sub_calls: env_parse("MAVEN_RLM_MAX_CALLS", defaults.max_sub_calls),
            timeout_secs: env_parse("MAVEN_RLM_TIMEOUT", defaults.timeout_secs),
            max_concurrency: env_parse("MAVEN_RLM_CONCURRENCY", defaults.max_concurrency)
                .max(1),
        }
    }

    pub fn with_sub_model(mut self, model: impl Into<String>) -> Self {
        self.sub_model = model.into();
        self
    }

    pub fn with_root_model(mut self, model: impl Into<String>) -> Self {
        self.root_model = model.into();
        self
    }

    pub fn with_max_chunk_chars(mut self, chars: usize) -> Self {
        self.max_chunk_chars = chars;
        self
    }

    pub fn with_max_sub_calls(mut self, max: usize) -> Self {
        self.max_sub_calls = max;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers.max(1);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
