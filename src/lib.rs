//! # maven-rlm
//!
//! A recursive context processing engine for queries over contexts far
//! larger than one model call can hold. The root model orchestrates;
//! cheaper sub-model calls examine the context piece by piece.
//!
//! ## Core Components
//!
//! - **Context**: Per-query environment with chunk views and sub-call telemetry
//! - **Search**: Windowed regex search over the raw context
//! - **Invoker**: Budgeted, timeout-enforced sub-query dispatch
//! - **Strategies**: Map-reduce, search-extract, iterative, and smart selection
//! - **Engine**: The `rlm_query` orchestrator that never raises
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use maven_rlm::{AnthropicClient, ClientConfig, QueryOptions, RlmConfig, RlmEngine};
//!
//! let client = Arc::new(AnthropicClient::new(ClientConfig::new(api_key)));
//! let engine = RlmEngine::new(client, RlmConfig::from_env());
//!
//! let result = engine
//!     .rlm_query("Summarize the risks", &huge_context, "smart", &QueryOptions::new())
//!     .await;
//! if result.success {
//!     println!("{}", result.final_answer.unwrap());
//! }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod financial;
pub mod invoker;
pub mod llm;
pub mod prompts;
pub mod search;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::RlmConfig;
pub use context::{ContextEnvironment, ContextStats, SubCallRecord};
pub use engine::{QueryOptions, RlmEngine};
pub use error::{Error, Result};
pub use invoker::{InvokeRequest, SubQueryInvoker};
pub use llm::{
    AnthropicClient, ClientConfig, CompletionRequest, CompletionResponse, LlmClient, TokenUsage,
};
pub use search::{search, SearchHit};
pub use strategy::{
    ChunkResult, Extraction, IterationRecord, QueryResult, Strategy, StrategyDetail,
};
