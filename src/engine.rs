//! High-level orchestrator: the `rlm_query` entry point.
//!
//! The engine constructs one [`ContextEnvironment`] per query, fills in
//! default prompt templates around the caller's query, dispatches to the
//! selected strategy, and normalizes every outcome into a [`QueryResult`].
//! It never returns an error: failures anywhere in the call chain come back
//! as `success = false` with the error message and whatever telemetry was
//! gathered before the failure.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::RlmConfig;
use crate::context::{ContextEnvironment, ContextStats};
use crate::error::Result;
use crate::invoker::SubQueryInvoker;
use crate::llm::LlmClient;
use crate::prompts::{
    default_extraction_prompt, default_initial_prompt, default_iteration_prompt,
    default_map_prompt, default_reduce_prompt, default_synthesis_prompt,
};
use crate::strategy::iterative::{default_termination, IterativeParams, TerminationCheck};
use crate::strategy::map_reduce::MapReduceParams;
use crate::strategy::search_extract::SearchExtractParams;
use crate::strategy::{adaptive, iterative, map_reduce, search_extract};
use crate::strategy::{QueryResult, Strategy, StrategyDetail};

/// Per-query options. Anything left unset falls back to the engine config
/// and the default prompt templates built around the query.
#[derive(Clone, Default)]
pub struct QueryOptions {
    /// Free-form label for the context (default "document"); no behavioral
    /// effect, carried into stats for downstream templating.
    pub context_type: Option<String>,
    /// Chunk size in characters (default: config `max_chunk_chars`)
    pub chunk_size: Option<usize>,
    pub map_prompt: Option<String>,
    pub reduce_prompt: Option<String>,
    pub search_patterns: Option<Vec<String>>,
    pub extraction_prompt: Option<String>,
    pub synthesis_prompt: Option<String>,
    pub initial_prompt: Option<String>,
    pub iteration_prompt: Option<String>,
    pub termination_check: Option<TerminationCheck>,
    /// Max iterative chunks to process (default 10)
    pub max_iterations: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_type(mut self, context_type: impl Into<String>) -> Self {
        self.context_type = Some(context_type.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_map_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.map_prompt = Some(prompt.into());
        self
    }

    pub fn with_reduce_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.reduce_prompt = Some(prompt.into());
        self
    }

    pub fn with_search_patterns(mut self, patterns: Vec<String>) -> Self {
        self.search_patterns = Some(patterns);
        self
    }

    pub fn with_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn with_synthesis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.synthesis_prompt = Some(prompt.into());
        self
    }

    pub fn with_initial_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.initial_prompt = Some(prompt.into());
        self
    }

    pub fn with_iteration_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.iteration_prompt = Some(prompt.into());
        self
    }

    pub fn with_termination_check(mut self, check: TerminationCheck) -> Self {
        self.termination_check = Some(check);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    fn context_type_or_default(&self) -> &str {
        self.context_type.as_deref().unwrap_or("document")
    }
}

impl std::fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOptions")
            .field("context_type", &self.context_type)
            .field("chunk_size", &self.chunk_size)
            .field("search_patterns", &self.search_patterns)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

/// The RLM engine. Holds the injected client and configuration; every
/// query gets its own environment, so independent engines (and sequential
/// queries on one engine) never share state.
pub struct RlmEngine {
    invoker: SubQueryInvoker,
    config: RlmConfig,
}

impl RlmEngine {
    pub fn new(client: Arc<dyn LlmClient>, config: RlmConfig) -> Self {
        Self {
            invoker: SubQueryInvoker::new(client, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &RlmConfig {
        &self.config
    }

    /// String-keyed entry point. Parses the strategy name and dispatches;
    /// an unrecognized name is reported in the result, without any sub-call.
    pub async fn rlm_query(
        &self,
        query: &str,
        context: &str,
        strategy: &str,
        options: &QueryOptions,
    ) -> QueryResult {
        match strategy.parse::<Strategy>() {
            Ok(parsed) => self.query_with(query, context, parsed, options).await,
            Err(err) => {
                warn!(strategy, "unknown strategy");
                let context_length = context.chars().count();
                QueryResult {
                    success: false,
                    final_answer: None,
                    error: Some(err.to_string()),
                    query: query.to_string(),
                    strategy: strategy.to_string(),
                    context_length,
                    timestamp: Utc::now(),
                    stats: ContextStats {
                        context_length,
                        context_type: options.context_type_or_default().to_string(),
                        ..ContextStats::default()
                    },
                    detail: StrategyDetail::None,
                    auto_strategy: None,
                }
            }
        }
    }

    /// Typed entry point.
    pub async fn query_with(
        &self,
        query: &str,
        context: &str,
        strategy: Strategy,
        options: &QueryOptions,
    ) -> QueryResult {
        match strategy {
            Strategy::Smart => self.query_smart(query, context, options).await,
            concrete => self.query_concrete(query, context, concrete, options).await,
        }
    }

    async fn query_smart(
        &self,
        query: &str,
        context: &str,
        options: &QueryOptions,
    ) -> QueryResult {
        let mut env = ContextEnvironment::new(context, options.context_type_or_default());
        info!(
            context_length = env.context_length(),
            "RLM query starting: smart selection"
        );

        match adaptive::classify(&self.invoker, &mut env, query).await {
            Ok(classified) => {
                let mut result = self
                    .query_concrete(query, context, classified.strategy, options)
                    .await;
                result.strategy = Strategy::Smart.to_string();
                result.auto_strategy = Some(classified.raw);
                result
            }
            Err(err) => {
                error!(%err, "smart selection failed");
                self.failure(query, Strategy::Smart.to_string(), env.stats(), &err)
            }
        }
    }

    async fn query_concrete(
        &self,
        query: &str,
        context: &str,
        strategy: Strategy,
        options: &QueryOptions,
    ) -> QueryResult {
        let mut env = ContextEnvironment::new(context, options.context_type_or_default());
        info!(
            context_length = env.context_length(),
            %strategy,
            "RLM query starting"
        );

        let outcome = self.run_strategy(query, strategy, &mut env, options).await;
        match outcome {
            Ok((final_answer, detail)) => QueryResult {
                success: true,
                final_answer: Some(final_answer),
                error: None,
                query: query.to_string(),
                strategy: strategy.to_string(),
                context_length: env.context_length(),
                timestamp: Utc::now(),
                stats: env.stats(),
                detail,
                auto_strategy: None,
            },
            Err(err) => {
                error!(%err, %strategy, "RLM query failed");
                self.failure(query, strategy.to_string(), env.stats(), &err)
            }
        }
    }

    async fn run_strategy(
        &self,
        query: &str,
        strategy: Strategy,
        env: &mut ContextEnvironment,
        options: &QueryOptions,
    ) -> Result<(String, StrategyDetail)> {
        match strategy {
            Strategy::MapReduce => {
                let params = MapReduceParams {
                    map_prompt: options
                        .map_prompt
                        .clone()
                        .unwrap_or_else(|| default_map_prompt(query)),
                    reduce_prompt: options
                        .reduce_prompt
                        .clone()
                        .unwrap_or_else(|| default_reduce_prompt(query)),
                    chunk_size: options.chunk_size.unwrap_or(self.config.max_chunk_chars),
                };
                let output = map_reduce::run(&self.invoker, env, &params).await?;
                Ok((
                    output.final_answer,
                    StrategyDetail::MapReduce {
                        chunk_results: output.chunk_results,
                    },
                ))
            }
            Strategy::SearchExtract => {
                let params = SearchExtractParams {
                    search_patterns: options
                        .search_patterns
                        .clone()
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| vec![first_word(query).to_string()]),
                    extraction_prompt: options
                        .extraction_prompt
                        .clone()
                        .unwrap_or_else(|| default_extraction_prompt(query)),
                    synthesis_prompt: options
                        .synthesis_prompt
                        .clone()
                        .unwrap_or_else(|| default_synthesis_prompt(query)),
                };
                let output = search_extract::run(&self.invoker, env, &params).await?;
                Ok((
                    output.final_answer,
                    StrategyDetail::SearchExtract {
                        extractions: output.extractions,
                        num_matches: output.num_matches,
                        num_processed: output.num_processed,
                    },
                ))
            }
            Strategy::Iterative => {
                let params = IterativeParams {
                    initial_prompt: options
                        .initial_prompt
                        .clone()
                        .unwrap_or_else(|| default_initial_prompt(query)),
                    iteration_prompt: options
                        .iteration_prompt
                        .clone()
                        .unwrap_or_else(|| default_iteration_prompt(query)),
                    termination_check: options
                        .termination_check
                        .clone()
                        .unwrap_or_else(default_termination),
                    max_iterations: options.max_iterations.unwrap_or(10),
                    chunk_size: options.chunk_size.unwrap_or(self.config.max_chunk_chars),
                };
                let output = iterative::run(&self.invoker, env, &params).await?;
                Ok((
                    output.final_answer,
                    StrategyDetail::Iterative {
                        iterations: output.iterations,
                        history: output.history,
                    },
                ))
            }
            Strategy::Smart => unreachable!("smart is resolved before dispatch"),
        }
    }

    fn failure(
        &self,
        query: &str,
        strategy: String,
        stats: ContextStats,
        err: &crate::error::Error,
    ) -> QueryResult {
        QueryResult {
            success: false,
            final_answer: None,
            error: Some(err.to_string()),
            query: query.to_string(),
            strategy,
            context_length: stats.context_length,
            timestamp: Utc::now(),
            stats,
            detail: StrategyDetail::None,
            auto_strategy: None,
        }
    }
}

/// First whitespace-separated word of the query, used as the fallback
/// search pattern.
fn first_word(query: &str) -> &str {
    query.split_whitespace().next().unwrap_or(query)
}
