//! Iterative-accumulation strategy: process chunks in sequence, carrying a
//! running buffer of accumulated understanding forward.
//!
//! Good for tasks where later chunks reference earlier ones. A caller-
//! supplied termination predicate can stop the run as soon as the buffer
//! contains an answer.

use std::sync::Arc;

use tracing::{info, warn};

use super::IterationRecord;
use crate::context::{preview, ContextEnvironment};
use crate::error::Result;
use crate::invoker::{InvokeRequest, SubQueryInvoker};
use crate::prompts::render;

/// Decides whether iterative processing can stop early.
pub type TerminationCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default termination: the buffer declares an answer.
pub fn default_termination() -> TerminationCheck {
    Arc::new(|result| result.contains("ANSWER_FOUND") || result.contains("FINAL_ANSWER"))
}

/// Parameters for an iterative run.
#[derive(Clone)]
pub struct IterativeParams {
    /// Template for chunk 0, with `{chunk}`
    pub initial_prompt: String,
    /// Template for later chunks, with `{buffer}`, `{chunk}`, `{chunk_num}`,
    /// `{total_chunks}`
    pub iteration_prompt: String,
    pub termination_check: TerminationCheck,
    /// Max chunks to process, regardless of how many exist
    pub max_iterations: usize,
    /// Chunk size in characters
    pub chunk_size: usize,
}

impl std::fmt::Debug for IterativeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterativeParams")
            .field("initial_prompt", &self.initial_prompt)
            .field("iteration_prompt", &self.iteration_prompt)
            .field("max_iterations", &self.max_iterations)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

/// Output of an iterative run.
#[derive(Debug, Clone)]
pub struct IterativeOutput {
    /// Final state of the running buffer
    pub final_answer: String,
    /// Iterations actually run
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
}

pub async fn run(
    invoker: &SubQueryInvoker,
    env: &mut ContextEnvironment,
    params: &IterativeParams,
) -> Result<IterativeOutput> {
    let chunks = env.chunk_by_size(params.chunk_size).to_vec();
    let total_chunks = chunks.len();

    let mut buffer = String::new();
    let mut history = Vec::new();

    for (i, chunk) in chunks.iter().take(params.max_iterations).enumerate() {
        if env.sub_calls().len() >= invoker.config().max_sub_calls {
            warn!(
                limit = invoker.config().max_sub_calls,
                "hit max sub-calls limit in iterative phase"
            );
            break;
        }

        let prompt = if i == 0 {
            render(&params.initial_prompt, &[("chunk", chunk.as_str())])
        } else {
            render(
                &params.iteration_prompt,
                &[
                    ("buffer", buffer.as_str()),
                    ("chunk", chunk.as_str()),
                    ("chunk_num", &(i + 1).to_string()),
                    ("total_chunks", &total_chunks.to_string()),
                ],
            )
        };

        buffer = invoker.invoke(InvokeRequest::new(prompt), env).await?;
        history.push(IterationRecord {
            iteration: i + 1,
            chunk_preview: preview(chunk, 100),
            result_preview: preview(&buffer, 200),
        });

        if (params.termination_check)(&buffer) {
            info!(iteration = i + 1, "early termination");
            break;
        }
    }

    Ok(IterativeOutput {
        final_answer: buffer,
        iterations: history.len(),
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RlmConfig;
    use crate::prompts::{default_initial_prompt, default_iteration_prompt};
    use crate::testing::MockClient;
    use pretty_assertions::assert_eq;

    fn params(max_iterations: usize, chunk_size: usize) -> IterativeParams {
        IterativeParams {
            initial_prompt: default_initial_prompt("the query"),
            iteration_prompt: default_iteration_prompt("the query"),
            termination_check: default_termination(),
            max_iterations,
            chunk_size,
        }
    }

    #[tokio::test]
    async fn test_buffer_accumulates_across_chunks() {
        let client = Arc::new(MockClient::new());
        client.push_reply("first findings");
        client.push_reply("updated findings");
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("A".repeat(10), "string");

        let output = run(&invoker, &mut env, &params(10, 5)).await.unwrap();

        assert_eq!(output.iterations, 2);
        assert_eq!(output.final_answer, "updated findings");
        // The second prompt carries the previous buffer and the new chunk.
        let prompts = client.prompts();
        assert!(prompts[1].contains("Previous findings:\nfirst findings"));
        assert!(prompts[1].contains("(2/2)"));
    }

    #[tokio::test]
    async fn test_max_iterations_caps_run() {
        let client = Arc::new(MockClient::new());
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("A".repeat(50), "string");

        // 10 chunks exist; only 3 may be processed.
        let output = run(&invoker, &mut env, &params(3, 5)).await.unwrap();
        assert_eq!(output.iterations, 3);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_termination_check_stops_early() {
        let client = Arc::new(MockClient::new());
        client.push_reply("still looking");
        client.push_reply("FINAL_ANSWER: 42");
        client.push_reply("never issued");
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("A".repeat(50), "string");

        let output = run(&invoker, &mut env, &params(10, 5)).await.unwrap();

        assert_eq!(output.iterations, 2);
        assert_eq!(output.final_answer, "FINAL_ANSWER: 42");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_custom_termination_check() {
        let client = Arc::new(MockClient::new());
        client.push_reply("contains DONE marker");
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("A".repeat(50), "string");

        let mut p = params(10, 5);
        p.termination_check = Arc::new(|s| s.contains("DONE"));
        let output = run(&invoker, &mut env, &p).await.unwrap();
        assert_eq!(output.iterations, 1);
    }

    #[tokio::test]
    async fn test_budget_stops_iterations() {
        let client = Arc::new(MockClient::new());
        let config = RlmConfig::default().with_max_sub_calls(2);
        let invoker = SubQueryInvoker::new(client.clone(), config);
        let mut env = ContextEnvironment::new("A".repeat(50), "string");

        let output = run(&invoker, &mut env, &params(10, 5)).await.unwrap();
        assert_eq!(output.iterations, 2);
        assert_eq!(env.sub_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_history_previews() {
        let client = Arc::new(MockClient::new());
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("B".repeat(300), "string");

        let output = run(&invoker, &mut env, &params(1, 300)).await.unwrap();

        let record = &output.history[0];
        assert_eq!(record.iteration, 1);
        assert!(record.chunk_preview.chars().count() <= 103);
        assert!(record.chunk_preview.ends_with("..."));
    }

    #[tokio::test]
    async fn test_empty_context_runs_nothing() {
        let client = Arc::new(MockClient::new());
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        let mut env = ContextEnvironment::new("", "string");

        let output = run(&invoker, &mut env, &params(10, 5)).await.unwrap();
        assert_eq!(output.iterations, 0);
        assert_eq!(output.final_answer, "");
        assert_eq!(client.call_count(), 0);
    }
}
