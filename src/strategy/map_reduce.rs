//! Map-reduce strategy: process every chunk independently, then synthesize
//! all chunk outputs in one final reduce call.
//!
//! The map phase runs through a bounded concurrent stream. Each worker
//! returns its own sub-call record; records are folded into the environment
//! in chunk order after the parallel section, so the telemetry log is never
//! mutated from multiple tasks and the result is deterministic.

use futures::StreamExt;
use tracing::{info, warn};

use super::ChunkResult;
use crate::context::ContextEnvironment;
use crate::error::Result;
use crate::invoker::{InvokeRequest, SubQueryInvoker};
use crate::prompts::render;

/// Parameters for a map-reduce run.
#[derive(Debug, Clone)]
pub struct MapReduceParams {
    /// Template with `{chunk}`, `{chunk_num}`, `{total_chunks}`
    pub map_prompt: String,
    /// Template with `{results}`, `{num_chunks}`
    pub reduce_prompt: String,
    /// Chunk size in characters
    pub chunk_size: usize,
}

/// Output of a map-reduce run.
#[derive(Debug, Clone)]
pub struct MapReduceOutput {
    pub final_answer: String,
    pub chunk_results: Vec<ChunkResult>,
}

pub async fn run(
    invoker: &SubQueryInvoker,
    env: &mut ContextEnvironment,
    params: &MapReduceParams,
) -> Result<MapReduceOutput> {
    let chunks = env.chunk_by_size(params.chunk_size).to_vec();
    let total_chunks = chunks.len();

    // Budget cap: issue at most the remaining sub-call allowance, producing
    // a partial map set rather than an error.
    let budget = invoker.config().max_sub_calls;
    let remaining = budget.saturating_sub(env.sub_calls().len());
    let to_process = total_chunks.min(remaining);
    if to_process < total_chunks {
        warn!(limit = budget, "hit max sub-calls limit in map phase");
    }

    let prompts: Vec<String> = chunks
        .iter()
        .take(to_process)
        .enumerate()
        .map(|(i, chunk)| {
            render(
                &params.map_prompt,
                &[
                    ("chunk", chunk.as_str()),
                    ("chunk_num", &(i + 1).to_string()),
                    ("total_chunks", &total_chunks.to_string()),
                ],
            )
        })
        .collect();

    let outcomes: Vec<_> = futures::stream::iter(prompts)
        .map(|prompt| invoker.dispatch(InvokeRequest::new(prompt)))
        .buffered(invoker.config().max_concurrency)
        .collect()
        .await;

    let mut chunk_results = Vec::with_capacity(outcomes.len());
    let mut first_err = None;
    for (i, (result, record)) in outcomes.into_iter().enumerate() {
        env.record_sub_call(record);
        match result {
            Ok(text) => {
                info!(chunk = i + 1, total = total_chunks, "processed chunk");
                chunk_results.push(ChunkResult {
                    chunk_num: i + 1,
                    chunk_start: i * params.chunk_size,
                    chunk_end: ((i + 1) * params.chunk_size).min(env.context_length()),
                    result: text,
                });
            }
            Err(err) => {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }

    // REDUCE phase: exactly one synthesis call over all map results.
    let results_text = chunk_results
        .iter()
        .map(|r| format!("=== Chunk {} ===\n{}", r.chunk_num, r.result))
        .collect::<Vec<_>>()
        .join("\n\n");
    let final_prompt = render(
        &params.reduce_prompt,
        &[
            ("results", results_text.as_str()),
            ("num_chunks", &chunk_results.len().to_string()),
        ],
    );
    let final_answer = invoker.invoke(InvokeRequest::new(final_prompt), env).await?;

    Ok(MapReduceOutput {
        final_answer,
        chunk_results,
    })
}
