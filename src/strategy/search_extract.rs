//! Search-extract strategy: locate relevant windows via pattern search,
//! extract structured information from each, then synthesize once.
//!
//! Built for needle-in-haystack tasks where most of the context is
//! irrelevant. When no pattern matches, the run is a cost-free no-op: it
//! fails without issuing a single sub-call.

use std::collections::HashSet;

use tracing::warn;

use super::Extraction;
use crate::context::ContextEnvironment;
use crate::error::{Error, Result};
use crate::invoker::{InvokeRequest, SubQueryInvoker};
use crate::prompts::render;
use crate::search::{search, SearchHit};

/// Hits returned per pattern before union and dedup.
const MAX_RESULTS_PER_PATTERN: usize = 10;

/// Parameters for a search-extract run.
#[derive(Debug, Clone)]
pub struct SearchExtractParams {
    /// Patterns to locate relevant sections
    pub search_patterns: Vec<String>,
    /// Template with `{context}`, `{match}`
    pub extraction_prompt: String,
    /// Template with `{extractions}`
    pub synthesis_prompt: String,
}

/// Output of a search-extract run.
#[derive(Debug, Clone)]
pub struct SearchExtractOutput {
    pub final_answer: String,
    pub extractions: Vec<Extraction>,
    /// Hits found across all patterns, before dedup
    pub num_matches: usize,
    /// Extractions issued, after dedup and budget capping
    pub num_processed: usize,
}

pub async fn run(
    invoker: &SubQueryInvoker,
    env: &mut ContextEnvironment,
    params: &SearchExtractParams,
) -> Result<SearchExtractOutput> {
    // Search phase: union of hits across every pattern.
    let mut all_matches: Vec<SearchHit> = Vec::new();
    for pattern in &params.search_patterns {
        all_matches.extend(search(env.context(), pattern, MAX_RESULTS_PER_PATTERN)?);
    }

    if all_matches.is_empty() {
        return Err(Error::NoMatches);
    }
    let num_matches = all_matches.len();

    // Collapse near-adjacent windows: hits whose offsets land in the same
    // 1000-byte buckets share one representative.
    let mut seen_ranges = HashSet::new();
    let unique_matches: Vec<&SearchHit> = all_matches
        .iter()
        .filter(|hit| seen_ranges.insert((hit.start / 1000, hit.end / 1000)))
        .collect();

    let remaining = invoker
        .config()
        .max_sub_calls
        .saturating_sub(env.sub_calls().len());
    if unique_matches.len() > remaining {
        warn!(
            limit = invoker.config().max_sub_calls,
            "hit max sub-calls limit in extraction phase"
        );
    }

    let mut extractions = Vec::new();
    for hit in unique_matches.into_iter().take(remaining) {
        let prompt = render(
            &params.extraction_prompt,
            &[("context", hit.window.as_str()), ("match", hit.matched.as_str())],
        );
        let extraction = invoker.invoke(InvokeRequest::new(prompt), env).await?;
        extractions.push(Extraction {
            matched: hit.matched.clone(),
            position: hit.start,
            extraction,
        });
    }

    // Synthesis: exactly one call over all extractions.
    let extractions_text = extractions
        .iter()
        .map(|e| {
            format!(
                "--- Match: {} (position {}) ---\n{}",
                e.matched, e.position, e.extraction
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let final_answer = invoker
        .invoke(
            InvokeRequest::new(render(
                &params.synthesis_prompt,
                &[("extractions", extractions_text.as_str())],
            )),
            env,
        )
        .await?;

    let num_processed = extractions.len();
    Ok(SearchExtractOutput {
        final_answer,
        extractions,
        num_matches,
        num_processed,
    })
}
