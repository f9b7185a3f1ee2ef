//! Adaptive ("smart") strategy selection.
//!
//! Samples three windows of the context (beginning, middle, end), asks the
//! sub-model which concrete strategy fits, and validates the reply against a
//! closed token set. Only the explicit `UNSURE` token falls back to
//! map-reduce; anything else unrecognized is a classification failure.

use tracing::info;

use super::Strategy;
use crate::context::{preview, ContextEnvironment};
use crate::error::{Error, Result};
use crate::invoker::{InvokeRequest, SubQueryInvoker};
use crate::prompts::classification_prompt;

/// Cap on each sample window, in characters.
const MAX_SAMPLE_CHARS: usize = 5000;

/// A validated classification, with the raw reply kept for auditability.
#[derive(Debug, Clone)]
pub struct ClassifiedStrategy {
    pub strategy: Strategy,
    pub raw: String,
}

/// Classify the best concrete strategy for `query` over the environment's
/// context. Issues exactly one sub-call, recorded into `env`.
pub async fn classify(
    invoker: &SubQueryInvoker,
    env: &mut ContextEnvironment,
    query: &str,
) -> Result<ClassifiedStrategy> {
    let len = env.context_length();
    let sample_size = MAX_SAMPLE_CHARS.min(len / 10);
    let mid = len / 2;

    let beginning = env.slice(0, sample_size);
    let middle = env.slice(
        mid.saturating_sub(sample_size / 2),
        mid + sample_size / 2,
    );
    let end = env.slice(len.saturating_sub(sample_size), len);

    let prompt = classification_prompt(query, &[beginning, middle, end]);
    let raw = invoker.invoke(InvokeRequest::new(prompt), env).await?;

    let strategy = parse_classification(&raw)?;
    info!(%strategy, "adaptive selection");
    Ok(ClassifiedStrategy { strategy, raw })
}

/// Validate a classification reply against the closed token set.
fn parse_classification(raw: &str) -> Result<Strategy> {
    let upper = raw.to_uppercase();
    let tokens: [(&str, Option<Strategy>); 4] = [
        ("MAP_REDUCE", Some(Strategy::MapReduce)),
        ("SEARCH_EXTRACT", Some(Strategy::SearchExtract)),
        ("ITERATIVE", Some(Strategy::Iterative)),
        ("UNSURE", None),
    ];

    let found: Vec<Option<Strategy>> = tokens
        .iter()
        .filter(|(token, _)| upper.contains(token))
        .map(|(_, strategy)| *strategy)
        .collect();

    match found.as_slice() {
        [Some(strategy)] => Ok(*strategy),
        // Recognized could-not-classify signal: fall back to the default.
        [None] => Ok(Strategy::MapReduce),
        [] => Err(Error::Classification(format!(
            "unrecognized response: {}",
            preview(raw, 100)
        ))),
        _ => Err(Error::Classification(format!(
            "ambiguous response: {}",
            preview(raw, 100)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RlmConfig;
    use crate::testing::MockClient;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_parse_classification_tokens() {
        assert_eq!(
            parse_classification("MAP_REDUCE").unwrap(),
            Strategy::MapReduce
        );
        assert_eq!(
            parse_classification("search_extract, the query names one fact").unwrap(),
            Strategy::SearchExtract
        );
        assert_eq!(
            parse_classification("ITERATIVE").unwrap(),
            Strategy::Iterative
        );
    }

    #[test]
    fn test_parse_unsure_falls_back_to_map_reduce() {
        assert_eq!(parse_classification("UNSURE").unwrap(), Strategy::MapReduce);
    }

    #[test]
    fn test_parse_unrecognized_is_error() {
        let err = parse_classification("I think chunking sounds nice").unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn test_parse_ambiguous_is_error() {
        let err = parse_classification("either MAP_REDUCE or ITERATIVE").unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[tokio::test]
    async fn test_classify_samples_three_windows() {
        let client = Arc::new(MockClient::new());
        client.push_reply("SEARCH_EXTRACT");
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());

        // 100k context: samples are capped at 5000 chars each.
        let context = format!("START{}MIDDLE{}END", "a".repeat(49_995), "b".repeat(49_994));
        let mut env = ContextEnvironment::new(context, "document");

        let classified = classify(&invoker, &mut env, "find the needle")
            .await
            .unwrap();

        assert_eq!(classified.strategy, Strategy::SearchExtract);
        assert_eq!(classified.raw, "SEARCH_EXTRACT");
        assert_eq!(env.sub_calls().len(), 1);

        let prompt = client.prompts().pop().unwrap();
        assert!(prompt.contains("START"));
        assert!(prompt.contains("MIDDLE"));
        assert!(prompt.contains("END"));
        assert!(prompt.contains("find the needle"));
    }

    #[tokio::test]
    async fn test_classify_tiny_context() {
        let client = Arc::new(MockClient::new());
        client.push_reply("MAP_REDUCE");
        let invoker = SubQueryInvoker::new(client.clone(), RlmConfig::default());
        // Sample size is len/10 = 0 chars; classification still proceeds.
        let mut env = ContextEnvironment::new("tiny", "string");

        let classified = classify(&invoker, &mut env, "q").await.unwrap();
        assert_eq!(classified.strategy, Strategy::MapReduce);
    }
}
