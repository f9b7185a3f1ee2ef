//! Processing strategies and their result types.
//!
//! A strategy composes chunking/search with sub-calls to answer a query
//! against a context too large for one model invocation. Dispatch is typed:
//! the [`Strategy`] enum is matched exhaustively by the engine, and the
//! string entry point parses into it up front.

pub mod adaptive;
pub mod iterative;
pub mod map_reduce;
pub mod search_extract;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ContextStats;
use crate::error::Error;

/// Processing strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Process each chunk independently, then synthesize in one final call.
    MapReduce,
    /// Locate relevant windows via pattern search, extract, then synthesize.
    SearchExtract,
    /// Process chunks in sequence, carrying a running buffer forward.
    Iterative,
    /// Sample the context and pick one of the other three automatically.
    Smart,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MapReduce => write!(f, "map_reduce"),
            Self::SearchExtract => write!(f, "search_extract"),
            Self::Iterative => write!(f, "iterative"),
            Self::Smart => write!(f, "smart"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map_reduce" => Ok(Self::MapReduce),
            "search_extract" => Ok(Self::SearchExtract),
            "iterative" => Ok(Self::Iterative),
            "smart" => Ok(Self::Smart),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

/// Result of one processed chunk in the map phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 1-based chunk number
    pub chunk_num: usize,
    /// Chunk start, in character offset
    pub chunk_start: usize,
    /// Chunk end (exclusive), in character offset
    pub chunk_end: usize,
    /// The sub-model's output for this chunk
    pub result: String,
}

/// One extraction produced by the search-extract strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// The matched text that anchored this extraction
    pub matched: String,
    /// Byte offset of the match in the context
    pub position: usize,
    /// The sub-model's extraction over the match window
    pub extraction: String,
}

/// One iteration of the iterative-accumulation strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: usize,
    pub chunk_preview: String,
    pub result_preview: String,
}

/// Strategy-specific detail attached to a [`QueryResult`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyDetail {
    MapReduce {
        chunk_results: Vec<ChunkResult>,
    },
    SearchExtract {
        extractions: Vec<Extraction>,
        /// Hits found across all patterns, before deduplication
        num_matches: usize,
        /// Extractions actually issued, after dedup and budget capping
        num_processed: usize,
    },
    Iterative {
        /// Iterations actually run
        iterations: usize,
        history: Vec<IterationRecord>,
    },
    #[default]
    None,
}

/// Normalized result of one RLM query. The engine always returns one of
/// these; errors are reported through `success`/`error`, never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub query: String,
    /// Strategy label as requested by the caller; kept as a string so an
    /// unrecognized name can still be echoed back in a failure result.
    pub strategy: String,
    pub context_length: usize,
    pub timestamp: DateTime<Utc>,
    pub stats: ContextStats,
    pub detail: StrategyDetail,
    /// Raw classification text when the smart strategy chose the route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_strategy: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strategy_round_trip() {
        for s in [
            Strategy::MapReduce,
            Strategy::SearchExtract,
            Strategy::Iterative,
            Strategy::Smart,
        ] {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_strategy_parse_unknown() {
        let err = "bogus".parse::<Strategy>().unwrap_err();
        assert!(err.to_string().contains("Unknown strategy: bogus"));
    }

    #[test]
    fn test_detail_serialization() {
        let detail = StrategyDetail::Iterative {
            iterations: 2,
            history: Vec::new(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["iterative"]["iterations"], 2);
    }
}
