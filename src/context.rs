//! Context environment: the addressable value wrapping a query's full input.
//!
//! The context variable holds the full input that would normally overflow a
//! model's context window. Strategies access slices of it, decompose it into
//! chunks, and spawn sub-calls over the pieces. One environment exists per
//! query and is discarded afterwards; it is never shared across queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Length of prompt/response previews kept in sub-call records, in chars.
const PREVIEW_CHARS: usize = 200;

/// Truncate to at most `max_chars` characters, appending "..." if truncated.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// One recorded invocation of the sub-model service. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCallRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub prompt_preview: String,
    /// Size of the context chunk attached to the call, in chars (0 if none).
    pub context_chars: usize,
    pub response_preview: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl SubCallRecord {
    pub fn new(
        model: impl Into<String>,
        prompt: &str,
        context_chars: usize,
        response: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            prompt_preview: preview(prompt, PREVIEW_CHARS),
            context_chars,
            response_preview: preview(response, PREVIEW_CHARS),
            input_tokens,
            output_tokens,
        }
    }
}

/// Statistics snapshot taken from a [`ContextEnvironment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStats {
    pub context_length: usize,
    pub context_type: String,
    /// `None` when no chunk view has been computed yet.
    pub num_chunks: Option<usize>,
    pub chunk_size: usize,
    pub num_sub_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub variables: Vec<String>,
}

/// The environment for one RLM query: raw context plus derived views and
/// sub-call telemetry.
#[derive(Debug, Clone)]
pub struct ContextEnvironment {
    context: String,
    context_type: String,
    /// Character length of the context, computed once at construction.
    context_length: usize,
    /// Cached chunk view, valid only for `chunk_size`.
    chunks: Vec<String>,
    chunk_size: usize,
    /// Open key/value scratch space for extensions.
    pub variables: HashMap<String, Value>,
    sub_calls: Vec<SubCallRecord>,
    total_input_tokens: u64,
    total_output_tokens: u64,
}

impl ContextEnvironment {
    pub fn new(context: impl Into<String>, context_type: impl Into<String>) -> Self {
        let context = context.into();
        let context_length = context.chars().count();
        Self {
            context,
            context_type: context_type.into(),
            context_length,
            chunks: Vec::new(),
            chunk_size: 0,
            variables: HashMap::new(),
            sub_calls: Vec::new(),
            total_input_tokens: 0,
            total_output_tokens: 0,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Character length of the context.
    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    pub fn sub_calls(&self) -> &[SubCallRecord] {
        &self.sub_calls
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input_tokens
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output_tokens
    }

    /// Get a slice of the context by character offsets. Out-of-range bounds
    /// clamp silently; an inverted range yields the empty string.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        if start >= end || start >= self.context_length {
            return "";
        }
        let byte_start = self.char_to_byte(start);
        let byte_end = self.char_to_byte(end);
        &self.context[byte_start..byte_end]
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.context
            .char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(self.context.len())
    }

    /// Chunk the context into fixed-size pieces of `chunk_size` characters.
    /// The view is cached and recomputed only when the requested size differs
    /// from the cached one.
    pub fn chunk_by_size(&mut self, chunk_size: usize) -> &[String] {
        let chunk_size = chunk_size.max(1);
        if self.chunks.is_empty() || self.chunk_size != chunk_size {
            self.chunk_size = chunk_size;
            self.chunks = chunk_string(&self.context, chunk_size);
        }
        &self.chunks
    }

    /// Chunk the context on every literal occurrence of `delimiter`. The
    /// delimiter itself is discarded, so joining the pieces with it restores
    /// the original content.
    pub fn chunk_by_delimiter(&self, delimiter: &str) -> Vec<String> {
        self.context
            .split(delimiter)
            .map(|s| s.to_string())
            .collect()
    }

    /// Chunk the context on every match of a regex pattern. Matched text is
    /// discarded from the output pieces.
    pub fn chunk_by_regex(&self, pattern: &str) -> Result<Vec<String>> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        Ok(re.split(&self.context).map(|s| s.to_string()).collect())
    }

    /// Number of chunks in the cached view, if one has been computed.
    pub fn num_chunks(&self) -> Option<usize> {
        if self.chunks.is_empty() {
            None
        } else {
            Some(self.chunks.len())
        }
    }

    /// Append a sub-call record and fold its token counts into the running
    /// totals. Records are append-only and never mutated afterwards.
    pub fn record_sub_call(&mut self, record: SubCallRecord) {
        self.total_input_tokens += record.input_tokens;
        self.total_output_tokens += record.output_tokens;
        self.sub_calls.push(record);
    }

    /// Snapshot statistics about the context and processing so far.
    pub fn stats(&self) -> ContextStats {
        let mut variables: Vec<String> = self.variables.keys().cloned().collect();
        variables.sort();
        ContextStats {
            context_length: self.context_length,
            context_type: self.context_type.clone(),
            num_chunks: self.num_chunks(),
            chunk_size: self.chunk_size,
            num_sub_calls: self.sub_calls.len(),
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
            variables,
        }
    }
}

/// Split into `ceil(chars / size)` contiguous pieces; the last piece may be
/// shorter. An empty input yields no pieces.
fn chunk_string(s: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;
    for (i, _) in s.char_indices() {
        if count == size {
            chunks.push(s[start..i].to_string());
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < s.len() {
        chunks.push(s[start..].to_string());
    }
    chunks
}
