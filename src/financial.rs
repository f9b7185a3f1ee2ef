//! Financial analysis entry points built on the engine.
//!
//! These wrap [`RlmEngine`] queries with CFO-oriented prompt templates for
//! the two workloads the engine was built around: multi-document financial
//! analysis and targeted lookups in large datasets.

use crate::engine::{QueryOptions, RlmEngine};
use crate::strategy::{QueryResult, Strategy};

/// Separator inserted between documents when they are combined into one
/// context for analysis.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---DOCUMENT---\n\n";

/// Chunk size for financial documents, smaller than the general default so
/// each map call sees roughly one document's worth of text.
const FINANCIAL_CHUNK_CHARS: usize = 150_000;

impl RlmEngine {
    /// Analyze a set of financial documents with map-reduce, using
    /// CFO-oriented extraction and synthesis prompts.
    pub async fn analyze_documents(&self, documents: &[String], query: &str) -> QueryResult {
        let context = documents.join(DOCUMENT_SEPARATOR);

        let map_prompt = format!(
            "You are Maven, an AI CFO analyzing financial documents.\n\n\
             Document {{chunk_num}}/{{total_chunks}}\n\n\
             Query: {query}\n\n\
             Extract:\n\
             1. Key financial metrics and numbers\n\
             2. Risk factors mentioned\n\
             3. Opportunities identified\n\
             4. Any red flags or concerns\n\n\
             Document content:\n{{chunk}}\n\n\
             Structured findings:"
        );

        let reduce_prompt = format!(
            "You are Maven, synthesizing financial analysis from multiple documents.\n\n\
             Findings from {{num_chunks}} documents:\n{{results}}\n\n\
             Original query: {query}\n\n\
             Provide a comprehensive financial analysis that:\n\
             1. Summarizes key findings\n\
             2. Identifies patterns across documents\n\
             3. Highlights risks and opportunities\n\
             4. Gives a confident recommendation\n\n\
             FINAL ANALYSIS:"
        );

        let options = QueryOptions::new()
            .with_context_type("financial-corpus")
            .with_chunk_size(FINANCIAL_CHUNK_CHARS)
            .with_map_prompt(map_prompt)
            .with_reduce_prompt(reduce_prompt);

        self.query_with(query, &context, Strategy::MapReduce, &options)
            .await
    }

    /// Search a large financial dataset for specific terms and extract the
    /// requested data from the matching sections.
    pub async fn search_data(
        &self,
        data: &str,
        search_terms: &[String],
        query: &str,
    ) -> QueryResult {
        let extraction_prompt = format!(
            "Extract financial data for: {query}\n\n\
             From this data section:\n{{context}}\n\n\
             Return structured JSON with relevant numbers and metrics."
        );

        let synthesis_prompt = format!(
            "Synthesize financial findings for: {query}\n\n\
             Extracted data:\n{{extractions}}\n\n\
             Provide a clear summary with key numbers and insights."
        );

        let options = QueryOptions::new()
            .with_context_type("financial-data")
            .with_search_patterns(search_terms.to_vec())
            .with_extraction_prompt(extraction_prompt)
            .with_synthesis_prompt(synthesis_prompt);

        self.query_with(query, data, Strategy::SearchExtract, &options)
            .await
    }
}
