//! Prompt templates and placeholder rendering.
//!
//! Templates carry `{placeholder}` markers filled in by literal replacement
//! at call time. The default templates embed the caller's query directly and
//! leave only the per-call placeholders (`{chunk}`, `{results}`, ...) open.

/// Fill `{key}` placeholders by literal replacement. Unknown placeholders
/// are left untouched; keys absent from the template are ignored.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

/// Default map prompt: expects `{chunk}`, `{chunk_num}`, `{total_chunks}`.
pub fn default_map_prompt(query: &str) -> String {
    format!(
        "You are processing chunk {{chunk_num}}/{{total_chunks}} of a large document.\n\n\
         Original query: {query}\n\n\
         Extract all information relevant to the query from this chunk:\n\n{{chunk}}"
    )
}

/// Default reduce prompt: expects `{results}`, `{num_chunks}`.
pub fn default_reduce_prompt(query: &str) -> String {
    format!(
        "You processed a large document in chunks. Here are the findings from each chunk:\n\n\
         {{results}}\n\n\
         Original query: {query}\n\n\
         Synthesize these findings into a final comprehensive answer:"
    )
}

/// Default extraction prompt: expects `{context}`, `{match}`.
pub fn default_extraction_prompt(query: &str) -> String {
    format!("Extract information relevant to: {query}\n\nFrom this section:\n{{context}}")
}

/// Default synthesis prompt: expects `{extractions}`.
pub fn default_synthesis_prompt(query: &str) -> String {
    format!("Based on these extractions, answer: {query}\n\n{{extractions}}")
}

/// Default initial prompt for iterative processing: expects `{chunk}`.
pub fn default_initial_prompt(query: &str) -> String {
    format!(
        "Starting to analyze a document for: {query}\n\n\
         First section:\n{{chunk}}\n\n\
         Summarize relevant findings:"
    )
}

/// Default iteration prompt: expects `{buffer}`, `{chunk}`, `{chunk_num}`,
/// `{total_chunks}`.
pub fn default_iteration_prompt(query: &str) -> String {
    format!(
        "Previous findings:\n{{buffer}}\n\n\
         New section ({{chunk_num}}/{{total_chunks}}):\n{{chunk}}\n\n\
         Update your findings for: {query}"
    )
}

/// Classification prompt for adaptive strategy selection. The sub-model must
/// answer with exactly one token from a closed set so the reply can be
/// validated against the strategy enum.
pub fn classification_prompt(query: &str, samples: &[&str; 3]) -> String {
    format!(
        "Analyze this document structure to determine the best processing strategy.\n\n\
         Query: {query}\n\n\
         Document samples (beginning, middle, end):\n\
         {}\n---\n{}\n---\n{}\n\n\
         Which strategy fits best?\n\
         - MAP_REDUCE: aggregation tasks that need to process everything\n\
         - SEARCH_EXTRACT: finding specific information (needle in haystack)\n\
         - ITERATIVE: tasks where understanding builds cumulatively\n\n\
         Respond with exactly one token: MAP_REDUCE, SEARCH_EXTRACT, ITERATIVE, \
         or UNSURE if you cannot classify.",
        samples[0], samples[1], samples[2]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_replaces_all_occurrences() {
        let out = render("{a} and {b} and {a}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "1 and 2 and 1");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let out = render("{known} {unknown}", &[("known", "x")]);
        assert_eq!(out, "x {unknown}");
    }

    #[test]
    fn test_default_map_prompt_placeholders() {
        let template = default_map_prompt("What is the revenue?");
        assert!(template.contains("What is the revenue?"));
        assert!(template.contains("{chunk}"));
        assert!(template.contains("{chunk_num}"));
        assert!(template.contains("{total_chunks}"));

        let filled = render(
            &template,
            &[("chunk", "BODY"), ("chunk_num", "2"), ("total_chunks", "3")],
        );
        assert!(filled.contains("chunk 2/3"));
        assert!(filled.ends_with("BODY"));
    }

    #[test]
    fn test_classification_prompt_token_set() {
        let prompt = classification_prompt("find the needle", &["a", "b", "c"]);
        assert!(prompt.contains("MAP_REDUCE"));
        assert!(prompt.contains("SEARCH_EXTRACT"));
        assert!(prompt.contains("ITERATIVE"));
        assert!(prompt.contains("UNSURE"));
    }
}
