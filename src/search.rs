//! Windowed pattern search over the raw context.
//!
//! Used by the search-extract strategy to avoid re-reading irrelevant
//! context: each hit carries a ±250-char window so the extraction call sees
//! only the neighborhood of the match.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Window radius around a match, in characters.
const WINDOW_RADIUS: usize = 250;

/// One search hit with its surrounding window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched text.
    pub matched: String,
    /// Byte offset of the match start in the context.
    pub start: usize,
    /// Byte offset just past the match end.
    pub end: usize,
    /// Surrounding window, clamped at the context boundaries.
    pub window: String,
}

/// Scan `context` for non-overlapping, case-insensitive matches of
/// `pattern`, returning up to `max_results` hits in document order.
pub fn search(context: &str, pattern: &str, max_results: usize) -> Result<Vec<SearchHit>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;

    let mut hits = Vec::new();
    for m in re.find_iter(context) {
        if hits.len() >= max_results {
            break;
        }
        let (window_start, window_end) = window_bounds(context, m.start(), m.end());
        hits.push(SearchHit {
            matched: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            window: context[window_start..window_end].to_string(),
        });
    }
    Ok(hits)
}

/// Window byte bounds covering `WINDOW_RADIUS` characters on each side of
/// the match, clamped at the context boundaries. The returned offsets fall
/// on char boundaries by construction.
fn window_bounds(context: &str, start: usize, end: usize) -> (usize, usize) {
    let before: usize = context[..start]
        .chars()
        .rev()
        .take(WINDOW_RADIUS)
        .map(|c| c.len_utf8())
        .sum();
    let after: usize = context[end..]
        .chars()
        .take(WINDOW_RADIUS)
        .map(|c| c.len_utf8())
        .sum();
    (start - before, end + after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_case_insensitive() {
        let context = "The quick brown fox jumps over the lazy dog. Fox is smart.";
        let hits = search(context, "fox", 5).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].matched, "fox");
        assert_eq!(hits[1].matched, "Fox");
    }

    #[test]
    fn test_search_respects_max_results() {
        let context = "ab ".repeat(100);
        let hits = search(&context, "ab", 10).unwrap();
        assert_eq!(hits.len(), 10);
    }

    #[test]
    fn test_search_offsets_are_valid() {
        let context = "alpha beta gamma beta delta";
        let hits = search(context, "beta", 10).unwrap();

        assert_eq!(hits.len(), 2);
        for hit in &hits {
            assert!(hit.start < hit.end);
            assert!(hit.end <= context.len());
            assert_eq!(&context[hit.start..hit.end], "beta");
        }
    }

    #[test]
    fn test_window_clamped_at_boundaries() {
        // Context shorter than a full window on either side.
        let context = "needle in a short haystack";
        let hits = search(context, "needle", 1).unwrap();
        assert_eq!(hits[0].window, context);
    }

    #[test]
    fn test_window_never_exceeds_500_chars() {
        let context = format!("{}needle{}", "a".repeat(2000), "b".repeat(2000));
        let hits = search(&context, "needle", 1).unwrap();

        let window_chars = hits[0].window.chars().count();
        assert!(window_chars <= 500 + "needle".len());
        assert!(hits[0].window.contains("needle"));
        // Window has exactly 250 chars of padding on each side.
        assert!(hits[0].window.starts_with(&"a".repeat(250)));
        assert!(hits[0].window.ends_with(&"b".repeat(250)));
    }

    #[test]
    fn test_window_multibyte_safe() {
        let context = format!("{}needle{}", "é".repeat(300), "ü".repeat(300));
        let hits = search(&context, "needle", 1).unwrap();

        assert_eq!(hits.len(), 1);
        // Slicing stayed on char boundaries; the window parses as valid UTF-8
        // and carries 250 chars of padding per side.
        assert_eq!(hits[0].window.chars().count(), 500 + "needle".len());
    }

    #[test]
    fn test_search_no_matches() {
        let hits = search("nothing to see here", "XYZ", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_invalid_pattern() {
        let err = search("abc", "[unclosed", 10).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_matches_are_non_overlapping() {
        let hits = search("aaaa", "aa", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].end <= hits[1].start);
    }
}
