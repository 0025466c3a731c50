//! Lexical retrieval over the chunk set.
//!
//! Ranks chunks by a term-frequency score against a free-text query. There
//! is no index: every call scores every chunk, which is fine for the
//! knowledge-base sizes this tool targets.
//!
//! # Scoring
//!
//! 1. Lower-case the query and split it on whitespace. Duplicate keywords
//!    are kept, so repeating a word in the query weights it more.
//! 2. For each keyword, count its non-overlapping occurrences in the
//!    lower-cased chunk. A keyword with `n > 0` occurrences contributes
//!    `1 + 0.5 × (n − 1)`; an absent keyword contributes nothing.
//! 3. Chunks scoring `0` are dropped entirely.
//! 4. Sort by score descending, ties by original index ascending.
//! 5. Truncate to `top_k`.
//!
//! Occurrences are counted per keyword independently, so keywords that
//! overlap each other inside a chunk (`"app"` and `"apple"`) both score on
//! the same text.

use std::cmp::Ordering;

use crate::models::ScoredChunk;

/// Default number of chunks returned by [`rank`].
pub const DEFAULT_TOP_K: usize = 5;

/// Split a query into lower-cased keywords, keeping duplicates.
pub fn keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Score one already lower-cased chunk against a keyword list.
pub fn score_text(text_lower: &str, keywords: &[String]) -> f64 {
    keywords
        .iter()
        .map(|kw| match text_lower.matches(kw.as_str()).count() {
            0 => 0.0,
            n => 1.0 + 0.5 * (n - 1) as f64,
        })
        .sum()
}

/// Score every chunk and return the non-zero ones, best first.
///
/// Never fails; a query with no keywords or no matching chunk yields an
/// empty vector.
pub fn score_chunks<S: AsRef<str>>(chunks: &[S], query: &str) -> Vec<ScoredChunk> {
    let kws = keywords(query);
    if kws.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let text = chunk.as_ref();
            let score = score_text(&text.to_lowercase(), &kws);
            (score > 0.0).then(|| ScoredChunk {
                index,
                score,
                text: text.to_string(),
            })
        })
        .collect();

    scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.index.cmp(&b.index),
        other => other,
    });
    scored
}

/// Return at most `top_k` chunk texts ranked by lexical relevance to `query`.
///
/// Chunks that share no keyword with the query are never returned, even if
/// fewer than `top_k` chunks match.
pub fn rank<S: AsRef<str>>(chunks: &[S], query: &str, top_k: usize) -> Vec<String> {
    score_chunks(chunks, query)
        .into_iter()
        .take(top_k)
        .map(|s| s.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_follow_occurrence_formula() {
        let chunks = ["apple banana", "apple apple", "banana"];
        let scored = score_chunks(&chunks, "apple");
        let by_index: Vec<(usize, f64)> = scored.iter().map(|s| (s.index, s.score)).collect();
        assert_eq!(by_index, vec![(1, 1.5), (0, 1.0)]);
    }

    #[test]
    fn test_rank_orders_best_first() {
        let chunks = ["apple banana", "apple apple", "banana"];
        let ranked = rank(&chunks, "apple", 5);
        assert_eq!(ranked, vec!["apple apple", "apple banana"]);
    }

    #[test]
    fn test_no_keyword_match_returns_empty() {
        let chunks = ["alpha beta", "gamma delta"];
        assert!(rank(&chunks, "omega", DEFAULT_TOP_K).is_empty());
    }

    #[test]
    fn test_blank_query_returns_empty() {
        let chunks = ["alpha beta"];
        assert!(rank(&chunks, "   ", DEFAULT_TOP_K).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let chunks = ["Rust Cargo Crates"];
        let scored = score_chunks(&chunks, "rust CARGO");
        assert_eq!(scored.len(), 1);
        assert!((scored[0].score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_keywords_add_weight() {
        let text = "install the driver";
        let kws_once = keywords("driver");
        let kws_twice = keywords("driver driver");
        assert!((score_text(text, &kws_once) - 1.0).abs() < 1e-9);
        assert!((score_text(text, &kws_twice) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_keywords_both_score() {
        let kws = keywords("app apple");
        // "app" occurs twice (inside "apple" and "app"), "apple" once
        let score = score_text("apple app", &kws);
        assert!((score - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_index() {
        let chunks = ["one kiwi", "two kiwi", "three kiwi"];
        let ranked = rank(&chunks, "kiwi", 5);
        assert_eq!(ranked, vec!["one kiwi", "two kiwi", "three kiwi"]);
    }

    #[test]
    fn test_top_k_truncates() {
        let chunks: Vec<String> = (0..20).map(|i| format!("match {}", i)).collect();
        assert_eq!(rank(&chunks, "match", 5).len(), 5);
        assert_eq!(rank(&chunks, "match", 0).len(), 0);
    }

    #[test]
    fn test_cjk_substring_match() {
        let chunks = ["设备重启步骤", "网络配置"];
        assert_eq!(rank(&chunks, "重启", 5), vec!["设备重启步骤"]);
    }
}
