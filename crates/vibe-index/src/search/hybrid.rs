//! Weighted fusion of the semantic, symbol and full-text signals.

use std::collections::HashMap;

use vibe_core::{SearchResult, SearchWeights, Signal, SignalScores, VibeError};

use super::fulltext::text_search;
use super::sort_by_score;
use super::symbol::symbol_search;
use super::vector::vector_search;
use crate::embedding::EmbeddingProvider;
use crate::store::CodeStore;

/// Bonus per additional signal that matched the same location.
const MULTI_SIGNAL_BOOST: f64 = 0.1;

/// Merges per-signal result lists into one ranking.
///
/// Results are keyed by `(file, line)`. Each key keeps its best score per
/// signal; the final score is the weighted sum, multiplied by
/// `1 + 0.1 * (signals - 1)` when more than one signal matched.
///
/// # Examples
///
/// ```
/// use vibe_core::SearchWeights;
/// use vibe_index::search::HybridRanker;
///
/// let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
/// assert!(ranker.merge(10, Vec::new(), Vec::new(), Vec::new()).is_empty());
///
/// let bad = SearchWeights { semantic: 0.5, symbol: 0.5, fulltext: 0.5 };
/// assert!(HybridRanker::new(bad).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HybridRanker {
    weights: SearchWeights,
}

struct Merged {
    result: SearchResult,
    scores: SignalScores,
}

impl HybridRanker {
    /// # Errors
    ///
    /// Returns [`VibeError::Config`] if the weights are negative or do not
    /// sum to 1.0.
    pub fn new(weights: SearchWeights) -> Result<Self, VibeError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> SearchWeights {
        self.weights
    }

    pub fn merge(
        &self,
        limit: usize,
        symbols: Vec<SearchResult>,
        fulltext: Vec<SearchResult>,
        semantic: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        let mut order: Vec<Merged> = Vec::new();
        let mut index: HashMap<(String, Option<u32>), usize> = HashMap::new();

        let lists = [
            (Signal::Symbol, symbols),
            (Signal::FullText, fulltext),
            (Signal::Semantic, semantic),
        ];
        for (signal, results) in lists {
            for result in results {
                if result.score <= 0.0 {
                    continue;
                }
                let key = (result.file_path.clone(), result.line);
                match index.get(&key) {
                    Some(&i) => {
                        let merged = &mut order[i];
                        merged.scores.raise(signal, result.score);
                        absorb(&mut merged.result, result);
                    }
                    None => {
                        let mut scores = SignalScores::default();
                        scores.raise(signal, result.score);
                        index.insert(key, order.len());
                        order.push(Merged { result, scores });
                    }
                }
            }
        }

        let mut results: Vec<SearchResult> = order
            .into_iter()
            .map(|m| {
                let mut result = m.result;
                result.score = self.score(&m.scores);
                result.breakdown = Some(m.scores);
                result
            })
            .collect();
        sort_by_score(&mut results);
        results.truncate(limit);
        results
    }

    /// Weighted sum of `scores` with the multi-signal boost applied.
    pub fn score(&self, scores: &SignalScores) -> f64 {
        let base = self.weights.semantic * scores.semantic
            + self.weights.symbol * scores.symbol
            + self.weights.fulltext * scores.fulltext;
        let matched = scores.matched();
        if matched > 1 {
            base * (1.0 + MULTI_SIGNAL_BOOST * (matched - 1) as f64)
        } else {
            base
        }
    }
}

/// Fold a later hit for the same location into the kept one: record its
/// match types and fill fields the first hit lacked.
fn absorb(kept: &mut SearchResult, other: SearchResult) {
    for match_type in other.match_types {
        if !kept.match_types.contains(&match_type) {
            kept.match_types.push(match_type);
        }
    }
    if kept.name.is_none() {
        kept.name = other.name;
    }
    if kept.parent.is_none() {
        kept.parent = other.parent;
    }
    if kept.language.is_none() {
        kept.language = other.language;
    }
    if kept.end_line.is_none() {
        kept.end_line = other.end_line;
    }
    if kept.preview.is_none() {
        kept.preview = other.preview;
    }
}

/// Run all three searches with twice the requested limit and merge them.
///
/// Semantic results are simply absent when the provider is unavailable.
///
/// # Errors
///
/// Returns [`VibeError::Config`] if `weights` are invalid. Search failures
/// themselves never error.
pub async fn hybrid_search(
    store: &CodeStore,
    project: &str,
    provider: &dyn EmbeddingProvider,
    weights: SearchWeights,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let ranker = HybridRanker::new(weights)?;
    let fetch_count = limit.saturating_mul(2);

    let semantic = vector_search(store, project, provider, query, fetch_count).await;
    let symbols = symbol_search(store, project, query, fetch_count);
    let fulltext = text_search(store, project, query, fetch_count);

    Ok(ranker.merge(limit, symbols, fulltext, semantic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::{seeded_store, FakeProvider};
    use vibe_core::{MatchType, ResultType};

    fn hit(file: &str, line: Option<u32>, score: f64, match_type: MatchType) -> SearchResult {
        SearchResult {
            result_type: ResultType::CodeChunk,
            name: None,
            file_path: file.into(),
            line,
            end_line: None,
            kind: "function".into(),
            parent: None,
            language: None,
            preview: None,
            score,
            match_types: vec![match_type],
            breakdown: None,
        }
    }

    #[test]
    fn two_signal_boost_arithmetic() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let merged = ranker.merge(
            10,
            vec![hit("a.ts", Some(3), 0.8, MatchType::SymbolPrefix)],
            vec![hit("a.ts", Some(3), 1.0, MatchType::FullText)],
            Vec::new(),
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.583).abs() < 1e-9, "{}", merged[0].score);
        let breakdown = merged[0].breakdown.unwrap();
        assert_eq!(breakdown.symbol, 0.8);
        assert_eq!(breakdown.fulltext, 1.0);
        assert_eq!(breakdown.semantic, 0.0);
        assert_eq!(
            merged[0].match_types,
            vec![MatchType::SymbolPrefix, MatchType::FullText]
        );
    }

    #[test]
    fn single_signal_has_no_boost() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let merged = ranker.merge(
            10,
            Vec::new(),
            vec![hit("a.ts", Some(3), 1.0, MatchType::FullText)],
            Vec::new(),
        );
        assert!((merged[0].score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn three_signals_boost_by_twenty_percent() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let scores = SignalScores {
            semantic: 1.0,
            symbol: 1.0,
            fulltext: 1.0,
        };
        assert!((ranker.score(&scores) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn best_score_per_signal_is_kept() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let merged = ranker.merge(
            10,
            vec![
                hit("a.ts", Some(1), 0.5, MatchType::SymbolContains),
                hit("a.ts", Some(1), 1.0, MatchType::SymbolExact),
            ],
            Vec::new(),
            Vec::new(),
        );
        assert!((merged[0].score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn different_lines_stay_separate_and_sorted() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let merged = ranker.merge(
            1,
            vec![hit("a.ts", Some(1), 0.4, MatchType::SymbolCaseInsensitive)],
            Vec::new(),
            vec![hit("a.ts", Some(9), 0.9, MatchType::Semantic)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].line, Some(9));
    }

    #[test]
    fn non_positive_semantic_hits_are_dropped() {
        let ranker = HybridRanker::new(SearchWeights::default()).unwrap();
        let merged = ranker.merge(
            10,
            vec![hit("a.ts", Some(1), 1.0, MatchType::SymbolExact)],
            Vec::new(),
            vec![
                hit("a.ts", Some(1), -0.3, MatchType::Semantic),
                hit("b.ts", Some(4), 0.0, MatchType::Semantic),
            ],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].match_types, vec![MatchType::SymbolExact]);
        assert_eq!(merged[0].breakdown.unwrap().semantic, 0.0);
        assert!((merged[0].score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn invalid_weights_rejected() {
        let weights = SearchWeights {
            semantic: 0.4,
            symbol: 0.4,
            fulltext: 0.4,
        };
        assert!(matches!(
            HybridRanker::new(weights),
            Err(VibeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn hybrid_search_without_provider_uses_lexical_signals() {
        let store = seeded_store();
        let provider = FakeProvider::down();
        let results = hybrid_search(
            &store,
            "/p",
            &provider,
            SearchWeights::default(),
            "useAuthToken",
            5,
        )
        .await
        .unwrap();
        let top = &results[0];
        assert_eq!(top.file_path, "src/hooks/useAuthToken.ts");
        let breakdown = top.breakdown.unwrap();
        assert_eq!(breakdown.symbol, 1.0);
        assert_eq!(breakdown.fulltext, 1.0);
        assert_eq!(breakdown.semantic, 0.0);
        assert!((top.score - (0.35 + 0.25) * 1.1).abs() < 1e-9);
    }
}
