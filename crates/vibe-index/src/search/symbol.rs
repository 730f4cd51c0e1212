//! Tiered symbol-name lookup.

use std::collections::HashMap;

use rusqlite::params;
use tracing::warn;
use vibe_chunker::truncate_chars;
use vibe_core::{MatchType, ResultType, SearchResult, VibeError};

use super::sort_by_score;
use crate::store::CodeStore;

const PREVIEW_CHARS: usize = 200;

/// Tiers run in order; each one only fills the capacity left by the ones
/// before it, and their conditions are disjoint.
const TIERS: [(MatchType, f64, &str); 4] = [
    (MatchType::SymbolExact, 1.0, "s.symbol_name = ?2"),
    (
        MatchType::SymbolPrefix,
        0.8,
        "substr(s.symbol_name, 1, length(?2)) = ?2 AND s.symbol_name <> ?2",
    ),
    (MatchType::SymbolContains, 0.5, "instr(s.symbol_name, ?2) > 1"),
    (
        MatchType::SymbolCaseInsensitive,
        0.4,
        "instr(lower(s.symbol_name), lower(?2)) > 0 AND instr(s.symbol_name, ?2) = 0",
    ),
];

/// Look up symbols by name. Errors are logged and yield no results.
pub fn symbol_search(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Vec<SearchResult> {
    try_symbol_search(store, project, query, limit).unwrap_or_else(|e| {
        warn!(error = %e, "symbol search failed");
        Vec::new()
    })
}

/// Look up symbols by name: exact, prefix, substring, then case-insensitive
/// substring matches.
///
/// # Errors
///
/// Returns [`VibeError::Database`] if a query fails.
pub fn try_symbol_search(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut best: HashMap<(String, String, u32), SearchResult> = HashMap::new();
    for (match_type, score, condition) in TIERS {
        let remaining = limit.saturating_sub(best.len());
        if remaining == 0 {
            break;
        }
        for hit in run_tier(store, project, query, condition, remaining)? {
            let result = to_result(hit, match_type, score);
            let key = (
                result.name.clone().unwrap_or_default(),
                result.file_path.clone(),
                result.line.unwrap_or(0),
            );
            match best.get(&key) {
                Some(existing) if existing.score >= result.score => {}
                _ => {
                    best.insert(key, result);
                }
            }
        }
    }

    let mut results: Vec<SearchResult> = best.into_values().collect();
    sort_by_score(&mut results);
    results.truncate(limit);
    Ok(results)
}

struct SymbolRow {
    name: String,
    file_path: String,
    symbol_type: String,
    parent: Option<String>,
    language: String,
    start_line: u32,
    end_line: u32,
    content: Option<String>,
}

fn run_tier(
    store: &CodeStore,
    project: &str,
    query: &str,
    condition: &str,
    limit: usize,
) -> Result<Vec<SymbolRow>, VibeError> {
    let sql = format!(
        "SELECT s.symbol_name, s.file_path, s.symbol_type, s.parent_symbol, s.language,
                s.start_line, s.end_line, c.content
         FROM symbols s
         LEFT JOIN code_chunks c ON c.id = s.chunk_id
         WHERE s.project_path = ?1 AND {condition}
         ORDER BY s.symbol_name, s.file_path, s.start_line
         LIMIT ?3"
    );
    let mut stmt = store
        .conn()
        .prepare(&sql)
        .map_err(|e| VibeError::Database(format!("failed to prepare symbol query: {e}")))?;
    let rows = stmt
        .query_map(params![project, query, limit as i64], |row| {
            Ok(SymbolRow {
                name: row.get(0)?,
                file_path: row.get(1)?,
                symbol_type: row.get(2)?,
                parent: row.get(3)?,
                language: row.get(4)?,
                start_line: row.get(5)?,
                end_line: row.get(6)?,
                content: row.get(7)?,
            })
        })
        .map_err(|e| VibeError::Database(format!("symbol query failed: {e}")))?;

    let mut hits = Vec::new();
    for row in rows {
        hits.push(row.map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?);
    }
    Ok(hits)
}

fn to_result(row: SymbolRow, match_type: MatchType, score: f64) -> SearchResult {
    SearchResult {
        result_type: ResultType::Symbol,
        name: Some(row.name),
        file_path: row.file_path,
        line: Some(row.start_line),
        end_line: Some(row.end_line),
        kind: row.symbol_type,
        parent: row.parent,
        language: row.language.parse().ok(),
        preview: row
            .content
            .map(|c| truncate_chars(&c, PREVIEW_CHARS).to_string()),
        score,
        match_types: vec![match_type],
        breakdown: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::seeded_store;

    fn names(results: &[SearchResult]) -> Vec<(&str, f64)> {
        results
            .iter()
            .map(|r| (r.name.as_deref().unwrap_or(""), r.score))
            .collect()
    }

    #[test]
    fn tiers_rank_exact_first() {
        let store = seeded_store();
        let results = try_symbol_search(&store, "/p", "useAuth", 10).unwrap();
        assert_eq!(
            names(&results),
            vec![("useAuth", 1.0), ("useAuthToken", 0.8)]
        );
        assert_eq!(results[0].match_types, vec![MatchType::SymbolExact]);
        assert_eq!(results[0].result_type, ResultType::Symbol);
        assert!(results[0].preview.as_deref().unwrap().contains("useAuth"));
    }

    #[test]
    fn substring_and_case_insensitive_tiers() {
        let store = seeded_store();
        let results = try_symbol_search(&store, "/p", "Auth", 10).unwrap();
        let found = names(&results);
        assert!(found.contains(&("useAuth", 0.5)), "{found:?}");
        assert!(found.contains(&("AuthService", 0.8)), "{found:?}");

        let results = try_symbol_search(&store, "/p", "authservice", 10).unwrap();
        assert_eq!(names(&results), vec![("AuthService", 0.4)]);
        assert_eq!(
            results[0].match_types,
            vec![MatchType::SymbolCaseInsensitive]
        );
    }

    #[test]
    fn limit_caps_later_tiers() {
        let store = seeded_store();
        let results = try_symbol_search(&store, "/p", "useAuth", 1).unwrap();
        assert_eq!(names(&results), vec![("useAuth", 1.0)]);
    }

    #[test]
    fn other_projects_are_invisible() {
        let store = seeded_store();
        assert!(try_symbol_search(&store, "/other", "useAuth", 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn blank_query_is_empty() {
        let store = seeded_store();
        assert!(symbol_search(&store, "/p", "   ", 10).is_empty());
    }
}
