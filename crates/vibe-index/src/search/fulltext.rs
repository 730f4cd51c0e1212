//! FTS5 search over chunk content with a substring fallback and a component
//! registry lookup.

use std::collections::HashSet;

use rusqlite::params;
use tracing::warn;
use vibe_chunker::truncate_chars;
use vibe_core::{MatchType, ResultType, SearchResult, VibeError};

use super::sort_by_score;
use crate::store::CodeStore;

const FTS_SCORE: f64 = 1.0;
const COMPONENT_SCORE: f64 = 0.8;
const SUBSTRING_SCORE: f64 = 0.6;

const EXCERPT_CHARS: usize = 200;
const EXCERPT_LEAD: usize = 40;
const SUBSTRING_PREVIEW_CHARS: usize = 100;

/// Full-text search that logs failures and returns no results instead.
pub fn text_search(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Vec<SearchResult> {
    try_text_search(store, project, query, limit).unwrap_or_else(|e| {
        warn!(error = %e, "full-text search failed");
        Vec::new()
    })
}

/// Search chunk content, names, kinds and paths.
///
/// FTS5 hits score 1.0. When they do not fill `limit`, or the FTS query
/// itself fails, a substring scan over content and names adds hits at 0.6. Components whose name, path or type
/// contain the query are added at 0.8.
///
/// # Errors
///
/// Returns [`VibeError::Database`] if a query fails.
pub fn try_text_search(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut results = fts_chunks(store, project, query, limit).unwrap_or_else(|e| {
        warn!(error = %e, "FTS query failed, falling back to substring scan");
        Vec::new()
    });
    if results.len() < limit {
        let mut seen: HashSet<(String, Option<u32>)> = results
            .iter()
            .map(|r| (r.file_path.clone(), r.line))
            .collect();
        for hit in substring_chunks(store, project, query, limit)? {
            if seen.insert((hit.file_path.clone(), hit.line)) {
                results.push(hit);
            }
        }
    }
    results.extend(matching_components(store, project, query, limit)?);

    sort_by_score(&mut results);
    results.truncate(limit);
    Ok(results)
}

/// Quote every whitespace-separated term so FTS5 operators in user input
/// are taken literally. Terms are ANDed.
pub(crate) fn fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn fts_chunks(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let mut stmt = store
        .conn()
        .prepare(
            "SELECT c.file_path, c.start_line, c.end_line, c.chunk_type, c.name,
                    c.parent_name, c.language,
                    highlight(code_chunks_fts, 0, '>>>', '<<<')
             FROM code_chunks_fts
             JOIN code_chunks c ON c.id = code_chunks_fts.rowid
             WHERE code_chunks_fts MATCH ?1 AND c.project_path = ?2
             ORDER BY rank
             LIMIT ?3",
        )
        .map_err(|e| VibeError::Database(format!("failed to prepare FTS query: {e}")))?;
    let rows = stmt
        .query_map(params![fts_query(query), project, limit as i64], |row| {
            let highlighted: String = row.get(7)?;
            Ok(chunk_result(
                ChunkRow {
                    file_path: row.get(0)?,
                    start_line: row.get(1)?,
                    end_line: row.get(2)?,
                    chunk_type: row.get(3)?,
                    name: row.get(4)?,
                    parent: row.get(5)?,
                    language: row.get(6)?,
                },
                excerpt(&highlighted, EXCERPT_CHARS),
                FTS_SCORE,
                MatchType::FullText,
            ))
        })
        .map_err(|e| VibeError::Database(format!("FTS query failed: {e}")))?;

    collect_rows(rows)
}

fn substring_chunks(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let mut stmt = store
        .conn()
        .prepare(
            "SELECT file_path, start_line, end_line, chunk_type, name, parent_name, language, content
             FROM code_chunks
             WHERE project_path = ?1
               AND (content LIKE ?2 ESCAPE '\\' OR name LIKE ?2 ESCAPE '\\')
             ORDER BY file_path, start_line
             LIMIT ?3",
        )
        .map_err(|e| VibeError::Database(format!("failed to prepare substring query: {e}")))?;
    let rows = stmt
        .query_map(params![project, like_pattern(query), limit as i64], |row| {
            let content: String = row.get(7)?;
            Ok(chunk_result(
                ChunkRow {
                    file_path: row.get(0)?,
                    start_line: row.get(1)?,
                    end_line: row.get(2)?,
                    chunk_type: row.get(3)?,
                    name: row.get(4)?,
                    parent: row.get(5)?,
                    language: row.get(6)?,
                },
                preview_at(&content, query, SUBSTRING_PREVIEW_CHARS),
                SUBSTRING_SCORE,
                MatchType::Substring,
            ))
        })
        .map_err(|e| VibeError::Database(format!("substring query failed: {e}")))?;

    collect_rows(rows)
}

fn matching_components(
    store: &CodeStore,
    project: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let mut stmt = store
        .conn()
        .prepare(
            "SELECT name, type, file_path FROM components
             WHERE project_path = ?1
               AND (name LIKE ?2 ESCAPE '\\' OR file_path LIKE ?2 ESCAPE '\\' OR type LIKE ?2 ESCAPE '\\')
             ORDER BY name
             LIMIT ?3",
        )
        .map_err(|e| VibeError::Database(format!("failed to prepare component query: {e}")))?;
    let rows = stmt
        .query_map(params![project, like_pattern(query), limit as i64], |row| {
            Ok(SearchResult {
                result_type: ResultType::Component,
                name: Some(row.get(0)?),
                kind: row.get(1)?,
                file_path: row.get(2)?,
                line: None,
                end_line: None,
                parent: None,
                language: None,
                preview: None,
                score: COMPONENT_SCORE,
                match_types: vec![MatchType::Component],
                breakdown: None,
            })
        })
        .map_err(|e| VibeError::Database(format!("component query failed: {e}")))?;

    collect_rows(rows)
}

struct ChunkRow {
    file_path: String,
    start_line: u32,
    end_line: u32,
    chunk_type: String,
    name: Option<String>,
    parent: Option<String>,
    language: String,
}

fn chunk_result(row: ChunkRow, preview: String, score: f64, match_type: MatchType) -> SearchResult {
    SearchResult {
        result_type: ResultType::CodeChunk,
        name: row.name,
        file_path: row.file_path,
        line: Some(row.start_line),
        end_line: Some(row.end_line),
        kind: row.chunk_type,
        parent: row.parent,
        language: row.language.parse().ok(),
        preview: Some(preview),
        score,
        match_types: vec![match_type],
        breakdown: None,
    }
}

fn collect_rows<I>(rows: I) -> Result<Vec<SearchResult>, VibeError>
where
    I: Iterator<Item = rusqlite::Result<SearchResult>>,
{
    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?);
    }
    Ok(results)
}

/// A window of at most `max_chars` characters starting a little before the
/// first highlight marker.
pub(crate) fn excerpt(highlighted: &str, max_chars: usize) -> String {
    let marker = highlighted.find(">>>").unwrap_or(0);
    let before = highlighted[..marker].chars().count();
    highlighted
        .chars()
        .skip(before.saturating_sub(EXCERPT_LEAD))
        .take(max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Up to `max_chars` characters starting at the first ASCII
/// case-insensitive occurrence of `query`, or at the start of `content`.
fn preview_at(content: &str, query: &str, max_chars: usize) -> String {
    let start = content
        .to_ascii_lowercase()
        .find(&query.to_ascii_lowercase())
        .unwrap_or(0);
    truncate_chars(&content[start..], max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::seeded_store;

    #[test]
    fn fts_hits_score_one_and_highlight() {
        let store = seeded_store();
        let results = try_text_search(&store, "/p", "session_token", 10).unwrap();
        let first = &results[0];
        assert_eq!(first.score, 1.0);
        assert_eq!(first.match_types, vec![MatchType::FullText]);
        assert_eq!(first.file_path, "src/services/auth.py");
        assert!(first.preview.as_deref().unwrap().contains(">>>"));
        assert!(first.preview.as_deref().unwrap().chars().count() <= EXCERPT_CHARS);
    }

    #[test]
    fn substring_fallback_finds_partial_words() {
        let store = seeded_store();
        let results = try_text_search(&store, "/p", "ssion_to", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0.6);
        assert_eq!(results[0].match_types, vec![MatchType::Substring]);
        assert!(results[0].preview.as_deref().unwrap().starts_with("ssion_to"));
    }

    #[test]
    fn fallback_does_not_duplicate_fts_hits() {
        let store = seeded_store();
        let results = try_text_search(&store, "/p", "useAuthToken", 10).unwrap();
        let mut keys: Vec<_> = results.iter().map(|r| (&r.file_path, r.line)).collect();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn components_match_by_name_and_type() {
        let store = seeded_store();
        let results = try_text_search(&store, "/p", "Button", 10).unwrap();
        let component = results
            .iter()
            .find(|r| r.result_type == ResultType::Component)
            .unwrap();
        assert_eq!(component.score, 0.8);
        assert_eq!(component.kind, "component");
        assert!(component.line.is_none());
    }

    #[test]
    fn broken_fts_table_still_runs_fallbacks() {
        let store = seeded_store();
        store
            .conn()
            .execute_batch("DROP TABLE code_chunks_fts;")
            .unwrap();

        let results = try_text_search(&store, "/p", "session_token", 10).unwrap();
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|r| r.match_types == vec![MatchType::Substring]));

        let results = try_text_search(&store, "/p", "Button", 10).unwrap();
        assert!(results
            .iter()
            .any(|r| r.result_type == ResultType::Component));
    }

    #[test]
    fn fts_operators_are_literal() {
        let store = seeded_store();
        assert!(try_text_search(&store, "/p", "\"NEAR(", 10).is_ok());
        assert!(try_text_search(&store, "/p", "a OR", 10).is_ok());
    }

    #[test]
    fn results_truncated_to_limit() {
        let store = seeded_store();
        let results = try_text_search(&store, "/p", "Auth", 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn query_quoting_and_like_escaping() {
        assert_eq!(fts_query("use auth"), "\"use\" \"auth\"");
        assert_eq!(fts_query("say \"hi\""), "\"say\" \"\"\"hi\"\"\"");
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }

    #[test]
    fn excerpt_window_starts_near_marker() {
        let text = format!("{}>>>hit<<< tail", "x".repeat(500));
        let window = excerpt(&text, 200);
        assert_eq!(window, format!("{}>>>hit<<< tail", "x".repeat(EXCERPT_LEAD)));

        let long = format!(">>>hit<<<{}", "y".repeat(500));
        assert_eq!(excerpt(&long, 200).chars().count(), 200);
    }
}
