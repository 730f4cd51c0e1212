//! Semantic search by cosine similarity over stored embeddings.

use rusqlite::params;
use tracing::debug;
use vibe_chunker::truncate_chars;
use vibe_core::{Language, MatchType, ResultType, SearchResult, VibeError};

use super::sort_by_score;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::store::{bytes_to_floats, CodeStore};

const PREVIEW_CHARS: usize = 200;

/// Semantic search that yields no results when the provider is down or a
/// query fails.
pub async fn vector_search(
    store: &CodeStore,
    project: &str,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Vec<SearchResult> {
    match try_vector_search(store, project, provider, query, limit).await {
        Ok(results) => results,
        Err(e) => {
            debug!(error = %e, "semantic search skipped");
            Vec::new()
        }
    }
}

/// Embed `query` and rank stored chunks and components by similarity.
///
/// # Errors
///
/// Returns [`VibeError::ProviderUnavailable`] if the provider does not answer
/// its probe, [`VibeError::Embedding`] if embedding the query fails and
/// [`VibeError::Database`] if loading stored vectors fails.
pub async fn try_vector_search(
    store: &CodeStore,
    project: &str,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    if query.trim().is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    if !provider.is_available().await {
        return Err(VibeError::ProviderUnavailable(format!(
            "embedding model '{}' is not being served",
            provider.model()
        )));
    }
    let query_vector = provider.embed(query).await?;
    rank_by_similarity(store, project, &query_vector, limit)
}

/// Rank every stored embedding of `project` against `query_vector`.
/// Rows whose dimension differs from the query are skipped.
///
/// # Errors
///
/// Returns [`VibeError::Database`] if a query fails.
pub fn rank_by_similarity(
    store: &CodeStore,
    project: &str,
    query_vector: &[f32],
    limit: usize,
) -> Result<Vec<SearchResult>, VibeError> {
    let mut results = Vec::new();
    let mut skipped = 0usize;

    let mut stmt = store
        .conn()
        .prepare(
            "SELECT file_path, start_line, end_line, chunk_type, name, parent_name,
                    language, content, embedding
             FROM code_chunks
             WHERE project_path = ?1 AND embedding IS NOT NULL",
        )
        .map_err(|e| VibeError::Database(format!("failed to prepare vector query: {e}")))?;
    let mut rows = stmt
        .query(params![project])
        .map_err(|e| VibeError::Database(format!("vector query failed: {e}")))?;
    while let Some(row) = rows
        .next()
        .map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?
    {
        let blob: Vec<u8> = row
            .get(8)
            .map_err(|e| VibeError::Database(format!("failed to read embedding: {e}")))?;
        let Some(score) = cosine_similarity(query_vector, &bytes_to_floats(&blob)) else {
            skipped += 1;
            continue;
        };
        let read = |e: rusqlite::Error| VibeError::Database(format!("failed to read row: {e}"));
        let language: String = row.get(6).map_err(read)?;
        let content: String = row.get(7).map_err(read)?;
        results.push(SearchResult {
            result_type: ResultType::CodeChunk,
            file_path: row.get(0).map_err(read)?,
            line: Some(row.get(1).map_err(read)?),
            end_line: Some(row.get(2).map_err(read)?),
            kind: row.get(3).map_err(read)?,
            name: row.get(4).map_err(read)?,
            parent: row.get(5).map_err(read)?,
            language: language.parse::<Language>().ok(),
            preview: Some(truncate_chars(&content, PREVIEW_CHARS).to_string()),
            score,
            match_types: vec![MatchType::Semantic],
            breakdown: None,
        });
    }

    let mut stmt = store
        .conn()
        .prepare(
            "SELECT name, type, file_path, embedding FROM components
             WHERE project_path = ?1 AND embedding IS NOT NULL",
        )
        .map_err(|e| VibeError::Database(format!("failed to prepare vector query: {e}")))?;
    let mut rows = stmt
        .query(params![project])
        .map_err(|e| VibeError::Database(format!("vector query failed: {e}")))?;
    while let Some(row) = rows
        .next()
        .map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?
    {
        let read = |e: rusqlite::Error| VibeError::Database(format!("failed to read row: {e}"));
        let blob: Vec<u8> = row.get(3).map_err(read)?;
        let Some(score) = cosine_similarity(query_vector, &bytes_to_floats(&blob)) else {
            skipped += 1;
            continue;
        };
        results.push(SearchResult {
            result_type: ResultType::Component,
            name: Some(row.get(0).map_err(read)?),
            kind: row.get(1).map_err(read)?,
            file_path: row.get(2).map_err(read)?,
            line: None,
            end_line: None,
            parent: None,
            language: None,
            preview: None,
            score,
            match_types: vec![MatchType::Semantic],
            breakdown: None,
        });
    }

    if skipped > 0 {
        debug!(skipped, "skipped embeddings with a different dimension");
    }
    sort_by_score(&mut results);
    results.truncate(limit);
    Ok(results)
}
