//! Full re-index of one project.
//!
//! Every sync replaces all chunks, symbols and components of the project
//! inside a single transaction, so readers never observe a half-written
//! index.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use vibe_chunker::walker::{discover_components, discover_files, DiscoveredFile};
use vibe_chunker::{chunk_file, truncate_chars, ChunkerOptions, CodeChunk};
use vibe_core::{Language, VibeConfig, VibeError};

use crate::embedding::{Embedding, EmbeddingProvider};
use crate::store::{CodeStore, ComponentRecord, FileRecord};

/// Counts reported by one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub files: usize,
    pub code_chunks: usize,
    pub symbols: usize,
    pub components: usize,
    pub embeddings: usize,
    pub skipped_files: usize,
    pub pruned_files: usize,
}

/// Progress hooks for long syncs. Every method defaults to a no-op.
pub trait SyncProgress {
    fn start(&self, _total_files: usize) {}
    fn file(&self, _relative_path: &str) {}
    fn finish(&self, _stats: &SyncStats) {}
}

impl SyncProgress for () {}

/// Re-index `root` into `store` under the key `project`.
///
/// When `embedder` is given it is probed once; if it is unreachable, or
/// becomes unreachable mid-run, the rest of the run stores no embeddings.
/// Unreadable files are skipped.
///
/// # Errors
///
/// Returns [`VibeError::Pattern`] for invalid globs and
/// [`VibeError::Database`] if writing the index fails. Nothing is committed
/// on error.
pub async fn sync_project(
    store: &CodeStore,
    root: &Path,
    project: &str,
    config: &VibeConfig,
    embedder: Option<&dyn EmbeddingProvider>,
    progress: &dyn SyncProgress,
) -> Result<SyncStats, VibeError> {
    let files = discover_files(root, &config.sync.patterns, &config.sync.exclude_dirs)?;
    let components = discover_components(
        root,
        &config.sync.component_patterns,
        &config.sync.exclude_dirs,
    )?;

    let mut embedder = match embedder {
        Some(provider) if provider.is_available().await => Some(provider),
        Some(provider) => {
            warn!(
                model = provider.model(),
                "embedding provider unavailable, indexing without embeddings"
            );
            None
        }
        None => None,
    };

    let tx = store
        .conn()
        .unchecked_transaction()
        .map_err(|e| VibeError::Database(format!("failed to begin transaction: {e}")))?;

    store.clear_project(project)?;

    let options = ChunkerOptions::from(&config.sync);
    let mut stats = SyncStats::default();
    progress.start(files.len());

    for file in &files {
        progress.file(&file.relative);
        let content = match std::fs::read_to_string(&file.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %file.relative, error = %e, "skipping unreadable file");
                stats.skipped_files += 1;
                continue;
            }
        };
        store.upsert_file(project, &file_record(file, &content))?;
        stats.files += 1;

        let chunks = chunk_file(Path::new(&file.relative), &content, &options);
        debug!(path = %file.relative, chunks = chunks.len(), "chunked");
        for chunk in &chunks {
            let embedding = match embedder {
                Some(_) => {
                    let text = embedding_text(chunk_label(chunk), &chunk.content, config.sync.embed_chars);
                    embed(&mut embedder, &text).await
                }
                None => None,
            };
            if embedding.is_some() {
                stats.embeddings += 1;
            }
            let chunk_id = store.insert_chunk(project, chunk, embedding.as_ref())?;
            stats.code_chunks += 1;
            for symbol in &chunk.symbols {
                store.insert_symbol(project, symbol, chunk, chunk_id)?;
                stats.symbols += 1;
            }
        }
    }

    for (file, kind) in &components {
        let name = file_stem(&file.relative);
        let embedding = match embedder {
            Some(_) => match std::fs::read_to_string(&file.path) {
                Ok(content) if !content.trim().is_empty() => {
                    let text = embedding_text(&name, &content, config.sync.embed_chars);
                    embed(&mut embedder, &text).await
                }
                Ok(_) => None,
                Err(e) => {
                    debug!(path = %file.relative, error = %e, "component not embedded");
                    None
                }
            },
            None => None,
        };
        if embedding.is_some() {
            stats.embeddings += 1;
        }
        store.insert_component(
            project,
            &ComponentRecord {
                name,
                kind: *kind,
                file_path: file.relative.clone(),
            },
            embedding.as_ref(),
        )?;
        stats.components += 1;
    }

    if config.sync.prune_stale_files {
        let seen: HashSet<String> = files.iter().map(|f| f.relative.clone()).collect();
        stats.pruned_files = store.prune_files(project, &seen)?;
    }

    store.rebuild_fts()?;
    store.record_sync_event(project, "sync", &serde_json::to_string(&stats)?)?;
    tx.commit()
        .map_err(|e| VibeError::Database(format!("failed to commit sync: {e}")))?;

    info!(
        files = stats.files,
        chunks = stats.code_chunks,
        symbols = stats.symbols,
        components = stats.components,
        embeddings = stats.embeddings,
        "sync complete"
    );
    progress.finish(&stats);
    Ok(stats)
}

/// Embed `text`, switching embeddings off for the rest of the run when the
/// provider stops answering.
async fn embed(embedder: &mut Option<&dyn EmbeddingProvider>, text: &str) -> Option<Embedding> {
    let provider = (*embedder)?;
    match provider.embed(text).await {
        Ok(vector) => Some(Embedding {
            vector,
            model: provider.model().to_string(),
        }),
        Err(VibeError::ProviderUnavailable(reason)) => {
            warn!(%reason, "embedding provider went away, continuing without embeddings");
            *embedder = None;
            None
        }
        Err(e) => {
            debug!(error = %e, "embedding failed");
            None
        }
    }
}

fn embedding_text(label: &str, content: &str, max_chars: usize) -> String {
    format!("{label}: {}", truncate_chars(content, max_chars))
}

fn chunk_label(chunk: &CodeChunk) -> &str {
    chunk.name.as_deref().unwrap_or(&chunk.file_path)
}

fn file_stem(relative: &str) -> String {
    Path::new(relative)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative.to_string())
}

fn file_record(file: &DiscoveredFile, content: &str) -> FileRecord {
    let ext = Path::new(&file.relative)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let last_modified = std::fs::metadata(&file.path)
        .and_then(|m| m.modified())
        .ok()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

    FileRecord {
        file_path: file.relative.clone(),
        file_type: Language::from_extension(&ext).to_string(),
        size_bytes: content.len() as u64,
        last_modified,
        content_hash: format!("{:x}", Sha256::digest(content.as_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::FakeProvider;
    use std::cell::RefCell;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in [
            (
                "src/hooks/useAuth.ts",
                "export function useAuth() {\n  return 1;\n}\n",
            ),
            (
                "src/components/Button.tsx",
                "export const Button = () => {\n  return null;\n};\n",
            ),
            (
                "src/api/users.py",
                "class Users:\n    def list(self):\n        return []\n",
            ),
            ("src/node_modules/x/index.ts", "export const x = 1;\n"),
        ] {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        dir
    }

    #[derive(Default)]
    struct Recorder {
        files: RefCell<Vec<String>>,
        total: RefCell<usize>,
    }

    impl SyncProgress for Recorder {
        fn start(&self, total_files: usize) {
            *self.total.borrow_mut() = total_files;
        }
        fn file(&self, relative_path: &str) {
            self.files.borrow_mut().push(relative_path.to_string());
        }
    }

    #[tokio::test]
    async fn sync_indexes_chunks_symbols_and_components() {
        let dir = project();
        let store = CodeStore::in_memory().unwrap();
        let recorder = Recorder::default();
        let stats = sync_project(
            &store,
            dir.path(),
            "/p",
            &VibeConfig::default(),
            None,
            &recorder,
        )
        .await
        .unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.code_chunks, 4);
        assert_eq!(stats.symbols, 5);
        assert_eq!(stats.components, 1);
        assert_eq!(stats.embeddings, 0);
        assert_eq!(*recorder.total.borrow(), 3);
        assert!(!recorder
            .files
            .borrow()
            .iter()
            .any(|f| f.contains("node_modules")));

        let status = store.status("/p").unwrap();
        assert_eq!(status.code_chunks, 4);
        assert_eq!(status.files, 3);
        assert_eq!(status.last_sync.unwrap().stats["codeChunks"], 4);
    }

    #[tokio::test]
    async fn repeated_sync_gives_identical_counts() {
        let dir = project();
        let store = CodeStore::in_memory().unwrap();
        let config = VibeConfig::default();
        let first = sync_project(&store, dir.path(), "/p", &config, None, &())
            .await
            .unwrap();
        let second = sync_project(&store, dir.path(), "/p", &config, None, &())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.status("/p").unwrap().symbols, first.symbols);
    }

    #[tokio::test]
    async fn unavailable_provider_leaves_embeddings_null() {
        let dir = project();
        let store = CodeStore::in_memory().unwrap();
        let provider = FakeProvider::down();
        let stats = sync_project(
            &store,
            dir.path(),
            "/p",
            &VibeConfig::default(),
            Some(&provider),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(stats.embeddings, 0);
        assert!(stats.code_chunks > 0);
        assert_eq!(store.status("/p").unwrap().chunks_with_embeddings, 0);
    }

    #[tokio::test]
    async fn available_provider_embeds_chunks_and_components() {
        let dir = project();
        let store = CodeStore::in_memory().unwrap();
        let provider = FakeProvider::constant(vec![0.5, 0.5]);
        let stats = sync_project(
            &store,
            dir.path(),
            "/p",
            &VibeConfig::default(),
            Some(&provider),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(stats.embeddings, stats.code_chunks + stats.components);
        let status = store.status("/p").unwrap();
        assert_eq!(status.chunks_with_embeddings, status.code_chunks);
        assert_eq!(status.components_with_embeddings, 1);
    }

    #[tokio::test]
    async fn deleted_files_are_pruned() {
        let dir = project();
        let store = CodeStore::in_memory().unwrap();
        let config = VibeConfig::default();
        sync_project(&store, dir.path(), "/p", &config, None, &())
            .await
            .unwrap();
        fs::remove_file(dir.path().join("src/api/users.py")).unwrap();
        let stats = sync_project(&store, dir.path(), "/p", &config, None, &())
            .await
            .unwrap();
        assert_eq!(stats.pruned_files, 1);
        assert_eq!(stats.files, 2);
        assert!(!store
            .indexed_files("/p")
            .unwrap()
            .contains(&"src/api/users.py".to_string()));
    }

    #[test]
    fn file_record_hashes_content() {
        let file = DiscoveredFile {
            path: "/nonexistent/a.py".into(),
            relative: "a.py".into(),
        };
        let record = file_record(&file, "abc");
        assert_eq!(record.file_type, "python");
        assert_eq!(record.size_bytes, 3);
        assert_eq!(
            record.content_hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(record.last_modified.is_none());
    }

    #[test]
    fn embedding_text_is_truncated() {
        assert_eq!(embedding_text("f", "abcdef", 3), "f: abc");
    }
}
