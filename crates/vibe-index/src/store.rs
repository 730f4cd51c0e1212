//! SQLite + FTS5 storage for chunks, symbols, components and embeddings.
//!
//! One database file can hold several projects; every row carries the
//! project key and every query filters on it. The FTS5 tables use external
//! content and are rebuilt in one step at the end of each sync.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use vibe_chunker::CodeChunk;
use vibe_core::{ComponentKind, VibeError};

use crate::embedding::Embedding;

/// Schema version written to the `metadata` table.
pub const SCHEMA_VERSION: &str = "2.1.0";

/// Location of the index inside a project.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vibe_index::store::db_path;
///
/// let path = db_path(Path::new("/work/app"));
/// assert!(path.ends_with(".claude/memory/vibe.db"));
/// ```
pub fn db_path(project_root: &Path) -> PathBuf {
    project_root.join(".claude").join("memory").join("vibe.db")
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS code_chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_path TEXT NOT NULL,
        file_path TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        language TEXT NOT NULL,
        chunk_type TEXT NOT NULL,
        name TEXT,
        parent_name TEXT,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        embedding BLOB,
        embedding_model TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_code_chunks_project ON code_chunks(project_path, file_path);

    CREATE TABLE IF NOT EXISTS symbols (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_path TEXT NOT NULL,
        file_path TEXT NOT NULL,
        symbol_name TEXT NOT NULL,
        symbol_type TEXT NOT NULL,
        parent_symbol TEXT,
        language TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        chunk_id INTEGER REFERENCES code_chunks(id)
    );
    CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(symbol_name);
    CREATE INDEX IF NOT EXISTS idx_symbols_project ON symbols(project_path);

    CREATE TABLE IF NOT EXISTS components (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_path TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        file_path TEXT NOT NULL,
        props_json TEXT,
        embedding BLOB,
        embedding_model TEXT,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(project_path, file_path)
    );

    CREATE TABLE IF NOT EXISTS file_index (
        project_path TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_type TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        last_modified TEXT,
        content_hash TEXT NOT NULL,
        indexed_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (project_path, file_path)
    );

    CREATE TABLE IF NOT EXISTS sync_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_path TEXT NOT NULL,
        timestamp TEXT NOT NULL DEFAULT (datetime('now')),
        event_type TEXT NOT NULL,
        stats_json TEXT NOT NULL
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS code_chunks_fts USING fts5(
        content, file_path, chunk_type, name,
        content='code_chunks', content_rowid='id'
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts USING fts5(
        symbol_name, file_path, symbol_type,
        content='symbols', content_rowid='id'
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS components_fts USING fts5(
        name, file_path, type,
        content='components', content_rowid='id'
    );
";

/// A file seen by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file_path: String,
    pub file_type: String,
    pub size_bytes: u64,
    /// RFC 3339 modification time, when the filesystem reports one.
    pub last_modified: Option<String>,
    /// SHA-256 of the file content, hex encoded.
    pub content_hash: String,
}

/// A file registered as a UI component or page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub name: String,
    pub kind: ComponentKind,
    pub file_path: String,
}

/// One row of the sync audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub timestamp: String,
    pub event_type: String,
    pub stats: serde_json::Value,
}

/// Counts and breakdowns for one project in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub schema_version: Option<String>,
    pub db_size_bytes: u64,
    pub code_chunks: usize,
    pub chunks_with_embeddings: usize,
    pub symbols: usize,
    pub components: usize,
    pub components_with_embeddings: usize,
    pub files: usize,
    /// Symbol count per symbol type.
    pub symbol_types: BTreeMap<String, usize>,
    /// Chunk count per language.
    pub languages: BTreeMap<String, usize>,
    pub last_sync: Option<SyncEvent>,
}

/// SQLite-backed index of chunks, symbols and components.
///
/// # Examples
///
/// ```
/// use vibe_index::store::CodeStore;
///
/// let store = CodeStore::in_memory().unwrap();
/// let status = store.status("/work/app").unwrap();
/// assert_eq!(status.code_chunks, 0);
/// assert_eq!(status.schema_version.as_deref(), Some("2.1.0"));
/// ```
pub struct CodeStore {
    conn: Connection,
}

impl std::fmt::Debug for CodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeStore")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl CodeStore {
    /// Open or create a read-write index at `path`, creating the schema.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] if the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, VibeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VibeError::Database(format!("failed to create index directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| VibeError::Database(format!("failed to open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| VibeError::Database(format!("failed to enable WAL: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an existing index for queries only.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::SchemaNotInitialized`] if the file does not exist
    /// or has no schema, and [`VibeError::Database`] if it cannot be opened.
    pub fn open_read_only(path: &Path) -> Result<Self, VibeError> {
        if !path.is_file() {
            return Err(VibeError::SchemaNotInitialized(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| VibeError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        if !store.has_table("code_chunks")? {
            return Err(VibeError::SchemaNotInitialized(path.to_path_buf()));
        }
        Ok(store)
    }

    /// Create an in-memory index (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, VibeError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            VibeError::Database(format!("failed to create in-memory database: {e}"))
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), VibeError> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| VibeError::Database(format!("failed to create schema: {e}")))?;
        self.set_metadata("schema_version", SCHEMA_VERSION)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn has_table(&self, name: &str) -> Result<bool, VibeError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| VibeError::Database(format!("failed to inspect schema: {e}")))?;
        Ok(count > 0)
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, VibeError> {
        self.conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| VibeError::Database(format!("failed to get metadata '{key}': {e}")))
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), VibeError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| VibeError::Database(format!("failed to set metadata '{key}': {e}")))?;
        Ok(())
    }

    /// Delete every chunk, symbol and component of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on delete failure.
    pub fn clear_project(&self, project: &str) -> Result<(), VibeError> {
        for table in ["symbols", "code_chunks", "components"] {
            self.conn
                .execute(
                    &format!("DELETE FROM {table} WHERE project_path = ?1"),
                    params![project],
                )
                .map_err(|e| VibeError::Database(format!("failed to clear {table}: {e}")))?;
        }
        Ok(())
    }

    /// Insert or refresh the file index row for one file.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on write failure.
    pub fn upsert_file(&self, project: &str, file: &FileRecord) -> Result<(), VibeError> {
        self.conn
            .execute(
                "INSERT INTO file_index
                 (project_path, file_path, file_type, size_bytes, last_modified, content_hash, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
                 ON CONFLICT(project_path, file_path) DO UPDATE SET
                    file_type = excluded.file_type,
                    size_bytes = excluded.size_bytes,
                    last_modified = excluded.last_modified,
                    content_hash = excluded.content_hash,
                    indexed_at = excluded.indexed_at",
                params![
                    project,
                    file.file_path,
                    file.file_type,
                    file.size_bytes as i64,
                    file.last_modified,
                    file.content_hash,
                ],
            )
            .map_err(|e| VibeError::Database(format!("failed to record file: {e}")))?;
        Ok(())
    }

    /// Remove file index rows of `project` whose path is not in `keep`.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on query failure.
    pub fn prune_files(&self, project: &str, keep: &HashSet<String>) -> Result<usize, VibeError> {
        let indexed = self.indexed_files(project)?;
        let mut removed = 0;
        for path in indexed.iter().filter(|p| !keep.contains(*p)) {
            removed += self
                .conn
                .execute(
                    "DELETE FROM file_index WHERE project_path = ?1 AND file_path = ?2",
                    params![project, path],
                )
                .map_err(|e| VibeError::Database(format!("failed to prune file: {e}")))?;
        }
        Ok(removed)
    }

    /// All file paths recorded for `project`.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on query failure.
    pub fn indexed_files(&self, project: &str) -> Result<Vec<String>, VibeError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_path FROM file_index WHERE project_path = ?1 ORDER BY file_path")
            .map_err(|e| VibeError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project], |row| row.get(0))
            .map_err(|e| VibeError::Database(format!("failed to query files: {e}")))?;

        let mut paths = Vec::new();
        for row in rows {
            let path: String =
                row.map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Store a chunk and return its row id.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on insert failure.
    pub fn insert_chunk(
        &self,
        project: &str,
        chunk: &CodeChunk,
        embedding: Option<&Embedding>,
    ) -> Result<i64, VibeError> {
        self.conn
            .execute(
                "INSERT INTO code_chunks
                 (project_path, file_path, chunk_index, content, language, chunk_type,
                  name, parent_name, start_line, end_line, embedding, embedding_model)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    project,
                    chunk.file_path,
                    chunk.chunk_index as i64,
                    chunk.content,
                    chunk.language.as_str(),
                    chunk.kind.as_str(),
                    chunk.name,
                    chunk.parent_name,
                    chunk.start_line,
                    chunk.end_line,
                    embedding.map(|e| floats_to_bytes(&e.vector)),
                    embedding.map(|e| e.model.as_str()),
                ],
            )
            .map_err(|e| VibeError::Database(format!("failed to insert chunk: {e}")))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Store one symbol of `chunk`, sharing the chunk's line range.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on insert failure.
    pub fn insert_symbol(
        &self,
        project: &str,
        name: &str,
        chunk: &CodeChunk,
        chunk_id: i64,
    ) -> Result<(), VibeError> {
        self.conn
            .execute(
                "INSERT INTO symbols
                 (project_path, file_path, symbol_name, symbol_type, parent_symbol,
                  language, start_line, end_line, chunk_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    project,
                    chunk.file_path,
                    name,
                    chunk.kind.as_str(),
                    chunk.parent_name,
                    chunk.language.as_str(),
                    chunk.start_line,
                    chunk.end_line,
                    chunk_id,
                ],
            )
            .map_err(|e| VibeError::Database(format!("failed to insert symbol: {e}")))?;
        Ok(())
    }

    /// Register a component, replacing any earlier row for the same file.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on insert failure.
    pub fn insert_component(
        &self,
        project: &str,
        component: &ComponentRecord,
        embedding: Option<&Embedding>,
    ) -> Result<(), VibeError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO components
                 (project_path, name, type, file_path, embedding, embedding_model, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
                params![
                    project,
                    component.name,
                    component.kind.as_str(),
                    component.file_path,
                    embedding.map(|e| floats_to_bytes(&e.vector)),
                    embedding.map(|e| e.model.as_str()),
                ],
            )
            .map_err(|e| VibeError::Database(format!("failed to insert component: {e}")))?;
        Ok(())
    }

    /// Rebuild the three full-text indexes from their content tables.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] if a rebuild fails.
    pub fn rebuild_fts(&self) -> Result<(), VibeError> {
        self.conn
            .execute_batch(
                "INSERT INTO code_chunks_fts(code_chunks_fts) VALUES('rebuild');
                 INSERT INTO symbols_fts(symbols_fts) VALUES('rebuild');
                 INSERT INTO components_fts(components_fts) VALUES('rebuild');",
            )
            .map_err(|e| VibeError::Database(format!("failed to rebuild full-text index: {e}")))
    }

    /// Append an entry to the sync audit log.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on insert failure.
    pub fn record_sync_event(
        &self,
        project: &str,
        event_type: &str,
        stats_json: &str,
    ) -> Result<(), VibeError> {
        self.conn
            .execute(
                "INSERT INTO sync_events (project_path, event_type, stats_json) VALUES (?1, ?2, ?3)",
                params![project, event_type, stats_json],
            )
            .map_err(|e| VibeError::Database(format!("failed to record sync event: {e}")))?;
        Ok(())
    }

    /// Most recent sync event of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on query failure.
    pub fn last_sync(&self, project: &str) -> Result<Option<SyncEvent>, VibeError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT timestamp, event_type, stats_json FROM sync_events
                 WHERE project_path = ?1 ORDER BY id DESC LIMIT 1",
                params![project],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| VibeError::Database(format!("failed to read sync events: {e}")))?;

        Ok(row.map(|(timestamp, event_type, stats)| SyncEvent {
            timestamp,
            event_type,
            stats: serde_json::from_str(&stats).unwrap_or(serde_json::Value::Null),
        }))
    }

    /// Counts and breakdowns for `project`.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] on query failure.
    pub fn status(&self, project: &str) -> Result<IndexStatus, VibeError> {
        let count = |sql: &str| -> Result<usize, VibeError> {
            self.conn
                .query_row(sql, params![project], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(|e| VibeError::Database(format!("failed to count rows: {e}")))
        };

        let page_count: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(IndexStatus {
            schema_version: self.get_metadata("schema_version")?,
            db_size_bytes: (page_count * page_size) as u64,
            code_chunks: count("SELECT COUNT(*) FROM code_chunks WHERE project_path = ?1")?,
            chunks_with_embeddings: count(
                "SELECT COUNT(*) FROM code_chunks WHERE project_path = ?1 AND embedding IS NOT NULL",
            )?,
            symbols: count("SELECT COUNT(*) FROM symbols WHERE project_path = ?1")?,
            components: count("SELECT COUNT(*) FROM components WHERE project_path = ?1")?,
            components_with_embeddings: count(
                "SELECT COUNT(*) FROM components WHERE project_path = ?1 AND embedding IS NOT NULL",
            )?,
            files: count("SELECT COUNT(*) FROM file_index WHERE project_path = ?1")?,
            symbol_types: self.breakdown(
                "SELECT symbol_type, COUNT(*) FROM symbols WHERE project_path = ?1 GROUP BY symbol_type",
                project,
            )?,
            languages: self.breakdown(
                "SELECT language, COUNT(*) FROM code_chunks WHERE project_path = ?1 GROUP BY language",
                project,
            )?,
            last_sync: self.last_sync(project)?,
        })
    }

    fn breakdown(&self, sql: &str, project: &str) -> Result<BTreeMap<String, usize>, VibeError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| VibeError::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![project], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| VibeError::Database(format!("failed to query breakdown: {e}")))?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, n) =
                row.map_err(|e| VibeError::Database(format!("failed to read row: {e}")))?;
            map.insert(key, n as usize);
        }
        Ok(map)
    }
}

pub(crate) fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(floats.len() * 4);
    for f in floats {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

pub(crate) fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_core::{ChunkKind, Language};

    pub(crate) fn sample_chunk(file: &str, name: &str, start: u32, end: u32) -> CodeChunk {
        CodeChunk {
            file_path: file.into(),
            chunk_index: 0,
            content: format!("function {name}() {{\n  return 1;\n}}"),
            language: Language::TypeScript,
            kind: ChunkKind::Function,
            name: Some(name.into()),
            parent_name: None,
            start_line: start,
            end_line: end,
            symbols: vec![name.into()],
        }
    }

    #[test]
    fn schema_version_recorded() {
        let store = CodeStore::in_memory().unwrap();
        assert_eq!(
            store.get_metadata("schema_version").unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
        assert!(store.get_metadata("missing").unwrap().is_none());
    }

    #[test]
    fn insert_and_count_per_project() {
        let store = CodeStore::in_memory().unwrap();
        let chunk = sample_chunk("src/a.ts", "alpha", 1, 3);
        let embedding = Embedding {
            vector: vec![0.1, 0.2],
            model: "test-model".into(),
        };
        let id = store.insert_chunk("/p1", &chunk, Some(&embedding)).unwrap();
        store.insert_symbol("/p1", "alpha", &chunk, id).unwrap();
        store.insert_chunk("/p2", &chunk, None).unwrap();

        let p1 = store.status("/p1").unwrap();
        assert_eq!(p1.code_chunks, 1);
        assert_eq!(p1.chunks_with_embeddings, 1);
        assert_eq!(p1.symbols, 1);
        assert_eq!(p1.symbol_types.get("function"), Some(&1));
        assert_eq!(p1.languages.get("typescript"), Some(&1));

        let p2 = store.status("/p2").unwrap();
        assert_eq!(p2.code_chunks, 1);
        assert_eq!(p2.chunks_with_embeddings, 0);
        assert_eq!(p2.symbols, 0);
    }

    #[test]
    fn clear_project_leaves_other_projects() {
        let store = CodeStore::in_memory().unwrap();
        let chunk = sample_chunk("src/a.ts", "alpha", 1, 3);
        for project in ["/p1", "/p2"] {
            let id = store.insert_chunk(project, &chunk, None).unwrap();
            store.insert_symbol(project, "alpha", &chunk, id).unwrap();
            store
                .insert_component(
                    project,
                    &ComponentRecord {
                        name: "Button".into(),
                        kind: ComponentKind::Component,
                        file_path: "src/components/Button.tsx".into(),
                    },
                    None,
                )
                .unwrap();
        }
        store.clear_project("/p1").unwrap();

        let p1 = store.status("/p1").unwrap();
        assert_eq!((p1.code_chunks, p1.symbols, p1.components), (0, 0, 0));
        let p2 = store.status("/p2").unwrap();
        assert_eq!((p2.code_chunks, p2.symbols, p2.components), (1, 1, 1));
    }

    #[test]
    fn upsert_and_prune_files() {
        let store = CodeStore::in_memory().unwrap();
        let record = |path: &str, hash: &str| FileRecord {
            file_path: path.into(),
            file_type: "typescript".into(),
            size_bytes: 10,
            last_modified: None,
            content_hash: hash.into(),
        };
        store.upsert_file("/p", &record("a.ts", "h1")).unwrap();
        store.upsert_file("/p", &record("a.ts", "h2")).unwrap();
        store.upsert_file("/p", &record("b.ts", "h3")).unwrap();
        assert_eq!(store.indexed_files("/p").unwrap(), vec!["a.ts", "b.ts"]);

        let keep: HashSet<String> = ["a.ts".to_string()].into_iter().collect();
        assert_eq!(store.prune_files("/p", &keep).unwrap(), 1);
        assert_eq!(store.indexed_files("/p").unwrap(), vec!["a.ts"]);
    }

    #[test]
    fn sync_events_read_back_newest_first() {
        let store = CodeStore::in_memory().unwrap();
        assert!(store.last_sync("/p").unwrap().is_none());
        store.record_sync_event("/p", "sync", r#"{"files":1}"#).unwrap();
        store.record_sync_event("/p", "sync", r#"{"files":2}"#).unwrap();
        let last = store.last_sync("/p").unwrap().unwrap();
        assert_eq!(last.event_type, "sync");
        assert_eq!(last.stats["files"], 2);
    }

    #[test]
    fn rebuild_fts_makes_chunks_searchable() {
        let store = CodeStore::in_memory().unwrap();
        store
            .insert_chunk("/p", &sample_chunk("src/a.ts", "tokenize", 1, 3), None)
            .unwrap();
        store.rebuild_fts().unwrap();
        let hits: i64 = store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM code_chunks_fts WHERE code_chunks_fts MATCH '\"tokenize\"'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
    }

    #[test]
    fn read_only_open_requires_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(dir.path());
        let err = CodeStore::open_read_only(&path).unwrap_err();
        assert!(matches!(err, VibeError::SchemaNotInitialized(_)));

        drop(CodeStore::open(&path).unwrap());
        let store = CodeStore::open_read_only(&path).unwrap();
        assert_eq!(store.status("/p").unwrap().code_chunks, 0);
    }

    #[test]
    fn float_bytes_are_little_endian() {
        let bytes = floats_to_bytes(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(bytes_to_floats(&bytes), vec![1.0, -2.5]);
    }
}
