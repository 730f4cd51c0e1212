//! Indexing, storage and hybrid retrieval for vibe-sync.
//!
//! A sync walks the project, chunks every file with `vibe-chunker`, and
//! stores chunks, symbols and components in one SQLite database with FTS5
//! indexes and optional embedding vectors. Search combines three signals:
//! symbol-name tiers, full-text matches and cosine similarity against
//! embeddings from an [`EmbeddingProvider`](embedding::EmbeddingProvider).
//!
//! [`Workspace`] ties a project root, its configuration and an embedding
//! client together and is the entry point used by the CLI and MCP server.

pub mod embedding;
pub mod search;
pub mod store;
pub mod sync;
pub mod workspace;

pub use embedding::{Embedding, EmbeddingProvider, OllamaClient};
pub use store::CodeStore;
pub use sync::{SyncProgress, SyncStats};
pub use workspace::{Capabilities, StatusReport, Workspace};
