//! Core types, configuration, and error handling for vibe-sync.
//!
//! This crate provides the shared foundation used by all other vibe-sync crates:
//! - [`VibeError`]: unified error type using `thiserror`
//! - [`VibeConfig`]: configuration loaded from `.vibe-sync.toml`
//! - Shared types: [`Language`], [`ChunkKind`], [`SearchResult`], [`MatchType`],
//!   [`SignalScores`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    ComponentPattern, EmbeddingConfig, SearchConfig, SearchWeights, SyncConfig, VibeConfig,
};
pub use error::VibeError;
pub use types::{
    ChunkKind, ComponentKind, Language, MatchType, OutputFormat, ResultType, SearchResult, Signal,
    SignalScores,
};

/// A convenience `Result` type for vibe-sync operations.
pub type Result<T> = std::result::Result<T, VibeError>;

/// Name of the per-project configuration file.
pub const CONFIG_FILE: &str = ".vibe-sync.toml";
