use std::path::PathBuf;

/// Errors that can occur while indexing or searching a project.
///
/// Library crates return this type directly; the binary converts it into a
/// `miette` diagnostic at the boundary.
///
/// # Examples
///
/// ```
/// use vibe_core::VibeError;
///
/// let err = VibeError::Config("weights must sum to 1.0".into());
/// assert!(err.to_string().contains("weights"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VibeError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration, including search weights that do not sum to 1.0.
    #[error("configuration error: {0}")]
    Config(String),

    /// SQLite failure while reading or writing the index.
    #[error("database error: {0}")]
    Database(String),

    /// The index exists but has not been created by `sync` or `init` yet.
    #[error("index not initialized at {}: run `vibe-sync sync` first", .0.display())]
    SchemaNotInitialized(PathBuf),

    /// The embedding provider could not be reached or does not serve the model.
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The embedding provider answered with an error or an unusable payload.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// An invalid file glob pattern.
    #[error("invalid pattern: {0}")]
    Pattern(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VibeError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = VibeError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn schema_error_points_at_sync() {
        let err = VibeError::SchemaNotInitialized(PathBuf::from("/tmp/p/.claude/memory/vibe.db"));
        let msg = err.to_string();
        assert!(msg.contains("vibe.db"));
        assert!(msg.contains("sync"));
    }
}
