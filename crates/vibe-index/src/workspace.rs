//! The project a command operates on.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vibe_core::{SearchResult, VibeConfig, VibeError, CONFIG_FILE};

use crate::embedding::{EmbeddingProvider, OllamaClient};
use crate::search;
use crate::store::{db_path, CodeStore, IndexStatus};
use crate::sync::{sync_project, SyncProgress, SyncStats};

/// A resolved project root with its configuration and embedding client.
///
/// The project key stored in every index row is the canonical root path.
/// The embedding client is created on first use.
///
/// # Examples
///
/// ```
/// use vibe_core::VibeConfig;
/// use vibe_index::Workspace;
///
/// let dir = tempfile::tempdir().unwrap();
/// let workspace = Workspace::new(dir.path().to_path_buf(), VibeConfig::default());
/// assert!(workspace.db_path().ends_with("vibe.db"));
/// assert_eq!(workspace.limit(None), 10);
/// ```
pub struct Workspace {
    root: PathBuf,
    project_key: String,
    config: VibeConfig,
    embedder: OnceLock<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What the index and provider can currently do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub symbol_search: bool,
    pub fulltext_search: bool,
    pub semantic_search: bool,
    pub provider_available: bool,
    pub embedding_model: String,
}

/// Health report for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub project_path: String,
    pub db_path: PathBuf,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStatus>,
    pub capabilities: Capabilities,
}

impl Workspace {
    pub fn new(root: PathBuf, config: VibeConfig) -> Self {
        Self {
            project_key: root.to_string_lossy().into_owned(),
            root,
            config,
            embedder: OnceLock::new(),
        }
    }

    /// Resolve the project root and load its configuration.
    ///
    /// An explicit `project` is used as given. Otherwise the enclosing git
    /// work tree of the current directory is used, falling back to the
    /// current directory itself. Configuration comes from `config_path` or
    /// from `.vibe-sync.toml` at the root when present.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::FileNotFound`] for a missing project directory or
    /// config file, and config parse/validation errors.
    pub fn load(project: Option<&Path>, config_path: Option<&Path>) -> Result<Self, VibeError> {
        let root = resolve_project_root(project)?;
        let config = load_config(&root, config_path)?;
        Ok(Self::new(root, config))
    }

    /// Use `provider` instead of the configured Ollama client.
    pub fn with_embedder(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = OnceLock::from(provider);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn config(&self) -> &VibeConfig {
        &self.config
    }

    pub fn db_path(&self) -> PathBuf {
        db_path(&self.root)
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder
            .get_or_init(|| Arc::new(OllamaClient::with_config(&self.config.embedding)))
            .as_ref()
    }

    /// Requested limit, or the configured default.
    pub fn limit(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.config.search.default_limit)
    }

    /// Create the index file and schema without indexing anything.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Database`] if the store cannot be created.
    pub fn init(&self) -> Result<PathBuf, VibeError> {
        let path = self.db_path();
        CodeStore::open(&path)?;
        Ok(path)
    }

    /// Re-index the project.
    ///
    /// # Errors
    ///
    /// See [`sync_project`].
    pub async fn sync(
        &self,
        embeddings: bool,
        progress: &dyn SyncProgress,
    ) -> Result<SyncStats, VibeError> {
        let store = CodeStore::open(&self.db_path())?;
        let embedder = embeddings.then(|| self.embedder());
        sync_project(
            &store,
            &self.root,
            &self.project_key,
            &self.config,
            embedder,
            progress,
        )
        .await
    }

    /// Symbol lookup. A missing index yields no results.
    pub fn symbol_search(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        let Some(store) = self.search_store() else {
            return Vec::new();
        };
        search::symbol_search(&store, &self.project_key, query, self.limit(limit))
    }

    /// Full-text search. A missing index yields no results.
    pub fn text_search(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        let Some(store) = self.search_store() else {
            return Vec::new();
        };
        search::text_search(&store, &self.project_key, query, self.limit(limit))
    }

    /// Semantic search that reports an unreachable provider.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::ProviderUnavailable`] when the provider is down
    /// and [`VibeError::Embedding`] when embedding the query fails.
    pub async fn semantic_search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, VibeError> {
        let Some(store) = self.search_store() else {
            return Ok(Vec::new());
        };
        search::try_vector_search(
            &store,
            &self.project_key,
            self.embedder(),
            query,
            self.limit(limit),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`VibeError::Config`] if the configured weights are invalid.
    pub async fn hybrid_search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, VibeError> {
        let Some(store) = self.search_store() else {
            return Ok(Vec::new());
        };
        search::hybrid_search(
            &store,
            &self.project_key,
            self.embedder(),
            self.config.search.weights,
            query,
            self.limit(limit),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`VibeError::Database`] if an existing index cannot be read.
    pub async fn status(&self) -> Result<StatusReport, VibeError> {
        let provider_available = self.embedder().is_available().await;
        let db_path = self.db_path();
        let index = match CodeStore::open_read_only(&db_path) {
            Ok(store) => Some(store.status(&self.project_key)?),
            Err(VibeError::SchemaNotInitialized(_)) => None,
            Err(e) => return Err(e),
        };
        let initialized = index.is_some();
        let has_vectors = index
            .as_ref()
            .is_some_and(|s| s.chunks_with_embeddings + s.components_with_embeddings > 0);

        Ok(StatusReport {
            project_path: self.project_key.clone(),
            db_path,
            initialized,
            index,
            capabilities: Capabilities {
                symbol_search: initialized,
                fulltext_search: initialized,
                semantic_search: provider_available && has_vectors,
                provider_available,
                embedding_model: self.embedder().model().to_string(),
            },
        })
    }

    fn search_store(&self) -> Option<CodeStore> {
        match CodeStore::open_read_only(&self.db_path()) {
            Ok(store) => Some(store),
            Err(VibeError::SchemaNotInitialized(path)) => {
                debug!(path = %path.display(), "no index yet");
                None
            }
            Err(e) => {
                warn!(error = %e, "index unavailable");
                None
            }
        }
    }
}

/// Canonical project root: `explicit` when given, else the enclosing git
/// work tree of the current directory, else the current directory.
///
/// # Errors
///
/// Returns [`VibeError::FileNotFound`] if `explicit` does not exist.
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf, VibeError> {
    if let Some(path) = explicit {
        if !path.is_dir() {
            return Err(VibeError::FileNotFound(path.to_path_buf()));
        }
        return Ok(path.canonicalize()?);
    }

    let cwd = std::env::current_dir()?;
    let root = match git2::Repository::discover(&cwd) {
        Ok(repo) => repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone()),
        Err(e) => {
            debug!(error = %e, "not inside a git work tree");
            cwd
        }
    };
    Ok(root.canonicalize()?)
}

/// Load `explicit`, or `<root>/.vibe-sync.toml` if it exists, or defaults.
///
/// # Errors
///
/// Returns [`VibeError::FileNotFound`] if `explicit` does not exist, and
/// parse or validation errors from [`VibeConfig::from_file`].
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<VibeConfig, VibeError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(VibeError::FileNotFound(path.to_path_buf()));
        }
        return VibeConfig::from_file(path);
    }
    let default_path = root.join(CONFIG_FILE);
    if default_path.is_file() {
        VibeConfig::from_file(&default_path)
    } else {
        Ok(VibeConfig::default())
    }
}
