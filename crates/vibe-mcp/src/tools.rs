//! Tool implementations for the vibe-sync MCP server.
//!
//! Six tools are exposed: `hybrid_search`, `symbol_search`, `text_search`,
//! `semantic_search`, `index_status` and `sync_project`. Each builds a
//! [`Workspace`] for the requested path and returns JSON via
//! `CallToolResult`.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::{Deserialize, Serialize};
use vibe_core::{SearchResult, VibeError};
use vibe_index::workspace::load_config;
use vibe_index::{EmbeddingProvider, Workspace};

/// MCP server exposing vibe-sync search and indexing tools.
///
/// # Examples
///
/// ```
/// use vibe_mcp::tools::VibeServer;
/// use std::path::PathBuf;
///
/// let server = VibeServer::new(PathBuf::from("."), None);
/// ```
#[derive(Clone)]
pub struct VibeServer {
    pub(crate) project_root: PathBuf,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub(crate) tool_router: ToolRouter<Self>,
}

// --- Parameter structs ---

/// Parameters shared by the search tools.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Search query: a symbol name, words from the code, or a description.
    pub query: String,
    /// Project path (default: server's configured path).
    pub path: Option<String>,
    /// Maximum results (default: `search.default_limit`, 10).
    pub limit: Option<usize>,
}

/// Parameters for the `index_status` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StatusParams {
    /// Project path (default: server's configured path).
    pub path: Option<String>,
}

/// Parameters for the `sync_project` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SyncParams {
    /// Project path (default: server's configured path).
    pub path: Option<String>,
    /// Generate embeddings when the provider is reachable (default: false).
    pub embeddings: Option<bool>,
}

// --- Response structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    query: String,
    results: Vec<SearchResult>,
    total: usize,
}

impl SearchResponse {
    fn new(query: String, results: Vec<SearchResult>) -> Self {
        Self {
            query,
            total: results.len(),
            results,
        }
    }
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| mcp_err(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl VibeServer {
    /// Create a new server rooted at `project_root`.
    pub fn new(project_root: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self {
            project_root,
            config_path,
            embedder: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Use `provider` for embeddings instead of the configured Ollama client.
    pub fn with_embedder(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    fn resolve_path(&self, path: &Option<String>) -> Result<PathBuf, McpError> {
        let canonical_root = self.project_root.canonicalize().map_err(|e| {
            mcp_err(format!(
                "Failed to access configured project path {}: {e}",
                self.project_root.display()
            ))
        })?;

        let requested_path = match path {
            Some(p) => {
                let input_path = PathBuf::from(p);
                if input_path.is_absolute() {
                    input_path
                } else {
                    canonical_root.join(input_path)
                }
            }
            None => canonical_root.clone(),
        };

        let canonical_requested_path = requested_path.canonicalize().map_err(|e| {
            mcp_err(format!(
                "Failed to resolve path {}: {e}",
                requested_path.display()
            ))
        })?;

        if !canonical_requested_path.starts_with(&canonical_root) {
            return Err(mcp_err(format!(
                "Path {} is outside the configured project {}",
                canonical_requested_path.display(),
                canonical_root.display()
            )));
        }

        Ok(canonical_requested_path)
    }

    fn workspace(&self, path: &Option<String>) -> Result<Workspace, McpError> {
        let root = self.resolve_path(path)?;
        let config = load_config(&root, self.config_path.as_deref())
            .map_err(|e| mcp_err(format!("Failed to load configuration: {e}")))?;
        let workspace = Workspace::new(root, config);
        Ok(match &self.embedder {
            Some(provider) => workspace.with_embedder(Arc::clone(provider)),
            None => workspace,
        })
    }

    /// Run `task` against a workspace on a blocking thread. The SQLite
    /// connection held across awaits is not `Sync`.
    async fn with_workspace<T, F, Fut>(&self, path: &Option<String>, task: F) -> Result<T, McpError>
    where
        T: Send + 'static,
        F: FnOnce(Workspace) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, McpError>>,
    {
        let workspace = self.workspace(path)?;
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(task(workspace)))
            .await
            .map_err(|e| mcp_err(format!("Task failed: {e}")))?
    }

    #[tool(
        name = "hybrid_search",
        description = "Search the indexed project by combining symbol-name matches, full-text matches and semantic similarity into one ranking. Each result carries a per-signal score breakdown. Best default for finding where something is implemented. Run sync_project first if the index is empty."
    )]
    pub async fn hybrid_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let SearchParams { query, path, limit } = params;
        let response = self
            .with_workspace(&path, move |ws| async move {
                let results = ws
                    .hybrid_search(&query, limit)
                    .await
                    .map_err(|e| mcp_err(format!("Search failed: {e}")))?;
                Ok(SearchResponse::new(query, results))
            })
            .await?;
        json_result(&response)
    }

    #[tool(
        name = "symbol_search",
        description = "Find functions, classes, components, hooks and other declarations by name. Exact matches rank first, then prefix, substring and case-insensitive matches."
    )]
    pub fn symbol_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let ws = self.workspace(&params.path)?;
        let results = ws.symbol_search(&params.query, params.limit);
        json_result(&SearchResponse::new(params.query, results))
    }

    #[tool(
        name = "text_search",
        description = "Full-text search over indexed code with highlighted excerpts, plus a substring fallback and component/page lookup by name or path."
    )]
    pub fn text_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let ws = self.workspace(&params.path)?;
        let results = ws.text_search(&params.query, params.limit);
        json_result(&SearchResponse::new(params.query, results))
    }

    #[tool(
        name = "semantic_search",
        description = "Find code by meaning using embedding similarity. Requires a running Ollama server with the configured embedding model and a sync with embeddings enabled."
    )]
    pub async fn semantic_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let SearchParams { query, path, limit } = params;
        let response = self
            .with_workspace(&path, move |ws| async move {
                let results = ws.semantic_search(&query, limit).await.map_err(|e| {
                    if matches!(e, VibeError::ProviderUnavailable(_)) {
                        mcp_err(format!(
                            "{e}. Start Ollama and pull the embedding model, or use hybrid_search."
                        ))
                    } else {
                        mcp_err(format!("Search failed: {e}"))
                    }
                })?;
                Ok(SearchResponse::new(query, results))
            })
            .await?;
        json_result(&response)
    }

    #[tool(
        name = "index_status",
        description = "Report index health for the project: chunk, symbol and component counts, embedding coverage, language breakdown, last sync, and which search modes are currently usable."
    )]
    pub async fn index_status(
        &self,
        Parameters(params): Parameters<StatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .with_workspace(&params.path, |ws| async move {
                ws.status()
                    .await
                    .map_err(|e| mcp_err(format!("Failed to read index status: {e}")))
            })
            .await?;
        json_result(&report)
    }

    #[tool(
        name = "sync_project",
        description = "Re-index the project: chunk every matching source file, record symbols and components, and optionally embed chunks. Replaces the previous index for this project."
    )]
    pub async fn sync_project(
        &self,
        Parameters(params): Parameters<SyncParams>,
    ) -> Result<CallToolResult, McpError> {
        let embeddings = params.embeddings.unwrap_or(false);
        let stats = self
            .with_workspace(&params.path, move |ws| async move {
                ws.sync(embeddings, &())
                    .await
                    .map_err(|e| mcp_err(format!("Failed to index project: {e}")))
            })
            .await?;
        json_result(&stats)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn resolve_path_accepts_relative_in_project() {
        let repo = tempfile::tempdir().unwrap();
        let src_dir = repo.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();

        let server = VibeServer::new(repo.path().to_path_buf(), None);
        let resolved = server.resolve_path(&Some("src".to_string())).unwrap();

        assert_eq!(resolved, src_dir.canonicalize().unwrap());
    }

    #[test]
    fn resolve_path_rejects_parent_escape() {
        let repo = tempfile::tempdir().unwrap();
        fs::create_dir_all(repo.path().join("safe")).unwrap();

        let server = VibeServer::new(repo.path().join("safe"), None);
        let err = server.resolve_path(&Some("../".to_string())).unwrap_err();

        assert!(err.message.contains("outside the configured project"));
    }

    #[test]
    fn resolve_path_rejects_absolute_out_of_project() {
        let repo = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();

        let server = VibeServer::new(repo.path().to_path_buf(), None);
        let err = server
            .resolve_path(&Some(outside.path().display().to_string()))
            .unwrap_err();

        assert!(err.message.contains("outside the configured project"));
    }

    #[test]
    fn workspace_uses_project_config() {
        let repo = tempfile::tempdir().unwrap();
        fs::write(
            repo.path().join(".vibe-sync.toml"),
            "[search]\ndefault_limit = 4\n",
        )
        .unwrap();

        let server = VibeServer::new(repo.path().to_path_buf(), None);
        let ws = server.workspace(&None).unwrap();
        assert_eq!(ws.limit(None), 4);
    }

    #[test]
    fn invalid_config_is_reported() {
        let repo = tempfile::tempdir().unwrap();
        fs::write(
            repo.path().join(".vibe-sync.toml"),
            "[search.weights]\nsemantic = 0.9\n",
        )
        .unwrap();

        let server = VibeServer::new(repo.path().to_path_buf(), None);
        let err = server.workspace(&None).unwrap_err();
        assert!(err.message.contains("Failed to load configuration"));
    }
}
