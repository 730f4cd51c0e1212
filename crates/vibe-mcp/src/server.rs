//! MCP server setup and lifecycle.

use std::path::PathBuf;

use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};
use vibe_core::VibeError;

use crate::tools::VibeServer;

const SERVER_INSTRUCTIONS: &str = "\
vibe-sync indexes a project into symbols, full-text and embeddings. Use these tools to find code:\n\
- hybrid_search: Best default; merges symbol, full-text and semantic matches\n\
- symbol_search: Find a declaration by name\n\
- text_search: Find words or identifiers anywhere in the code\n\
- semantic_search: Find code by meaning (needs Ollama embeddings)\n\
- index_status: Check what is indexed and which searches are available\n\
- sync_project: Re-index the project after changes";

#[tool_handler]
impl ServerHandler for VibeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "vibe-sync".to_string(),
                title: Some("vibe-sync Code Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Hybrid symbol, full-text and semantic code search".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Start the MCP server on stdio transport and block until the client
/// closes stdin.
///
/// # Errors
///
/// Returns [`VibeError::Config`] if the server fails to initialize or hits a
/// transport error.
pub async fn run_server(
    project_root: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<(), VibeError> {
    tracing::info!(root = %project_root.display(), "starting MCP server");
    let server = VibeServer::new(project_root, config_path);
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| VibeError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| VibeError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
