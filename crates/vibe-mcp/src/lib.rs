//! MCP server interface exposing vibe-sync search to IDEs and agents.
//!
//! Implements a Model Context Protocol server using rmcp that exposes
//! `hybrid_search`, `symbol_search`, `text_search`, `semantic_search`,
//! `index_status` and `sync_project` over stdio transport.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), vibe_core::VibeError> {
//! vibe_mcp::server::run_server(PathBuf::from("."), None).await?;
//! # Ok(())
//! # }
//! ```

pub mod server;
pub mod tools;
