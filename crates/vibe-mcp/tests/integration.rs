use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{handler::server::wrapper::Parameters, model::*, ServerHandler};
use vibe_core::VibeError;
use vibe_index::EmbeddingProvider;
use vibe_mcp::tools::{SearchParams, StatusParams, SyncParams, VibeServer};

struct OfflineProvider;

#[async_trait]
impl EmbeddingProvider for OfflineProvider {
    fn model(&self) -> &str {
        "offline"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, VibeError> {
        Err(VibeError::ProviderUnavailable("offline".into()))
    }
}

fn test_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in [
        (
            "src/lib/format.ts",
            "export function formatPrice(cents: number) {\n  return `$${(cents / 100).toFixed(2)}`;\n}\n",
        ),
        (
            "src/components/PriceTag.tsx",
            "export const PriceTag = ({ cents }: Props) => {\n  return <b>{formatPrice(cents)}</b>;\n};\n",
        ),
    ] {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    dir
}

fn test_server(dir: &tempfile::TempDir) -> VibeServer {
    VibeServer::new(dir.path().to_path_buf(), None).with_embedder(Arc::new(OfflineProvider))
}

fn extract_json(result: &CallToolResult) -> serde_json::Value {
    match &result.content[0].raw {
        RawContent::Text(t) => serde_json::from_str(&t.text).unwrap(),
        _ => panic!("expected text content"),
    }
}

fn search(query: &str) -> Parameters<SearchParams> {
    Parameters(SearchParams {
        query: query.to_string(),
        path: None,
        limit: Some(5),
    })
}

#[test]
fn server_info_is_correct() {
    let dir = test_project();
    let info = test_server(&dir).get_info();

    assert_eq!(info.server_info.name, "vibe-sync");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    let instructions = info.instructions.unwrap();
    for tool in [
        "hybrid_search",
        "symbol_search",
        "text_search",
        "semantic_search",
        "index_status",
        "sync_project",
    ] {
        assert!(instructions.contains(tool), "missing {tool}");
    }
}

#[test]
fn searches_before_sync_return_no_results() {
    let dir = test_project();
    let server = test_server(&dir);
    let parsed = extract_json(&server.symbol_search(search("formatPrice")).unwrap());
    assert_eq!(parsed["total"], 0);
    assert_eq!(parsed["query"], "formatPrice");
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_then_search_over_mcp() {
    let dir = test_project();
    let server = test_server(&dir);

    let stats = extract_json(
        &server
            .sync_project(Parameters(SyncParams {
                path: None,
                embeddings: Some(true),
            }))
            .await
            .unwrap(),
    );
    assert_eq!(stats["files"], 2);
    assert_eq!(stats["components"], 1);
    assert_eq!(stats["embeddings"], 0);

    let symbols = extract_json(&server.symbol_search(search("formatPrice")).unwrap());
    assert_eq!(symbols["results"][0]["name"], "formatPrice");
    assert_eq!(symbols["results"][0]["matchTypes"][0], "symbol:exact");

    let text = extract_json(&server.text_search(search("PriceTag")).unwrap());
    assert!(text["results"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["type"] == "component"));

    let hybrid = extract_json(&server.hybrid_search(search("formatPrice")).await.unwrap());
    let top = &hybrid["results"][0];
    assert_eq!(top["filePath"], "src/lib/format.ts");
    assert_eq!(top["breakdown"]["semantic"], 0.0);

    let status = extract_json(
        &server
            .index_status(Parameters(StatusParams { path: None }))
            .await
            .unwrap(),
    );
    assert_eq!(status["initialized"], true);
    assert_eq!(status["index"]["codeChunks"], 2);
    assert_eq!(status["capabilities"]["semanticSearch"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn semantic_search_reports_unavailable_provider() {
    let dir = test_project();
    let server = test_server(&dir);
    server
        .sync_project(Parameters(SyncParams {
            path: None,
            embeddings: None,
        }))
        .await
        .unwrap();

    let err = server
        .semantic_search(search("price formatting"))
        .await
        .unwrap_err();
    assert!(err.message.contains("unavailable"), "{}", err.message);
}

#[test]
fn path_outside_project_is_rejected() {
    let dir = test_project();
    let outside = tempfile::tempdir().unwrap();
    let server = test_server(&dir);
    let err = server
        .text_search(Parameters(SearchParams {
            query: "x".into(),
            path: Some(outside.path().display().to_string()),
            limit: None,
        }))
        .unwrap_err();
    assert!(err.message.contains("outside the configured project"));
}
