//! Search primitives over a [`CodeStore`](crate::store::CodeStore).
//!
//! Each primitive comes in two flavours: `try_*` surfaces errors, the plain
//! function logs them and returns no results so callers always get an
//! answer.

pub mod fulltext;
pub mod hybrid;
pub mod symbol;
pub mod vector;

pub use fulltext::{text_search, try_text_search};
pub use hybrid::{hybrid_search, HybridRanker};
pub use symbol::{symbol_search, try_symbol_search};
pub use vector::{rank_by_similarity, try_vector_search, vector_search};

use vibe_core::SearchResult;

/// Highest score first. Ties keep their insertion order.
pub(crate) fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use vibe_chunker::CodeChunk;
    use vibe_core::{ChunkKind, ComponentKind, Language, VibeError};

    use crate::embedding::EmbeddingProvider;
    use crate::store::{CodeStore, ComponentRecord};

    /// Embedding provider that never touches the network.
    pub(crate) struct FakeProvider {
        available: bool,
        vector: Vec<f32>,
    }

    impl FakeProvider {
        pub(crate) fn down() -> Self {
            Self {
                available: false,
                vector: Vec::new(),
            }
        }

        pub(crate) fn constant(vector: Vec<f32>) -> Self {
            Self {
                available: true,
                vector,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FakeProvider {
        fn model(&self) -> &str {
            "fake"
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, VibeError> {
            if self.available {
                Ok(self.vector.clone())
            } else {
                Err(VibeError::ProviderUnavailable("fake provider is down".into()))
            }
        }
    }

    fn chunk(
        file: &str,
        language: Language,
        kind: ChunkKind,
        name: &str,
        lines: (u32, u32),
        content: &str,
        symbols: &[&str],
    ) -> CodeChunk {
        CodeChunk {
            file_path: file.into(),
            chunk_index: 0,
            content: content.into(),
            language,
            kind,
            name: Some(name.into()),
            parent_name: None,
            start_line: lines.0,
            end_line: lines.1,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A small indexed project under the key `/p`.
    pub(crate) fn seeded_store() -> CodeStore {
        let store = CodeStore::in_memory().unwrap();
        let chunks = [
            chunk(
                "src/hooks/useAuth.ts",
                Language::TypeScript,
                ChunkKind::Hook,
                "useAuth",
                (1, 8),
                "export function useAuth() {\n  const token = useAuthToken();\n  return { token };\n}",
                &["useAuth"],
            ),
            chunk(
                "src/hooks/useAuthToken.ts",
                Language::TypeScript,
                ChunkKind::Hook,
                "useAuthToken",
                (1, 4),
                "export function useAuthToken() {\n  return localStorage.getItem('t');\n}",
                &["useAuthToken"],
            ),
            chunk(
                "src/services/auth.py",
                Language::Python,
                ChunkKind::Class,
                "AuthService",
                (1, 10),
                "class AuthService:\n    def login(self, user):\n        return session_token(user)",
                &["AuthService", "login"],
            ),
        ];
        for c in &chunks {
            let id = store.insert_chunk("/p", c, None).unwrap();
            for symbol in &c.symbols {
                store.insert_symbol("/p", symbol, c, id).unwrap();
            }
        }
        store
            .insert_component(
                "/p",
                &ComponentRecord {
                    name: "Button".into(),
                    kind: ComponentKind::Component,
                    file_path: "src/components/Button.tsx".into(),
                },
                None,
            )
            .unwrap();
        store.rebuild_fts().unwrap();
        store
    }
}
