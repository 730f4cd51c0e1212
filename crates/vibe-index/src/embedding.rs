//! Embedding providers.
//!
//! [`EmbeddingProvider`] is the seam between indexing/search and whatever
//! turns text into vectors. [`OllamaClient`] talks to a local Ollama server.
//! Transport failures and error statuses surface as
//! [`VibeError::ProviderUnavailable`] so callers can degrade to lexical
//! search; an unusable response body is [`VibeError::Embedding`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vibe_chunker::truncate_chars;
use vibe_core::{EmbeddingConfig, VibeError};

/// A vector together with the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

/// Turns text into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name recorded next to stored vectors.
    fn model(&self) -> &str;

    /// Whether the provider can serve requests right now. Never errors.
    async fn is_available(&self) -> bool;

    /// Embed one text.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::ProviderUnavailable`] when the provider cannot be
    /// reached or answers with an error status, and [`VibeError::Embedding`]
    /// when the response carries no usable vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, VibeError>;
}

/// Client for a local Ollama server.
///
/// # Examples
///
/// ```
/// use vibe_core::EmbeddingConfig;
/// use vibe_index::embedding::{EmbeddingProvider, OllamaClient};
///
/// let client = OllamaClient::with_config(&EmbeddingConfig::default());
/// assert_eq!(client.model(), "nomic-embed-text");
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    probe_timeout: Duration,
    max_chars: usize,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaClient {
    pub fn with_config(config: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            max_chars: config.max_chars,
        }
    }

    fn build_request<'a>(&'a self, text: &'a str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: &self.model,
            prompt: truncate_chars(text, self.max_chars),
        }
    }

    fn serves_model(&self, tags: &TagsResponse) -> bool {
        tags.models.iter().any(|m| m.name.contains(&self.model))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let response = match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = %r.status(), "ollama probe rejected");
                return false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "ollama probe failed");
                return false;
            }
        };
        match response.json::<TagsResponse>().await {
            Ok(tags) => self.serves_model(&tags),
            Err(e) => {
                tracing::debug!(error = %e, "unreadable ollama model list");
                false
            }
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, VibeError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&self.build_request(text))
            .send()
            .await
            .map_err(|e| VibeError::ProviderUnavailable(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(VibeError::ProviderUnavailable(format!(
                "ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| VibeError::Embedding(format!("failed to parse response: {e}")))?;
        if parsed.embedding.is_empty() {
            return Err(VibeError::Embedding("empty embedding from ollama".into()));
        }
        Ok(parsed.embedding)
    }
}

/// Cosine similarity of two vectors, `None` when the dimensions differ or
/// either vector has zero magnitude.
///
/// # Examples
///
/// ```
/// use vibe_index::embedding::cosine_similarity;
///
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(dot / denom)
}
