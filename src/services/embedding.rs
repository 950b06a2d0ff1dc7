//! # Similarity Backend
//!
//! Sentence-embedding cosine similarity between two phrases, used by the
//! phrase validator to reject copies that mean the same thing as the
//! original. The real backend is an HTTP embeddings API; the client is
//! built lazily on first use so startup never blocks on it.
//!
//! Failure policy lives in the validator, not here: this module only
//! reports `ExternalServiceUnavailable` and lets the caller decide
//! whether that fails open (prompt validation) or closed (copy
//! validation).

use std::collections::HashMap;

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::GameError;

/// Pluggable similarity source. The HTTP arm is production; the static
/// arm drives tests and the disabled arm models an unconfigured or
/// unreachable service.
pub enum EmbeddingBackend {
    Http(HttpEmbeddingClient),
    Static(StaticSimilarity),
    Disabled,
}

impl EmbeddingBackend {
    /// Cosine similarity of the two phrases in [0, 1].
    pub async fn similarity(&self, a: &str, b: &str) -> Result<f32, GameError> {
        match self {
            EmbeddingBackend::Http(client) => client.similarity(a, b).await,
            EmbeddingBackend::Static(table) => Ok(table.similarity(a, b)),
            EmbeddingBackend::Disabled => Err(GameError::ExternalServiceUnavailable(
                "similarity backend not configured".to_string(),
            )),
        }
    }
}

/// HTTP client for an embeddings API (OpenAI-compatible request shape).
pub struct HttpEmbeddingClient {
    url: String,
    api_key: Option<String>,
    model: String,
    client: OnceCell<reqwest::Client>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    pub fn new(url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            url,
            api_key,
            model,
            client: OnceCell::new(),
        }
    }

    async fn http(&self) -> &reqwest::Client {
        self.client
            .get_or_init(|| async {
                tracing::info!("Initializing embeddings client for {}", self.url);
                reqwest::Client::new()
            })
            .await
    }

    /// Embeds both phrases in one request and returns their cosine
    /// similarity.
    ///
    /// # Arguments
    /// * `a` / `b` - The phrases to compare; lowercased before the call
    ///
    /// # Returns
    /// * `Ok(f32)` - Cosine similarity in [0, 1]
    /// * `Err(ExternalServiceUnavailable)` - Network failure, error
    ///   status, or an unparseable response; the validator decides
    ///   whether that fails open or closed
    pub async fn similarity(&self, a: &str, b: &str) -> Result<f32, GameError> {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();

        let mut request = self.http().await.post(&self.url).json(&serde_json::json!({
            "model": self.model,
            "input": [a, b],
        }));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Embeddings API: request failed: {}", e);
            GameError::ExternalServiceUnavailable(format!("embeddings request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Embeddings API: returned error status: {}", status);
            return Err(GameError::ExternalServiceUnavailable(format!(
                "embeddings API error: {status}"
            )));
        }

        let payload = response.json::<EmbeddingsResponse>().await.map_err(|e| {
            tracing::error!("Embeddings API: failed to parse response: {}", e);
            GameError::ExternalServiceUnavailable(format!("bad embeddings response: {e}"))
        })?;

        if payload.data.len() < 2 {
            return Err(GameError::ExternalServiceUnavailable(
                "embeddings response missing vectors".to_string(),
            ));
        }

        let score = cosine_similarity(&payload.data[0].embedding, &payload.data[1].embedding);
        tracing::debug!("similarity('{}', '{}') = {:.4}", a, b, score);
        Ok(score)
    }
}

/// Fixed similarity table for tests; unknown pairs fall back to a
/// default score.
pub struct StaticSimilarity {
    default: f32,
    overrides: HashMap<(String, String), f32>,
}

impl StaticSimilarity {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Registers a symmetric similarity score for a phrase pair.
    pub fn with_pair(mut self, a: &str, b: &str, score: f32) -> Self {
        self.overrides.insert(Self::key(a, b), score);
        self
    }

    fn key(a: &str, b: &str) -> (String, String) {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        self.overrides
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(self.default)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.25, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn static_table_is_symmetric() {
        let table = StaticSimilarity::new(0.1).with_pair("Freedom", "liberty", 0.9);
        assert_eq!(table.similarity("LIBERTY", "FREEDOM"), 0.9);
        assert_eq!(table.similarity("freedom", "justice"), 0.1);
    }

    #[tokio::test]
    async fn disabled_backend_reports_unavailable() {
        let backend = EmbeddingBackend::Disabled;
        let err = backend.similarity("a", "b").await.unwrap_err();
        assert!(matches!(err, GameError::ExternalServiceUnavailable(_)));
    }
}
