//! # Embedding Module
//!
//! Wraps the Gemini embedding REST API behind the [`Embedder`] trait. Input
//! text is truncated to a fixed character ceiling before submission, and the
//! returned vector is normalized to unit length: the 1536-dimension output
//! used here is not pre-normalized by the provider, and downstream
//! similarity search assumes unit vectors for correct cosine ranking.
//!
//! The batch variant preserves input-to-output index alignment: items whose
//! embedding fails are returned as `None` rather than silently dropped, so
//! the caller can distinguish "no embedding" from "embedding unavailable".

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Embedding model used for all documents in a deployment
pub const EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Fixed output dimensionality; must stay constant across crawls so stored
/// vectors remain comparable
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Character ceiling applied before submission (~4 chars per token)
const MAX_EMBED_CHARS: usize = 8000;

/// Default timeout for embedding requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Error type for embedding operations
#[derive(Debug, Error)]
pub enum EmbedError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),
}

/// Text-to-vector service consumed by the change detector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate a normalized embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Generate embeddings for multiple texts, index-aligned.
    ///
    /// Failed items are `None`; positions are never dropped.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    content: ContentPayload<'a>,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct ContentPayload<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Gemini-backed embedder
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: ReqwestClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    /// Create a new embedder with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: api_key.into(),
            model: EMBEDDING_MODEL.to_string(),
        }
    }

    /// Set the base URL (for testing only)
    #[cfg(test)]
    pub fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbedContentRequest {
            content: ContentPayload {
                parts: vec![TextPart { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
            output_dimensionality: EMBEDDING_DIMENSIONS,
        };

        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Embedding API error: {} - {}", status, body);
            return Err(EmbedError::Api {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let parsed: EmbedContentResponse = serde_json::from_str(&body)
            .map_err(|e| EmbedError::UnexpectedResponse(format!("Failed to parse response: {}", e)))?;

        if parsed.embedding.values.is_empty() {
            return Err(EmbedError::UnexpectedResponse(
                "empty embedding vector".to_string(),
            ));
        }

        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let text = truncate_chars(text, MAX_EMBED_CHARS);
        debug!("Generating embedding for text of length {}", text.len());

        let mut values = self.request_embedding(text).await?;
        normalize(&mut values);

        trace!("Generated embedding with {} dimensions", values.len());
        Ok(values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            match self.embed(text).await {
                Ok(values) => embeddings.push(Some(values)),
                Err(e) => {
                    // Keep the slot so callers can match inputs to outputs.
                    warn!("Batch embedding {}/{} failed: {}", i + 1, texts.len(), e);
                    embeddings.push(None);
                }
            }
        }
        Ok(embeddings)
    }
}

/// Scale a vector to unit length in place.
///
/// A zero vector is left untouched.
pub fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Truncate to at most `max` bytes without splitting a character.
fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_normalize_unit_length() {
        let mut values = vec![3.0, 4.0];
        normalize(&mut values);
        assert!((values[0] - 0.6).abs() < 1e-6);
        assert!((values[1] - 0.8).abs() < 1e-6);
        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_untouched() {
        let mut values = vec![0.0, 0.0, 0.0];
        normalize(&mut values);
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo".repeat(2000);
        let truncated = truncate_chars(&text, MAX_EMBED_CHARS);
        assert!(truncated.len() <= MAX_EMBED_CHARS);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_chars("short", MAX_EMBED_CHARS), "short");
    }

    #[tokio::test]
    async fn test_embed_success_normalizes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-embedding-001:embedContent",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"embedding\": {\"values\": [3.0, 4.0]}}")
            .match_query(mockito::Matcher::Any)
            .expect(1)
            .create_async()
            .await;

        let mut embedder = GeminiEmbedder::new("test-key");
        embedder.set_base_url(server.url());

        let values = embedder.embed("some documentation text").await.unwrap();
        assert!((values[0] - 0.6).abs() < 1e-6);
        assert!((values[1] - 0.8).abs() < 1e-6);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_api_error_surfaces() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-embedding-001:embedContent",
            )
            .with_status(500)
            .with_body("internal error")
            .match_query(mockito::Matcher::Any)
            .create_async()
            .await;

        let mut embedder = GeminiEmbedder::new("test-key");
        embedder.set_base_url(server.url());

        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbedError::Api { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn test_batch_preserves_alignment_on_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-embedding-001:embedContent",
            )
            .with_status(500)
            .with_body("unavailable")
            .match_query(mockito::Matcher::Any)
            .create_async()
            .await;

        let mut embedder = GeminiEmbedder::new("test-key");
        embedder.set_base_url(server.url());

        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_none()));
    }

    #[tokio::test]
    async fn test_batch_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-embedding-001:embedContent",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"embedding\": {\"values\": [1.0, 0.0]}}")
            .match_query(mockito::Matcher::Any)
            .expect(2)
            .create_async()
            .await;

        let mut embedder = GeminiEmbedder::new("test-key");
        embedder.set_base_url(server.url());

        let texts = vec!["a".to_string(), "b".to_string()];
        let results = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_some()));
    }
}
