// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ollama Embedding Backend
//!
//! The local, unmetered tier of the provider chain. Speaks the Ollama
//! embeddings API at `<base_url>/api/embeddings` with the same
//! `{model, prompt}` / `{embedding}` wire shape as the remote tier.

use std::time::Duration;

use hasher_domain::IngestError;

use super::chain::classify_status;
use super::cloudflare::{classify_request_error, EmbeddingRequest, EmbeddingResponse};

/// HTTP client for the local embedding service.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Service probe timeout used during DEPENDENCY_CHECK
    const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IngestError::internal_error(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Embeds one text through the local endpoint.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, "ollama"));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IngestError::transient(format!("ollama returned unparseable body: {}", e)))?;
        Ok(body.embedding)
    }

    /// Liveness probe against the service root. Best-effort: any response
    /// counts as alive.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        matches!(
            tokio::time::timeout(Self::PROBE_TIMEOUT, self.client.get(&url).send()).await,
            Ok(Ok(_))
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::embedding::http_stub::serve_once;

    #[tokio::test]
    async fn test_embed_posts_to_api_embeddings() {
        let (addr, request) = serve_once("200 OK", r#"{"embedding":[1.0,2.0,3.0]}"#).await;
        // Trailing slash must not produce a double-slash path
        let embedder = OllamaEmbedder::new(format!("http://{}/", addr), "nomic-embed-text").unwrap();

        let vector = embedder.embed("some interaction text").await.unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);

        let raw = request.await.unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /api/embeddings HTTP/1.1"));

        let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["model"], "nomic-embed-text");
        assert_eq!(parsed["prompt"], "some interaction text");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_transient() {
        let (addr, _request) = serve_once("200 OK", "not json at all").await;
        let embedder = OllamaEmbedder::new(format!("http://{}", addr), "nomic-embed-text").unwrap();

        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, IngestError::Transient(_)));
    }

    #[tokio::test]
    async fn test_error_status_classified() {
        let (addr, _request) = serve_once("500 Internal Server Error", "{}").await;
        let embedder = OllamaEmbedder::new(format!("http://{}", addr), "nomic-embed-text").unwrap();

        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, IngestError::Transient(_)));
    }

    #[tokio::test]
    async fn test_probe_alive_service() {
        let (addr, _request) = serve_once("200 OK", r#"{"models":[]}"#).await;
        let embedder = OllamaEmbedder::new(format!("http://{}", addr), "nomic-embed-text").unwrap();
        assert!(embedder.probe().await);
    }

    #[tokio::test]
    async fn test_probe_dead_service() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let embedder = OllamaEmbedder::new(format!("http://{}", addr), "nomic-embed-text").unwrap();
        assert!(!embedder.probe().await);
    }
}
