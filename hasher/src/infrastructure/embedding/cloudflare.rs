// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cloudflare Embedding Backend
//!
//! The remote, metered tier of the provider chain. Each successful call
//! consumes one unit of the daily request budget tracked by the quota
//! tracker (the chain does the accounting; this type only speaks HTTP).
//!
//! Wire shape: `POST <url>` with `{model, prompt}`, bearer-token auth,
//! response `{embedding: [f32, ...]}`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use hasher_domain::IngestError;

use super::chain::classify_status;

/// Request body shared by both embedding endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

/// Response body shared by both embedding endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

/// HTTP client for the remote metered embedding endpoint.
pub struct CloudflareEmbedder {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    model: String,
}

impl CloudflareEmbedder {
    /// Request timeout; the file processor enforces its own 60s bound on
    /// top of this.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(url: impl Into<String>, token: Option<String>, model: impl Into<String>) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IngestError::internal_error(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            token,
            model: model.into(),
        })
    }

    /// Embeds one text through the remote endpoint.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            prompt: text,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, "cloudflare"));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IngestError::transient(format!("cloudflare returned unparseable body: {}", e)))?;
        Ok(body.embedding)
    }
}

/// Transport-level failures are always transient: the local tier can still
/// serve the request.
pub(crate) fn classify_request_error(err: reqwest::Error) -> IngestError {
    if err.is_timeout() {
        IngestError::timeout(format!("embedding request timed out: {}", err))
    } else {
        IngestError::transient(format!("embedding request failed: {}", err))
    }
}
