// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Service Port
//!
//! Boundary to the embedding provider chain. The application sees a single
//! `get_embedding` operation; tiering, fallback, quota accounting, and
//! dimension validation are the adapter's concern.

use async_trait::async_trait;

use crate::error::IngestError;

/// Produces dense vectors for texts.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds one text.
    ///
    /// # Errors
    ///
    /// - [`IngestError::QuotaExhausted`] when the metered tier is spent and
    ///   no fallback succeeded
    /// - [`IngestError::Transient`] for retryable provider failures
    /// - [`IngestError::InternalError`] for dimension mismatches and other
    ///   fatal conditions
    async fn get_embedding(&self, text: &str) -> Result<Vec<f32>, IngestError>;

    /// Embeds a batch sequentially, returning the full list or the first
    /// unrecoverable error.
    async fn get_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.get_embedding(text).await?);
        }
        Ok(vectors)
    }
}
