// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Process-wide prometheus counters for the ingestion workflow. The ledger
//! remains the durable source of truth; these counters exist for live
//! observation (dumped on the operator's show-stats choice and on shutdown)
//! and reset with the process.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use hasher_domain::IngestError;

/// Prometheus registry plus the workflow counters.
pub struct MetricsService {
    registry: Registry,
    workflow_loops: IntCounter,
    papers_processed: IntCounter,
    papers_downloaded: IntCounter,
    embeddings_generated: IntCounter,
    embedding_failures: IntCounter,
    provider_fallbacks: IntCounter,
}

impl MetricsService {
    /// Creates the registry and registers all counters.
    pub fn new() -> Result<Self, IngestError> {
        let registry = Registry::new();

        let workflow_loops = IntCounter::new("hasher_workflow_loops_total", "Completed workflow loop iterations")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;
        let papers_processed = IntCounter::new("hasher_papers_processed_total", "Source files fully processed")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;
        let papers_downloaded = IntCounter::new("hasher_papers_downloaded_total", "New files acquired by the miner")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;
        let embeddings_generated = IntCounter::new("hasher_embeddings_generated_total", "Embedding vectors produced")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;
        let embedding_failures = IntCounter::new("hasher_embedding_failures_total", "Embedding calls that failed or timed out")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;
        let provider_fallbacks = IntCounter::new("hasher_provider_fallbacks_total", "Remote-to-local embedding fallbacks")
            .map_err(|e| IngestError::internal_error(format!("failed to create counter: {}", e)))?;

        for counter in [
            &workflow_loops,
            &papers_processed,
            &papers_downloaded,
            &embeddings_generated,
            &embedding_failures,
            &provider_fallbacks,
        ] {
            registry
                .register(Box::new(counter.clone()))
                .map_err(|e| IngestError::internal_error(format!("failed to register counter: {}", e)))?;
        }

        Ok(Self {
            registry,
            workflow_loops,
            papers_processed,
            papers_downloaded,
            embeddings_generated,
            embedding_failures,
            provider_fallbacks,
        })
    }

    pub fn workflow_loops(&self) -> &IntCounter {
        &self.workflow_loops
    }

    pub fn papers_processed(&self) -> &IntCounter {
        &self.papers_processed
    }

    pub fn papers_downloaded(&self) -> &IntCounter {
        &self.papers_downloaded
    }

    pub fn embeddings_generated(&self) -> &IntCounter {
        &self.embeddings_generated
    }

    pub fn embedding_failures(&self) -> &IntCounter {
        &self.embedding_failures
    }

    pub fn provider_fallbacks(&self) -> &IntCounter {
        &self.provider_fallbacks
    }

    /// Renders the registry in the prometheus text format.
    pub fn render(&self) -> Result<String, IngestError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| IngestError::internal_error(format!("failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| IngestError::internal_error(format!("metrics not utf8: {}", e)))
    }
}
