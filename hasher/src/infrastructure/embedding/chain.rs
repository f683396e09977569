// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Provider Chain
//!
//! The client-side fallback fabric. Backends are an enumerated sum type, not
//! an open registry, so the fallback ordering is statically visible: remote
//! metered tier first, local unmetered tier second.
//!
//! ## Fallback Contract
//!
//! For each `get_embedding(text)`:
//!
//! 1. the remote tier is attempted only while it is configured, not
//!    session-disabled, and quota remains; success increments the quota
//!    tracker by one;
//! 2. a *transient* remote failure (timeout, connect error, 5xx) falls
//!    through to the local tier;
//! 3. a *quota-exhausted* signal (429-style status, or remaining already at
//!    zero) falls through AND disables the remote tier for the rest of the
//!    session;
//! 4. a *fatal* remote failure (malformed request, authentication) surfaces
//!    immediately without trying local;
//! 5. when local also fails, the caller gets one combined error naming both
//!    causes.
//!
//! There is deliberately no sticky "selected provider": per-call fallback
//! absorbs transient failures without operator intervention, and the driver
//! detects the quota transition purely by reading the quota tracker.
//!
//! ## Dimension Validation
//!
//! The first successful vector fixes the run's embedding dimension; any
//! later mismatch (e.g. remote and local models disagree) is fatal, because
//! a mixed-dimension Arrow file would be useless downstream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use hasher_domain::{EmbeddingService, IngestError};

use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::stats::QuotaTracker;

use super::cloudflare::CloudflareEmbedder;
use super::ollama::OllamaEmbedder;

/// Maps a non-success HTTP status to the chain's error classification.
pub(crate) fn classify_status(status: StatusCode, provider: &str) -> IngestError {
    if status.is_server_error() {
        return IngestError::transient(format!("{} returned {}", provider, status));
    }
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
            IngestError::quota_exhausted(format!("{} returned {}", provider, status))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            IngestError::invalid_config(format!("{} rejected credentials ({})", provider, status))
        }
        _ => IngestError::malformed_input(format!("{} rejected request ({})", provider, status)),
    }
}

/// One tier of the fallback chain.
pub enum EmbeddingBackend {
    /// Remote metered provider (counts against the daily budget)
    Cloudflare(CloudflareEmbedder),
    /// Local unmetered provider
    Ollama(OllamaEmbedder),
    #[cfg(test)]
    Mock(mock::MockBackend),
}

impl EmbeddingBackend {
    pub fn label(&self) -> &'static str {
        match self {
            EmbeddingBackend::Cloudflare(_) => "cloudflare",
            EmbeddingBackend::Ollama(_) => "ollama",
            #[cfg(test)]
            EmbeddingBackend::Mock(m) => m.label,
        }
    }

    /// Metered tiers consume quota and honor the session-disable flag.
    pub fn is_metered(&self) -> bool {
        match self {
            EmbeddingBackend::Cloudflare(_) => true,
            EmbeddingBackend::Ollama(_) => false,
            #[cfg(test)]
            EmbeddingBackend::Mock(m) => m.metered,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        match self {
            EmbeddingBackend::Cloudflare(c) => c.embed(text).await,
            EmbeddingBackend::Ollama(o) => o.embed(text).await,
            #[cfg(test)]
            EmbeddingBackend::Mock(m) => m.embed(text),
        }
    }
}

/// Tiered embedding client implementing the domain port.
pub struct EmbeddingClient {
    backends: Vec<EmbeddingBackend>,
    quota: Arc<QuotaTracker>,
    metrics: Arc<MetricsService>,
    remote_disabled: AtomicBool,
    dimension: OnceLock<usize>,
}

impl EmbeddingClient {
    /// Creates a chain over `backends`, in fallback order.
    pub fn new(backends: Vec<EmbeddingBackend>, quota: Arc<QuotaTracker>, metrics: Arc<MetricsService>) -> Self {
        Self {
            backends,
            quota,
            metrics,
            remote_disabled: AtomicBool::new(false),
            dimension: OnceLock::new(),
        }
    }

    /// Disables the metered tier for the rest of the session (the
    /// operator's continue-local-only choice).
    pub fn force_local_only(&self) {
        self.remote_disabled.store(true, Ordering::SeqCst);
    }

    /// True once the metered tier has been disabled for this session.
    pub fn remote_disabled(&self) -> bool {
        self.remote_disabled.load(Ordering::SeqCst)
    }

    /// The dimension fixed by the first successful embedding, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Probes the local tier, if one is configured.
    pub async fn probe_local(&self) -> Option<bool> {
        for backend in &self.backends {
            if let EmbeddingBackend::Ollama(o) = backend {
                return Some(o.probe().await);
            }
        }
        None
    }

    fn validate_dimension(&self, vector: Vec<f32>, provider: &str) -> Result<Vec<f32>, IngestError> {
        let expected = *self.dimension.get_or_init(|| vector.len());
        if vector.len() != expected {
            return Err(IngestError::internal_error(format!(
                "embedding dimension mismatch from {}: got {}, run is fixed at {}",
                provider,
                vector.len(),
                expected
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingService for EmbeddingClient {
    async fn get_embedding(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut remote_failure: Option<IngestError> = None;

        for backend in &self.backends {
            if backend.is_metered() {
                if self.remote_disabled() {
                    continue;
                }
                if self.quota.stats().remaining == 0 {
                    debug!(provider = backend.label(), "daily budget spent, disabling remote tier");
                    self.remote_disabled.store(true, Ordering::SeqCst);
                    remote_failure = Some(IngestError::quota_exhausted("daily remote budget already spent"));
                    continue;
                }

                match backend.embed(text).await {
                    Ok(vector) => {
                        self.quota.incr();
                        return self.validate_dimension(vector, backend.label());
                    }
                    Err(e) if e.is_quota_exhausted() => {
                        warn!(provider = backend.label(), error = %e, "remote quota exhausted, disabling for session");
                        self.remote_disabled.store(true, Ordering::SeqCst);
                        self.metrics.provider_fallbacks().inc();
                        remote_failure = Some(e);
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!(provider = backend.label(), error = %e, "remote embedding failed, trying next tier");
                        self.metrics.provider_fallbacks().inc();
                        remote_failure = Some(e);
                    }
                    // Fatal: malformed request or bad credentials; local
                    // would not help and retrying would not either.
                    Err(e) => return Err(e),
                }
            } else {
                match backend.embed(text).await {
                    Ok(vector) => return self.validate_dimension(vector, backend.label()),
                    Err(local_failure) => {
                        return Err(match remote_failure {
                            Some(remote) => IngestError::transient(format!(
                                "all embedding providers failed: remote: {}; local: {}",
                                remote, local_failure
                            )),
                            None => local_failure,
                        });
                    }
                }
            }
        }

        Err(remote_failure
            .unwrap_or_else(|| IngestError::dependency_missing("no embedding providers configured")))
    }
}
