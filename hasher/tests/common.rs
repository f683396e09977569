// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Stub ports and builders shared by the integration tests. The stubs stand
//! in for every external collaborator so the tests exercise the real
//! orchestration (processor, writer, checkpoints, ledger) without network
//! or subprocess dependencies.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use hasher_bootstrap::shutdown::CancellationToken;
use hasher_domain::{EmbeddingService, IngestError, LinguisticAnalyzer, LinguisticSidecar, PosTag, TextExtractor};

use hasher::infrastructure::stats::QuotaTracker;

/// Extractor that returns the file's own contents as its "extracted text".
pub struct FileContentExtractor;

#[async_trait]
impl TextExtractor for FileContentExtractor {
    async fn extract(&self, path: &Path) -> Result<String, IngestError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IngestError::io_error(format!("cannot read {}: {}", path.display(), e)))
    }
}

/// Deterministic analyzer: whitespace tokens, capitalized words tagged NOUN,
/// words ending in "s" tagged VERB.
pub struct WordAnalyzer;

#[async_trait]
impl LinguisticAnalyzer for WordAnalyzer {
    async fn process(&self, text: &str) -> LinguisticSidecar {
        let mut sidecar = LinguisticSidecar::empty();
        let mut offset = 0i32;
        for word in text.split_whitespace() {
            let pos = if word.chars().next().is_some_and(|c| c.is_uppercase()) {
                PosTag::Noun
            } else if word.ends_with('s') {
                PosTag::Verb
            } else {
                PosTag::Unknown
            };
            sidecar.push_token(word, offset, pos, "dep");
            offset += word.len() as i32 + 1;
        }
        sidecar
    }
}

/// Scriptable embedder: fixed-dimension vectors, optional quota accounting,
/// optional failure injection and cancellation triggering.
pub struct StubEmbedder {
    dimension: usize,
    calls: AtomicU64,
    /// Calls after this many return QuotaExhausted
    exhaust_after: Option<u64>,
    /// Quota tracker credited one unit per success while budget remains
    quota: Option<Arc<QuotaTracker>>,
    /// Token cancelled right after this many calls
    cancel_after: Option<(u64, CancellationToken)>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicU64::new(0),
            exhaust_after: None,
            quota: None,
            cancel_after: None,
        }
    }

    pub fn exhaust_after(mut self, successes: u64) -> Self {
        self.exhaust_after = Some(successes);
        self
    }

    pub fn with_quota(mut self, quota: Arc<QuotaTracker>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn cancel_after(mut self, calls: u64, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for StubEmbedder {
    async fn get_embedding(&self, _text: &str) -> Result<Vec<f32>, IngestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((after, token)) = &self.cancel_after {
            if call == *after {
                token.cancel();
            }
        }

        if let Some(after) = self.exhaust_after {
            if call > after {
                return Err(IngestError::quota_exhausted("stub budget spent"));
            }
        }

        if let Some(quota) = &self.quota {
            if quota.stats().remaining > 0 {
                quota.incr();
            }
        }

        Ok(vec![0.25; self.dimension])
    }
}

/// Writes a document of `words` whitespace-separated words into the inbox.
pub async fn write_document(dir: &Path, name: &str, words: usize) -> std::path::PathBuf {
    let text = (0..words).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
    let path = dir.join(name);
    tokio::fs::write(&path, text).await.unwrap();
    path
}
