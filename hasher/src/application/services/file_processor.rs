// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Processor
//!
//! One phase's worth of per-file work: scan the inbox, extract text, chunk,
//! enrich, embed, and hand records to the dual-format writer, checkpointing
//! each completed file.
//!
//! ## Worker Pool
//!
//! Files are processed by a fixed pool of N workers pulling paths from one
//! bounded queue (depth 2N); records funnel into the writer's own bounded
//! queue. The pool is an implementation detail of this service - the driver
//! only sees one `process_files` call per phase, and cross-file ordering is
//! not guaranteed. Within one file, records reach the writer in chunk-index
//! order.
//!
//! ## Failure Containment
//!
//! Per-chunk errors (embedding failure, timeout) skip the chunk. Per-file
//! errors (extraction failure, empty text) skip the file. Worker panics are
//! caught at the per-file task boundary, logged with the path, and
//! converted to a skip. Only output-sink failures propagate, because a dead
//! writer makes the whole iteration pointless.
//!
//! ## Quota Exhaustion Mid-File
//!
//! When the provider chain reports the budget spent and no fallback
//! succeeded, the current file halts (keeping what was written, not marked
//! done) and a shared halt flag stops the other workers from starting new
//! files; the driver observes the flag through the report and runs its
//! quota decision.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use hasher_bootstrap::shutdown::CancellationToken;
use hasher_domain::{
    CheckpointRepository, EmbeddingService, EnrichedRecord, IngestError, ProcessedFileMetadata, TextChunker,
    TextExtractor,
};

use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::output::RecordSink;

use super::enrichment::EnrichmentPipeline;

/// Wall-clock budget for one embedding call
pub const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Progress log cadence for unprocessed files found
const SCAN_LOG_EVERY: usize = 100;

/// Progress log cadence for directory entries walked
const WALK_LOG_EVERY: u64 = 1000;

/// Totals for one `process_files` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    /// Files that ran to completion (checkpointed)
    pub files_processed: u64,
    /// Files skipped (extraction failure, per-file error, panic)
    pub files_skipped: u64,
    /// Records written with a non-empty embedding
    pub embeddings_generated: u64,
    /// True when quota exhaustion halted the phase early
    pub quota_halted: bool,
}

impl ProcessingReport {
    fn merge(&mut self, other: ProcessingReport) {
        self.files_processed += other.files_processed;
        self.files_skipped += other.files_skipped;
        self.embeddings_generated += other.embeddings_generated;
        self.quota_halted |= other.quota_halted;
    }
}

/// Outcome of one file.
#[derive(Debug, Default)]
struct FileReport {
    embeddings: u64,
    completed: bool,
    skipped: bool,
    halted: bool,
    cancelled: bool,
}

/// Per-file processing service.
pub struct FileProcessor {
    extractor: Arc<dyn TextExtractor>,
    enrichment: Arc<EnrichmentPipeline>,
    embedder: Arc<dyn EmbeddingService>,
    checkpoints: Arc<dyn CheckpointRepository>,
    chunker: TextChunker,
    metrics: Arc<MetricsService>,
    papers_dir: PathBuf,
    extension: String,
    workers: usize,
}

impl FileProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        enrichment: Arc<EnrichmentPipeline>,
        embedder: Arc<dyn EmbeddingService>,
        checkpoints: Arc<dyn CheckpointRepository>,
        chunker: TextChunker,
        metrics: Arc<MetricsService>,
        papers_dir: PathBuf,
        extension: String,
        workers: usize,
    ) -> Self {
        Self {
            extractor,
            enrichment,
            embedder,
            checkpoints,
            chunker,
            metrics,
            papers_dir,
            extension,
            workers: workers.max(1),
        }
    }

    /// Recursively walks `dir` for documents with the configured extension
    /// that are present in neither checkpoint bucket.
    pub async fn scan_pending(&self, dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let mut pending = Vec::new();
        let mut walked = 0u64;
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| IngestError::io_error(format!("failed to read {}: {}", current.display(), e)))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| IngestError::io_error(format!("failed to walk {}: {}", current.display(), e)))?
            {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }

                walked += 1;
                if walked % WALK_LOG_EVERY == 0 {
                    info!(walked, "scanning inbox");
                }

                if !self.matches_extension(&path) {
                    continue;
                }

                let Some(name) = file_name_of(&path) else { continue };
                if self.checkpoints.is_processed(&name).await? || self.checkpoints.is_metadata_present(&name).await? {
                    continue;
                }

                pending.push(path);
                if pending.len() % SCAN_LOG_EVERY == 0 {
                    info!(found = pending.len(), "unprocessed files found so far");
                }
            }
        }

        pending.sort();
        debug!(pending = pending.len(), walked, "inbox scan complete");
        Ok(pending)
    }

    /// Counts all matching documents under `dir`, processed or not. Used by
    /// the driver to diff the inbox around a mining call.
    pub async fn count_files(&self, dir: &Path) -> Result<usize, IngestError> {
        let mut count = 0usize;
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| IngestError::io_error(format!("failed to read {}: {}", current.display(), e)))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| IngestError::io_error(format!("failed to walk {}: {}", current.display(), e)))?
            {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if self.matches_extension(&path) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    /// Processes `files` through the worker pool, emitting records into
    /// `sink`.
    ///
    /// # Errors
    ///
    /// Only output-sink failures (and internal pool failures) surface; every
    /// other problem is contained per file or per chunk.
    pub async fn process_files(
        self: &Arc<Self>,
        files: &[PathBuf],
        sink: &RecordSink,
        token: &CancellationToken,
    ) -> Result<ProcessingReport, IngestError> {
        if files.is_empty() {
            return Ok(ProcessingReport::default());
        }

        let workers = self.workers.min(files.len());
        let halt = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<PathBuf>(workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        // Feeder: bounded send gives backpressure; cancellation stops the
        // feed and lets workers drain what is already queued.
        let feeder = {
            let token = token.clone();
            let files = files.to_vec();
            tokio::spawn(async move {
                for path in files {
                    match token.run_until_cancelled(tx.send(path)).await {
                        Some(Ok(())) => {}
                        // Cancelled, or every worker is gone
                        _ => break,
                    }
                }
            })
        };

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let this = self.clone();
            let rx = rx.clone();
            let sink = sink.clone();
            let token = token.clone();
            let halt = halt.clone();
            handles.push(tokio::spawn(async move {
                this.worker_loop(worker_id, rx, sink, token, halt).await
            }));
        }

        let mut report = ProcessingReport::default();
        let mut first_error = None;
        for handle in join_all(handles).await {
            match handle {
                Ok(Ok(worker_report)) => report.merge(worker_report),
                Ok(Err(e)) => first_error = first_error.or(Some(e)),
                Err(e) => {
                    error!(error = %e, "worker task failed to join");
                    first_error = first_error.or(Some(IngestError::internal_error(format!(
                        "worker task join failed: {}",
                        e
                    ))));
                }
            }
        }
        feeder.abort();

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn worker_loop(
        self: Arc<Self>,
        worker_id: usize,
        rx: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
        sink: RecordSink,
        token: CancellationToken,
        halt: Arc<AtomicBool>,
    ) -> Result<ProcessingReport, IngestError> {
        let mut report = ProcessingReport::default();

        loop {
            if token.is_cancelled() || halt.load(Ordering::SeqCst) {
                break;
            }

            let path = {
                let mut guard = rx.lock().await;
                token.run_until_cancelled(guard.recv()).await.flatten()
            };
            let Some(path) = path else { break };

            // Per-file task boundary: a panic inside one file becomes a
            // logged skip, not a dead worker.
            let this = self.clone();
            let file_sink = sink.clone();
            let file_token = token.clone();
            let file_halt = halt.clone();
            let file_path = path.clone();
            let outcome =
                tokio::spawn(async move { this.process_one(&file_path, &file_sink, &file_token, &file_halt).await })
                    .await;

            match outcome {
                Ok(Ok(file_report)) => {
                    report.embeddings_generated += file_report.embeddings;
                    if file_report.completed {
                        report.files_processed += 1;
                    }
                    if file_report.skipped {
                        report.files_skipped += 1;
                    }
                    if file_report.halted {
                        report.quota_halted = true;
                    }
                    if file_report.cancelled {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    // Sink failures are iteration-fatal; nothing else
                    // reaches this arm.
                    error!(worker_id, file = %path.display(), error = %e, "fatal error while processing file");
                    return Err(e);
                }
                Err(join_error) => {
                    error!(worker_id, file = %path.display(), error = %join_error, "file task panicked, skipping file");
                    report.files_skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Processes one file end to end. Returns `Err` only for iteration-fatal
    /// failures (output sink); everything else is encoded in the report.
    async fn process_one(
        &self,
        path: &Path,
        sink: &RecordSink,
        token: &CancellationToken,
        halt: &AtomicBool,
    ) -> Result<FileReport, IngestError> {
        let mut report = FileReport::default();
        let Some(file_name) = file_name_of(path) else {
            warn!(file = %path.display(), "unnameable path, skipping");
            report.skipped = true;
            return Ok(report);
        };

        if token.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let text = match self.extractor.extract(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file_name, error = %e, "text extraction failed, skipping file");
                report.skipped = true;
                return Ok(report);
            }
        };
        if text.trim().is_empty() {
            info!(file = %file_name, "extractor produced no text, skipping file");
            report.skipped = true;
            return Ok(report);
        }

        let chunks = self.chunker.chunk_document(&text);
        if chunks.is_empty() {
            // Still checkpointed: re-extracting forever would never yield
            // chunks either.
            info!(file = %file_name, "no valid chunks, marking done");
            self.finalize_file(path, &file_name, None).await;
            report.completed = true;
            return Ok(report);
        }

        debug!(file = %file_name, chunks = chunks.len(), "processing chunks");
        let mut paper_triples = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            if token.is_cancelled() {
                report.cancelled = true;
                return Ok(report);
            }
            if halt.load(Ordering::SeqCst) {
                report.halted = true;
                return Ok(report);
            }

            let triple = self.enrichment.synthesize_triple(chunk.text()).await;
            let interaction = triple.render_interaction();
            let sidecar = self.enrichment.analyze(&interaction).await;

            let embedding = match tokio::time::timeout(EMBEDDING_TIMEOUT, self.embedder.get_embedding(&interaction)).await
            {
                Err(_) => {
                    warn!(file = %file_name, chunk = chunk.index(), "embedding timed out, skipping chunk");
                    self.metrics.embedding_failures().inc();
                    continue;
                }
                Ok(Err(e)) if e.is_quota_exhausted() => {
                    warn!(file = %file_name, chunk = chunk.index(), "quota exhausted mid-file, halting");
                    halt.store(true, Ordering::SeqCst);
                    report.halted = true;
                    return Ok(report);
                }
                Ok(Err(e)) => {
                    warn!(file = %file_name, chunk = chunk.index(), error = %e, "embedding failed, skipping chunk");
                    self.metrics.embedding_failures().inc();
                    continue;
                }
                Ok(Ok(vector)) => vector,
            };

            let record = EnrichedRecord::new(file_name.clone(), chunk.index(), triple.clone(), embedding, sidecar);
            let counted = record.has_embedding();

            // A dead writer is fatal for the whole iteration.
            sink.write(record).await?;

            if counted {
                report.embeddings += 1;
                self.metrics.embeddings_generated().inc();
            }
            paper_triples.push((chunk.index(), triple));
        }

        let artifact = self.write_paper_sidecar(&file_name, &paper_triples).await;
        self.finalize_file(path, &file_name, artifact).await;
        self.metrics.papers_processed().inc();
        report.completed = true;
        Ok(report)
    }

    /// Writes the per-paper JSON artifact; failure only costs the metadata
    /// its artifact reference.
    async fn write_paper_sidecar(&self, file_name: &str, triples: &[(i32, hasher_domain::AlpacaTriple)]) -> Option<String> {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let path = self.papers_dir.join(format!("{}.json", stem));

        let body = serde_json::json!({
            "file_name": file_name,
            "records": triples
                .iter()
                .map(|(chunk_id, triple)| {
                    serde_json::json!({
                        "chunk_id": chunk_id,
                        "instruction": triple.instruction,
                        "input": triple.input,
                        "output": triple.output,
                    })
                })
                .collect::<Vec<_>>(),
        });

        match tokio::fs::write(&path, body.to_string()).await {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(file = %file_name, error = %e, "failed to write paper sidecar");
                None
            }
        }
    }

    /// Checkpoints a completed file. Mutation failures are logged and the
    /// file simply gets retried next run.
    async fn finalize_file(&self, path: &Path, file_name: &str, artifact: Option<String>) {
        let file_size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let mut metadata = ProcessedFileMetadata::new(file_name, chrono::Utc::now(), file_size);
        if let Some(artifact) = artifact {
            metadata = metadata.with_paper_json(artifact);
        }

        if let Err(e) = self.checkpoints.add_metadata(&metadata).await {
            warn!(file = %file_name, error = %e, "failed to store metadata, file will be retried next run");
        }
        if let Err(e) = self.checkpoints.mark_done(file_name).await {
            warn!(file = %file_name, error = %e, "failed to mark done, file will be retried next run");
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_merge() {
        let mut a = ProcessingReport {
            files_processed: 1,
            files_skipped: 0,
            embeddings_generated: 4,
            quota_halted: false,
        };
        a.merge(ProcessingReport {
            files_processed: 2,
            files_skipped: 1,
            embeddings_generated: 3,
            quota_halted: true,
        });
        assert_eq!(a.files_processed, 3);
        assert_eq!(a.files_skipped, 1);
        assert_eq!(a.embeddings_generated, 7);
        assert!(a.quota_halted);
    }
}
