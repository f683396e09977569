// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! File processor integration tests over stub collaborators: completion and
//! checkpointing, idempotent rescans, cancellation mid-file, and the
//! quota-halt path.

use std::sync::Arc;

use tempfile::TempDir;

use crate::common::{write_document, FileContentExtractor, StubEmbedder, WordAnalyzer};
use hasher::application::services::{EnrichmentPipeline, FileProcessor};
use hasher::infrastructure::metrics::MetricsService;
use hasher::infrastructure::output::DualFormatWriter;
use hasher::infrastructure::repositories::SqliteCheckpointRepository;
use hasher::infrastructure::stats::QuotaTracker;
use hasher_bootstrap::shutdown::ShutdownCoordinator;
use hasher_domain::{CheckpointRepository, EmbeddingService, EnrichedRecord, TextChunker};

struct Harness {
    processor: Arc<FileProcessor>,
    checkpoints: Arc<SqliteCheckpointRepository>,
    metrics: Arc<MetricsService>,
    inbox: TempDir,
}

/// Builds a processor over the stub collaborators with a `chunk_size`-word
/// non-overlapping window chunker and `workers` workers.
async fn harness(embedder: Arc<dyn EmbeddingService>, chunk_size: usize, workers: usize) -> Harness {
    let inbox = TempDir::new().unwrap();
    let checkpoints = Arc::new(SqliteCheckpointRepository::in_memory().await.unwrap());
    let metrics = Arc::new(MetricsService::new().unwrap());
    let enrichment = Arc::new(EnrichmentPipeline::new(Arc::new(WordAnalyzer), Vec::new()));

    let processor = Arc::new(FileProcessor::new(
        Arc::new(FileContentExtractor),
        enrichment,
        embedder,
        checkpoints.clone(),
        TextChunker::new(chunk_size, 0),
        metrics.clone(),
        inbox.path().join("papers"),
        "pdf".to_string(),
        workers,
    ));
    tokio::fs::create_dir_all(inbox.path().join("papers")).await.unwrap();

    Harness {
        processor,
        checkpoints,
        metrics,
        inbox,
    }
}

fn writer(dir: &TempDir) -> (hasher::infrastructure::output::RecordSink, DualFormatWriter) {
    DualFormatWriter::spawn(
        dir.path().join("out_alpaca.arrow"),
        dir.path().join("out_alpaca.json"),
        8,
    )
    .unwrap()
}

#[tokio::test]
async fn test_single_file_two_chunks_completes_and_checkpoints() {
    let embedder = Arc::new(StubEmbedder::new(384));
    let h = harness(embedder.clone(), 150, 2).await;
    // 300 words in one block: paragraph splitting yields one paragraph, so
    // the 150-word window fallback produces exactly two chunks
    write_document(h.inbox.path(), "a.pdf", 300).await;

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    assert_eq!(pending.len(), 1);

    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.embeddings_generated, 2);
    assert_eq!(stats.records_written, 2);
    assert_eq!(embedder.call_count(), 2);
    assert_eq!(h.metrics.papers_processed().get(), 1);
    assert_eq!(h.metrics.embeddings_generated().get(), 2);

    // Exactly one metadata entry, file marked done in both buckets
    assert!(h.checkpoints.is_processed("a.pdf").await.unwrap());
    let listed = h.checkpoints.list_metadata().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name, "a.pdf");
    assert!(listed[0].file_size > 0);
    assert!(listed[0].paper_json.is_some());

    // Idempotence: a second scan re-emits nothing
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_records_preserve_chunk_order_and_content() {
    let h = harness(Arc::new(StubEmbedder::new(8)), 20, 1).await;
    write_document(h.inbox.path(), "b.pdf", 60).await;

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    out.finish().await.unwrap();

    let text = std::fs::read_to_string(h.inbox.path().join("out_alpaca.json")).unwrap();
    let records: Vec<EnrichedRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.chunk_id, i as i32);
        assert_eq!(record.file_name, "b.pdf");
        assert_eq!(record.embedding.len(), 8);
        // Deterministic fallback synthesis: input is the raw chunk
        assert!(record.triple.input.starts_with(&format!("word{}", i * 20)));
        // Sidecar alignment invariant
        assert_eq!(record.sidecar.tokens().len(), record.sidecar.pos_tags().len());
    }
}

#[tokio::test]
async fn test_cancellation_mid_file_leaves_file_unprocessed() {
    let coordinator = ShutdownCoordinator::default();
    let token = coordinator.token();
    // 1000 words, 20-word chunks: 50 chunks; cancel fires on the 5th call
    let embedder = Arc::new(StubEmbedder::new(16).cancel_after(5, token.clone()));
    let h = harness(embedder.clone(), 20, 1).await;
    write_document(h.inbox.path(), "long.pdf", 1000).await;

    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    out.finish().await.unwrap();

    // At most the first ~5 embeddings were counted, nothing was completed
    assert!(report.embeddings_generated <= 5);
    assert_eq!(report.files_processed, 0);
    assert!(!h.checkpoints.is_processed("long.pdf").await.unwrap());
    assert!(!h.checkpoints.is_metadata_present("long.pdf").await.unwrap());

    // Next run sees the file again, from chunk 0
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_quota_exhaustion_mid_file_halts_without_checkpoint() {
    let quota = Arc::new(QuotaTracker::new(5000));
    // One success (credited to the quota), then exhaustion
    let embedder = Arc::new(StubEmbedder::new(4).exhaust_after(1).with_quota(quota.clone()));
    let h = harness(embedder, 10, 1).await;
    write_document(h.inbox.path(), "c.pdf", 30).await;

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert!(report.quota_halted);
    assert_eq!(report.embeddings_generated, 1);
    assert_eq!(stats.records_written, 1);
    assert_eq!(quota.stats().used, 1);
    // Partial file is preserved but not marked done
    assert!(!h.checkpoints.is_processed("c.pdf").await.unwrap());
}

#[tokio::test]
async fn test_empty_extraction_skips_without_checkpoint() {
    let h = harness(Arc::new(StubEmbedder::new(4)), 50, 1).await;
    tokio::fs::write(h.inbox.path().join("blank.pdf"), "   \n\n  ").await.unwrap();

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    out.finish().await.unwrap();

    assert_eq!(report.files_processed, 0);
    assert_eq!(report.files_skipped, 1);
    assert!(!h.checkpoints.is_processed("blank.pdf").await.unwrap());
}

#[tokio::test]
async fn test_zero_valid_chunks_still_marks_done() {
    let h = harness(Arc::new(StubEmbedder::new(4)), 50, 1).await;
    // Three words: below every chunking minimum, but real text
    tokio::fs::write(h.inbox.path().join("tiny.pdf"), "almost no text").await.unwrap();

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(stats.records_written, 0);
    // Marked done to avoid a re-extraction loop
    assert!(h.checkpoints.is_processed("tiny.pdf").await.unwrap());
}

#[tokio::test]
async fn test_scan_ignores_other_extensions_and_subdirs() {
    let h = harness(Arc::new(StubEmbedder::new(4)), 50, 1).await;
    write_document(h.inbox.path(), "keep.pdf", 30).await;
    write_document(h.inbox.path(), "keep.PDF", 30).await;
    write_document(h.inbox.path(), "skip.txt", 30).await;
    tokio::fs::create_dir_all(h.inbox.path().join("nested")).await.unwrap();
    write_document(&h.inbox.path().join("nested"), "deep.pdf", 30).await;

    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let names: Vec<String> = pending
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(pending.len(), 3);
    assert!(names.contains(&"keep.pdf".to_string()));
    assert!(names.contains(&"keep.PDF".to_string()));
    assert!(names.contains(&"deep.pdf".to_string()));
}

#[tokio::test]
async fn test_worker_pool_processes_many_files() {
    let embedder = Arc::new(StubEmbedder::new(4));
    let h = harness(embedder.clone(), 20, 4).await;
    for i in 0..12 {
        write_document(h.inbox.path(), &format!("f{:02}.pdf", i), 40).await;
    }

    let token = ShutdownCoordinator::default().token();
    let pending = h.processor.scan_pending(h.inbox.path()).await.unwrap();
    let (sink, out) = writer(&h.inbox);
    let report = h.processor.process_files(&pending, &sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(report.files_processed, 12);
    // 40 words / 20-word windows = 2 chunks per file
    assert_eq!(report.embeddings_generated, 24);
    assert_eq!(stats.records_written, 24);
    assert_eq!(h.checkpoints.list_metadata().await.unwrap().len(), 12);
}
