// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Workflow driver integration tests: iteration bookkeeping, the quota
//! decision gate, the continue-local-only path, and dry-run behavior.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::common::{write_document, FileContentExtractor, StubEmbedder, WordAnalyzer};
use hasher::application::services::{
    AutoStopHandler, EnrichmentPipeline, FileProcessor, LoopControl, QuotaDecision, QuotaDecisionHandler,
    WorkflowDriver,
};
use hasher::infrastructure::config::AppConfig;
use hasher::infrastructure::embedding::EmbeddingClient;
use hasher::infrastructure::metrics::MetricsService;
use hasher::infrastructure::output::DualFormatWriter;
use hasher::infrastructure::repositories::SqliteCheckpointRepository;
use hasher::infrastructure::stats::{QuotaTracker, StatsLedger};
use hasher_bootstrap::shutdown::ShutdownCoordinator;
use hasher_domain::{CheckpointRepository, EmbeddingService, TextChunker, WorkflowStats};

/// Always chooses continue-local-only (stands in for the operator).
struct LocalOnlyHandler;

#[async_trait]
impl QuotaDecisionHandler for LocalOnlyHandler {
    async fn decide(&self, _stats: &WorkflowStats, _quota: hasher::infrastructure::stats::QuotaStats) -> QuotaDecision {
        QuotaDecision::ContinueLocalOnly
    }
}

struct Harness {
    driver: WorkflowDriver,
    ledger: Arc<StatsLedger>,
    quota: Arc<QuotaTracker>,
    embedder: Arc<EmbeddingClient>,
    checkpoints: Arc<SqliteCheckpointRepository>,
    coordinator: ShutdownCoordinator,
    _data: TempDir,
}

async fn harness(
    quota_max: u64,
    quota_used: u64,
    decision: Arc<dyn QuotaDecisionHandler>,
    dry_run: bool,
) -> Harness {
    let data = TempDir::new().unwrap();
    let mut config = AppConfig::from_data_dir(data.path().to_path_buf());
    config.workers = 1;
    config.chunk_size = 20;
    config.chunk_overlap = 0;
    config.dry_run = dry_run;
    config.interactive = false;
    config.ensure_directories().unwrap();

    let ledger = Arc::new(StatsLedger::load(&config.stats_file).unwrap());
    let quota = Arc::new(QuotaTracker::new(quota_max));
    quota.set(quota_used);

    let metrics = Arc::new(MetricsService::new().unwrap());
    let checkpoints = Arc::new(SqliteCheckpointRepository::in_memory().await.unwrap());
    let enrichment = Arc::new(EnrichmentPipeline::new(Arc::new(WordAnalyzer), Vec::new()));
    let stub: Arc<dyn EmbeddingService> = Arc::new(StubEmbedder::new(8));

    let processor = Arc::new(FileProcessor::new(
        Arc::new(FileContentExtractor),
        enrichment,
        stub,
        checkpoints.clone(),
        TextChunker::new(config.chunk_size, config.chunk_overlap),
        metrics.clone(),
        config.papers_dir.clone(),
        config.extension.clone(),
        config.workers,
    ));

    // No HTTP backends: the chain is only consulted for tier control here
    let embedder = Arc::new(EmbeddingClient::new(Vec::new(), quota.clone(), metrics.clone()));
    let coordinator = ShutdownCoordinator::default();

    let driver = WorkflowDriver::new(
        config,
        processor,
        embedder.clone(),
        quota.clone(),
        ledger.clone(),
        None,
        None,
        decision,
        metrics,
        coordinator.clone(),
    );

    Harness {
        driver,
        ledger,
        quota,
        embedder,
        checkpoints,
        coordinator,
        _data: data,
    }
}

fn writer(h: &Harness) -> (hasher::infrastructure::output::RecordSink, DualFormatWriter) {
    DualFormatWriter::spawn(
        h._data.path().join("t_alpaca.arrow"),
        h._data.path().join("t_alpaca.json"),
        4,
    )
    .unwrap()
}

#[tokio::test]
async fn test_cold_start_records_one_empty_loop() {
    // Empty inbox, full quota, no miner. Cancel before the iteration's
    // sleep so the test returns immediately.
    let h = harness(5000, 0, Arc::new(AutoStopHandler), false).await;
    let (sink, out) = writer(&h);
    let token = h.coordinator.token();
    token.cancel();

    let control = h.driver.run_once(&sink, &token).await.unwrap();
    drop(sink);
    out.finish().await.unwrap();

    assert_eq!(control, LoopControl::Continue);
    let stats = h.ledger.snapshot();
    assert_eq!(stats.daily.workflow_loops, 1);
    assert_eq!(stats.daily.papers_processed, 0);
    assert_eq!(stats.daily.embeddings_generated, 0);
    assert_eq!(stats.cloudflare.used, 0);
    // Persisted at the iteration boundary
    assert!(h.ledger.path().exists());
    // Checkpoint store untouched
    assert!(h.checkpoints.list_metadata().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_quota_stops_without_processing() {
    let h = harness(5000, 5000, Arc::new(AutoStopHandler), false).await;
    write_document(h.driver.input_dir(), "pending.pdf", 40).await;

    let (sink, out) = writer(&h);
    let token = h.coordinator.token();
    let control = h.driver.run_once(&sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(control, LoopControl::Stop);
    assert_eq!(stats.records_written, 0);
    // Nothing recorded, nothing checkpointed
    assert_eq!(h.ledger.snapshot().daily.workflow_loops, 0);
    assert!(!h.checkpoints.is_processed("pending.pdf").await.unwrap());
}

#[tokio::test]
async fn test_continue_local_only_processes_and_disables_remote() {
    // Quota spent, but the operator chooses local-only processing
    let h = harness(5, 5, Arc::new(LocalOnlyHandler), false).await;
    write_document(h.driver.input_dir(), "doc.pdf", 40).await;

    let (sink, out) = writer(&h);
    let token = h.coordinator.token();
    let control = h.driver.run_once(&sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(control, LoopControl::Continue);
    assert!(h.embedder.remote_disabled());
    // 40 words / 20-word windows = 2 records
    assert_eq!(stats.records_written, 2);

    let snapshot = h.ledger.snapshot();
    assert_eq!(snapshot.daily.workflow_loops, 1);
    assert_eq!(snapshot.daily.papers_processed, 1);
    assert_eq!(snapshot.daily.embeddings_generated, 2);
    // Quota snapshot mirrored into the ledger unchanged
    assert_eq!(snapshot.cloudflare.used, 5);
    assert_eq!(snapshot.cloudflare.max, 5);
    assert!(h.checkpoints.is_processed("doc.pdf").await.unwrap());
}

#[tokio::test]
async fn test_dry_run_scans_but_writes_nothing() {
    let h = harness(5000, 0, Arc::new(AutoStopHandler), true).await;
    write_document(h.driver.input_dir(), "would.pdf", 40).await;

    let (sink, out) = writer(&h);
    let token = h.coordinator.token();
    let control = h.driver.run_once(&sink, &token).await.unwrap();
    drop(sink);
    let stats = out.finish().await.unwrap();

    assert_eq!(control, LoopControl::Stop);
    assert_eq!(stats.records_written, 0);
    assert!(!h.checkpoints.is_processed("would.pdf").await.unwrap());
    assert_eq!(h.quota.stats().used, 0);
}

#[tokio::test]
async fn test_second_iteration_skips_processed_files() {
    let h = harness(5, 5, Arc::new(LocalOnlyHandler), false).await;
    write_document(h.driver.input_dir(), "once.pdf", 40).await;

    let (sink, out) = writer(&h);
    let token = h.coordinator.token();
    h.driver.run_once(&sink, &token).await.unwrap();
    let first = h.ledger.snapshot();
    assert_eq!(first.daily.papers_processed, 1);

    // Second iteration: same inbox, nothing new to do
    h.driver.run_once(&sink, &token).await.unwrap();
    drop(sink);
    out.finish().await.unwrap();

    let second = h.ledger.snapshot();
    assert_eq!(second.daily.workflow_loops, 2);
    assert_eq!(second.daily.papers_processed, 1);
    assert_eq!(second.total.papers_processed, 1);
}
