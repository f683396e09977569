// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Driver
//!
//! The continuous phased loop at the top of the system:
//!
//! ```text
//! INIT -> DEPENDENCY_CHECK -> LOOP -> (QUOTA_DECISION | CANCEL) -> EXIT
//! ```
//!
//! Each LOOP iteration snapshots the quota, processes the existing inbox
//! (Phase A), optionally mines new papers (Phase B, counted by diffing the
//! inbox scan around the miner call), processes what arrived (Phase C),
//! persists the stats ledger, and sleeps five seconds.
//!
//! ## Task Topology
//!
//! Three concurrent tasks communicate over three channels: the signal
//! handler (feeds the broadcast cancellation token), the background
//! iteration task (reports through a oneshot completion channel), and the
//! main task waiting on either. No callbacks, no shared mutable state
//! beyond the ledger's own lock and the quota tracker's atomic.
//!
//! ## Quota Decision
//!
//! When remaining quota drops to the decision threshold the driver consults
//! a [`QuotaDecisionHandler`]: interactive deployments prompt the operator
//! with five choices, automated ones short-circuit to stop. The
//! continue-local-only choice forces the provider chain to skip its remote
//! tier for the rest of the session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use hasher_bootstrap::shutdown::{CancellationToken, ShutdownCoordinator};
use hasher_bootstrap::signals::bind_signals;
use hasher_domain::{IngestError, PaperMiner, WorkflowStats};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::embedding::EmbeddingClient;
use crate::infrastructure::external::OllamaGenerator;
use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::output::{DualFormatWriter, RecordSink};
use crate::infrastructure::stats::{QuotaStats, QuotaTracker, StatsLedger};

use super::file_processor::FileProcessor;

/// Remaining-quota level at which the driver stops looping and asks
const QUOTA_DECISION_THRESHOLD: u64 = 10;

/// Remaining-quota level required before mining new papers
const MINING_QUOTA_FLOOR: u64 = 100;

/// Pause between loop iterations
const LOOP_SLEEP: Duration = Duration::from_secs(5);

/// Operator choices at the quota decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Stop the loop cleanly
    Stop,
    /// Keep processing with the remote tier disabled
    ContinueLocalOnly,
    /// Keep processing with whatever remote quota is left
    ContinueMixed,
    /// Print counters, then ask again
    ShowStats,
    /// Stop the loop cleanly (alias kept distinct for the prompt UI)
    Exit,
}

/// Port for the quota-exhaustion decision point.
#[async_trait]
pub trait QuotaDecisionHandler: Send + Sync {
    async fn decide(&self, stats: &WorkflowStats, quota: QuotaStats) -> QuotaDecision;
}

/// Non-interactive deployments short-circuit to stop.
pub struct AutoStopHandler;

#[async_trait]
impl QuotaDecisionHandler for AutoStopHandler {
    async fn decide(&self, _stats: &WorkflowStats, quota: QuotaStats) -> QuotaDecision {
        info!(used = quota.used, max = quota.max, "quota spent and no operator attached, stopping");
        QuotaDecision::Stop
    }
}

/// Interactive stdin prompt with the five standard choices.
pub struct ConsolePromptHandler;

#[async_trait]
impl QuotaDecisionHandler for ConsolePromptHandler {
    async fn decide(&self, _stats: &WorkflowStats, quota: QuotaStats) -> QuotaDecision {
        println!();
        println!(
            "Remote embedding quota: {} used of {} ({} remaining)",
            quota.used, quota.max, quota.remaining
        );
        println!("  1) stop");
        println!("  2) continue with local embeddings only");
        println!("  3) continue mixed (use remaining remote quota)");
        println!("  4) show stats");
        println!("  5) exit");
        print!("> ");

        let line = tokio::task::spawn_blocking(|| {
            use std::io::{BufRead, Write};
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        let choice = match line {
            Ok(Ok(line)) => line.trim().to_lowercase(),
            _ => String::new(),
        };

        match choice.as_str() {
            "2" | "local" => QuotaDecision::ContinueLocalOnly,
            "3" | "mixed" => QuotaDecision::ContinueMixed,
            "4" | "stats" => QuotaDecision::ShowStats,
            "5" | "exit" => QuotaDecision::Exit,
            // EOF, empty, "1", or anything unparseable: the safe default
            _ => QuotaDecision::Stop,
        }
    }
}

/// Papers the remaining quota can still cover, assuming
/// `per_paper_estimate` embeddings per paper. A remainder of at least the
/// decision threshold still buys one paper.
pub fn estimate_batch_size(remaining: u64, per_paper_estimate: u64) -> usize {
    let estimate = (remaining / per_paper_estimate.max(1)) as usize;
    if estimate == 0 && remaining >= QUOTA_DECISION_THRESHOLD {
        1
    } else {
        estimate
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// The workflow driver. Constructed once at INIT with every collaborator
/// injected; process-wide state (ledger, quota tracker) is shared by
/// reference, never global.
pub struct WorkflowDriver {
    config: AppConfig,
    processor: Arc<FileProcessor>,
    embedder: Arc<EmbeddingClient>,
    quota: Arc<QuotaTracker>,
    ledger: Arc<StatsLedger>,
    miner: Option<Arc<dyn PaperMiner>>,
    generator_probe: Option<Arc<OllamaGenerator>>,
    decision: Arc<dyn QuotaDecisionHandler>,
    metrics: Arc<MetricsService>,
    coordinator: ShutdownCoordinator,
}

impl WorkflowDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        processor: Arc<FileProcessor>,
        embedder: Arc<EmbeddingClient>,
        quota: Arc<QuotaTracker>,
        ledger: Arc<StatsLedger>,
        miner: Option<Arc<dyn PaperMiner>>,
        generator_probe: Option<Arc<OllamaGenerator>>,
        decision: Arc<dyn QuotaDecisionHandler>,
        metrics: Arc<MetricsService>,
        coordinator: ShutdownCoordinator,
    ) -> Self {
        Self {
            config,
            processor,
            embedder,
            quota,
            ledger,
            miner,
            generator_probe,
            decision,
            metrics,
            coordinator,
        }
    }

    /// Runs the driver to completion: dependency check, background loop,
    /// signal handling, and the bounded shutdown drain.
    pub async fn run(self: Arc<Self>) -> Result<(), IngestError> {
        let session = uuid::Uuid::new_v4();
        info!(%session, input = %self.config.input_dir.display(), "workflow driver starting");

        self.dependency_check().await;

        let (sink, writer) = DualFormatWriter::spawn(
            self.config.arrow_path.clone(),
            self.config.json_path.clone(),
            self.config.queue_depth(),
        )?;

        // Signal listener feeding the cancellation token
        let _signals = bind_signals(&self.coordinator);

        // Background iteration task reporting through a oneshot channel
        let token = self.coordinator.token();
        let (done_tx, done_rx) = oneshot::channel();
        let loop_driver = self.clone();
        let loop_token = token.clone();
        let loop_handle = tokio::spawn(async move {
            let result = loop_driver.run_loop(&sink, &loop_token).await;
            let _ = done_tx.send(result);
        });

        let outcome = tokio::select! {
            result = done_rx => {
                match result {
                    Ok(result) => result,
                    Err(_) => Err(IngestError::internal_error("iteration task dropped its completion channel")),
                }
            }
            _ = token.cancelled() => {
                // CANCEL: persist what we have, then give the background
                // task its drain budget.
                if let Err(e) = self.ledger.save() {
                    warn!(error = %e, "failed to save ledger during shutdown");
                }
                match self.coordinator.drain(loop_handle).await {
                    Some(_) => debug!("iteration task drained"),
                    None => warn!("iteration task did not drain within the shutdown budget"),
                }
                Err(IngestError::cancelled("interrupted by signal"))
            }
        };

        if let Err(e) = self.ledger.close() {
            warn!(error = %e, "failed to persist ledger on exit");
        }

        // The loop task owns the only sink clone; once it has returned the
        // writer drains and finalizes. Bounded in case the drain wedges.
        match self.coordinator.drain(writer.finish()).await {
            Some(Ok(stats)) => {
                info!(records = stats.records_written, "output finalized");
                outcome
            }
            Some(Err(e)) => {
                error!(error = %e, "output writer failed");
                // The loop's own error (if any) wins over the writer's
                outcome.and(Err(e))
            }
            None => {
                warn!("output writer did not finalize within the shutdown budget");
                outcome
            }
        }
    }

    /// DEPENDENCY_CHECK: probe the local embedding service (best-effort
    /// start when a serve command is configured) and the generative model.
    /// Failures only downgrade the fallback tier, never abort.
    async fn dependency_check(&self) {
        match self.embedder.probe_local().await {
            Some(true) => info!("local embedding service is up"),
            Some(false) => {
                if let Some(command) = &self.config.embedding.serve_command {
                    info!(command = %command, "local embedding service down, attempting to start it");
                    spawn_detached(command);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                match self.embedder.probe_local().await {
                    Some(true) => info!("local embedding service came up"),
                    _ => warn!("local embedding service unavailable, embeddings degrade to the remote tier only"),
                }
            }
            None => debug!("no local embedding backend configured"),
        }

        if let Some(generator) = &self.generator_probe {
            if generator.probe().await {
                info!("generative endpoint is up");
            } else {
                warn!("generative endpoint unavailable, triple synthesis will rely on deterministic fallback");
            }
        }
    }

    async fn run_loop(&self, sink: &RecordSink, token: &CancellationToken) -> Result<(), IngestError> {
        loop {
            if token.is_cancelled() {
                return Err(IngestError::cancelled("cancelled before iteration"));
            }
            match self.run_once(sink, token).await? {
                LoopControl::Stop => return Ok(()),
                LoopControl::Continue => {}
            }
        }
    }

    /// One LOOP iteration. Public for integration tests, which drive
    /// iterations directly instead of racing the continuous loop.
    pub async fn run_once(&self, sink: &RecordSink, token: &CancellationToken) -> Result<LoopControl, IngestError> {
        // 1. Quota gate
        let quota = self.quota.stats();
        let estimate = estimate_batch_size(quota.remaining, self.config.embedding.per_paper_estimate);
        if quota.remaining <= QUOTA_DECISION_THRESHOLD || estimate == 0 {
            match self.quota_decision().await {
                QuotaDecision::Stop | QuotaDecision::Exit => return Ok(LoopControl::Stop),
                QuotaDecision::ContinueLocalOnly => {
                    info!("continuing with local embeddings only");
                    self.embedder.force_local_only();
                }
                QuotaDecision::ContinueMixed => info!("continuing with remaining remote quota"),
                QuotaDecision::ShowStats => unreachable!("show-stats is resolved inside quota_decision"),
            }
        }

        let mut downloaded = 0u64;
        let mut processed = 0u64;
        let mut embeddings = 0u64;

        // Phase A: process existing inbox
        let pending = self.processor.scan_pending(&self.config.input_dir).await?;
        if self.config.dry_run {
            info!(pending = pending.len(), "dry run: would process these files, stopping");
            return Ok(LoopControl::Stop);
        }
        if !pending.is_empty() {
            let batch = &pending[..pending.len().min(self.config.batch_size)];
            info!(files = batch.len(), "phase A: processing existing files");
            let report = self.processor.process_files(batch, sink, token).await?;
            processed += report.files_processed;
            embeddings += report.embeddings_generated;
            if report.quota_halted {
                debug!("phase A halted on quota exhaustion");
            }
        }

        // Phase B: acquire new papers
        if !token.is_cancelled() && self.config.arxiv.enabled {
            let remaining = self.quota.stats().remaining;
            if remaining > MINING_QUOTA_FLOOR {
                if let Some(miner) = &self.miner {
                    let target = estimate_batch_size(remaining, self.config.embedding.per_paper_estimate)
                        .min(self.config.arxiv.max_papers);
                    if target > 0 {
                        let before = self.processor.count_files(&self.config.input_dir).await.unwrap_or(0);
                        if let Err(e) = miner.mine(target).await {
                            warn!(error = %e, "mining failed, continuing without new papers");
                        }
                        let after = self.processor.count_files(&self.config.input_dir).await.unwrap_or(before);
                        downloaded = after.saturating_sub(before) as u64;
                        self.metrics.papers_downloaded().inc_by(downloaded);
                        info!(downloaded, target, "phase B: mining complete");
                    }
                }
            }
        }

        // Phase C: process what just arrived
        if downloaded > 0 && !token.is_cancelled() {
            let pending = self.processor.scan_pending(&self.config.input_dir).await?;
            if !pending.is_empty() {
                let batch = &pending[..pending.len().min(self.config.batch_size)];
                info!(files = batch.len(), "phase C: processing new files");
                let report = self.processor.process_files(batch, sink, token).await?;
                processed += report.files_processed;
                embeddings += report.embeddings_generated;
            }
        }

        // Persist counters at the iteration boundary
        self.ledger.record_workflow_loop(downloaded, processed, embeddings);
        let quota = self.quota.stats();
        self.ledger.record_quota_usage(quota.used, quota.max);
        if let Err(e) = self.ledger.save() {
            warn!(error = %e, "ledger save failed, will retry at the next boundary");
        }
        self.metrics.workflow_loops().inc();
        debug!(downloaded, processed, embeddings, "iteration complete");

        if quota.remaining > 0 {
            token.sleep(LOOP_SLEEP).await;
        }

        Ok(LoopControl::Continue)
    }

    /// QUOTA_DECISION: consult the handler, resolving show-stats locally.
    async fn quota_decision(&self) -> QuotaDecision {
        loop {
            let decision = self.decision.decide(&self.ledger.snapshot(), self.quota.stats()).await;
            if decision != QuotaDecision::ShowStats {
                return decision;
            }

            let stats = self.ledger.snapshot();
            info!(
                daily_loops = stats.daily.workflow_loops,
                daily_papers = stats.daily.papers_processed,
                daily_embeddings = stats.daily.embeddings_generated,
                total_papers = stats.total.papers_processed,
                total_embeddings = stats.total.embeddings_generated,
                quota_used = stats.cloudflare.used,
                quota_max = stats.cloudflare.max,
                "workflow statistics"
            );
            if let Ok(rendered) = self.metrics.render() {
                println!("{}", rendered);
            }
        }
    }

    /// Input directory this driver scans (handy for tests).
    pub fn input_dir(&self) -> &PathBuf {
        &self.config.input_dir
    }
}

/// Best-effort detached spawn of a service command ("ollama serve").
fn spawn_detached(command: &str) {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else { return };
    match tokio::process::Command::new(program)
        .args(parts)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(_) => debug!(command = %command, "service command spawned"),
        Err(e) => warn!(command = %command, error = %e, "failed to spawn service command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_batch_size_proportional() {
        assert_eq!(estimate_batch_size(5000, 30), 166);
        assert_eq!(estimate_batch_size(300, 30), 10);
        assert_eq!(estimate_batch_size(60, 30), 2);
    }

    #[test]
    fn test_estimate_batch_size_floor() {
        // Under one paper's worth but at least the threshold: one paper
        assert_eq!(estimate_batch_size(29, 30), 1);
        assert_eq!(estimate_batch_size(10, 30), 1);
        // Below the threshold: nothing
        assert_eq!(estimate_batch_size(9, 30), 0);
        assert_eq!(estimate_batch_size(0, 30), 0);
    }

    #[test]
    fn test_estimate_batch_size_custom_divisor() {
        assert_eq!(estimate_batch_size(100, 10), 10);
        // Degenerate divisor clamps instead of dividing by zero
        assert_eq!(estimate_batch_size(100, 0), 100);
    }

    #[tokio::test]
    async fn test_auto_stop_handler() {
        let handler = AutoStopHandler;
        let decision = handler
            .decide(
                &WorkflowStats::new("2024-01-01"),
                QuotaStats {
                    used: 5000,
                    max: 5000,
                    remaining: 0,
                },
            )
            .await;
        assert_eq!(decision, QuotaDecision::Stop);
    }
}
