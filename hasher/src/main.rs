// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingestion Driver Binary
//!
//! Thin entry point: parse the CLI, resolve configuration (defaults, TOML
//! file, environment, flags), wire the object graph, and hand control to
//! the workflow driver. Exit codes: 0 success, 1 configuration error, 2
//! interrupted by signal, 3 unrecoverable runtime error.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};

use hasher::application::services::{
    AutoStopHandler, ConsolePromptHandler, EnrichmentPipeline, FileProcessor, QuotaDecisionHandler, WorkflowDriver,
};
use hasher::infrastructure::config::AppConfig;
use hasher::infrastructure::embedding::{CloudflareEmbedder, EmbeddingBackend, EmbeddingClient, OllamaEmbedder};
use hasher::infrastructure::external::{CommandAnalyzer, CommandGenerator, CommandMiner, OllamaGenerator, PdfTextExtractor};
use hasher::infrastructure::metrics::MetricsService;
use hasher::infrastructure::repositories::SqliteCheckpointRepository;
use hasher::infrastructure::stats::{QuotaTracker, StatsLedger};
use hasher_bootstrap::exit_code::ExitCode;
use hasher_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use hasher_bootstrap::platform::resolve_data_dir;
use hasher_bootstrap::shutdown::ShutdownCoordinator;
use hasher_domain::{IngestError, PaperMiner, TextChunker, TextGenerator};

/// Continuous document-ingestion and embedding pipeline
#[derive(Debug, Parser)]
#[command(name = "hasher", version, about)]
struct Cli {
    /// Ingestion inbox directory (default: <data_dir>/documents)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output base path; writes <base>_alpaca.arrow plus a JSON mirror
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-file worker count (default: min(cores, 16))
    #[arg(short, long)]
    workers: Option<usize>,

    /// Sliding-window chunk size in words
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Sliding-window overlap in words
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Maximum files processed per phase pass
    #[arg(long)]
    batch_size: Option<usize>,

    /// Enable arXiv mining (Phase B)
    #[arg(long)]
    arxiv_enable: bool,

    /// Maximum papers per mining call
    #[arg(long)]
    arxiv_max_papers: Option<usize>,

    /// Seconds between miner requests
    #[arg(long)]
    arxiv_delay: Option<u64>,

    /// Scan and report without processing or writing
    #[arg(long)]
    dry_run: bool,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Bootstrap logger covers the window before the subscriber is up
    let boot_logger = ConsoleLogger::with_prefix("hasher");

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        boot_logger.error(&format!("failed to install tracing subscriber: {}", e));
    }

    let exit_code = match run_app(cli).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!(error = %e, category = e.category(), "driver exited with error");
            match e {
                IngestError::InvalidConfiguration(_) => ExitCode::ConfigError,
                IngestError::Cancelled(_) => ExitCode::Interrupted,
                _ => ExitCode::RuntimeError,
            }
        }
    };

    std::process::exit(exit_code.as_i32());
}

async fn run_app(cli: Cli) -> Result<(), IngestError> {
    // === Configuration ===
    let data_dir = resolve_data_dir().map_err(|e| IngestError::invalid_config(e.to_string()))?;
    debug!(data_dir = %data_dir.display(), "resolved application data directory");

    let mut config = AppConfig::from_data_dir(data_dir);
    if let Some(path) = &cli.config {
        config.apply_file(path)?;
    }
    config.apply_env();
    apply_cli(&mut config, &cli);
    config.interactive = config.interactive && std::io::stdin().is_terminal();

    config.validate()?;
    config.ensure_directories()?;

    // === Persistent state ===
    let ledger = Arc::new(StatsLedger::load(&config.stats_file)?);
    let snapshot = ledger.snapshot();
    let quota = Arc::new(QuotaTracker::new(config.embedding.daily_limit));
    quota.set(snapshot.cloudflare.used);
    info!(
        quota_used = snapshot.cloudflare.used,
        quota_max = config.embedding.daily_limit,
        "quota tracker restored from ledger"
    );

    let checkpoints = Arc::new(SqliteCheckpointRepository::open(&config.checkpoint_db).await?);

    // === Services ===
    let metrics = Arc::new(MetricsService::new()?);

    let mut backends = Vec::new();
    if let Some(url) = &config.embedding.remote_url {
        backends.push(EmbeddingBackend::Cloudflare(CloudflareEmbedder::new(
            url.clone(),
            config.embedding.remote_token.clone(),
            config.embedding.remote_model.clone(),
        )?));
    }
    backends.push(EmbeddingBackend::Ollama(OllamaEmbedder::new(
        config.embedding.local_base_url.clone(),
        config.embedding.local_model.clone(),
    )?));
    let embedder = Arc::new(EmbeddingClient::new(backends, quota.clone(), metrics.clone()));

    let analyzer = Arc::new(CommandAnalyzer::new(config.analyzer_command.clone()));

    let mut generators: Vec<Arc<dyn TextGenerator>> = Vec::new();
    if let Some(command) = &config.generation.command {
        generators.push(Arc::new(CommandGenerator::new(command.clone())));
    }
    let ollama_generator = Arc::new(OllamaGenerator::new(
        config.generation.base_url.clone(),
        config.generation.model.clone(),
    )?);
    generators.push(ollama_generator.clone());

    let enrichment = Arc::new(EnrichmentPipeline::new(analyzer, generators));

    let processor = Arc::new(FileProcessor::new(
        Arc::new(PdfTextExtractor::new(config.extractor_command.clone())),
        enrichment,
        embedder.clone(),
        checkpoints,
        TextChunker::new(config.chunk_size, config.chunk_overlap),
        metrics.clone(),
        config.papers_dir.clone(),
        config.extension.clone(),
        config.workers,
    ));

    let miner: Option<Arc<dyn PaperMiner>> = config
        .arxiv
        .command
        .as_ref()
        .map(|command| -> Arc<dyn PaperMiner> {
            Arc::new(CommandMiner::new(
                command.clone(),
                config.input_dir.clone(),
                config.arxiv.delay,
            ))
        });

    let decision: Arc<dyn QuotaDecisionHandler> = if config.interactive {
        Arc::new(ConsolePromptHandler)
    } else {
        Arc::new(AutoStopHandler)
    };

    // === Driver ===
    let coordinator = ShutdownCoordinator::default();
    let driver = Arc::new(WorkflowDriver::new(
        config,
        processor,
        embedder,
        quota,
        ledger,
        miner,
        Some(ollama_generator),
        decision,
        metrics,
        coordinator,
    ));

    driver.run().await
}

fn apply_cli(config: &mut AppConfig, cli: &Cli) {
    if let Some(input) = &cli.input {
        config.input_dir = input.clone();
    }
    if let Some(output) = &cli.output {
        config.set_output_base(output);
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(size) = cli.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = cli.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    if let Some(batch) = cli.batch_size {
        config.batch_size = batch;
    }
    if cli.arxiv_enable {
        config.arxiv.enabled = true;
    }
    if let Some(max) = cli.arxiv_max_papers {
        config.arxiv.max_papers = max;
    }
    if let Some(delay) = cli.arxiv_delay {
        config.arxiv.delay = std::time::Duration::from_secs(delay);
    }
    if cli.dry_run {
        config.dry_run = true;
    }
}
