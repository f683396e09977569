// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! Layered configuration for the ingestion driver. Precedence, lowest to
//! highest: built-in defaults anchored at the platform data directory, an
//! optional TOML file (`--config`), environment variables, CLI flags
//! (applied by `main`).
//!
//! ## Environment Variables
//!
//! | Variable | Meaning |
//! |---|---|
//! | `HASHER_DATA_DIR` | overrides the application-data directory |
//! | `CLOUDFLARE_EMBEDDING_URL` | remote embedding endpoint (enables the metered tier) |
//! | `CLOUDFLARE_API_TOKEN` | bearer token for the remote endpoint |
//! | `CLOUDFLARE_DAILY_LIMIT` | remote daily request budget |
//! | `OLLAMA_BASE_URL` | local embedding/generation service base URL |
//! | `HASHER_GEN_MODEL` | generative model identifier for triple synthesis |
//! | `HASHER_MODE` | `batch` forces the non-interactive quota decision |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use hasher_domain::entities::workflow_stats::QuotaCounters;
use hasher_domain::{IngestError, TextChunker};

/// arXiv mining settings.
#[derive(Debug, Clone)]
pub struct ArxivSettings {
    pub enabled: bool,
    pub max_papers: usize,
    pub delay: Duration,
    /// External miner command; mining is skipped when unset
    pub command: Option<String>,
}

impl Default for ArxivSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_papers: 10,
            delay: Duration::from_secs(3),
            command: None,
        }
    }
}

/// Embedding provider chain settings.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// Remote metered endpoint; the remote tier is absent when unset
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub remote_model: String,
    /// Daily request budget for the remote tier
    pub daily_limit: u64,
    pub local_base_url: String,
    pub local_model: String,
    /// Best-effort command to start the local service when the probe fails
    pub serve_command: Option<String>,
    /// Embeddings-per-paper estimate used by `estimate_batch_size`
    pub per_paper_estimate: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote_token: None,
            remote_model: "@cf/baai/bge-base-en-v1.5".to_string(),
            daily_limit: QuotaCounters::DEFAULT_MAX,
            local_base_url: "http://localhost:11434".to_string(),
            local_model: "nomic-embed-text".to_string(),
            serve_command: None,
            per_paper_estimate: 30,
        }
    }
}

/// Triple-synthesis generator settings.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Generative model identifier (strategy S2)
    pub model: String,
    /// External command generator (strategy S1); skipped when unset
    pub command: Option<String>,
    pub base_url: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            command: None,
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Ingestion inbox scanned for new documents
    pub input_dir: PathBuf,
    /// Per-paper JSON sidecar directory
    pub papers_dir: PathBuf,
    /// Columnar output (authoritative)
    pub arrow_path: PathBuf,
    /// JSON mirror output
    pub json_path: PathBuf,
    pub checkpoint_db: PathBuf,
    pub stats_file: PathBuf,
    /// Document extension accepted by the scanner (case-insensitive)
    pub extension: String,
    pub extractor_command: String,
    pub analyzer_command: Option<String>,
    pub workers: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Maximum files handed to the processor per phase pass
    pub batch_size: usize,
    pub dry_run: bool,
    /// Whether the quota decision may prompt the operator
    pub interactive: bool,
    pub arxiv: ArxivSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl AppConfig {
    /// Built-in defaults anchored at `data_dir`.
    pub fn from_data_dir(data_dir: PathBuf) -> Self {
        let input_dir = data_dir.join("documents");
        let papers_dir = data_dir.join("papers");
        let checkpoint_db = data_dir.join("checkpoints").join("checkpoints.db");
        let stats_file = data_dir.join("stats.json");
        let arrow_path = data_dir.join("training_data_alpaca.arrow");
        let json_path = data_dir.join("backup").join("json").join("training_data_alpaca.json");

        Self {
            data_dir,
            input_dir,
            papers_dir,
            arrow_path,
            json_path,
            checkpoint_db,
            stats_file,
            extension: "pdf".to_string(),
            extractor_command: "pdftotext".to_string(),
            analyzer_command: None,
            workers: default_workers(),
            chunk_size: TextChunker::DEFAULT_SIZE,
            chunk_overlap: TextChunker::DEFAULT_OVERLAP,
            batch_size: 32,
            dry_run: false,
            interactive: true,
            arxiv: ArxivSettings::default(),
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
        }
    }

    /// Points both outputs at a new base: `<base>_alpaca.arrow` next to the
    /// base, `<stem>_alpaca.json` under the backup mirror directory.
    pub fn set_output_base(&mut self, base: &Path) {
        let stem = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "training_data".to_string());
        let parent = base.parent().map(Path::to_path_buf).unwrap_or_else(|| self.data_dir.clone());

        self.arrow_path = parent.join(format!("{}_alpaca.arrow", stem));
        self.json_path = self
            .data_dir
            .join("backup")
            .join("json")
            .join(format!("{}_alpaca.json", stem));
    }

    /// Applies overrides from a TOML config file.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), IngestError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IngestError::invalid_config(format!("cannot read config file {}: {}", path.display(), e)))?;
        let overrides: FileOverrides = toml::from_str(&raw)
            .map_err(|e| IngestError::invalid_config(format!("cannot parse config file {}: {}", path.display(), e)))?;
        overrides.apply(self);
        Ok(())
    }

    /// Applies environment-variable overrides.
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_env("CLOUDFLARE_EMBEDDING_URL") {
            self.embedding.remote_url = Some(url);
        }
        if let Some(token) = non_empty_env("CLOUDFLARE_API_TOKEN") {
            self.embedding.remote_token = Some(token);
        }
        if let Some(limit) = non_empty_env("CLOUDFLARE_DAILY_LIMIT").and_then(|v| v.parse().ok()) {
            self.embedding.daily_limit = limit;
        }
        if let Some(base) = non_empty_env("OLLAMA_BASE_URL") {
            self.embedding.local_base_url = base.clone();
            self.generation.base_url = base;
        }
        if let Some(model) = non_empty_env("HASHER_GEN_MODEL") {
            self.generation.model = model;
        }
        if let Some(mode) = non_empty_env("HASHER_MODE") {
            if mode.eq_ignore_ascii_case("batch") || mode.eq_ignore_ascii_case("non-interactive") {
                self.interactive = false;
            }
        }
    }

    /// Validates the configuration; violations are fatal at startup.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.workers == 0 {
            return Err(IngestError::invalid_config("workers must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(IngestError::invalid_config("chunk size must be at least 1 word"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::invalid_config(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(IngestError::invalid_config("batch size must be at least 1"));
        }
        if self.extension.trim().is_empty() {
            return Err(IngestError::invalid_config("document extension must not be empty"));
        }
        if self.embedding.per_paper_estimate == 0 {
            return Err(IngestError::invalid_config("per-paper embedding estimate must be at least 1"));
        }
        Ok(())
    }

    /// Creates every directory the run needs (mkdir-all semantics).
    pub fn ensure_directories(&self) -> Result<(), IngestError> {
        let mut dirs: Vec<&Path> = vec![&self.data_dir, &self.input_dir, &self.papers_dir];
        if let Some(parent) = self.arrow_path.parent() {
            dirs.push(parent);
        }
        if let Some(parent) = self.json_path.parent() {
            dirs.push(parent);
        }
        if let Some(parent) = self.checkpoint_db.parent() {
            dirs.push(parent);
        }
        for dir in dirs {
            std::fs::create_dir_all(dir).map_err(|e| {
                IngestError::invalid_config(format!("cannot create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Writer queue depth: twice the worker count.
    pub fn queue_depth(&self) -> usize {
        self.workers * 2
    }
}

/// Default worker count: available cores capped at 16.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(16)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Partial overrides loaded from the TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverrides {
    input_dir: Option<PathBuf>,
    extension: Option<String>,
    extractor_command: Option<String>,
    analyzer_command: Option<String>,
    workers: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    batch_size: Option<usize>,
    #[serde(default)]
    arxiv: ArxivOverrides,
    #[serde(default)]
    embedding: EmbeddingOverrides,
    #[serde(default)]
    generation: GenerationOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArxivOverrides {
    enabled: Option<bool>,
    max_papers: Option<usize>,
    delay_secs: Option<u64>,
    command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmbeddingOverrides {
    remote_url: Option<String>,
    remote_model: Option<String>,
    daily_limit: Option<u64>,
    local_base_url: Option<String>,
    local_model: Option<String>,
    serve_command: Option<String>,
    per_paper_estimate: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenerationOverrides {
    model: Option<String>,
    command: Option<String>,
    base_url: Option<String>,
}

impl FileOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(v) = self.input_dir {
            config.input_dir = v;
        }
        if let Some(v) = self.extension {
            config.extension = v;
        }
        if let Some(v) = self.extractor_command {
            config.extractor_command = v;
        }
        if let Some(v) = self.analyzer_command {
            config.analyzer_command = Some(v);
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if let Some(v) = self.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = self.chunk_overlap {
            config.chunk_overlap = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }

        if let Some(v) = self.arxiv.enabled {
            config.arxiv.enabled = v;
        }
        if let Some(v) = self.arxiv.max_papers {
            config.arxiv.max_papers = v;
        }
        if let Some(v) = self.arxiv.delay_secs {
            config.arxiv.delay = Duration::from_secs(v);
        }
        if let Some(v) = self.arxiv.command {
            config.arxiv.command = Some(v);
        }

        if let Some(v) = self.embedding.remote_url {
            config.embedding.remote_url = Some(v);
        }
        if let Some(v) = self.embedding.remote_model {
            config.embedding.remote_model = v;
        }
        if let Some(v) = self.embedding.daily_limit {
            config.embedding.daily_limit = v;
        }
        if let Some(v) = self.embedding.local_base_url {
            config.embedding.local_base_url = v;
        }
        if let Some(v) = self.embedding.local_model {
            config.embedding.local_model = v;
        }
        if let Some(v) = self.embedding.serve_command {
            config.embedding.serve_command = Some(v);
        }
        if let Some(v) = self.embedding.per_paper_estimate {
            config.embedding.per_paper_estimate = v;
        }

        if let Some(v) = self.generation.model {
            config.generation.model = v;
        }
        if let Some(v) = self.generation.command {
            config.generation.command = Some(v);
        }
        if let Some(v) = self.generation.base_url {
            config.generation.base_url = v;
        }
    }
}
