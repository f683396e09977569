// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stats Ledger
//!
//! Persistent workflow counters: daily and lifetime sections plus the remote
//! provider's quota state, stored as a single JSON file
//! (`<data_dir>/stats.json`).
//!
//! ## Concurrency
//!
//! A single readers-writer lock protects the whole entry. Writers are the
//! workflow driver (loop records, quota mirror) and nothing else; readers
//! take consistent snapshots for the operator prompt and metrics.
//!
//! ## Day Rollover
//!
//! Rollover runs on load and before every mutation, so a loop iteration
//! straddling midnight attributes its counts to the day it finishes on. The
//! rollover rules themselves live on the domain entity
//! [`WorkflowStats`]; this type only decides *when* to apply them.
//!
//! ## Failure Semantics
//!
//! `save()` failures are returned to the caller, which logs and retries at
//! the next iteration boundary; a lost save costs at most one loop's worth
//! of counter updates.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use hasher_domain::{IngestError, WorkflowStats};

/// Thread-safe persistent workflow statistics.
pub struct StatsLedger {
    inner: RwLock<WorkflowStats>,
    path: PathBuf,
}

impl StatsLedger {
    /// Loads the ledger from `path`, creating a fresh entry when the file
    /// does not exist. Day rollover is applied immediately after load.
    ///
    /// # Errors
    ///
    /// An unreadable or unparseable stats file is a persistence error; the
    /// caller decides whether to abort or start fresh.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let path = path.into();
        let today = today_local();

        let mut stats = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| IngestError::persistence(format!("failed to read stats file {}: {}", path.display(), e)))?;
            serde_json::from_str::<WorkflowStats>(&raw)
                .map_err(|e| IngestError::persistence(format!("failed to parse stats file {}: {}", path.display(), e)))?
        } else {
            debug!(path = %path.display(), "no stats file found, starting fresh");
            WorkflowStats::new(today.clone())
        };

        if stats.rollover(&today) {
            info!(date = %today, "day rollover applied on load, daily counters reset");
        }

        Ok(Self {
            inner: RwLock::new(stats),
            path,
        })
    }

    /// Records one completed workflow loop into both daily and lifetime
    /// sections.
    pub fn record_workflow_loop(&self, downloaded: u64, processed: u64, embeddings: u64) {
        let mut stats = self.inner.write();
        stats.rollover(&today_local());
        stats.record_loop(downloaded, processed, embeddings);
    }

    /// Sets the absolute quota state as observed from the quota tracker.
    pub fn record_quota_usage(&self, used: u64, max: u64) {
        let mut stats = self.inner.write();
        stats.rollover(&today_local());
        stats.record_quota(used, max);
    }

    /// Consistent read of the whole entry.
    pub fn snapshot(&self) -> WorkflowStats {
        self.inner.read().clone()
    }

    /// Persists the entry to disk, creating parent directories as needed
    /// (0755 directories, 0644 file on unix).
    pub fn save(&self) -> Result<(), IngestError> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            create_dirs(parent)?;
        }

        fs::write(&self.path, json)
            .map_err(|e| IngestError::persistence(format!("failed to write stats file {}: {}", self.path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o644));
        }

        Ok(())
    }

    /// Final save on shutdown.
    pub fn close(&self) -> Result<(), IngestError> {
        self.save()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Today's date in process-local time, `YYYY-MM-DD`.
pub fn today_local() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn create_dirs(dir: &Path) -> Result<(), IngestError> {
    fs::create_dir_all(dir)
        .map_err(|e| IngestError::persistence(format!("failed to create directory {}: {}", dir.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o755));
    }

    Ok(())
}
