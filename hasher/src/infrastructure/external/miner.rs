// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External arXiv Miner
//!
//! Adapter over the external miner command that populates the ingestion
//! inbox. The miner is invoked as
//! `<command> --output <inbox> --max <target> --delay <secs>` and is
//! idempotent: re-running it never duplicates an already-downloaded paper.
//! The driver does not trust the miner's own accounting; it counts new
//! files by diffing a directory scan before and after the call.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use hasher_domain::{IngestError, PaperMiner};

/// Command-line arXiv miner.
pub struct CommandMiner {
    command: String,
    inbox: PathBuf,
    delay: Duration,
}

impl CommandMiner {
    pub fn new(command: impl Into<String>, inbox: PathBuf, delay: Duration) -> Self {
        Self {
            command: command.into(),
            inbox,
            delay,
        }
    }
}

#[async_trait]
impl PaperMiner for CommandMiner {
    async fn mine(&self, target: usize) -> Result<(), IngestError> {
        info!(command = %self.command, target, "mining new papers");

        let output = Command::new(&self.command)
            .arg("--output")
            .arg(&self.inbox)
            .arg("--max")
            .arg(target.to_string())
            .arg("--delay")
            .arg(self.delay.as_secs().to_string())
            .output()
            .await
            .map_err(|e| IngestError::dependency_missing(format!("failed to run miner {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::transient(format!(
                "miner exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
