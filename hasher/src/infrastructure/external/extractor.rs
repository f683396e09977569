// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Text Extractor
//!
//! Adapter over a `pdftotext`-style command: `<command> <path> -` writes the
//! document text to stdout. A non-zero exit is an error; an empty result is
//! returned as-is and the file processor decides to skip. Extraction has no
//! configured timeout (typical runs are seconds) but is cancelled with the
//! process group on shutdown.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use hasher_domain::{IngestError, TextExtractor};

/// Default extractor command
pub const DEFAULT_EXTRACTOR_COMMAND: &str = "pdftotext";

/// Command-line text extractor.
pub struct PdfTextExtractor {
    command: String,
}

impl PdfTextExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXTRACTOR_COMMAND)
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, IngestError> {
        debug!(file = %path.display(), command = %self.command, "extracting text");

        let output = Command::new(&self.command)
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| IngestError::dependency_missing(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::io_error(format!(
                "{} exited with {} for {}: {}",
                self.command,
                output.status,
                path.display(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
