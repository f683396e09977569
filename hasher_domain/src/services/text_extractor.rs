// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text Extractor Port
//!
//! Boundary to the external document-text extractor (a `pdftotext`-style
//! command in production). The extractor is synchronous from the document's
//! point of view; the port is async because the adapter spawns a process.

use async_trait::async_trait;
use std::path::Path;

use crate::error::IngestError;

/// Extracts plain text from one source document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extracts the full text of `path`.
    ///
    /// A non-zero extractor exit is an error; an empty or whitespace-only
    /// result is returned as-is and the caller decides to skip the file.
    async fn extract(&self, path: &Path) -> Result<String, IngestError>;
}
