// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processed-File Metadata
//!
//! The durable receipt for one fully processed source file. Created once,
//! when the file processor emits the last record for a file; never mutated;
//! removed only by explicit admin action. Downstream consumers deduplicate
//! by `file_name`, which is what makes at-least-once processing safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of one completed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFileMetadata {
    /// Source file identifier (file name, unique within the inbox)
    pub file_name: String,

    /// When processing completed
    pub processed_at: DateTime<Utc>,

    /// Source file size in bytes
    pub file_size: u64,

    /// Optional path of the side-saved per-paper JSON artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_json: Option<String>,
}

impl ProcessedFileMetadata {
    pub fn new(file_name: impl Into<String>, processed_at: DateTime<Utc>, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            processed_at,
            file_size,
            paper_json: None,
        }
    }

    /// Attaches the per-paper artifact reference.
    pub fn with_paper_json(mut self, path: impl Into<String>) -> Self {
        self.paper_json = Some(path.into());
        self
    }
}
