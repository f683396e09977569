// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Repository Port
//!
//! Durable record of which source files have been fully processed, in two
//! logical buckets:
//!
//! - a **legacy bucket** of processed paths mapped to a sentinel, written by
//!   earlier versions and still honored when filtering the scan;
//! - a **metadata bucket** mapping file name to
//!   [`ProcessedFileMetadata`](crate::value_objects::ProcessedFileMetadata).
//!
//! The scan filter keeps only files present in *neither* bucket.
//!
//! ## Failure Semantics
//!
//! Opening the store is fatal at startup. A failed mutation is logged by the
//! caller and does not stop the file processor: the file will simply be
//! retried next run, which is safe because downstream consumers deduplicate
//! by file name.

use async_trait::async_trait;

use crate::error::IngestError;
use crate::value_objects::processed_file::ProcessedFileMetadata;

/// Persistent map of processed files.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// True when `key` is present in the legacy processed-paths bucket.
    async fn is_processed(&self, key: &str) -> Result<bool, IngestError>;

    /// Marks `key` done in the legacy bucket (idempotent).
    async fn mark_done(&self, key: &str) -> Result<(), IngestError>;

    /// Stores one file's metadata (idempotent on `file_name`).
    async fn add_metadata(&self, metadata: &ProcessedFileMetadata) -> Result<(), IngestError>;

    /// True when `file_name` is present in the metadata bucket.
    async fn is_metadata_present(&self, file_name: &str) -> Result<bool, IngestError>;

    /// All stored metadata entries, unordered.
    async fn list_metadata(&self) -> Result<Vec<ProcessedFileMetadata>, IngestError>;

    /// Admin removal of one file from both buckets.
    async fn remove(&self, file_name: &str) -> Result<(), IngestError>;
}
