// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Store Schema
//!
//! Embedded SQL schema for the checkpoint database. Two tables mirror the
//! store's two logical buckets:
//!
//! - `processed_paths` - the legacy set of processed path keys; the value
//!   column carries only a timestamp sentinel;
//! - `processed_files` - the metadata bucket; entities are stored as a JSON
//!   column keyed by file name, the same entity-as-JSON layout the rest of
//!   the persistence layer uses.
//!
//! Schema creation is idempotent (`IF NOT EXISTS`) and runs at every open.

use sqlx::SqlitePool;

use hasher_domain::IngestError;

/// Legacy processed-paths bucket
pub const CREATE_PROCESSED_PATHS: &str = r#"
CREATE TABLE IF NOT EXISTS processed_paths (
    path TEXT PRIMARY KEY,
    marked_at TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

/// Metadata bucket: file name -> serialized ProcessedFileMetadata
pub const CREATE_PROCESSED_FILES: &str = r#"
CREATE TABLE IF NOT EXISTS processed_files (
    file_name TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    processed_at TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

/// Index for time-ordered listing
pub const CREATE_PROCESSED_FILES_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_processed_files_processed_at
    ON processed_files(processed_at)
"#;

/// Applies the checkpoint schema to the given pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), IngestError> {
    for statement in [CREATE_PROCESSED_PATHS, CREATE_PROCESSED_FILES, CREATE_PROCESSED_FILES_INDEX] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to apply checkpoint schema: {}", e)))?;
    }
    Ok(())
}
