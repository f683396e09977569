// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Checkpoint Repository
//!
//! Embedded, crash-safe implementation of the checkpoint store over a
//! `sqlx::SqlitePool`. Every mutation is a single-statement transaction, so
//! readers never observe a half-written entry, and SQLite's commit gives the
//! durability the idempotence story depends on.
//!
//! ## Failure Semantics
//!
//! - `open` failure is fatal at startup (no checkpoint store means every
//!   run would re-emit every record);
//! - mutation failures are surfaced to the caller, which logs and continues;
//!   the un-checkpointed file is simply retried next run and downstream
//!   consumers deduplicate by file name.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use hasher_domain::{CheckpointRepository, IngestError, ProcessedFileMetadata};

use super::schema;

/// SQLite-backed checkpoint store.
pub struct SqliteCheckpointRepository {
    pool: SqlitePool,
}

impl SqliteCheckpointRepository {
    /// Opens (and creates, if missing) the checkpoint database at `path`.
    ///
    /// Parent directories are created with mkdir-all semantics. WAL journal
    /// mode keeps readers unblocked while the processor marks files done.
    pub async fn open(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IngestError::persistence(format!("failed to create checkpoint directory {}: {}", parent.display(), e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                IngestError::persistence(format!("failed to open checkpoint database {}: {}", path.display(), e))
            })?;

        let repo = Self { pool };
        schema::ensure_schema(&repo.pool).await?;
        Ok(repo)
    }

    /// In-memory store for tests.
    ///
    /// The pool is pinned to one long-lived connection: every `:memory:`
    /// connection is its own database, so a second connection would see
    /// empty tables.
    pub async fn in_memory() -> Result<Self, IngestError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(":memory:")
            .await
            .map_err(|e| IngestError::persistence(format!("failed to create in-memory checkpoint store: {}", e)))?;
        let repo = Self { pool };
        schema::ensure_schema(&repo.pool).await?;
        Ok(repo)
    }
}

#[async_trait]
impl CheckpointRepository for SqliteCheckpointRepository {
    async fn is_processed(&self, key: &str) -> Result<bool, IngestError> {
        let row = sqlx::query("SELECT 1 FROM processed_paths WHERE path = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to query processed_paths: {}", e)))?;
        Ok(row.is_some())
    }

    async fn mark_done(&self, key: &str) -> Result<(), IngestError> {
        sqlx::query("INSERT OR IGNORE INTO processed_paths (path) VALUES (?)")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to mark {} done: {}", key, e)))?;
        Ok(())
    }

    async fn add_metadata(&self, metadata: &ProcessedFileMetadata) -> Result<(), IngestError> {
        let data = serde_json::to_string(metadata)?;
        sqlx::query("INSERT OR REPLACE INTO processed_files (file_name, data, processed_at) VALUES (?, ?, ?)")
            .bind(&metadata.file_name)
            .bind(&data)
            .bind(metadata.processed_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to store metadata for {}: {}", metadata.file_name, e)))?;
        Ok(())
    }

    async fn is_metadata_present(&self, file_name: &str) -> Result<bool, IngestError> {
        let row = sqlx::query("SELECT 1 FROM processed_files WHERE file_name = ?")
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to query processed_files: {}", e)))?;
        Ok(row.is_some())
    }

    async fn list_metadata(&self) -> Result<Vec<ProcessedFileMetadata>, IngestError> {
        let rows = sqlx::query("SELECT data FROM processed_files")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to list processed_files: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.get("data");
            entries.push(serde_json::from_str(&data)?);
        }
        Ok(entries)
    }

    async fn remove(&self, file_name: &str) -> Result<(), IngestError> {
        sqlx::query("DELETE FROM processed_files WHERE file_name = ?")
            .bind(file_name)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to remove metadata for {}: {}", file_name, e)))?;
        sqlx::query("DELETE FROM processed_paths WHERE path = ?")
            .bind(file_name)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::persistence(format!("failed to remove path entry for {}: {}", file_name, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mark_done_and_is_processed() {
        let repo = SqliteCheckpointRepository::in_memory().await.unwrap();
        assert!(!repo.is_processed("a.pdf").await.unwrap());

        repo.mark_done("a.pdf").await.unwrap();
        assert!(repo.is_processed("a.pdf").await.unwrap());

        // Idempotent
        repo.mark_done("a.pdf").await.unwrap();
        assert!(repo.is_processed("a.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let repo = SqliteCheckpointRepository::in_memory().await.unwrap();
        let meta = ProcessedFileMetadata::new("b.pdf", Utc::now(), 2048).with_paper_json("papers/b.json");

        repo.add_metadata(&meta).await.unwrap();
        assert!(repo.is_metadata_present("b.pdf").await.unwrap());

        let listed = repo.list_metadata().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], meta);
    }

    #[tokio::test]
    async fn test_exactly_one_entry_per_file() {
        let repo = SqliteCheckpointRepository::in_memory().await.unwrap();
        let first = ProcessedFileMetadata::new("c.pdf", Utc::now(), 1);
        let second = ProcessedFileMetadata::new("c.pdf", Utc::now(), 2);

        repo.add_metadata(&first).await.unwrap();
        repo.add_metadata(&second).await.unwrap();

        let listed = repo.list_metadata().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_size, 2);
    }

    #[tokio::test]
    async fn test_remove_clears_both_buckets() {
        let repo = SqliteCheckpointRepository::in_memory().await.unwrap();
        repo.mark_done("d.pdf").await.unwrap();
        repo.add_metadata(&ProcessedFileMetadata::new("d.pdf", Utc::now(), 7))
            .await
            .unwrap();

        repo.remove("d.pdf").await.unwrap();

        assert!(!repo.is_processed("d.pdf").await.unwrap());
        assert!(!repo.is_metadata_present("d.pdf").await.unwrap());
        assert!(repo.list_metadata().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buckets_are_independent() {
        let repo = SqliteCheckpointRepository::in_memory().await.unwrap();
        repo.mark_done("legacy.pdf").await.unwrap();

        assert!(repo.is_processed("legacy.pdf").await.unwrap());
        assert!(!repo.is_metadata_present("legacy.pdf").await.unwrap());
    }
}
