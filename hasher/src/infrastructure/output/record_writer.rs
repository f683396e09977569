// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dual-Format Writer Task
//!
//! A single writer task owns both output sinks; every record producer holds
//! a clone-able [`RecordSink`] and funnels records through one bounded
//! channel. This keeps file access single-writer (no interleaving, no
//! locks around the IPC stream) while the worker pool produces records
//! concurrently, and the bounded channel gives natural backpressure when
//! disk is slower than embedding.
//!
//! ## Shutdown
//!
//! The writer drains until every sink clone is dropped, then finalizes both
//! files. On cancellation, producers stop sending and drop their sinks; the
//! writer finishes whatever is already queued. A write error kills the task,
//! which producers observe as a closed channel - fatal for the iteration,
//! per the no-retry contract of the output sinks.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use hasher_domain::{EnrichedRecord, IngestError};

use super::arrow_writer::ArrowRecordWriter;
use super::json_writer::JsonArrayWriter;

/// Totals reported by the writer task at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    pub records_written: u64,
}

/// Clone-able producer handle feeding the writer task.
#[derive(Clone)]
pub struct RecordSink {
    tx: mpsc::Sender<EnrichedRecord>,
}

impl RecordSink {
    /// Enqueues one record for both sinks.
    ///
    /// # Errors
    ///
    /// [`IngestError::PersistenceError`] when the writer task has died (its
    /// own write error is returned from [`DualFormatWriter::finish`]).
    pub async fn write(&self, record: EnrichedRecord) -> Result<(), IngestError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| IngestError::persistence("record writer task is no longer accepting records"))
    }
}

/// Handle to the background writer task.
pub struct DualFormatWriter {
    handle: JoinHandle<Result<WriterStats, IngestError>>,
}

impl DualFormatWriter {
    /// Opens both sinks and spawns the writer task.
    ///
    /// `queue_depth` bounds the in-flight record queue (the driver passes
    /// twice the worker count).
    pub fn spawn(arrow_path: PathBuf, json_path: PathBuf, queue_depth: usize) -> Result<(RecordSink, Self), IngestError> {
        let mut arrow = ArrowRecordWriter::create(&arrow_path)?;
        let mut json = JsonArrayWriter::create(&json_path)?;

        let (tx, mut rx) = mpsc::channel::<EnrichedRecord>(queue_depth.max(1));

        let handle = tokio::spawn(async move {
            let mut written = 0u64;
            while let Some(record) = rx.recv().await {
                if let Err(e) = arrow.append(&record).and_then(|_| json.append(&record)) {
                    error!(error = %e, "output sink write failed, aborting writer");
                    return Err(e);
                }
                written += 1;
            }

            arrow.finish()?;
            json.finish()?;
            debug!(records = written, "output sinks finalized");
            Ok(WriterStats { records_written: written })
        });

        Ok((RecordSink { tx }, Self { handle }))
    }

    /// Waits for the writer to drain and finalize. All [`RecordSink`] clones
    /// must be dropped first or this waits forever.
    pub async fn finish(self) -> Result<WriterStats, IngestError> {
        self.handle
            .await
            .map_err(|e| IngestError::internal_error(format!("writer task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hasher_domain::{AlpacaTriple, LinguisticSidecar};
    use tempfile::TempDir;

    fn record(chunk_id: i32) -> EnrichedRecord {
        EnrichedRecord::new(
            "w.pdf",
            chunk_id,
            AlpacaTriple::new("i", "in", "out"),
            vec![1.0],
            LinguisticSidecar::empty(),
        )
    }

    #[tokio::test]
    async fn test_writer_drains_and_counts() {
        let dir = TempDir::new().unwrap();
        let (sink, writer) = DualFormatWriter::spawn(
            dir.path().join("out_alpaca.arrow"),
            dir.path().join("out_alpaca.json"),
            4,
        )
        .unwrap();

        for i in 0..10 {
            sink.write(record(i)).await.unwrap();
        }
        drop(sink);

        let stats = writer.finish().await.unwrap();
        assert_eq!(stats.records_written, 10);
    }

    #[tokio::test]
    async fn test_zero_record_run_finalizes_cleanly() {
        let dir = TempDir::new().unwrap();
        let arrow_path = dir.path().join("empty_alpaca.arrow");
        let json_path = dir.path().join("empty_alpaca.json");
        let (sink, writer) = DualFormatWriter::spawn(arrow_path.clone(), json_path.clone(), 2).unwrap();
        drop(sink);

        let stats = writer.finish().await.unwrap();
        assert_eq!(stats.records_written, 0);
        assert!(arrow_path.exists());
        assert!(json_path.exists());
    }

    #[tokio::test]
    async fn test_cloned_sinks_share_the_writer() {
        let dir = TempDir::new().unwrap();
        let (sink, writer) = DualFormatWriter::spawn(
            dir.path().join("c_alpaca.arrow"),
            dir.path().join("c_alpaca.json"),
            4,
        )
        .unwrap();

        let clone = sink.clone();
        sink.write(record(0)).await.unwrap();
        clone.write(record(1)).await.unwrap();
        drop(sink);
        drop(clone);

        assert_eq!(writer.finish().await.unwrap().records_written, 2);
    }
}
