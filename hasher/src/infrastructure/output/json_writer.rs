// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming JSON Array Writer
//!
//! Writes a single top-level JSON array one record at a time: `[` at open,
//! a comma-newline before every record after the first, `]` on close. The
//! file is valid JSON at close, and trivially diffable between runs because
//! each record occupies one line.
//!
//! The JSON mirror is advisory; the Arrow file is the authoritative format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hasher_domain::{EnrichedRecord, IngestError};

/// Append-only writer for a JSON array of enriched records.
pub struct JsonArrayWriter {
    out: BufWriter<File>,
    records_written: u64,
}

impl JsonArrayWriter {
    /// Creates the file (parent directories included) and writes the
    /// opening bracket.
    pub fn create(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IngestError::persistence(format!("failed to create output directory {}: {}", parent.display(), e))
            })?;
        }

        let file = File::create(path)
            .map_err(|e| IngestError::persistence(format!("failed to create {}: {}", path.display(), e)))?;
        let mut out = BufWriter::new(file);
        out.write_all(b"[")
            .map_err(|e| IngestError::persistence(format!("failed to write {}: {}", path.display(), e)))?;

        Ok(Self {
            out,
            records_written: 0,
        })
    }

    /// Appends one record.
    pub fn append(&mut self, record: &EnrichedRecord) -> Result<(), IngestError> {
        let json = serde_json::to_string(record)?;
        let separator: &[u8] = if self.records_written == 0 { b"\n" } else { b",\n" };

        self.out
            .write_all(separator)
            .and_then(|_| self.out.write_all(json.as_bytes()))
            .map_err(|e| IngestError::persistence(format!("failed to append record: {}", e)))?;

        self.records_written += 1;
        Ok(())
    }

    /// Closes the array and flushes.
    pub fn finish(mut self) -> Result<u64, IngestError> {
        self.out
            .write_all(b"\n]")
            .and_then(|_| self.out.flush())
            .map_err(|e| IngestError::persistence(format!("failed to finalize json output: {}", e)))?;
        Ok(self.records_written)
    }
}
