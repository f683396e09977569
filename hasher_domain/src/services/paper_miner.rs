// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Paper Miner Port
//!
//! Boundary to the external arXiv miner, which populates the ingestion inbox
//! with new documents. The miner is idempotent; the driver never trusts its
//! report and instead counts new files by diffing a directory scan before
//! and after the call.

use async_trait::async_trait;

use crate::error::IngestError;

/// Acquires new source documents into the inbox directory.
#[async_trait]
pub trait PaperMiner: Send + Sync {
    /// Mines up to `target` new papers. Errors are reported but the driver
    /// treats mining as best-effort; a failed mine only skips Phase C.
    async fn mine(&self, target: usize) -> Result<(), IngestError>;
}
