// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error hierarchy for the ingestion pipeline
//! domain. Failures are categorized so each call site can make a systematic
//! decision: retry through the provider fallback, skip the offending chunk or
//! file, or abort the iteration.
//!
//! ## Error Categories
//!
//! #### Configuration Errors
//! - **InvalidConfiguration**: Malformed or missing configuration at startup;
//!   fatal, maps to exit code 1
//! - **DependencyMissing**: A required external binary or endpoint is absent;
//!   fatal for that dependency, may only downgrade behavior (e.g. no remote
//!   embeddings means local-only operation)
//!
//! #### Processing Errors
//! - **Transient**: Timeouts, 5xx responses, connection failures. Retried at
//!   the call site (embedding chain fallback) or skipped per-file
//! - **QuotaExhausted**: The remote provider's daily budget is spent. Stops
//!   remote attempts for the session and sends the driver into its quota
//!   decision
//! - **MalformedInput**: Unparseable model output, empty extracted text, or
//!   misaligned analyzer output. The offending unit is skipped and logged
//!
//! #### Infrastructure Errors
//! - **PersistenceError**: Disk write failure on the checkpoint store, stats
//!   ledger, or output sinks
//! - **IoError**: File system and process I/O failures
//! - **SerializationError**: JSON encode/decode failures
//! - **TimeoutError**: Bounded operations exceeding their wall-clock budget
//!
//! #### System Errors
//! - **Cancelled**: Cooperative cancellation; callers save state and return
//! - **InternalError**: Unexpected failures (worker panics, invariant
//!   violations)
//!
//! ## Propagation Policy
//!
//! Per-chunk errors never propagate past the file boundary. Per-file errors
//! never propagate past the iteration boundary. Iteration-level errors cause
//! the driver to return with exit code 3.

use thiserror::Error;

/// Domain-specific errors for the ingestion pipeline.
///
/// Each variant carries a descriptive message. Variants are cloneable so
/// errors can be logged and counted without losing the original.
#[derive(Error, Debug, Clone)]
pub enum IngestError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IngestError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new missing-dependency error
    pub fn dependency_missing(msg: impl Into<String>) -> Self {
        Self::DependencyMissing(msg.into())
    }

    /// Creates a new transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Creates a new quota-exhausted error
    pub fn quota_exhausted(msg: impl Into<String>) -> Self {
        Self::QuotaExhausted(msg.into())
    }

    /// Creates a new malformed-input error
    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Creates a new persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceError(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable by retry or fallback
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::Transient(_) | IngestError::TimeoutError(_) | IngestError::IoError(_)
        )
    }

    /// Checks if the error ends the driver's use of the remote provider
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, IngestError::QuotaExhausted(_))
    }

    /// Checks if the error came from cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled(_))
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            IngestError::InvalidConfiguration(_) => "configuration",
            IngestError::DependencyMissing(_) => "dependency",
            IngestError::Transient(_) => "transient",
            IngestError::QuotaExhausted(_) => "quota",
            IngestError::MalformedInput(_) => "input",
            IngestError::PersistenceError(_) => "persistence",
            IngestError::IoError(_) => "io",
            IngestError::SerializationError(_) => "serialization",
            IngestError::TimeoutError(_) => "timeout",
            IngestError::Cancelled(_) => "cancellation",
            IngestError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::SerializationError(err.to_string())
    }
}
