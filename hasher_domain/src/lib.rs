// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hasher Domain
//!
//! The domain layer of the hasher document-ingestion pipeline. It holds the
//! business rules and data shapes of the system - chunks, instruction-tuning
//! triples, linguistic sidecars, enriched records, workflow counters - and
//! the ports through which the application reaches infrastructure, entirely
//! independent of databases, HTTP clients, or the filesystem.
//!
//! ## Module Structure
//!
//! - [`value_objects`] - Immutable domain values: [`TextChunk`],
//!   [`AlpacaTriple`], [`PosTag`], [`LinguisticSidecar`], [`EnrichedRecord`],
//!   [`ProcessedFileMetadata`]
//! - [`entities`] - Mutable domain state: [`WorkflowStats`] with its
//!   day-rollover rules
//! - [`services`] - Stateless domain services (text chunking) and async
//!   infrastructure ports (text extraction, linguistic analysis, text
//!   generation, embedding, paper mining)
//! - [`repositories`] - Persistence ports (checkpoint store)
//! - [`error`] - The [`IngestError`] hierarchy shared by every layer
//!
//! ## Design Notes
//!
//! Value objects are self-validating and equality is attribute-based. The
//! one cross-field invariant the pipeline relies on - all five sidecar
//! sequences share one length - is enforced by [`LinguisticSidecar`]'s
//! constructors rather than re-checked by every consumer.
//!
//! Ports that perform I/O are `async` and live here so the application layer
//! depends on abstractions only; concrete adapters (SQLite, reqwest, external
//! commands) live in the application crate's infrastructure layer.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{PeriodCounters, QuotaCounters, WorkflowStats};
pub use error::IngestError;
pub use repositories::CheckpointRepository;
pub use services::chunking::TextChunker;
pub use services::{EmbeddingService, LinguisticAnalyzer, PaperMiner, TextExtractor, TextGenerator};
pub use value_objects::{
    fnv1a_32, AlpacaTriple, EnrichedRecord, LinguisticSidecar, PosTag, ProcessedFileMetadata, TextChunk,
};
