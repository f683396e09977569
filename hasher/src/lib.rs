// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hasher
//!
//! A continuous document-ingestion and embedding pipeline. The system mines
//! a research-paper corpus, extracts text from each document, splits it into
//! bounded chunks, synthesizes Alpaca instruction-tuning triples, produces a
//! dense embedding per record through a prioritized provider chain, and
//! serializes the combined record stream to a columnar Arrow file plus a
//! human-auditable JSON mirror - persisting per-day and per-lifetime
//! counters and a per-file progress log across runs.
//!
//! ## Architecture Overview
//!
//! The workspace follows the domain / application / infrastructure split:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (workflow driver, file processor, enrichment pipeline)    │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (chunks, triples, sidecars, records, stats, ports)        │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (sqlite checkpoints, stats ledger, provider chain,        │
//! │   external commands, dual-format writer, metrics)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Workflow Driver
//! A phased continuous loop: process the existing inbox, optionally mine new
//! papers from arXiv, process those, persist counters, sleep, repeat - until
//! cancelled by signal or until the remote embedding quota forces an
//! operator decision.
//!
//! ### Provider Chain
//! Embeddings come from an ordered fallback list: a remote metered provider
//! with a daily request budget, then a local unmetered one. Transient remote
//! failures fall through silently; quota exhaustion disables the remote tier
//! for the rest of the session.
//!
//! ### Checkpointing
//! Every fully processed file leaves exactly one durable checkpoint entry.
//! Processing is at-least-once; duplicates are filtered downstream by file
//! name, which keeps every mutation here idempotent.

pub mod application;
pub mod infrastructure;

// Re-export commonly used domain types
pub use hasher_domain::{
    AlpacaTriple, EnrichedRecord, IngestError, LinguisticSidecar, PosTag, ProcessedFileMetadata, TextChunk,
    TextChunker, WorkflowStats,
};
