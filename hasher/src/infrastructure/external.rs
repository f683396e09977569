// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Collaborators
//!
//! Adapters for the processes and endpoints the core consumes through
//! narrow ports: the text extractor, the linguistic analyzer, the
//! generative LLM endpoints, and the arXiv miner.

pub mod analyzer;
pub mod extractor;
pub mod generator;
pub mod miner;

pub use analyzer::CommandAnalyzer;
pub use extractor::PdfTextExtractor;
pub use generator::{CommandGenerator, OllamaGenerator};
pub use miner::CommandMiner;
