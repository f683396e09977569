// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Provider Chain
//!
//! Tiered fallback over embedding backends: a remote metered provider with a
//! daily request budget, then a local unmetered one.

pub mod chain;
pub mod cloudflare;
pub mod ollama;

pub use chain::{EmbeddingBackend, EmbeddingClient};
pub use cloudflare::CloudflareEmbedder;
pub use ollama::OllamaEmbedder;
