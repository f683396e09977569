// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text Generator Port
//!
//! Boundary to a generative LLM endpoint used for Alpaca triple synthesis.
//! Two shapes exist in production - an external command writing to stdout
//! and an HTTP endpoint - and both return arbitrary text the enrichment
//! pipeline parses for a balanced JSON object.

use async_trait::async_trait;

use crate::error::IngestError;

/// Generates free-form text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Runs one generation. The returned text is unconstrained; parsing is
    /// the caller's responsibility.
    async fn generate(&self, prompt: &str) -> Result<String, IngestError>;

    /// Short label for logs ("command", "ollama").
    fn label(&self) -> &'static str;
}
