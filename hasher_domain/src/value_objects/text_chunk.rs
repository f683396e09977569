// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text Chunk Value Object
//!
//! A contiguous, word-aligned slice of extracted document text. Chunks from
//! one document are numbered `0..N-1` in emission order; the index travels
//! with the chunk into the enriched record as its `chunk_id`.
//!
//! Chunks are produced exclusively by [`crate::services::chunking::TextChunker`],
//! which enforces the size bounds (minimum word counts per splitting strategy,
//! hard truncation at 180 words / ~2000 characters).

use serde::{Deserialize, Serialize};

/// A bounded window of document text with its emission-order index.
///
/// Immutable once constructed. The text is guaranteed word-aligned: it never
/// begins or ends in the middle of a whitespace-delimited word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    index: i32,
    text: String,
}

impl TextChunk {
    /// Creates a chunk with the given emission-order index.
    pub fn new(index: i32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Emission-order index within the source document (0-based).
    pub fn index(&self) -> i32 {
        self.index
    }

    /// The chunk text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of whitespace-delimited words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
