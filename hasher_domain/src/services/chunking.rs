// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text Chunking Service
//!
//! Splits extracted document text into bounded, word-aligned chunks.
//!
//! ## Strategy
//!
//! Paragraph splitting is preferred: paragraphs read better as instruction
//! inputs and keep sentence boundaries intact. When a document yields too
//! few paragraphs (scanned PDFs often extract as one run-on block), the
//! chunker falls back to a sliding word window with configurable size and
//! overlap.
//!
//! ## Bounds
//!
//! - paragraph fragments under 5 words are discarded;
//! - sliding windows under 10 words are skipped;
//! - every emitted chunk is hard-truncated to 180 words and ~2000
//!   characters, whichever is hit first, always on a word boundary.
//!
//! This is a pure CPU-bound domain service; it performs no I/O.

use crate::value_objects::text_chunk::TextChunk;

/// Minimum words for a paragraph fragment to survive
pub const MIN_PARAGRAPH_WORDS: usize = 5;

/// Minimum words for a sliding window to be emitted
pub const MIN_WINDOW_WORDS: usize = 10;

/// Hard upper bound on chunk length in words
pub const MAX_CHUNK_WORDS: usize = 180;

/// Approximate hard upper bound on chunk length in characters
pub const MAX_CHUNK_CHARS: usize = 2000;

/// Paragraph count below which the window fallback engages
const PARAGRAPH_FALLBACK_THRESHOLD: usize = 5;

/// Word-window chunker configuration and entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Sliding window size in words
    size: usize,
    /// Overlap between consecutive windows in words
    overlap: usize,
}

impl TextChunker {
    /// Default window size in words
    pub const DEFAULT_SIZE: usize = 150;

    /// Default window overlap in words
    pub const DEFAULT_OVERLAP: usize = 30;

    /// Creates a chunker; `overlap` is clamped below `size` so the window
    /// always advances.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        let overlap = overlap.min(size.saturating_sub(1));
        Self { size, overlap }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunks one document: paragraphs first, window fallback when the
    /// document yields fewer than 5 paragraphs. Every chunk is truncated to
    /// the hard bounds and indexed in emission order.
    pub fn chunk_document(&self, text: &str) -> Vec<TextChunk> {
        let paragraphs = paragraph_chunks(text);

        let raw = if paragraphs.len() >= PARAGRAPH_FALLBACK_THRESHOLD {
            paragraphs
        } else {
            self.window_chunks(text)
        };

        raw.into_iter()
            .map(|chunk| truncate_chunk(&chunk))
            .enumerate()
            .map(|(i, text)| TextChunk::new(i as i32, text))
            .collect()
    }

    /// Sliding word windows over the whole text.
    pub fn window_chunks(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.size).min(words.len());
            let window = &words[start..end];
            if window.len() >= MIN_WINDOW_WORDS {
                chunks.push(window.join(" "));
            }
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE, Self::DEFAULT_OVERLAP)
    }
}

/// Splits text into blank-line separated paragraphs, dropping fragments
/// under 5 words.
pub fn paragraph_chunks(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut paragraphs);
        } else {
            current.push(line.trim());
        }
    }
    flush_paragraph(&mut current, &mut paragraphs);

    paragraphs
}

fn flush_paragraph(current: &mut Vec<&str>, out: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let paragraph = current.join(" ");
    current.clear();
    if paragraph.split_whitespace().count() >= MIN_PARAGRAPH_WORDS {
        out.push(paragraph);
    }
}

/// Truncates a chunk to the hard word and character bounds, word-aligned.
fn truncate_chunk(text: &str) -> String {
    let mut result = String::new();
    let mut words = 0;

    for word in text.split_whitespace() {
        if words >= MAX_CHUNK_WORDS {
            break;
        }
        let added = if result.is_empty() { word.len() } else { word.len() + 1 };
        if !result.is_empty() && result.len() + added > MAX_CHUNK_CHARS {
            break;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
        words += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_paragraph_split_on_blank_lines() {
        let text = "one two three four five six\n\nseven eight nine ten eleven\n\n\ntwelve thirteen fourteen fifteen sixteen";
        let paragraphs = paragraph_chunks(text);
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], "one two three four five six");
    }

    #[test]
    fn test_paragraph_discards_short_fragments() {
        let text = "too short\n\nthis paragraph has enough words to survive here";
        let paragraphs = paragraph_chunks(text);
        assert_eq!(paragraphs.len(), 1);
        assert!(paragraphs[0].starts_with("this paragraph"));
    }

    #[test]
    fn test_paragraph_joins_wrapped_lines() {
        let text = "a line that\nwraps onto the next\nline of text";
        let paragraphs = paragraph_chunks(text);
        assert_eq!(paragraphs, vec!["a line that wraps onto the next line of text"]);
    }

    #[test]
    fn test_window_fallback_when_few_paragraphs() {
        // One long paragraph, well under 5 paragraphs: fallback engages
        let text = words(400);
        let chunker = TextChunker::new(100, 20);
        let chunks = chunker.chunk_document(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].index(), 0);
        assert_eq!(chunks[1].index(), 1);
        // Step is size - overlap = 80 words
        assert!(chunks[0].text().starts_with("w0 "));
        assert!(chunks[1].text().starts_with("w80 "));
    }

    #[test]
    fn test_window_skips_short_tail() {
        let chunker = TextChunker::new(100, 0);
        // 105 words: second window is 5 words, below the 10-word minimum
        let chunks = chunker.window_chunks(&words(105));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_window_empty_text() {
        let chunker = TextChunker::default();
        assert!(chunker.window_chunks("").is_empty());
        assert!(chunker.chunk_document("   \n\n  ").is_empty());
    }

    #[test]
    fn test_hard_truncation_at_word_bound() {
        let text = (0..PARAGRAPH_FALLBACK_THRESHOLD)
            .map(|_| words(300))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = TextChunker::default().chunk_document(&text);

        assert_eq!(chunks.len(), PARAGRAPH_FALLBACK_THRESHOLD);
        for chunk in &chunks {
            assert!(chunk.word_count() <= MAX_CHUNK_WORDS);
            assert!(chunk.text().len() <= MAX_CHUNK_CHARS);
        }
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let chunker = TextChunker::new(50, 50);
        assert_eq!(chunker.overlap(), 49);
        // Must terminate despite pathological overlap
        let chunks = chunker.window_chunks(&words(200));
        assert!(!chunks.is_empty());
    }

    proptest! {
        // Every emitted chunk respects the hard bounds and indices are dense
        #[test]
        fn prop_chunk_bounds(
            word_list in proptest::collection::vec("[a-z]{1,12}", 0..600),
            size in 10usize..200,
            overlap in 0usize..100,
        ) {
            let text = word_list.join(" ");
            let chunker = TextChunker::new(size, overlap);
            let chunks = chunker.chunk_document(&text);
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index(), i as i32);
                prop_assert!(chunk.word_count() <= MAX_CHUNK_WORDS);
                prop_assert!(chunk.text().len() <= MAX_CHUNK_CHARS);
            }
        }
    }
}
