// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Enrichment Pipeline
//!
//! Per-chunk feature derivation and Alpaca triple synthesis. The pipeline is
//! stateless: it holds references to the linguistic analyzer and an ordered
//! list of generators, and owns nothing that persists across chunks.
//!
//! ## Synthesis Strategies
//!
//! Three prioritized strategies, each producing `{instruction, input,
//! output}`:
//!
//! 1. an external command-style LLM invocation;
//! 2. an HTTP invocation on a local generative model;
//! 3. a deterministic fallback derived from linguistic features -
//!    instruction templated from detected verbs, input = the raw chunk,
//!    output templated from detected nouns. This strategy always succeeds.
//!
//! Strategy 1 and 2 outputs are arbitrary model text; the first balanced
//! `{...}` substring is extracted and parsed as JSON. A parse failure (or
//! a generator error) cascades to the next strategy.

use std::sync::Arc;

use tracing::{debug, warn};

use hasher_domain::services::linguistic_analyzer::cap_analyzer_input;
use hasher_domain::{AlpacaTriple, LinguisticAnalyzer, LinguisticSidecar, PosTag, TextGenerator};

/// Most distinct verbs/nouns carried into the fallback templates
const FALLBACK_TERM_LIMIT: usize = 5;

/// Stateless per-chunk enrichment: analysis + triple synthesis.
pub struct EnrichmentPipeline {
    analyzer: Arc<dyn LinguisticAnalyzer>,
    generators: Vec<Arc<dyn TextGenerator>>,
}

impl EnrichmentPipeline {
    /// Creates a pipeline over an analyzer and generators in strategy order.
    pub fn new(analyzer: Arc<dyn LinguisticAnalyzer>, generators: Vec<Arc<dyn TextGenerator>>) -> Self {
        Self { analyzer, generators }
    }

    /// Derives linguistic features for `text` (input capped at 50,000
    /// characters). Analyzer failure yields an empty sidecar; the chunk
    /// still proceeds.
    pub async fn analyze(&self, text: &str) -> LinguisticSidecar {
        self.analyzer.process(cap_analyzer_input(text)).await
    }

    /// Synthesizes one Alpaca triple for a chunk. Never fails: the
    /// deterministic fallback closes the chain.
    pub async fn synthesize_triple(&self, chunk_text: &str) -> AlpacaTriple {
        let prompt = build_prompt(chunk_text);

        for generator in &self.generators {
            match generator.generate(&prompt).await {
                Ok(text) => match parse_triple(&text) {
                    Some(triple) => {
                        debug!(strategy = generator.label(), "triple synthesized");
                        return triple;
                    }
                    None => {
                        warn!(strategy = generator.label(), "generator output had no parseable triple, cascading");
                    }
                },
                Err(e) => {
                    warn!(strategy = generator.label(), error = %e, "generator failed, cascading");
                }
            }
        }

        self.fallback_triple(chunk_text).await
    }

    /// Strategy S3: deterministic triple from the chunk's own features.
    async fn fallback_triple(&self, chunk_text: &str) -> AlpacaTriple {
        let sidecar = self.analyzer.process(cap_analyzer_input(chunk_text)).await;

        let verbs = distinct_terms(sidecar.tokens_with_tag(PosTag::Verb));
        let mut nouns = distinct_terms(sidecar.tokens_with_tag(PosTag::Noun));
        if nouns.is_empty() {
            nouns = distinct_terms(sidecar.tokens_with_tag(PosTag::Propn));
        }

        let instruction = if verbs.is_empty() {
            "Summarize the key points of the following passage.".to_string()
        } else {
            format!(
                "Explain how the following passage uses the actions \"{}\".",
                verbs.join("\", \"")
            )
        };

        let output = if nouns.is_empty() {
            "The passage offers a general discussion of its subject.".to_string()
        } else {
            format!("The passage examines {}.", nouns.join(", "))
        };

        AlpacaTriple::new(instruction, chunk_text, output)
    }
}

fn build_prompt(chunk_text: &str) -> String {
    format!(
        "You are building an instruction-tuning dataset from research papers. \
         Given the passage below, write one training example. Respond with a \
         single JSON object with exactly the keys \"instruction\", \"input\", \
         and \"output\".\n\nPassage:\n{}",
        chunk_text
    )
}

fn distinct_terms(tokens: Vec<&str>) -> Vec<String> {
    let mut seen = Vec::new();
    for token in tokens {
        let term = token.to_lowercase();
        if term.chars().any(|c| c.is_alphanumeric()) && !seen.contains(&term) {
            seen.push(term);
            if seen.len() == FALLBACK_TERM_LIMIT {
                break;
            }
        }
    }
    seen
}

/// Extracts the first balanced `{...}` substring, honoring JSON strings and
/// escapes so braces inside values do not break the balance count.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses a generator's raw output into a triple. Requires a balanced JSON
/// object with non-empty `instruction` and `output` strings; `input` is
/// optional.
pub fn parse_triple(text: &str) -> Option<AlpacaTriple> {
    let object = extract_json_object(text)?;
    let value: serde_json::Value = serde_json::from_str(object).ok()?;

    let instruction = value.get("instruction")?.as_str()?.trim();
    let output = value.get("output")?.as_str()?.trim();
    if instruction.is_empty() || output.is_empty() {
        return None;
    }
    let input = value.get("input").and_then(|v| v.as_str()).unwrap_or("");

    Some(AlpacaTriple::new(instruction, input, output))
}
