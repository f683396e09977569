// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Linguistic Analyzer Port
//!
//! Boundary to the external POS/dependency analyzer. The contract is
//! deliberately forgiving: the analyzer may be missing, crash, or emit
//! garbage, and the pipeline still proceeds with an empty sidecar. Analysis
//! failure must never cost a record its embedding.

use async_trait::async_trait;

use crate::value_objects::linguistic_sidecar::LinguisticSidecar;

/// Derives per-token linguistic features from a text.
#[async_trait]
pub trait LinguisticAnalyzer: Send + Sync {
    /// Analyzes `text` into an aligned sidecar.
    ///
    /// Must not fail: any analyzer-side problem yields
    /// [`LinguisticSidecar::empty`]. Callers truncate their input to the
    /// 50,000-character analysis cap before calling.
    async fn process(&self, text: &str) -> LinguisticSidecar;
}

/// Maximum characters handed to the analyzer in one call
pub const ANALYZER_INPUT_CAP: usize = 50_000;

/// Truncates analyzer input to [`ANALYZER_INPUT_CAP`] on a char boundary.
pub fn cap_analyzer_input(text: &str) -> &str {
    if text.len() <= ANALYZER_INPUT_CAP {
        return text;
    }
    let mut end = ANALYZER_INPUT_CAP;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
