// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Linguistic Feature Sidecar
//!
//! Per-token features accompanying every enriched record: token text, start
//! offsets into the analyzed text, coarse POS codes, tense codes (reserved,
//! currently always zero), and 32-bit FNV-1a hashes of the dependency
//! relation labels.
//!
//! The sidecar's single invariant: all five sequences share one length equal
//! to the token count. The type enforces this by construction - tokens are
//! appended atomically through [`LinguisticSidecar::push_token`] and the only
//! bulk constructor validates alignment.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::value_objects::pos_tag::PosTag;

/// FNV-1a offset basis (32-bit)
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1a prime (32-bit)
const FNV_PRIME: u32 = 16_777_619;

/// Computes the 32-bit FNV-1a hash of a dependency-relation label.
///
/// This is a wire contract: downstream consumers join on these hashes, so
/// the algorithm and width are fixed. The hash is stored little-endian in
/// the columnar output (arrow handles byte order; the value itself is what
/// is fixed here).
pub fn fnv1a_32(label: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in label.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Aligned per-token feature sequences for one analyzed text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinguisticSidecar {
    tokens: Vec<String>,
    token_offsets: Vec<i32>,
    pos_tags: Vec<u8>,
    tenses: Vec<u8>,
    dep_hashes: Vec<u32>,
}

impl LinguisticSidecar {
    /// An empty sidecar - the analyzer-unavailable fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a sidecar from pre-assembled sequences, validating alignment.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MalformedInput`] when the sequences disagree on
    /// length; an analyzer emitting ragged output must not produce a record.
    pub fn from_sequences(
        tokens: Vec<String>,
        token_offsets: Vec<i32>,
        pos_tags: Vec<u8>,
        tenses: Vec<u8>,
        dep_hashes: Vec<u32>,
    ) -> Result<Self, IngestError> {
        let len = tokens.len();
        if token_offsets.len() != len || pos_tags.len() != len || tenses.len() != len || dep_hashes.len() != len {
            return Err(IngestError::malformed_input(format!(
                "misaligned sidecar sequences: tokens={}, offsets={}, pos={}, tenses={}, deps={}",
                len,
                token_offsets.len(),
                pos_tags.len(),
                tenses.len(),
                dep_hashes.len()
            )));
        }
        Ok(Self {
            tokens,
            token_offsets,
            pos_tags,
            tenses,
            dep_hashes,
        })
    }

    /// Appends one token's features atomically.
    ///
    /// The tense code is reserved and always written as zero; the dependency
    /// relation is hashed here so callers never handle raw labels.
    pub fn push_token(&mut self, text: impl Into<String>, offset: i32, pos: PosTag, dep_relation: &str) {
        self.tokens.push(text.into());
        self.token_offsets.push(offset);
        self.pos_tags.push(pos.code());
        self.tenses.push(0);
        self.dep_hashes.push(fnv1a_32(dep_relation));
    }

    /// Token count (shared length of all sequences).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn token_offsets(&self) -> &[i32] {
        &self.token_offsets
    }

    pub fn pos_tags(&self) -> &[u8] {
        &self.pos_tags
    }

    pub fn tenses(&self) -> &[u8] {
        &self.tenses
    }

    pub fn dep_hashes(&self) -> &[u32] {
        &self.dep_hashes
    }

    /// Tokens whose POS code matches `tag`, in order.
    pub fn tokens_with_tag(&self, tag: PosTag) -> Vec<&str> {
        self.tokens
            .iter()
            .zip(self.pos_tags.iter())
            .filter(|(_, code)| **code == tag.code())
            .map(|(token, _)| token.as_str())
            .collect()
    }
}
