// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Enriched Record Value Object
//!
//! The unit of output: one chunk together with its Alpaca triple, its dense
//! embedding, and its linguistic sidecar. Both on-disk formats (the Arrow
//! file and the JSON mirror) serialize exactly this logical record, field
//! for field.
//!
//! JSON field order matches the columnar schema: `instruction`, `input`,
//! `output`, `file_name`, `chunk_id`, `embedding`, then the sidecar
//! sequences.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::value_objects::alpaca_triple::AlpacaTriple;
use crate::value_objects::linguistic_sidecar::LinguisticSidecar;

/// One chunk's worth of output: triple + embedding + sidecar.
///
/// The embedding may be empty when the record was produced without a vector
/// (all providers failed but the triple was still worth keeping); only
/// records with a non-empty embedding count toward the embeddings counter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrichedRecord {
    pub file_name: String,
    pub chunk_id: i32,
    #[serde(flatten)]
    pub triple: AlpacaTriple,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub sidecar: LinguisticSidecar,
}

impl EnrichedRecord {
    pub fn new(
        file_name: impl Into<String>,
        chunk_id: i32,
        triple: AlpacaTriple,
        embedding: Vec<f32>,
        sidecar: LinguisticSidecar,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            chunk_id,
            triple,
            embedding,
            sidecar,
        }
    }

    /// True when an embedding was actually produced for this record.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}

// Hand-written serialization pins the flat field layout and order of the
// JSON mirror to the columnar schema.
impl Serialize for EnrichedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("EnrichedRecord", 11)?;
        state.serialize_field("instruction", &self.triple.instruction)?;
        state.serialize_field("input", &self.triple.input)?;
        state.serialize_field("output", &self.triple.output)?;
        state.serialize_field("file_name", &self.file_name)?;
        state.serialize_field("chunk_id", &self.chunk_id)?;
        state.serialize_field("embedding", &self.embedding)?;
        state.serialize_field("tokens", self.sidecar.tokens())?;
        state.serialize_field("token_offsets", self.sidecar.token_offsets())?;
        state.serialize_field("pos_tags", self.sidecar.pos_tags())?;
        state.serialize_field("tenses", self.sidecar.tenses())?;
        state.serialize_field("dep_hashes", self.sidecar.dep_hashes())?;
        state.end()
    }
}
