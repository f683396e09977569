// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Arrow Record Writer
//!
//! Columnar output over the fixed enriched-record schema, written as an
//! Arrow IPC file. Records are buffered and flushed in small batches; the
//! file footer is written by [`ArrowRecordWriter::finish`], so an
//! interrupted run leaves a truncated file and the next run rewrites it -
//! the checkpoint store, not the output file, is what carries progress
//! across runs.
//!
//! ## Schema
//!
//! One row per record, all fields non-nullable (list items included):
//!
//! | column | type |
//! |---|---|
//! | instruction, input, output, file_name | utf8 |
//! | chunk_id | int32 |
//! | embedding | list&lt;float32&gt; |
//! | tokens | list&lt;utf8&gt; |
//! | token_offsets | list&lt;int32&gt; |
//! | pos_tags, tenses | list&lt;uint8&gt; |
//! | dep_hashes | list&lt;uint32&gt; |

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{Float32Builder, Int32Builder, ListBuilder, StringBuilder, UInt32Builder, UInt8Builder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_ipc::writer::FileWriter;
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use hasher_domain::{EnrichedRecord, IngestError};

/// Rows buffered before a batch is flushed to the IPC stream
const BATCH_ROWS: usize = 64;

fn list_field(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, false)))
}

/// The enriched-record columnar schema (all fields non-nullable).
pub fn enriched_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("instruction", DataType::Utf8, false),
        Field::new("input", DataType::Utf8, false),
        Field::new("output", DataType::Utf8, false),
        Field::new("file_name", DataType::Utf8, false),
        Field::new("chunk_id", DataType::Int32, false),
        Field::new("embedding", list_field(DataType::Float32), false),
        Field::new("tokens", list_field(DataType::Utf8), false),
        Field::new("token_offsets", list_field(DataType::Int32), false),
        Field::new("pos_tags", list_field(DataType::UInt8), false),
        Field::new("tenses", list_field(DataType::UInt8), false),
        Field::new("dep_hashes", list_field(DataType::UInt32), false),
    ]))
}

/// Buffered Arrow IPC writer for enriched records.
pub struct ArrowRecordWriter {
    writer: FileWriter<BufWriter<File>>,
    pending: Vec<EnrichedRecord>,
}

impl ArrowRecordWriter {
    /// Creates the output file (parent directories included) and writes the
    /// IPC header.
    pub fn create(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IngestError::persistence(format!("failed to create output directory {}: {}", parent.display(), e))
            })?;
        }

        let file = File::create(path)
            .map_err(|e| IngestError::persistence(format!("failed to create {}: {}", path.display(), e)))?;
        let writer = FileWriter::try_new(BufWriter::new(file), &enriched_schema())
            .map_err(|e| IngestError::persistence(format!("failed to open arrow writer for {}: {}", path.display(), e)))?;

        Ok(Self {
            writer,
            pending: Vec::with_capacity(BATCH_ROWS),
        })
    }

    /// Buffers one record, flushing a batch when full.
    pub fn append(&mut self, record: &EnrichedRecord) -> Result<(), IngestError> {
        self.pending.push(record.clone());
        if self.pending.len() >= BATCH_ROWS {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Flushes the trailing partial batch and writes the IPC footer.
    pub fn finish(mut self) -> Result<(), IngestError> {
        self.flush_pending()?;
        self.writer
            .finish()
            .map_err(|e| IngestError::persistence(format!("failed to finalize arrow output: {}", e)))
    }

    fn flush_pending(&mut self) -> Result<(), IngestError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = records_to_batch(&self.pending)?;
        self.pending.clear();
        self.writer
            .write(&batch)
            .map_err(|e| IngestError::persistence(format!("failed to write arrow batch: {}", e)))
    }
}

/// Converts a slice of records into one `RecordBatch` over
/// [`enriched_schema`].
pub fn records_to_batch(records: &[EnrichedRecord]) -> Result<RecordBatch, IngestError> {
    let mut instruction = StringBuilder::new();
    let mut input = StringBuilder::new();
    let mut output = StringBuilder::new();
    let mut file_name = StringBuilder::new();
    let mut chunk_id = Int32Builder::new();

    let item = |dt: DataType| Arc::new(Field::new("item", dt, false));
    let mut embedding = ListBuilder::new(Float32Builder::new()).with_field(item(DataType::Float32));
    let mut tokens = ListBuilder::new(StringBuilder::new()).with_field(item(DataType::Utf8));
    let mut token_offsets = ListBuilder::new(Int32Builder::new()).with_field(item(DataType::Int32));
    let mut pos_tags = ListBuilder::new(UInt8Builder::new()).with_field(item(DataType::UInt8));
    let mut tenses = ListBuilder::new(UInt8Builder::new()).with_field(item(DataType::UInt8));
    let mut dep_hashes = ListBuilder::new(UInt32Builder::new()).with_field(item(DataType::UInt32));

    for record in records {
        instruction.append_value(&record.triple.instruction);
        input.append_value(&record.triple.input);
        output.append_value(&record.triple.output);
        file_name.append_value(&record.file_name);
        chunk_id.append_value(record.chunk_id);

        embedding.values().append_slice(&record.embedding);
        embedding.append(true);

        for token in record.sidecar.tokens() {
            tokens.values().append_value(token);
        }
        tokens.append(true);

        token_offsets.values().append_slice(record.sidecar.token_offsets());
        token_offsets.append(true);

        pos_tags.values().append_slice(record.sidecar.pos_tags());
        pos_tags.append(true);

        tenses.values().append_slice(record.sidecar.tenses());
        tenses.append(true);

        dep_hashes.values().append_slice(record.sidecar.dep_hashes());
        dep_hashes.append(true);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(instruction.finish()),
        Arc::new(input.finish()),
        Arc::new(output.finish()),
        Arc::new(file_name.finish()),
        Arc::new(chunk_id.finish()),
        Arc::new(embedding.finish()),
        Arc::new(tokens.finish()),
        Arc::new(token_offsets.finish()),
        Arc::new(pos_tags.finish()),
        Arc::new(tenses.finish()),
        Arc::new(dep_hashes.finish()),
    ];

    RecordBatch::try_new(enriched_schema(), columns)
        .map_err(|e| IngestError::persistence(format!("failed to assemble record batch: {}", e)))
}
