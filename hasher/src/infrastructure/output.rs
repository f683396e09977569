// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Output Layer
//!
//! The dual-format record writer: an Arrow IPC file (authoritative) and a
//! streaming JSON array mirror (human-auditable), fed by a single writer
//! task behind a bounded channel.

pub mod arrow_writer;
pub mod json_writer;
pub mod record_writer;

pub use arrow_writer::{enriched_schema, ArrowRecordWriter};
pub use json_writer::JsonArrayWriter;
pub use record_writer::{DualFormatWriter, RecordSink, WriterStats};
