// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Dual-format writer round-trip tests: every record written to the
//! columnar format reads back with bytewise-equal non-float fields and
//! exactly-equal float sequences, and the JSON mirror deserializes to the
//! same logical records.

use std::fs::File;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type, UInt32Type, UInt8Type};
use arrow_array::Array;
use arrow_ipc::reader::FileReader;
use tempfile::TempDir;

use hasher::infrastructure::output::{enriched_schema, DualFormatWriter};
use hasher_domain::{AlpacaTriple, EnrichedRecord, LinguisticSidecar, PosTag};

fn sample_records(n: i32) -> Vec<EnrichedRecord> {
    (0..n)
        .map(|i| {
            let mut sidecar = LinguisticSidecar::empty();
            sidecar.push_token(format!("tok{}", i), i * 7, PosTag::Noun, "nsubj");
            sidecar.push_token("verbs", i * 7 + 5, PosTag::Verb, "ROOT");
            EnrichedRecord::new(
                format!("paper-{}.pdf", i % 3),
                i,
                AlpacaTriple::new(
                    format!("Explain concept {}.", i),
                    format!("passage {}", i),
                    format!("Concept {} means...", i),
                ),
                vec![i as f32 * 0.5, -1.25, f32::MIN_POSITIVE],
                sidecar,
            )
        })
        .collect()
}

#[tokio::test]
async fn test_arrow_round_trip_exact() {
    let dir = TempDir::new().unwrap();
    let arrow_path = dir.path().join("rt_alpaca.arrow");
    let json_path = dir.path().join("rt_alpaca.json");

    // 100 records spans two batches (batch size 64), exercising the flush path
    let records = sample_records(100);
    let (sink, writer) = DualFormatWriter::spawn(arrow_path.clone(), json_path.clone(), 8).unwrap();
    for record in &records {
        sink.write(record.clone()).await.unwrap();
    }
    drop(sink);
    assert_eq!(writer.finish().await.unwrap().records_written, 100);

    let reader = FileReader::try_new(File::open(&arrow_path).unwrap(), None).unwrap();
    assert_eq!(reader.schema(), enriched_schema());

    let mut row = 0usize;
    for batch in reader {
        let batch = batch.unwrap();
        let instruction = batch.column(0).as_string::<i32>();
        let input = batch.column(1).as_string::<i32>();
        let output = batch.column(2).as_string::<i32>();
        let file_name = batch.column(3).as_string::<i32>();
        let chunk_id = batch.column(4).as_primitive::<Int32Type>();
        let embedding = batch.column(5).as_list::<i32>();
        let tokens = batch.column(6).as_list::<i32>();
        let token_offsets = batch.column(7).as_list::<i32>();
        let pos_tags = batch.column(8).as_list::<i32>();
        let tenses = batch.column(9).as_list::<i32>();
        let dep_hashes = batch.column(10).as_list::<i32>();

        for i in 0..batch.num_rows() {
            let expected = &records[row];
            assert_eq!(instruction.value(i), expected.triple.instruction);
            assert_eq!(input.value(i), expected.triple.input);
            assert_eq!(output.value(i), expected.triple.output);
            assert_eq!(file_name.value(i), expected.file_name);
            assert_eq!(chunk_id.value(i), expected.chunk_id);

            let embedding_row = embedding.value(i);
            let floats = embedding_row.as_primitive::<Float32Type>();
            assert_eq!(floats.len(), expected.embedding.len());
            for (j, value) in expected.embedding.iter().enumerate() {
                // Exact float equality is the round-trip contract
                assert_eq!(floats.value(j).to_bits(), value.to_bits());
            }

            let token_row = tokens.value(i);
            let token_strings = token_row.as_string::<i32>();
            assert_eq!(token_strings.len(), expected.sidecar.len());
            for (j, token) in expected.sidecar.tokens().iter().enumerate() {
                assert_eq!(token_strings.value(j), token.as_str());
            }

            let offsets_row = token_offsets.value(i);
            assert_eq!(
                offsets_row.as_primitive::<Int32Type>().values().as_ref(),
                expected.sidecar.token_offsets()
            );
            let pos_row = pos_tags.value(i);
            assert_eq!(pos_row.as_primitive::<UInt8Type>().values().as_ref(), expected.sidecar.pos_tags());
            let tense_row = tenses.value(i);
            assert_eq!(tense_row.as_primitive::<UInt8Type>().values().as_ref(), expected.sidecar.tenses());
            let dep_row = dep_hashes.value(i);
            assert_eq!(
                dep_row.as_primitive::<UInt32Type>().values().as_ref(),
                expected.sidecar.dep_hashes()
            );

            row += 1;
        }
    }
    assert_eq!(row, records.len());
}

#[tokio::test]
async fn test_json_mirror_matches_arrow_content() {
    let dir = TempDir::new().unwrap();
    let arrow_path = dir.path().join("m_alpaca.arrow");
    let json_path = dir.path().join("m_alpaca.json");

    let records = sample_records(7);
    let (sink, writer) = DualFormatWriter::spawn(arrow_path, json_path.clone(), 4).unwrap();
    for record in &records {
        sink.write(record.clone()).await.unwrap();
    }
    drop(sink);
    writer.finish().await.unwrap();

    let text = std::fs::read_to_string(&json_path).unwrap();
    let mirrored: Vec<EnrichedRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(mirrored, records);
}

#[tokio::test]
async fn test_concurrent_producers_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let (sink, writer) = DualFormatWriter::spawn(
        dir.path().join("p_alpaca.arrow"),
        dir.path().join("p_alpaca.json"),
        4,
    )
    .unwrap();

    let sink = Arc::new(sink);
    let mut handles = Vec::new();
    for producer in 0..4 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                let record = EnrichedRecord::new(
                    format!("p{}.pdf", producer),
                    i,
                    AlpacaTriple::new("i", "in", "out"),
                    vec![0.5],
                    LinguisticSidecar::empty(),
                );
                sink.write(record).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    drop(sink);

    assert_eq!(writer.finish().await.unwrap().records_written, 100);
}
