// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application service exports

pub mod enrichment;
pub mod file_processor;
pub mod workflow;

pub use enrichment::EnrichmentPipeline;
pub use file_processor::{FileProcessor, ProcessingReport};
pub use workflow::{
    estimate_batch_size, AutoStopHandler, ConsolePromptHandler, LoopControl, QuotaDecision, QuotaDecisionHandler,
    WorkflowDriver,
};
