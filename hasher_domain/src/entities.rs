// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Mutable domain state with identity persisting through changes.

pub mod workflow_stats;

pub use workflow_stats::{PeriodCounters, QuotaCounters, WorkflowStats};
