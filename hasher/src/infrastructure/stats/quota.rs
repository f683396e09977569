// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Quota Tracker
//!
//! Monotonic counter for remote embedding requests spent today. The provider
//! chain is the only writer (one `incr` per successful remote call, plus one
//! `set` at startup restoring the ledger's persisted value); the workflow
//! driver reads it to drive phase transitions and the quota decision.
//!
//! `used` never decreases within a session. The day-rollover reset happens
//! in the ledger, which the driver then mirrors back here via `set(0)` at
//! startup of the next session.

use std::sync::atomic::{AtomicU64, Ordering};

use hasher_domain::entities::workflow_stats::QuotaCounters;

/// Point-in-time view of the daily request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStats {
    pub used: u64,
    pub max: u64,
    pub remaining: u64,
}

/// Atomic daily-budget counter for the metered embedding tier.
#[derive(Debug)]
pub struct QuotaTracker {
    used: AtomicU64,
    max: u64,
}

impl QuotaTracker {
    /// Creates a tracker with the given daily cap.
    pub fn new(max: u64) -> Self {
        Self {
            used: AtomicU64::new(0),
            max,
        }
    }

    /// Records one spent remote request.
    pub fn incr(&self) {
        self.used.fetch_add(1, Ordering::SeqCst);
    }

    /// Restores the counter at startup from the persisted ledger value.
    pub fn set(&self, used: u64) {
        self.used.store(used, Ordering::SeqCst);
    }

    /// Consistent snapshot of `(used, max, remaining)`.
    pub fn stats(&self) -> QuotaStats {
        let used = self.used.load(Ordering::SeqCst);
        QuotaStats {
            used,
            max: self.max,
            remaining: self.max.saturating_sub(used),
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(QuotaCounters::DEFAULT_MAX)
    }
}
