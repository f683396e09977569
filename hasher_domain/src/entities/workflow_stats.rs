// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Statistics Entity
//!
//! The counters the stats ledger persists across runs: daily and lifetime
//! workflow loops, papers downloaded/processed, embeddings generated, and the
//! remote provider's daily quota state.
//!
//! ## Day Rollover
//!
//! Two independent reset dates govern the daily sections:
//!
//! - `last_reset_date` - when today (process-local `YYYY-MM-DD`) differs,
//!   the `daily` counters are zeroed and the date updated;
//! - `cloudflare_last_reset_date` - when today differs, `cloudflare.used`
//!   is zeroed and the date updated.
//!
//! Lifetime totals are never reset. Rollover is a pure function of the
//! entity plus a date string; the ledger applies it on load and before every
//! mutation, which is what makes the midnight boundary safe regardless of
//! how long a loop iteration straddles it.
//!
//! The JSON field names (including the `cloudflare` section) are a wire
//! contract with existing stats files.

use serde::{Deserialize, Serialize};

/// Counters for one accounting period (a day, or the process lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodCounters {
    #[serde(default)]
    pub workflow_loops: u64,
    #[serde(default)]
    pub papers_downloaded: u64,
    #[serde(default)]
    pub papers_processed: u64,
    #[serde(default)]
    pub embeddings_generated: u64,
}

impl PeriodCounters {
    fn add_loop(&mut self, downloaded: u64, processed: u64, embeddings: u64) {
        self.workflow_loops += 1;
        self.papers_downloaded += downloaded;
        self.papers_processed += processed;
        self.embeddings_generated += embeddings;
    }
}

/// Remote provider daily request budget state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounters {
    #[serde(default)]
    pub used: u64,
    #[serde(default = "QuotaCounters::default_max")]
    pub max: u64,
}

impl QuotaCounters {
    /// Default daily request budget for the remote provider
    pub const DEFAULT_MAX: u64 = 5000;

    fn default_max() -> u64 {
        Self::DEFAULT_MAX
    }
}

impl Default for QuotaCounters {
    fn default() -> Self {
        Self {
            used: 0,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// Persistent workflow counters: daily section, lifetime section, quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub last_reset_date: String,
    pub cloudflare_last_reset_date: String,
    #[serde(default)]
    pub daily: PeriodCounters,
    #[serde(default)]
    pub total: PeriodCounters,
    #[serde(default)]
    pub cloudflare: QuotaCounters,
}

impl WorkflowStats {
    /// Fresh stats anchored at `today` (`YYYY-MM-DD`).
    pub fn new(today: impl Into<String>) -> Self {
        let today = today.into();
        Self {
            last_reset_date: today.clone(),
            cloudflare_last_reset_date: today,
            daily: PeriodCounters::default(),
            total: PeriodCounters::default(),
            cloudflare: QuotaCounters::default(),
        }
    }

    /// Applies day rollover against `today`.
    ///
    /// Returns `true` when either daily section was reset. Totals are
    /// untouched.
    pub fn rollover(&mut self, today: &str) -> bool {
        let mut rolled = false;

        if self.last_reset_date != today {
            self.daily = PeriodCounters::default();
            self.last_reset_date = today.to_string();
            rolled = true;
        }

        if self.cloudflare_last_reset_date != today {
            self.cloudflare.used = 0;
            self.cloudflare_last_reset_date = today.to_string();
            rolled = true;
        }

        rolled
    }

    /// Records one completed workflow loop into both periods.
    pub fn record_loop(&mut self, downloaded: u64, processed: u64, embeddings: u64) {
        self.daily.add_loop(downloaded, processed, embeddings);
        self.total.add_loop(downloaded, processed, embeddings);
    }

    /// Sets the absolute quota state as reported by the provider chain.
    pub fn record_quota(&mut self, used: u64, max: u64) {
        self.cloudflare.used = used;
        self.cloudflare.max = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_loop_feeds_both_periods() {
        let mut stats = WorkflowStats::new("2024-01-01");
        stats.record_loop(3, 2, 17);
        stats.record_loop(0, 1, 4);

        assert_eq!(stats.daily.workflow_loops, 2);
        assert_eq!(stats.daily.papers_downloaded, 3);
        assert_eq!(stats.daily.papers_processed, 3);
        assert_eq!(stats.daily.embeddings_generated, 21);
        assert_eq!(stats.total, stats.daily);
    }

    #[test]
    fn test_rollover_zeroes_daily_only() {
        let mut stats = WorkflowStats::new("2024-01-01");
        stats.record_loop(1, 5, 50);
        stats.record_quota(120, 5000);

        assert!(stats.rollover("2024-01-02"));

        assert_eq!(stats.daily, PeriodCounters::default());
        assert_eq!(stats.total.papers_processed, 5);
        assert_eq!(stats.total.embeddings_generated, 50);
        assert_eq!(stats.cloudflare.used, 0);
        assert_eq!(stats.cloudflare.max, 5000);
        assert_eq!(stats.last_reset_date, "2024-01-02");
        assert_eq!(stats.cloudflare_last_reset_date, "2024-01-02");
    }

    #[test]
    fn test_rollover_same_day_is_noop() {
        let mut stats = WorkflowStats::new("2024-01-01");
        stats.record_loop(0, 1, 2);
        assert!(!stats.rollover("2024-01-01"));
        assert_eq!(stats.daily.papers_processed, 1);
    }

    #[test]
    fn test_independent_quota_reset_date() {
        let mut stats = WorkflowStats::new("2024-01-01");
        stats.cloudflare_last_reset_date = "2023-12-31".to_string();
        stats.record_quota(40, 5000);
        stats.record_loop(0, 1, 1);

        assert!(stats.rollover("2024-01-01"));

        // Quota reset, daily counters kept (their date already matched)
        assert_eq!(stats.cloudflare.used, 0);
        assert_eq!(stats.daily.papers_processed, 1);
    }

    #[test]
    fn test_counter_consistency_after_rollover() {
        let mut stats = WorkflowStats::new("2024-01-01");
        stats.record_loop(2, 2, 9);
        stats.rollover("2024-01-02");
        stats.record_loop(0, 1, 3);

        assert!(stats.total.embeddings_generated >= stats.daily.embeddings_generated);
        assert_eq!(stats.daily.embeddings_generated, 3);
        assert_eq!(stats.total.embeddings_generated, 12);
    }

    #[test]
    fn test_json_wire_names() {
        let stats = WorkflowStats::new("2024-06-30");
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("last_reset_date").is_some());
        assert!(json.get("cloudflare_last_reset_date").is_some());
        assert!(json["daily"].get("workflow_loops").is_some());
        assert!(json["cloudflare"].get("used").is_some());
        assert_eq!(json["cloudflare"]["max"], 5000);
    }

    #[test]
    fn test_missing_sections_default_on_load() {
        let json = r#"{"last_reset_date":"2024-01-01","cloudflare_last_reset_date":"2024-01-01"}"#;
        let stats: WorkflowStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.daily, PeriodCounters::default());
        assert_eq!(stats.cloudflare.max, QuotaCounters::DEFAULT_MAX);
    }
}
