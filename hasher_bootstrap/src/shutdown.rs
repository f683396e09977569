// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Cancellation plumbing for the workflow driver's three-task topology:
//! the signal listener cancels, the background iteration task and the
//! writer drain, the main task enforces the budget.
//!
//! ## Shape
//!
//! - [`CancellationToken`] - the broadcast cancellation signal. Beyond the
//!   usual `cancel`/`cancelled` pair it carries the two waits the pipeline
//!   actually performs: [`CancellationToken::run_until_cancelled`] wraps the
//!   blocking points (queue sends and receives in the worker pool) and
//!   [`CancellationToken::sleep`] is the inter-iteration pause, which must
//!   end early the moment a signal arrives.
//! - [`ShutdownCoordinator`] - hands out tokens and owns the drain budget:
//!   after cancellation the driver gives the iteration task and the output
//!   writer up to the grace period (30s) through
//!   [`ShutdownCoordinator::drain`], then exits regardless.
//!
//! Cancellation is cooperative and best-effort: an in-flight embedding call
//! may still complete, but no new file, chunk, or sleep starts once the
//! token fires.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hasher_bootstrap::shutdown::ShutdownCoordinator;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = ShutdownCoordinator::default();
//!     let token = coordinator.token();
//!
//!     let worker = tokio::spawn(async move {
//!         loop {
//!             // Pause between iterations, ending early on cancellation
//!             if !token.sleep(Duration::from_secs(5)).await {
//!                 break;
//!             }
//!         }
//!     });
//!
//!     coordinator.initiate_shutdown();
//!     // Bounded by the grace period; None means the budget expired
//!     let _ = coordinator.drain(worker).await;
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Default grace period for graceful shutdown (in seconds)
///
/// The driver's shutdown budget: after a signal, the background iteration
/// task and the output writer each get this long to drain.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 30;

/// Broadcast cancellation signal.
///
/// Clone-able; every task that can block holds one. The file processor
/// checks it at file and chunk boundaries, the worker pool parks on it
/// around queue operations, and the driver races its inter-iteration sleep
/// against it.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Cancels the token. Returns `true` for the call that actually
    /// transitioned it, `false` for every later call.
    pub fn cancel(&self) -> bool {
        let transitioned = self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if transitioned {
            self.notify.notify_waiters();
        }
        transitioned
    }

    /// Check if cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation (async)
    pub async fn cancelled(&self) {
        // Register interest before checking the flag: a cancel landing
        // between the check and the wait must still wake this task.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Runs `fut` to completion unless cancellation fires first.
    ///
    /// `None` means the token won the race; the operation's side effects
    /// (a queued record, a half-sent path) are the caller's to abandon.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }

    /// Cooperative pause: sleeps `period`, ending early on cancellation.
    ///
    /// Returns `true` when the full period elapsed, `false` when the token
    /// cut it short.
    pub async fn sleep(&self, period: Duration) -> bool {
        self.run_until_cancelled(tokio::time::sleep(period)).await.is_some()
    }
}

/// Shutdown coordinator: token source plus the drain budget.
///
/// Created once at the driver's INIT and kept for the process lifetime.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    ///
    /// # Arguments
    ///
    /// * `grace_period` - Maximum time [`ShutdownCoordinator::drain`] waits
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
        }
    }

    /// Get a cancellation token
    ///
    /// Tokens can be cloned and passed to async tasks for shutdown signaling.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Check if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Initiate graceful shutdown. Idempotent: only the first call cancels
    /// the tokens and logs.
    pub fn initiate_shutdown(&self) {
        if self.token.cancel() {
            tracing::info!(grace_period = ?self.grace_period, "initiating graceful shutdown");
        }
    }

    /// Runs `fut` bounded by the grace period.
    ///
    /// Used for the two drains the driver performs on its way out: joining
    /// the background iteration task and finalizing the output writer.
    /// `None` means the budget expired and the caller should give up on the
    /// result.
    pub async fn drain<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::time::timeout(self.grace_period, fut).await.ok()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}
