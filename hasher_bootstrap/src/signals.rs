// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Signal Handling
//!
//! Binds process signals to the shutdown coordinator. The driver installs
//! the binding once at INIT; the first signal received cancels every
//! outstanding token, which is what sends the driver down its CANCEL path
//! (save the ledger, drain within the grace budget, exit code 2).
//!
//! ## Supported Signals
//!
//! - **SIGTERM** (15) - Graceful shutdown request
//! - **SIGINT** (2) - User interrupt (Ctrl+C)
//! - **SIGHUP** (1) - Hangup (terminal closed)
//!
//! Windows only distinguishes Ctrl+C, reported as [`ShutdownSignal::Interrupt`].
//!
//! The listener resolves to *which* signal fired so the exit path can log
//! it; repeated signals after the first are ignored (cancellation is
//! one-way, and the drain budget already bounds how long the process can
//! linger).

use tokio::task::JoinHandle;

use crate::shutdown::ShutdownCoordinator;

/// The signal that ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Terminate,
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGHUP
    Hangup,
}

impl ShutdownSignal {
    /// Conventional signal name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Hangup => "SIGHUP",
        }
    }
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waits for the first shutdown signal.
#[cfg(unix)]
pub async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => ShutdownSignal::Terminate,
        _ = sigint.recv() => ShutdownSignal::Interrupt,
        _ = sighup.recv() => ShutdownSignal::Hangup,
    }
}

/// Waits for the first shutdown signal.
#[cfg(windows)]
pub async fn wait_for_signal() -> ShutdownSignal {
    tokio::signal::ctrl_c().await.expect("failed to register Ctrl+C handler");
    ShutdownSignal::Interrupt
}

/// Spawns the signal listener bound to `coordinator`.
///
/// The returned handle resolves to the signal that fired, after shutdown
/// has been initiated. The driver keeps the handle only for logging; the
/// binding itself outlives it (dropping a `JoinHandle` detaches the task).
pub fn bind_signals(coordinator: &ShutdownCoordinator) -> JoinHandle<ShutdownSignal> {
    let coordinator = coordinator.clone();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal = signal.as_str(), "received shutdown signal");
        coordinator.initiate_shutdown();
        signal
    })
}
