// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hasher Bootstrap
//!
//! Entry-point concerns for the hasher ingestion pipeline, kept separate from
//! the application so that the binary crate stays thin and the process-level
//! machinery is reusable and testable in isolation.
//!
//! ## Modules
//!
//! - [`signals`] - Binds SIGINT/SIGTERM/SIGHUP to the shutdown coordinator
//! - [`shutdown`] - Cancellation tokens and the graceful-shutdown drain budget
//! - [`exit_code`] - Process exit codes for the driver binary
//! - [`logger`] - Minimal logger trait for pre-subscriber bootstrap output
//! - [`platform`] - OS-specific application-data directory resolution
//!
//! ## Design
//!
//! The bootstrap crate owns everything that has to exist before the tracing
//! subscriber, configuration, and runtime services are up: it resolves the
//! data directory, binds process signals, and hands the application a
//! [`shutdown::ShutdownCoordinator`] whose tokens are threaded through every
//! blocking operation in the core.

pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use exit_code::ExitCode;
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use platform::resolve_data_dir;
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use signals::{bind_signals, ShutdownSignal};
