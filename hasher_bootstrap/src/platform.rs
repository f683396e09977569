// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction
//!
//! OS-specific resolution of the application-data directory where all
//! persisted state lives:
//!
//! - Windows: `%APPDATA%/hasher/data`
//! - macOS: `~/Library/Application Support/hasher/data`
//! - Linux: `${XDG_DATA_HOME:-~/.local/share}/hasher/data`
//!
//! The `HASHER_DATA_DIR` environment variable overrides the platform default
//! entirely, which tests and containerized deployments rely on.

use std::path::PathBuf;

/// Environment variable overriding the application-data directory
pub const DATA_DIR_ENV: &str = "HASHER_DATA_DIR";

/// Application name used as the data subdirectory
const APP_NAME: &str = "hasher";

/// Resolve the application-data directory for persisted state
///
/// Checks the `HASHER_DATA_DIR` override first, then falls back to the
/// platform data directory joined with `hasher/data`. The directory is not
/// created here; the driver's INIT phase creates it with mkdir-all semantics.
///
/// # Errors
///
/// Returns an error when no override is set and the platform data directory
/// cannot be determined (no home directory).
pub fn resolve_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let base = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("unable to determine platform data directory"))?;
    Ok(base.join(APP_NAME).join("data"))
}
