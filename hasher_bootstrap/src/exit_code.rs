// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Process exit codes for the ingestion driver binary.
//!
//! ## Exit Code Conventions
//!
//! The driver exposes a deliberately narrow contract to supervisors and
//! shell scripts:
//!
//! - **0**: Success
//! - **1**: Configuration error (invalid flags, unusable directories)
//! - **2**: Interrupted by signal (graceful shutdown path)
//! - **3**: Unrecoverable runtime error
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hasher_bootstrap::exit_code::ExitCode;
//!
//! fn run_application() -> Result<(), Box<dyn std::error::Error>> {
//!     // Application logic here
//!     Ok(())
//! }
//!
//! fn main() {
//!     let result = run_application();
//!     let exit_code = match result {
//!         Ok(_) => ExitCode::Success,
//!         Err(_) => ExitCode::RuntimeError,
//!     };
//!     std::process::exit(exit_code.as_i32());
//! }
//! ```

use std::fmt;

/// Exit codes for the ingestion driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// Configuration error (1)
    /// - Invalid or missing CLI arguments
    /// - Unusable input/output directories
    /// - Malformed configuration file
    ConfigError = 1,

    /// Interrupted by signal (2)
    /// - SIGINT / SIGTERM received
    /// - Graceful shutdown completed (possibly with partial progress)
    Interrupted = 2,

    /// Unrecoverable runtime error (3)
    /// - Output sink write failure
    /// - Checkpoint store unavailable at startup
    /// - Internal invariant violation
    RuntimeError = 3,
}

impl ExitCode {
    /// Returns the numeric exit code for `std::process::exit`
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::ConfigError => "configuration error",
            ExitCode::Interrupted => "interrupted by signal",
            ExitCode::RuntimeError => "unrecoverable runtime error",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::ConfigError.as_i32(), 1);
        assert_eq!(ExitCode::Interrupted.as_i32(), 2);
        assert_eq!(ExitCode::RuntimeError.as_i32(), 3);
    }

    #[test]
    fn test_exit_code_default() {
        assert_eq!(ExitCode::default(), ExitCode::Success);
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(ExitCode::Interrupted.to_string(), "2 (interrupted by signal)");
    }

    #[test]
    fn test_exit_code_into_i32() {
        let code: i32 = ExitCode::RuntimeError.into();
        assert_eq!(code, 3);
    }
}
