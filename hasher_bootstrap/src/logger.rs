// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! Minimal logging abstraction for the bootstrap phase, before the tracing
//! subscriber is installed. Once `main` has configured tracing, application
//! code uses `tracing` macros directly; this trait only covers the window
//! between process start and subscriber installation (CLI validation errors,
//! data-directory resolution failures).

use std::fmt;
use std::sync::Mutex;

/// Logger trait for bootstrap output
///
/// Implementations must be thread-safe; the signal handler may log from a
/// separate task.
pub trait BootstrapLogger: Send + Sync {
    /// Log an error message
    fn error(&self, message: &str);

    /// Log a warning message
    fn warn(&self, message: &str);

    /// Log an informational message
    fn info(&self, message: &str);

    /// Log a debug message
    fn debug(&self, message: &str);
}

/// Console logger writing to stderr
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self { prefix: String::new() }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn format(&self, level: &str, message: &str) -> String {
        if self.prefix.is_empty() {
            format!("[{}] {}", level, message)
        } else {
            format!("[{}] {}: {}", level, self.prefix, message)
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        eprintln!("{}", self.format("ERROR", message));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", self.format("WARN", message));
    }

    fn info(&self, message: &str) {
        eprintln!("{}", self.format("INFO", message));
    }

    fn debug(&self, message: &str) {
        eprintln!("{}", self.format("DEBUG", message));
    }
}

/// No-op logger for tests and silent deployments
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Logger that captures messages for test assertions
pub struct CapturingLogger {
    messages: Mutex<Vec<LogMessage>>,
}

/// A captured log message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of captured messages
    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.messages.lock().unwrap().push(LogMessage {
            level,
            message: message.to_string(),
        });
    }
}

impl Default for CapturingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for CapturingLogger {
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
        }
    }
}
