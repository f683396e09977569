// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Linguistic Analyzer
//!
//! Adapter over the external POS/dependency analyzer process. The analyzer
//! reads text on stdin and writes one JSON array of token objects on
//! stdout:
//!
//! ```json
//! [{"text": "Newton", "start": 0, "pos": "PROPN", "dep": "nsubj"}, ...]
//! ```
//!
//! POS labels are mapped to the fixed wire codes, dependency labels are
//! FNV-1a hashed, and tense codes are reserved zeros. The adapter honors
//! the port's must-not-raise contract: any spawn, timeout, exit, or parse
//! problem yields an empty sidecar and a warning, never an error.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use hasher_domain::{LinguisticAnalyzer, LinguisticSidecar, PosTag};

/// One token row in the analyzer's output.
#[derive(Debug, Deserialize)]
struct AnalyzerToken {
    text: String,
    start: i32,
    #[serde(default)]
    pos: String,
    #[serde(default)]
    dep: String,
}

/// Command-line linguistic analyzer. `None` command means analysis is
/// disabled and every call returns an empty sidecar.
pub struct CommandAnalyzer {
    command: Option<String>,
    timeout: Duration,
}

impl CommandAnalyzer {
    /// Default analyzer invocation budget
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, command: &str, text: &str) -> Option<LinguisticSidecar> {
        let mut child = Command::new(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .ok()?;

        let mut stdin = child.stdin.take()?;
        stdin.write_all(text.as_bytes()).await.ok()?;
        drop(stdin);

        let output = tokio::time::timeout(self.timeout, child.wait_with_output()).await.ok()?.ok()?;
        if !output.status.success() {
            return None;
        }

        let tokens: Vec<AnalyzerToken> = serde_json::from_slice(&output.stdout).ok()?;
        let mut sidecar = LinguisticSidecar::empty();
        for token in tokens {
            sidecar.push_token(token.text, token.start, PosTag::from_label(&token.pos), &token.dep);
        }
        Some(sidecar)
    }
}

#[async_trait]
impl LinguisticAnalyzer for CommandAnalyzer {
    async fn process(&self, text: &str) -> LinguisticSidecar {
        let Some(command) = &self.command else {
            return LinguisticSidecar::empty();
        };

        match self.run(command, text).await {
            Some(sidecar) => sidecar,
            None => {
                warn!(command = %command, "linguistic analysis failed, continuing with empty sidecar");
                LinguisticSidecar::empty()
            }
        }
    }
}
