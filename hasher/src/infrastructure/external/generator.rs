// /////////////////////////////////////////////////////////////////////////////
// Hasher Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Generative LLM Adapters
//!
//! The two production shapes of the triple-synthesis generator:
//!
//! - [`CommandGenerator`] - an external command receiving the prompt on
//!   stdin and returning the model's text on stdout (synthesis strategy S1);
//! - [`OllamaGenerator`] - HTTP `POST <base_url>/api/generate` with
//!   `{model, prompt, format: "json", stream: false}`, response
//!   `{response: string}` (strategy S2).
//!
//! Both return arbitrary text; the enrichment pipeline extracts the first
//! balanced JSON object and falls through on parse failure.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use hasher_domain::{IngestError, TextGenerator};

/// Wall-clock budget for one generative call
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// External-command generator (strategy S1).
pub struct CommandGenerator {
    command: String,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextGenerator for CommandGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, IngestError> {
        let mut child = Command::new(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IngestError::dependency_missing(format!("failed to run {}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| IngestError::io_error(format!("failed to write prompt to {}: {}", self.command, e)))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| IngestError::timeout(format!("{} exceeded {:?}", self.command, self.timeout)))?
            .map_err(|e| IngestError::io_error(format!("failed to collect {} output: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(IngestError::transient(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn label(&self) -> &'static str {
        "command"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP generator against a local Ollama-style endpoint (strategy S2).
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(|e| IngestError::internal_error(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Best-effort model probe used during DEPENDENCY_CHECK.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "generative endpoint probe");
                response.status().is_success()
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, IngestError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                format: "json",
                stream: false,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IngestError::timeout(format!("generation timed out: {}", e))
                } else {
                    IngestError::transient(format!("generation request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::transient(format!("generative endpoint returned {}", status)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| IngestError::malformed_input(format!("unparseable generation response: {}", e)))?;
        Ok(body.response)
    }

    fn label(&self) -> &'static str {
        "ollama"
    }
}
