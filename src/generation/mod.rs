//! Abstractions over the text-generation oracle.
//!
//! Every analysis capability funnels through a single `invoke(prompt) -> text` call; no
//! conversation state is retained between calls. The Ollama-backed client issues HTTP
//! requests directly to the runtime with a per-call timeout so an unresponsive oracle
//! surfaces as an ordinary generation error instead of hanging the run.

use crate::config::{DEFAULT_ORACLE_TIMEOUT_SECS, get_config};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while invoking the generation oracle.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was unreachable or the call timed out.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Run a single self-contained prompt through the configured model.
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationClientError>;
}

/// Build a generation client from the loaded configuration.
pub fn get_generation_client() -> Box<dyn GenerationClient + Send + Sync> {
    let config = get_config();
    let base_url = config
        .ollama_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    let timeout = Duration::from_secs(
        config
            .oracle_timeout_secs
            .unwrap_or(DEFAULT_ORACLE_TIMEOUT_SECS),
    );
    Box::new(OllamaGenerationClient::new(
        base_url,
        config.chat_model.clone(),
        timeout,
    ))
}

/// Generation client backed by the Ollama `/api/generate` endpoint.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerationClient {
    /// Construct a client targeting the given Ollama runtime and model.
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("docsense/generate")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.3,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaGenerateResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
