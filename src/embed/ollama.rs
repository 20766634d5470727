//! Ollama embedding client.
//!
//! Talks to a local Ollama server over its REST API with a blocking `ureq`
//! agent. No retries: a failed request surfaces as an [`EmbedError`] and the
//! batch runner decides what to do with the record.

use std::time::Duration;

use crate::config::EmbedderConfig;
use crate::error::EmbedError;

use super::{EmbedResult, Embedder};

/// Configuration for the Ollama embedding client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            timeout_secs: 60,
        }
    }
}

impl From<&EmbedderConfig> for OllamaConfig {
    fn from(config: &EmbedderConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Client for Ollama's `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    config: OllamaConfig,
    agent: ureq::Agent,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self { config, agent }
    }

    /// Check that the server answers and the model is pulled.
    ///
    /// Sends a lightweight request to `/api/tags`.
    pub fn probe(&self) -> EmbedResult<()> {
        let url = format!("{}/api/tags", self.config.base_url);
        let resp = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build()
            .get(&url)
            .call()
            .map_err(|_| EmbedError::Unavailable {
                url: self.config.base_url.clone(),
            })?;

        let body = resp.into_string().map_err(|e| EmbedError::ParseError {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| EmbedError::ParseError {
                message: e.to_string(),
            })?;

        let target = &self.config.model;
        let has_model = json["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str())
                    .any(|name| name == target || name.split(':').next() == Some(target))
            })
            .unwrap_or(false);

        if has_model {
            Ok(())
        } else {
            Err(EmbedError::RequestFailed {
                message: format!(
                    "model \"{target}\" is not pulled; run `ollama pull {target}`"
                ),
            })
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// Pull the vector out of an `/api/embeddings` response body.
fn parse_embedding(body: &str) -> EmbedResult<Vec<f32>> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| EmbedError::ParseError {
            message: e.to_string(),
        })?;

    let values = json["embedding"]
        .as_array()
        .ok_or_else(|| EmbedError::ParseError {
            message: "missing 'embedding' field".into(),
        })?;

    values
        .iter()
        .map(|v| {
            v.as_f64().map(|x| x as f32).ok_or_else(|| EmbedError::ParseError {
                message: format!("non-numeric embedding component: {v}"),
            })
        })
        .collect()
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": text,
        });

        let resp = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| match e {
                ureq::Error::Transport(_) => EmbedError::Unavailable {
                    url: self.config.base_url.clone(),
                },
                ureq::Error::Status(code, _) => EmbedError::RequestFailed {
                    message: format!("server returned status {code}"),
                },
            })?;

        let resp_str = resp.into_string().map_err(|e| EmbedError::ParseError {
            message: e.to_string(),
        })?;

        parse_embedding(&resp_str)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

impl std::fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}
