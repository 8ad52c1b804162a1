//! Chat completion provider abstraction
//!
//! Thin transport over an OpenAI-compatible chat completions endpoint. The
//! retrieval pipeline treats any failure here as "no draft answer"; this
//! module only reports errors, it never invents text.

use crate::config::CompletionConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for draft answer generation
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Send a system + user message pair, return the model's reply text
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completion client
pub struct OpenAiCompleter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiCompleter {
    /// Create a new OpenAI-compatible completion client
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "completion.api_key is required for the openai provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompleter {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let start = Instant::now();
        metrics::counter!(format!(
            "{}_completion_requests_total",
            crate::metrics::METRICS_PREFIX
        ))
        .increment(1);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::CompletionError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            metrics::counter!(format!(
                "{}_completion_errors_total",
                crate::metrics::METRICS_PREFIX
            ))
            .increment(1);
            return Err(AppError::CompletionError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::CompletionError {
                message: format!("Failed to parse response: {}", e),
            })?;

        metrics::histogram!(format!(
            "{}_completion_duration_seconds",
            crate::metrics::METRICS_PREFIX
        ))
        .record(start.elapsed().as_secs_f64());

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::CompletionError {
                message: "Empty response from completion API".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock completer for development and testing
///
/// Always replies with the refusal sentinel, so the pipeline falls back to
/// the best retrieved corpus answer. That keeps `chat` usable without an
/// API key.
pub struct MockCompleter;

#[async_trait]
impl ChatCompleter for MockCompleter {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok("NO MATCH".to_string())
    }

    fn model_name(&self) -> &str {
        "mock-completion"
    }
}

/// Create a completer based on configuration
pub fn create_completer(config: &CompletionConfig) -> Result<Arc<dyn ChatCompleter>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompleter::new(config)?)),
        "mock" => Ok(Arc::new(MockCompleter)),
        other => {
            tracing::warn!(provider = other, "Unknown completion provider, using mock");
            Ok(Arc::new(MockCompleter))
        }
    }
}
