//! LLM gateway: one chat-completion call to an OpenAI-compatible endpoint.
//!
//! The gateway is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], request shaping in [`crate::pipeline::prompt`]; this
//! module only moves bytes and classifies failures:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | transport error | `Err(AnalyzeError::Network)` |
//! | non-2xx, context length exceeded | `Ok` with the request's canned response |
//! | non-2xx, anything else | `Err(AnalyzeError::Provider)` |
//! | 2xx without `choices` | `Err(AnalyzeError::Provider)` |
//! | 2xx | first choice's content, or `""` |
//!
//! There is no retry and no timeout at this layer.

use crate::config::AnalysisConfig;
use crate::error::AnalyzeError;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A fully-built completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Returned instead of an error when the prompt exceeds the context window.
    pub canned_response: &'static str,
}

/// Whether a completion came from the model or was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Model,
    Canned,
}

/// Raw model text plus its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub source: CompletionSource,
}

impl Completion {
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CompletionSource::Model,
        }
    }

    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CompletionSource::Canned,
        }
    }
}

/// Anything that can turn an [`LlmRequest`] into a [`Completion`].
///
/// Object-safe so the analyzer can hold an `Arc<dyn ChatCompletion>` and tests
/// can substitute a scripted model.
pub trait ChatCompletion: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a LlmRequest,
    ) -> BoxFuture<'a, Result<Completion, AnalyzeError>>;

    /// Model identifier, for logs and health output.
    fn model(&self) -> &str;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────

/// Chat-completion client for Groq (or any OpenAI-compatible endpoint).
pub struct GroqClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl GroqClient {
    /// Create a client from the analysis config.
    ///
    /// Fails when no API key is configured. Call once at startup and share
    /// the client; a missing key is a deployment error, not a request error.
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalyzeError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AnalyzeError::ProviderNotConfigured {
                provider: "groq".to_string(),
                hint: "Set GROQ_API_KEY (or pass --api-key) to a valid API key.".to_string(),
            })?
            .to_string();

        let http = reqwest::Client::builder()
            .user_agent(concat!("marketmetric/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyzeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        let endpoint = config.completions_url();
        info!("Using LLM endpoint {} with model {}", endpoint, config.model);

        Ok(Self {
            http,
            endpoint,
            api_key,
            model: config.model.clone(),
        })
    }

    async fn send(&self, request: &LlmRequest) -> Result<Completion, AnalyzeError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalyzeError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            if is_context_length_error(&raw) {
                warn!(
                    "Prompt exceeds the context window of {} (HTTP {}), returning canned response",
                    self.model, status
                );
                return Ok(Completion::canned(request.canned_response));
            }
            let message = error_message(&raw).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            warn!("LLM API error {}: {}", status, message);
            return Err(AnalyzeError::Provider {
                status: status.as_u16(),
                message,
                body: raw,
            });
        }

        let raw = response.text().await.map_err(|e| AnalyzeError::Network {
            detail: e.to_string(),
        })?;
        let payload: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| AnalyzeError::Provider {
                status: status.as_u16(),
                message: format!("Unexpected response payload: {e}"),
                body: raw.clone(),
            })?;
        let choices = payload.choices.ok_or_else(|| AnalyzeError::Provider {
            status: status.as_u16(),
            message: "Response payload has no 'choices' field".to_string(),
            body: raw.clone(),
        })?;

        let text = choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        debug!(
            "Completion from {}: {} chars in {:?}",
            self.model,
            text.len(),
            start.elapsed()
        );
        Ok(Completion::model(text))
    }
}

impl ChatCompletion for GroqClient {
    fn complete<'a>(
        &'a self,
        request: &'a LlmRequest,
    ) -> BoxFuture<'a, Result<Completion, AnalyzeError>> {
        self.send(request).boxed()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Does this error body say the prompt was too long for the model?
///
/// Checks the structured `error.code` / `error.type` / `error.message` when
/// the body is JSON, and falls back to a plain-text scan otherwise.
pub fn is_context_length_error(body: &str) -> bool {
    fn mentions(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("context_length_exceeded")
            || lower.contains("context length")
            || lower.contains("context window")
            || lower.contains("maximum context")
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let e = env.error;
            [e.code, e.kind, e.message]
                .iter()
                .flatten()
                .any(|field| mentions(field))
        }
        Err(_) => mentions(body),
    }
}

/// Best-effort human message from an error body (JSON or plain text).
fn error_message(body: &str) -> Option<String> {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(msg) = env.error.message {
            return Some(msg);
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(500).collect())
}
