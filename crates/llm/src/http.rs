//! HTTP Scoring Backend
//!
//! Reference `ScoringBackend` implementation speaking the chat-completions
//! wire shape over HTTPS. The substrate owns deadlines and pooling; this
//! backend only builds requests, maps HTTP failures, and extracts text.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::{parse_http_error, BackendError, CompletionRequest, ScoringBackend};

/// Default scoring service endpoint.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Build the `reqwest::Client` shared by a backend instance.
///
/// Connection setup gets its own short budget; overall call deadlines are
/// enforced above the backend by the invoker.
pub fn build_http_client() -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| BackendError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Configuration for the HTTP scoring backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBackendConfig {
    /// API key for the scoring service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override (defaults to the chat-completions URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use.
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: default_temperature(),
        }
    }
}

/// Chat-completions scoring backend.
pub struct HttpScoringBackend {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct ChatStreamDelta {
    content: Option<String>,
}

impl HttpScoringBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = build_http_client()?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::AuthenticationFailed {
                message: "API key not configured for scoring backend".to_string(),
            })
    }

    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens,
            "temperature": self.config.temperature,
            "stream": stream,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
        })
    }

    async fn post(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(request, stream);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response
                .text()
                .await
                .map_err(|e| BackendError::NetworkError {
                    message: e.to_string(),
                })?;
            return Err(parse_http_error(status, &body_text, "scoring-api"));
        }

        Ok(response)
    }
}

#[async_trait]
impl ScoringBackend for HttpScoringBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let response = self.post(request, false).await?;

        let body_text = response
            .text()
            .await
            .map_err(|e| BackendError::NetworkError {
                message: e.to_string(),
            })?;

        let parsed: ChatResponse =
            serde_json::from_str(&body_text).map_err(|e| BackendError::Other {
                message: format!("malformed completion envelope: {}", e),
            })?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!(agent = %request.agent, chars = content.len(), "completion settled");
        Ok(content)
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<String, BackendError> {
        let response = self.post(request, true).await?;

        let mut accumulated = String::new();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BackendError::NetworkError {
                message: e.to_string(),
            })?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete SSE lines
            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                if data == "[DONE]" {
                    continue;
                }

                if let Ok(parsed) = serde_json::from_str::<ChatStreamChunk>(data) {
                    if let Some(content) = parsed
                        .choices
                        .first()
                        .and_then(|c| c.delta.content.as_deref())
                    {
                        accumulated.push_str(content);
                        // Receiver gone means the caller stopped listening;
                        // keep accumulating for the final parse.
                        let _ = tx.send(content.to_string()).await;
                    }
                }
            }
        }

        debug!(agent = %request.agent, chars = accumulated.len(), "stream settled");
        Ok(accumulated)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let probe = CompletionRequest::new("health", "Reply with OK.", "ping", 8);
        self.complete(&probe).await.map(|_| ())
    }
}

impl std::fmt::Debug for HttpScoringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScoringBackend")
            .field("model", &self.config.model)
            .field("base_url", &self.base_url())
            .finish()
    }
}
