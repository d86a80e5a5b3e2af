//! Scoring Backend Trait
//!
//! Defines the interface the substrate calls through to reach the external
//! language-model service. The substrate treats the backend as an opaque
//! text-completion function; pooling, deadlines, and payload normalization
//! all happen above this trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level failure from a scoring backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Rate limit exceeded
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Server error from the backend
    #[error("Server error: {message}")]
    ServerError { message: String, status: Option<u16> },

    /// Network/connection error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Invalid request (bad parameters)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Backend not reachable
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    /// Other error
    #[error("{message}")]
    Other { message: String },
}

impl BackendError {
    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::AuthenticationFailed { .. } => Some(401),
            BackendError::RateLimited { .. } => Some(429),
            BackendError::ServerError { status, .. } => *status,
            _ => None,
        }
    }
}

/// Map an HTTP error status to a backend error.
pub fn parse_http_error(status: u16, body: &str, backend: &str) -> BackendError {
    match status {
        401 | 403 => BackendError::AuthenticationFailed {
            message: format!("{}: access denied", backend),
        },
        429 => BackendError::RateLimited {
            message: body.to_string(),
        },
        400 => BackendError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => BackendError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => BackendError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// One prompt pair bound for the external scoring service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Logical agent name, for logging and delta tagging.
    pub agent: String,
    /// System prompt establishing the scoring role.
    pub system_prompt: String,
    /// User prompt carrying the transcript window.
    pub user_prompt: String,
    /// Token budget for the response.
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(
        agent: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            agent: agent.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens,
        }
    }
}

/// Trait every scoring backend implements.
///
/// Provides a unified interface for:
/// - One-shot completions (complete)
/// - Streaming completions (stream)
/// - Health checking
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    /// Backend name for identification and logging.
    fn name(&self) -> &str;

    /// Run one completion to the end and return the raw response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;

    /// Run one completion, forwarding raw token fragments through `tx` as
    /// they arrive, and return the full accumulated text.
    ///
    /// The default implementation completes non-streamed and forwards the
    /// whole payload as a single fragment; backends with native streaming
    /// should override.
    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<String, BackendError> {
        let text = self.complete(request).await?;
        let _ = tx.send(text.clone()).await;
        Ok(text)
    }

    /// Check that the backend is reachable and credentials are valid.
    async fn health_check(&self) -> Result<(), BackendError>;
}
