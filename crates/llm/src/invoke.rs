//! Agent Invoker
//!
//! The single entry point for scoring calls. Wraps every backend call with
//! pool admission, a hard deadline, payload normalization, and optional
//! token-streaming pass-through, resolving to a tagged `AgentOutcome` in
//! all cases. Deadline expiry drops the in-flight request future, which
//! cancels the underlying call and frees the pool slot immediately.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::backend::{CompletionRequest, ScoringBackend};
use crate::json::normalize_payload;
use crate::pool::CallPools;
use crate::types::{AgentOutcome, InvokeOptions, StreamDelta};

/// Issues scoring calls through a shared backend and pool pair.
#[derive(Clone)]
pub struct AgentInvoker {
    backend: Arc<dyn ScoringBackend>,
    pools: Arc<CallPools>,
}

impl AgentInvoker {
    /// Create an invoker over the given backend and pools.
    pub fn new(backend: Arc<dyn ScoringBackend>, pools: Arc<CallPools>) -> Self {
        Self { backend, pools }
    }

    /// Shared pool handle, for observability and tests.
    pub fn pools(&self) -> &Arc<CallPools> {
        &self.pools
    }

    /// Execute one scoring call.
    ///
    /// Acquires a slot from the configured pool (FIFO), runs the backend
    /// call under the configured deadline, and normalizes the payload.
    /// Never returns an error: every failure mode maps to a tagged
    /// `AgentOutcome` variant.
    pub async fn invoke(
        &self,
        agent: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: InvokeOptions,
        deltas: Option<mpsc::Sender<StreamDelta>>,
    ) -> AgentOutcome {
        let permit = match self.pools.acquire(options.pool).await {
            Ok(permit) => permit,
            Err(err) => {
                warn!(agent, error = %err, "pool acquisition failed");
                return AgentOutcome::Transport {
                    message: err.to_string(),
                    status: None,
                };
            }
        };

        let request =
            CompletionRequest::new(agent, system_prompt, user_prompt, options.max_tokens);
        let deadline = Duration::from_millis(options.timeout_ms);

        let call = async {
            if options.streaming {
                if let Some(delta_tx) = deltas {
                    return self.stream_with_forwarding(&request, delta_tx).await;
                }
            }
            self.backend.complete(&request).await
        };

        let outcome = match timeout(deadline, call).await {
            Ok(Ok(text)) => match normalize_payload(&text) {
                Ok(fields) => {
                    debug!(agent, "call completed");
                    AgentOutcome::Completed { fields }
                }
                Err(err) => {
                    warn!(agent, error = %err, "payload did not normalize");
                    AgentOutcome::ParseFailed {
                        message: err.to_string(),
                    }
                }
            },
            Ok(Err(backend_err)) => {
                warn!(agent, error = %backend_err, "backend call failed");
                AgentOutcome::Transport {
                    status: backend_err.status(),
                    message: backend_err.to_string(),
                }
            }
            Err(_elapsed) => {
                warn!(agent, timeout_ms = options.timeout_ms, "call timed out");
                AgentOutcome::TimedOut {
                    after_ms: options.timeout_ms,
                }
            }
        };

        // Slot freed the moment the call settles or is cancelled.
        drop(permit);
        outcome
    }

    /// Stream through the backend while re-tagging raw fragments with the
    /// agent name for the caller's sink.
    async fn stream_with_forwarding(
        &self,
        request: &CompletionRequest,
        delta_tx: mpsc::Sender<StreamDelta>,
    ) -> Result<String, crate::backend::BackendError> {
        let (raw_tx, mut raw_rx) = mpsc::channel::<String>(64);
        let agent = request.agent.clone();

        let forwarder = tokio::spawn(async move {
            while let Some(content) = raw_rx.recv().await {
                let delta = StreamDelta {
                    agent: agent.clone(),
                    content,
                };
                if delta_tx.send(delta).await.is_err() {
                    break;
                }
            }
        });

        let result = self.backend.stream(request, raw_tx).await;
        let _ = forwarder.await;
        result
    }
}

impl std::fmt::Debug for AgentInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentInvoker")
            .field("backend", &self.backend.name())
            .finish()
    }
}
