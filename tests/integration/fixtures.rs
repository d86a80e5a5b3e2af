//! Scripted scoring backend and helpers for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use callsight::{BackendError, OutboundMessage, ScoringBackend};
use callsight_llm::CompletionRequest;

/// What a scripted backend does for one agent.
#[derive(Debug, Clone)]
pub enum Script {
    /// Sleep, then return the payload.
    Payload { text: String, delay_ms: u64 },
    /// Sleep, then stream the fragments; the full text is their
    /// concatenation.
    Fragments { parts: Vec<String>, delay_ms: u64 },
    /// Per-call delays: the Nth call to this agent sleeps `delays[N]`
    /// (last entry repeats), then returns the payload.
    DelaySequence { text: String, delays: Vec<u64> },
    /// Fail with a network error.
    Fail,
}

/// Backend whose behavior is scripted per agent name, recording every
/// call it receives.
pub struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    fallback: Script,
    calls: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(fallback: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            fallback,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_script(mut self, agent: &str, script: Script) -> Self {
        self.scripts.insert(agent.to_string(), script);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn script_for(&self, agent: &str) -> Script {
        self.scripts
            .get(agent)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Record a call and return its per-agent index.
    fn record(&self, agent: &str) -> usize {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.iter().filter(|a| a.as_str() == agent).count();
        calls.push(agent.to_string());
        self.call_count.fetch_add(1, Ordering::SeqCst);
        index
    }

    async fn run_script(
        &self,
        request: &CompletionRequest,
        tx: Option<&mpsc::Sender<String>>,
    ) -> Result<String, BackendError> {
        let index = self.record(&request.agent);
        match self.script_for(&request.agent) {
            Script::Payload { text, delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if let Some(tx) = tx {
                    let _ = tx.send(text.clone()).await;
                }
                Ok(text)
            }
            Script::Fragments { parts, delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if let Some(tx) = tx {
                    for part in &parts {
                        let _ = tx.send(part.clone()).await;
                    }
                }
                Ok(parts.concat())
            }
            Script::DelaySequence { text, delays } => {
                let delay = delays
                    .get(index)
                    .or_else(|| delays.last())
                    .copied()
                    .unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(text)
            }
            Script::Fail => Err(BackendError::NetworkError {
                message: "scripted failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ScoringBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.run_script(request, None).await
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<String, BackendError> {
        self.run_script(request, Some(&tx)).await
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Collect every outbound message that arrives within the window.
pub async fn drain_for(
    rx: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    ms: u64,
) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    let deadline = tokio::time::sleep(Duration::from_millis(ms));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => return messages,
            message = rx.recv() => match message {
                Some(message) => messages.push(message),
                None => return messages,
            }
        }
    }
}

/// Sequences of all snapshot messages, in arrival order.
pub fn snapshot_sequences(messages: &[OutboundMessage]) -> Vec<u64> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::Snapshot { sequence, .. } => Some(*sequence),
            _ => None,
        })
        .collect()
}
