//! Partial-Result Emitter
//!
//! Converts internal completion events into the outbound message sequence
//! the dashboard consumes, and micro-batches token-level stream deltas so
//! transport message rate stays bounded. Consumers must ignore messages
//! whose sequence is lower than the highest seen, and merge (never
//! replace) the additive lists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

use callsight_llm::StreamDelta;
use callsight_scoring::{CoherenceScore, ReadinessScore};

use crate::models::AnalysisSnapshot;
use crate::session::RunTicket;

/// One message on the dashboard stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Full snapshot for a settled run.
    Snapshot {
        session_id: String,
        sequence: u64,
        snapshot: AnalysisSnapshot,
    },
    /// One agent's slice plus re-scored totals, emitted the moment that
    /// agent settles.
    Partial {
        session_id: String,
        sequence: u64,
        agent: String,
        /// The agent's parsed fields; null when the agent failed.
        slice: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        readiness: ReadinessScore,
        coherence: CoherenceScore,
    },
    /// Micro-batched token fragments from a streaming agent.
    StreamDelta {
        session_id: String,
        sequence: u64,
        agent: String,
        content: String,
    },
}

impl OutboundMessage {
    /// The run sequence that owns this message.
    pub fn sequence(&self) -> u64 {
        match self {
            OutboundMessage::Snapshot { sequence, .. }
            | OutboundMessage::Partial { sequence, .. }
            | OutboundMessage::StreamDelta { sequence, .. } => *sequence,
        }
    }
}

/// Sends outbound messages to the dashboard transport.
///
/// A closed receiver means the dashboard is gone; sends become no-ops so
/// analysis never blocks on the consumer.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Emitter {
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, message: OutboundMessage) {
        if self.tx.send(message).is_err() {
            warn!("outbound channel closed; dropping message");
        }
    }

    /// Emit a full snapshot for a settled run.
    pub fn snapshot(&self, session_id: &str, sequence: u64, snapshot: AnalysisSnapshot) {
        debug!(session_id, sequence, "emitting snapshot");
        self.send(OutboundMessage::Snapshot {
            session_id: session_id.to_string(),
            sequence,
            snapshot,
        });
    }

    /// Emit one agent's partial result.
    #[allow(clippy::too_many_arguments)]
    pub fn partial(
        &self,
        session_id: &str,
        sequence: u64,
        agent: &str,
        slice: serde_json::Value,
        error: Option<String>,
        readiness: ReadinessScore,
        coherence: CoherenceScore,
    ) {
        debug!(session_id, sequence, agent, "emitting partial");
        self.send(OutboundMessage::Partial {
            session_id: session_id.to_string(),
            sequence,
            agent: agent.to_string(),
            slice,
            error,
            readiness,
            coherence,
        });
    }

    /// Emit one batched stream fragment.
    pub fn stream_delta(&self, session_id: &str, sequence: u64, agent: &str, content: String) {
        self.send(OutboundMessage::StreamDelta {
            session_id: session_id.to_string(),
            sequence,
            agent: agent.to_string(),
            content,
        });
    }
}

/// Micro-batches raw token deltas per agent.
///
/// Fragments accumulate per agent key and flush on whichever comes first:
/// the flush interval or the size threshold. The remainder flushes when
/// the delta channel closes.
pub struct StreamBatcher;

impl StreamBatcher {
    /// Consume deltas until the channel closes. Flushes are suppressed
    /// once the owning run is no longer current.
    pub async fn run(
        emitter: Emitter,
        session_id: String,
        ticket: RunTicket,
        mut rx: mpsc::Receiver<StreamDelta>,
        flush_interval_ms: u64,
        flush_threshold_chars: usize,
    ) {
        let mut buffers: HashMap<String, String> = HashMap::new();
        let mut ticker = interval(Duration::from_millis(flush_interval_ms.max(1)));
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                delta = rx.recv() => {
                    match delta {
                        Some(delta) => {
                            let agent = delta.agent.clone();
                            let buffer = buffers.entry(delta.agent).or_default();
                            buffer.push_str(&delta.content);
                            if buffer.len() >= flush_threshold_chars {
                                Self::flush_agent(
                                    &emitter, &session_id, &ticket, &mut buffers, &agent,
                                );
                            }
                        }
                        None => {
                            Self::flush_all(&emitter, &session_id, &ticket, &mut buffers);
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    Self::flush_all(&emitter, &session_id, &ticket, &mut buffers);
                }
            }
        }
    }

    fn flush_agent(
        emitter: &Emitter,
        session_id: &str,
        ticket: &RunTicket,
        buffers: &mut HashMap<String, String>,
        agent: &str,
    ) {
        if let Some(content) = buffers.remove(agent) {
            if !content.is_empty() && ticket.is_current() {
                emitter.stream_delta(session_id, ticket.sequence(), agent, content);
            }
        }
    }

    fn flush_all(
        emitter: &Emitter,
        session_id: &str,
        ticket: &RunTicket,
        buffers: &mut HashMap<String, String>,
    ) {
        let agents: Vec<String> = buffers.keys().cloned().collect();
        for agent in agents {
            Self::flush_agent(emitter, session_id, ticket, buffers, &agent);
        }
    }
}
