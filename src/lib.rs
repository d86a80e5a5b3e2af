//! Callsight - Real-Time Sales Call Analysis Core
//!
//! The orchestration layer between raw transcript chunks and emitted
//! analysis snapshots:
//! - Per-session scheduler coalescing overlapping re-analysis
//! - Parallel agent fan-out with isolated per-agent failure
//! - Deterministic re-scoring on every settlement
//! - Partial/snapshot/stream-delta emission with sequence guarding

pub mod agents;
pub mod config;
pub mod dedup;
pub mod emitter;
pub mod fanout;
pub mod models;
pub mod runtime;
pub mod scheduler;
pub mod session;

pub use agents::{agent_spec, AgentSpec, AGENT_SET};
pub use config::RuntimeConfig;
pub use dedup::{is_duplicate_objection, token_overlap, OBJECTION_SIMILARITY_THRESHOLD};
pub use emitter::{Emitter, OutboundMessage, StreamBatcher};
pub use fanout::{execute_run, RunContext};
pub use models::{AgentSlice, AnalysisSnapshot, HotButton, Objection, RunAccumulator};
pub use runtime::AnalysisRuntime;
pub use scheduler::SessionScheduler;
pub use session::{recency_window, RunState, RunTicket, SessionState};

// Re-export the workspace crates' primary types for embedders.
pub use callsight_core::{CoreError, CoreResult, SessionConfig};
pub use callsight_llm::{
    AgentInvoker, AgentOutcome, BackendError, CallPools, HttpBackendConfig, HttpScoringBackend,
    InvokeOptions, PoolKind, ScoringBackend, StreamDelta,
};
pub use callsight_scoring::{
    AiRuleFinding, CoherenceScore, IndicatorSignals, Pillar, PillarWeights, ReadinessLevel,
    ReadinessScore, TriggeredPenalty,
};
