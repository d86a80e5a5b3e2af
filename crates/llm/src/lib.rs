//! Callsight LLM
//!
//! The agent call substrate: everything between a logical scoring request
//! and the external language-model service.
//! - `ScoringBackend` trait + HTTP chat-completions reference backend
//! - Dual concurrency pools (`main`/`aux`) with FIFO admission
//! - Hard per-call deadlines with active cancellation
//! - JSON payload normalization and repair
//! - Token-streaming pass-through tagged by agent name

pub mod backend;
pub mod http;
pub mod invoke;
pub mod json;
pub mod pool;
pub mod types;

// Re-export main types
pub use backend::{parse_http_error, BackendError, CompletionRequest, ScoringBackend};
pub use http::{build_http_client, HttpBackendConfig, HttpScoringBackend};
pub use invoke::AgentInvoker;
pub use json::normalize_payload;
pub use pool::{CallPools, DEFAULT_AUX_POOL_SIZE, DEFAULT_MAIN_POOL_SIZE};
pub use types::{
    AgentOutcome, InvokeOptions, PoolKind, StreamDelta, DEFAULT_CALL_TIMEOUT_MS,
    DEFAULT_MAX_TOKENS,
};
