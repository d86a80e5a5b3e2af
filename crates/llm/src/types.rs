//! Substrate Types
//!
//! Core types for scoring-call invocations: per-call options, the tagged
//! outcome every call resolves to, and the streaming delta unit.

use serde::{Deserialize, Serialize};

/// Default hard deadline for a single scoring call, in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 8_000;

/// Default token budget for a single scoring call.
pub const DEFAULT_MAX_TOKENS: u32 = 1_024;

/// Named concurrency pool a call draws its slot from.
///
/// `Main` serves foreground real-time analysis; `Aux` serves background
/// work. The two budgets are independent so neither side can starve the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Main,
    Aux,
}

impl Default for PoolKind {
    fn default() -> Self {
        Self::Main
    }
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::Main => write!(f, "main"),
            PoolKind::Aux => write!(f, "aux"),
        }
    }
}

/// Per-call options for a scoring invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeOptions {
    /// Maximum tokens the model may generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Hard deadline in milliseconds; expiry cancels the in-flight call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Pool this call draws its concurrency slot from.
    #[serde(default)]
    pub pool: PoolKind,
    /// Forward partial tokens to the delta sink while the call runs.
    #[serde(default)]
    pub streaming: bool,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            pool: PoolKind::Main,
            streaming: false,
        }
    }
}

impl InvokeOptions {
    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the hard deadline in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the concurrency pool.
    pub fn with_pool(mut self, pool: PoolKind) -> Self {
        self.pool = pool;
        self
    }

    /// Enable token streaming for this call.
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}

/// Tagged result of a single scoring call.
///
/// Every call resolves to exactly one of these; nothing in the substrate
/// raises an unhandled error past this boundary. Callers must match
/// exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// The call completed and its payload parsed to a JSON object.
    Completed { fields: serde_json::Value },
    /// The call completed but no JSON object could be recovered from the
    /// payload, even after normalization.
    ParseFailed { message: String },
    /// The hard deadline expired; the in-flight request was cancelled.
    TimedOut { after_ms: u64 },
    /// Network failure, non-2xx response, or backend unavailability.
    Transport {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl AgentOutcome {
    /// Whether the call produced usable fields.
    pub fn is_completed(&self) -> bool {
        matches!(self, AgentOutcome::Completed { .. })
    }

    /// The parsed fields, if the call completed.
    pub fn fields(&self) -> Option<&serde_json::Value> {
        match self {
            AgentOutcome::Completed { fields } => Some(fields),
            _ => None,
        }
    }

    /// Human-readable failure description for the run's error map.
    /// Returns None for completed calls.
    pub fn error_message(&self) -> Option<String> {
        match self {
            AgentOutcome::Completed { .. } => None,
            AgentOutcome::ParseFailed { message } => Some(format!("invalid JSON: {}", message)),
            AgentOutcome::TimedOut { after_ms } => Some(format!("timeout after {}ms", after_ms)),
            AgentOutcome::Transport { message, status } => match status {
                Some(s) => Some(format!("transport error ({}): {}", s, message)),
                None => Some(format!("transport error: {}", message)),
            },
        }
    }
}

/// One forwarded token fragment from a streaming call, tagged with the
/// logical agent that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamDelta {
    pub agent: String,
    pub content: String,
}
