//! Runtime Configuration
//!
//! Tunables for one analysis runtime. Every timing constant in the core
//! lives here so tests can shrink them; defaults match the production
//! values.

use serde::{Deserialize, Serialize};

use callsight_llm::{DEFAULT_AUX_POOL_SIZE, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MAIN_POOL_SIZE};

/// Configuration for an `AnalysisRuntime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Foreground call pool capacity.
    #[serde(default = "default_main_pool_size")]
    pub main_pool_size: usize,
    /// Background call pool capacity.
    #[serde(default = "default_aux_pool_size")]
    pub aux_pool_size: usize,
    /// Hard deadline for a single scoring call, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Completion-to-launch throttle window, in milliseconds. Chunk
    /// bursts inside this window coalesce into one follow-up run.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Sanity ceiling for one run, in milliseconds. A run older than
    /// this no longer blocks new launches.
    #[serde(default = "default_run_ceiling_ms")]
    pub run_ceiling_ms: u64,
    /// Stream delta flush interval, in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Stream delta flush size threshold, in characters.
    #[serde(default = "default_flush_threshold_chars")]
    pub flush_threshold_chars: usize,
    /// Accumulated transcript cap, in characters; oldest text drops first.
    #[serde(default = "default_transcript_cap_chars")]
    pub transcript_cap_chars: usize,
}

fn default_main_pool_size() -> usize {
    DEFAULT_MAIN_POOL_SIZE
}

fn default_aux_pool_size() -> usize {
    DEFAULT_AUX_POOL_SIZE
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_throttle_ms() -> u64 {
    400
}

fn default_run_ceiling_ms() -> u64 {
    25_000
}

fn default_flush_interval_ms() -> u64 {
    120
}

fn default_flush_threshold_chars() -> usize {
    256
}

fn default_transcript_cap_chars() -> usize {
    48_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            main_pool_size: default_main_pool_size(),
            aux_pool_size: default_aux_pool_size(),
            call_timeout_ms: default_call_timeout_ms(),
            throttle_ms: default_throttle_ms(),
            run_ceiling_ms: default_run_ceiling_ms(),
            flush_interval_ms: default_flush_interval_ms(),
            flush_threshold_chars: default_flush_threshold_chars(),
            transcript_cap_chars: default_transcript_cap_chars(),
        }
    }
}
