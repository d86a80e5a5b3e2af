//! Session State
//!
//! Per-call mutable state owned exclusively by the scheduler: the bounded
//! accumulated transcript, configuration, the monotonic run sequence, and
//! the run-lifecycle flags. Destroyed without drain when the call ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use callsight_core::SessionConfig;

/// Lifecycle of a session's current analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in flight.
    Idle,
    /// A fan-out is in flight since the given instant.
    Running { since: Instant },
}

/// Validates that a run is still the session's latest before its output
/// may surface. Lock-free so fan-out tasks can check it per emission.
#[derive(Debug, Clone)]
pub struct RunTicket {
    sequence: u64,
    current: Arc<AtomicU64>,
}

impl RunTicket {
    pub fn new(sequence: u64, current: Arc<AtomicU64>) -> Self {
        Self { sequence, current }
    }

    /// This run's sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether no newer run has launched for the session.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.sequence
    }
}

/// State for one active call.
#[derive(Debug)]
pub struct SessionState {
    pub id: String,
    pub config: SessionConfig,
    transcript: String,
    transcript_cap: usize,
    /// Transcript length at the last launched run's snapshot.
    pub last_analyzed_offset: usize,
    current_sequence: Arc<AtomicU64>,
    pub run_state: RunState,
    pub dirty: bool,
    pub last_completed_at: Option<Instant>,
}

impl SessionState {
    pub fn new(id: impl Into<String>, config: SessionConfig, transcript_cap: usize) -> Self {
        Self {
            id: id.into(),
            config,
            transcript: String::new(),
            transcript_cap,
            last_analyzed_offset: 0,
            current_sequence: Arc::new(AtomicU64::new(0)),
            run_state: RunState::Idle,
            dirty: false,
            last_completed_at: None,
        }
    }

    /// Append one cleaned transcript chunk, trimming the oldest text when
    /// the cap is exceeded.
    pub fn append_chunk(&mut self, chunk: &str) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return;
        }
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(chunk);

        if self.transcript.len() > self.transcript_cap {
            let mut cut = self.transcript.len() - self.transcript_cap;
            while !self.transcript.is_char_boundary(cut) {
                cut += 1;
            }
            self.transcript.drain(..cut);
            self.last_analyzed_offset = self.last_analyzed_offset.saturating_sub(cut);
        }
    }

    /// The full accumulated transcript.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Replace the session configuration mid-call.
    pub fn apply_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /// The latest launched sequence number.
    pub fn sequence(&self) -> u64 {
        self.current_sequence.load(Ordering::SeqCst)
    }

    /// Advance to the next sequence number and return it.
    pub fn bump_sequence(&mut self) -> u64 {
        self.current_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Shared handle for run tickets.
    pub fn sequence_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.current_sequence)
    }
}

/// Suffix of `text` at most `chars` bytes long, starting on a char
/// boundary. The recency window every agent sees is a suffix, so trimming
/// the transcript front never changes window content.
pub fn recency_window(text: &str, chars: usize) -> &str {
    if text.len() <= chars {
        return text;
    }
    let mut start = text.len() - chars;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
