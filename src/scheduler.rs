//! Per-Session Analysis Scheduler
//!
//! Owns every session's run lifecycle: admits or coalesces runs as chunks
//! arrive, guards emissions with sequence numbers, recovers stuck runs,
//! and schedules the dirty follow-up after settlement.
//!
//! State machine per session: `idle -> running -> (idle | running+dirty)`.
//! - A new event while running sets the dirty flag; never a second
//!   concurrent run per session.
//! - A new event while idle inside the throttle window of the last
//!   completion coalesces into the dirty flag, unless forced.
//! - On settlement, output is emitted only if the run's sequence is still
//!   the session's latest; a dirty session relaunches immediately,
//!   bypassing the throttle.
//! - A run older than the ceiling stops blocking new launches; its late
//!   result is dropped by the sequence check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use callsight_core::{CoreError, CoreResult, SessionConfig};
use callsight_llm::AgentInvoker;

use crate::config::RuntimeConfig;
use crate::emitter::Emitter;
use crate::fanout::{execute_run, RunContext};
use crate::models::AnalysisSnapshot;
use crate::session::{RunState, RunTicket, SessionState};

/// Scheduler over all active sessions of one runtime.
pub struct SessionScheduler {
    sessions: Mutex<HashMap<String, SessionState>>,
    invoker: AgentInvoker,
    emitter: Emitter,
    config: RuntimeConfig,
}

impl SessionScheduler {
    pub fn new(invoker: AgentInvoker, emitter: Emitter, config: RuntimeConfig) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            invoker,
            emitter,
            config,
        })
    }

    /// Register a new call session and return its id.
    pub fn start_session(&self, config: SessionConfig) -> CoreResult<String> {
        config.validate()?;
        let id = Uuid::new_v4().to_string();
        let session = SessionState::new(&id, config, self.config.transcript_cap_chars);

        let mut sessions = self.lock_sessions();
        sessions.insert(id.clone(), session);
        info!(session_id = %id, "session started");
        Ok(id)
    }

    /// Ingest one cleaned transcript chunk for a session.
    pub fn ingest_chunk(self: &Arc<Self>, session_id: &str, chunk: &str) -> CoreResult<()> {
        let mut sessions = self.lock_sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::not_found(format!("session {}", session_id)))?;
        session.append_chunk(chunk);
        self.maybe_launch(session, false);
        Ok(())
    }

    /// Apply a configuration update mid-session. Forces an immediate
    /// re-run, bypassing the throttle.
    pub fn update_config(self: &Arc<Self>, session_id: &str, config: SessionConfig) -> CoreResult<()> {
        config.validate()?;
        let mut sessions = self.lock_sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::not_found(format!("session {}", session_id)))?;
        session.apply_config(config);
        info!(session_id, "session config updated; forcing re-run");
        self.maybe_launch(session, true);
        Ok(())
    }

    /// Destroy a session. In-flight run output is discarded on settle;
    /// nothing is drained.
    pub fn end_session(&self, session_id: &str) -> CoreResult<()> {
        let mut sessions = self.lock_sessions();
        let mut session = sessions
            .remove(session_id)
            .ok_or_else(|| CoreError::not_found(format!("session {}", session_id)))?;
        // Invalidate outstanding run tickets so an in-flight run stops
        // emitting partials the moment the session is gone.
        session.bump_sequence();
        info!(session_id, "session ended");
        Ok(())
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Latest launched sequence for a session, for observability.
    pub fn current_sequence(&self, session_id: &str) -> CoreResult<u64> {
        let sessions = self.lock_sessions();
        sessions
            .get(session_id)
            .map(|s| s.sequence())
            .ok_or_else(|| CoreError::not_found(format!("session {}", session_id)))
    }

    /// Admission decision for one new event. Caller holds the session via
    /// the registry lock.
    fn maybe_launch(self: &Arc<Self>, session: &mut SessionState, force: bool) {
        // Stuck-run recovery: a run past the ceiling no longer blocks new
        // launches. Its late result is dropped by the sequence check once
        // a successor launches.
        if let RunState::Running { since } = session.run_state {
            if since.elapsed() >= Duration::from_millis(self.config.run_ceiling_ms) {
                warn!(
                    session_id = %session.id,
                    sequence = session.sequence(),
                    "run exceeded ceiling; clearing pending state"
                );
                session.run_state = RunState::Idle;
            }
        }

        match session.run_state {
            RunState::Running { .. } => {
                session.dirty = true;
                debug!(session_id = %session.id, "run in flight; marked dirty");
            }
            RunState::Idle => {
                if !force && self.inside_throttle(session) {
                    session.dirty = true;
                    debug!(session_id = %session.id, "inside throttle window; coalesced");
                } else {
                    self.launch(session);
                }
            }
        }
    }

    fn inside_throttle(&self, session: &SessionState) -> bool {
        session
            .last_completed_at
            .map(|at| at.elapsed() < Duration::from_millis(self.config.throttle_ms))
            .unwrap_or(false)
    }

    /// Launch a run for the session's current state. Caller holds the
    /// registry lock; the fan-out itself runs detached.
    fn launch(self: &Arc<Self>, session: &mut SessionState) {
        let sequence = session.bump_sequence();
        let ticket = RunTicket::new(sequence, session.sequence_handle());
        let ctx = RunContext {
            session_id: session.id.clone(),
            ticket,
            transcript: session.transcript().to_string(),
            config: session.config.clone(),
        };
        session.last_analyzed_offset = session.transcript().len();
        session.run_state = RunState::Running {
            since: Instant::now(),
        };
        session.dirty = false;

        let scheduler = Arc::clone(self);
        let invoker = self.invoker.clone();
        let emitter = self.emitter.clone();
        let config = self.config.clone();
        let session_id = ctx.session_id.clone();

        tokio::spawn(async move {
            let snapshot = execute_run(invoker, emitter, config, ctx).await;
            scheduler.on_run_settled(&session_id, sequence, snapshot);
        });
    }

    /// Apply a settled run's result under the state machine rules.
    fn on_run_settled(self: &Arc<Self>, session_id: &str, sequence: u64, snapshot: AnalysisSnapshot) {
        let mut sessions = self.lock_sessions();
        let Some(session) = sessions.get_mut(session_id) else {
            debug!(session_id, sequence, "session gone; run result discarded");
            return;
        };

        if sequence != session.sequence() {
            // A newer run launched while this one was in flight; its
            // output must never clobber newer state.
            debug!(
                session_id,
                sequence,
                current = session.sequence(),
                "stale run result dropped"
            );
            return;
        }

        self.emitter.snapshot(session_id, sequence, snapshot);
        session.run_state = RunState::Idle;
        session.last_completed_at = Some(Instant::now());

        if session.dirty {
            debug!(session_id, "dirty at settlement; scheduling follow-up run");
            self.launch(session);
        }
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionState>> {
        // Sessions are only touched under this lock and never across an
        // await; a poisoned lock means a panic elsewhere already broke the
        // process invariants.
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for SessionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("sessions", &self.session_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use callsight_llm::{BackendError, CallPools, CompletionRequest, ScoringBackend};
    use tokio::sync::mpsc;

    struct InstantBackend;

    #[async_trait]
    impl ScoringBackend for InstantBackend {
        fn name(&self) -> &str {
            "instant"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
            Ok("{}".to_string())
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn scheduler() -> (Arc<SessionScheduler>, mpsc::UnboundedReceiver<crate::emitter::OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let invoker = AgentInvoker::new(Arc::new(InstantBackend), Arc::new(CallPools::default()));
        let scheduler = SessionScheduler::new(invoker, Emitter::new(tx), RuntimeConfig::default());
        (scheduler, rx)
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (scheduler, _rx) = scheduler();
        let id = scheduler.start_session(SessionConfig::default()).unwrap();
        assert_eq!(scheduler.session_count(), 1);

        scheduler.end_session(&id).unwrap();
        assert_eq!(scheduler.session_count(), 0);
        assert!(scheduler.end_session(&id).is_err());
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let (scheduler, _rx) = scheduler();
        assert!(scheduler.ingest_chunk("nope", "text").is_err());
        assert!(scheduler
            .update_config("nope", SessionConfig::default())
            .is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (scheduler, _rx) = scheduler();
        let bad = SessionConfig::default().with_weight_override(9, 1.0);
        assert!(scheduler.start_session(bad).is_err());
    }

    #[tokio::test]
    async fn test_chunk_launches_run() {
        let (scheduler, _rx) = scheduler();
        let id = scheduler.start_session(SessionConfig::default()).unwrap();
        scheduler.ingest_chunk(&id, "hello prospect").unwrap();
        assert_eq!(scheduler.current_sequence(&id).unwrap(), 1);
    }
}
