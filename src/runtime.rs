//! Analysis Runtime
//!
//! The explicitly constructed root object owning everything one analysis
//! deployment needs: the scoring backend handle, the call pools, and the
//! session scheduler. Multiple independent runtimes can coexist in one
//! process; nothing here is global.

use std::sync::Arc;

use tokio::sync::mpsc;

use callsight_core::{CoreResult, SessionConfig};
use callsight_llm::{AgentInvoker, BackendError, CallPools, ScoringBackend};

use crate::config::RuntimeConfig;
use crate::emitter::{Emitter, OutboundMessage};
use crate::scheduler::SessionScheduler;

/// One live-analysis runtime.
///
/// Must be constructed and driven inside a tokio runtime; every admitted
/// analysis run executes as a detached task.
pub struct AnalysisRuntime {
    backend: Arc<dyn ScoringBackend>,
    scheduler: Arc<SessionScheduler>,
}

impl AnalysisRuntime {
    /// Construct a runtime over the given backend, sending all outbound
    /// messages to `outbound`.
    pub fn new(
        backend: Arc<dyn ScoringBackend>,
        config: RuntimeConfig,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        let pools = Arc::new(CallPools::new(config.main_pool_size, config.aux_pool_size));
        let invoker = AgentInvoker::new(Arc::clone(&backend), pools);
        let scheduler = SessionScheduler::new(invoker, Emitter::new(outbound), config);
        Self { backend, scheduler }
    }

    /// Register a new call session and return its id.
    pub fn start_session(&self, config: SessionConfig) -> CoreResult<String> {
        self.scheduler.start_session(config)
    }

    /// Feed one cleaned transcript chunk into a session. May admit a new
    /// analysis run, coalesce into a pending one, or mark the session
    /// dirty, per the scheduler's state machine.
    pub fn ingest_chunk(&self, session_id: &str, chunk: &str) -> CoreResult<()> {
        self.scheduler.ingest_chunk(session_id, chunk)
    }

    /// Update a session's configuration; forces an immediate re-run.
    pub fn update_config(&self, session_id: &str, config: SessionConfig) -> CoreResult<()> {
        self.scheduler.update_config(session_id, config)
    }

    /// Destroy a session without draining in-flight work.
    pub fn end_session(&self, session_id: &str) -> CoreResult<()> {
        self.scheduler.end_session(session_id)
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.scheduler.session_count()
    }

    /// Latest launched run sequence for a session.
    pub fn current_sequence(&self, session_id: &str) -> CoreResult<u64> {
        self.scheduler.current_sequence(session_id)
    }

    /// Probe the scoring backend.
    pub async fn health_check(&self) -> Result<(), BackendError> {
        self.backend.health_check().await
    }
}

impl std::fmt::Debug for AnalysisRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRuntime")
            .field("backend", &self.backend.name())
            .field("sessions", &self.session_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use callsight_llm::CompletionRequest;

    struct OkBackend;

    #[async_trait]
    impl ScoringBackend for OkBackend {
        fn name(&self) -> &str {
            "ok"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
            Ok("{}".to_string())
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_two_runtimes_are_independent() {
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let runtime_a = AnalysisRuntime::new(Arc::new(OkBackend), RuntimeConfig::default(), tx_a);
        let runtime_b = AnalysisRuntime::new(Arc::new(OkBackend), RuntimeConfig::default(), tx_b);

        runtime_a.start_session(SessionConfig::default()).unwrap();
        assert_eq!(runtime_a.session_count(), 1);
        assert_eq!(runtime_b.session_count(), 0);
    }

    #[tokio::test]
    async fn test_health_check_passthrough() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let runtime = AnalysisRuntime::new(Arc::new(OkBackend), RuntimeConfig::default(), tx);
        assert!(runtime.health_check().await.is_ok());
    }
}
