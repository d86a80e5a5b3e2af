//! Agent Fan-Out
//!
//! Executes one analysis run: launches the fixed agent set as independent
//! tasks against one immutable transcript snapshot, folds each settling
//! agent into the run accumulator, re-scores deterministically, and emits
//! a partial update per settlement. Per-agent failure is isolated; the
//! run proceeds with whatever settles. Partial success is the design, not
//! a failure mode.

use tokio::sync::mpsc;
use tracing::{debug, info};

use callsight_core::SessionConfig;
use callsight_llm::{AgentInvoker, AgentOutcome, StreamDelta};

use crate::agents::{parse_slice, system_prompt, user_prompt, AGENT_SET};
use crate::config::RuntimeConfig;
use crate::emitter::{Emitter, StreamBatcher};
use crate::models::{AnalysisSnapshot, RunAccumulator};
use crate::session::{recency_window, RunTicket};

/// Immutable input for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session_id: String,
    pub ticket: RunTicket,
    /// Transcript snapshot taken at launch; agents window into this.
    pub transcript: String,
    pub config: SessionConfig,
}

/// Execute one full fan-out and return the final snapshot.
///
/// Never fails: an all-agents-failed run still returns a snapshot with
/// empty fields and a populated error map. Emission of the returned
/// snapshot is the scheduler's call; partials are emitted here as agents
/// settle, each gated on the run still being current.
pub async fn execute_run(
    invoker: AgentInvoker,
    emitter: Emitter,
    config: RuntimeConfig,
    ctx: RunContext,
) -> AnalysisSnapshot {
    let sequence = ctx.ticket.sequence();
    info!(
        session_id = %ctx.session_id,
        sequence,
        transcript_chars = ctx.transcript.len(),
        "run launched"
    );

    let (delta_tx, delta_rx) = mpsc::channel::<StreamDelta>(256);
    let batcher = tokio::spawn(StreamBatcher::run(
        emitter.clone(),
        ctx.session_id.clone(),
        ctx.ticket.clone(),
        delta_rx,
        config.flush_interval_ms,
        config.flush_threshold_chars,
    ));

    let (results_tx, mut results_rx) = mpsc::channel::<(&'static str, AgentOutcome)>(AGENT_SET.len());

    for spec in AGENT_SET {
        let invoker = invoker.clone();
        let results_tx = results_tx.clone();
        let deltas = spec.streaming.then(|| delta_tx.clone());
        let system = system_prompt(spec, &ctx.config);
        let user = user_prompt(recency_window(&ctx.transcript, spec.window_chars));
        let options = spec.invoke_options(config.call_timeout_ms);

        tokio::spawn(async move {
            let outcome = invoker
                .invoke(spec.name, &system, &user, options, deltas)
                .await;
            // Receiver gone means the run was dropped wholesale; nothing
            // left to do with this result.
            let _ = results_tx.send((spec.name, outcome)).await;
        });
    }
    drop(results_tx);
    drop(delta_tx);

    let mut accumulator = RunAccumulator::new();
    let mut settled = 0usize;

    while let Some((agent, outcome)) = results_rx.recv().await {
        settled += 1;
        let slice = outcome.fields().map(|fields| parse_slice(agent, fields));
        let slice_value = outcome.fields().cloned().unwrap_or(serde_json::Value::Null);
        let error = outcome.error_message();
        accumulator.apply(agent, &outcome, slice);

        debug!(
            session_id = %ctx.session_id,
            sequence,
            agent,
            settled,
            failed = error.is_some(),
            "agent settled"
        );

        // Surface the fastest signal immediately, but never for a run a
        // newer sequence has superseded.
        if ctx.ticket.is_current() {
            let scored = accumulator.build_snapshot(&ctx.transcript, &ctx.config);
            emitter.partial(
                &ctx.session_id,
                sequence,
                agent,
                slice_value,
                error,
                scored.readiness,
                scored.coherence,
            );
        }
    }

    // All delta senders are gone once every agent task finished; wait for
    // the batcher to flush the tail before the final snapshot goes out.
    let _ = batcher.await;

    let snapshot = accumulator.build_snapshot(&ctx.transcript, &ctx.config);
    info!(
        session_id = %ctx.session_id,
        sequence,
        errors = snapshot.errors.len(),
        readiness = snapshot.readiness.score,
        coherence = snapshot.coherence.score,
        "run settled"
    );
    snapshot
}
