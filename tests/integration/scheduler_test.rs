//! Scheduler state-machine tests: coalescing, throttling, stuck-run
//! recovery, and stale-result suppression, driven through the runtime.

use std::sync::Arc;

use tokio::sync::mpsc;

use callsight::{
    AnalysisRuntime, OutboundMessage, RuntimeConfig, SessionConfig,
};

use crate::fixtures::{drain_for, snapshot_sequences, Script, ScriptedBackend};

fn runtime_with(
    backend: Arc<ScriptedBackend>,
    config: RuntimeConfig,
) -> (
    AnalysisRuntime,
    mpsc::UnboundedReceiver<OutboundMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AnalysisRuntime::new(backend, config, tx), rx)
}

fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        throttle_ms: 0,
        run_ceiling_ms: 50,
        call_timeout_ms: 2_000,
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn test_out_of_order_settles_surface_only_latest() {
    // Per-run agent delays: run 1 is slow (500ms), run 2 slower (600ms),
    // run 3 fast (100ms). With a 50ms ceiling, chunks at ~0/80/160ms
    // launch three runs that settle in the order 3, 1, 2.
    let backend = Arc::new(ScriptedBackend::new(Script::DelaySequence {
        text: "{}".to_string(),
        delays: vec![500, 600, 100],
    }));
    let (runtime, mut rx) = runtime_with(Arc::clone(&backend), fast_config());

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "first fragment").unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    runtime.ingest_chunk(&id, "second fragment").unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    runtime.ingest_chunk(&id, "third fragment").unwrap();
    assert_eq!(runtime.current_sequence(&id).unwrap(), 3);

    let messages = drain_for(&mut rx, 1_200).await;

    // Runs 1 and 2 settled after run 3 launched: dropped silently.
    assert_eq!(snapshot_sequences(&messages), vec![3]);
    assert!(messages.iter().all(|m| m.sequence() == 3));
}

#[tokio::test]
async fn test_burst_while_running_schedules_one_follow_up() {
    let backend = Arc::new(ScriptedBackend::new(Script::Payload {
        text: "{}".to_string(),
        delay_ms: 250,
    }));
    let (runtime, mut rx) = runtime_with(Arc::clone(&backend), RuntimeConfig::default());

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "chunk one").unwrap();

    // Three more chunks while run 1 is in flight: coalesce into one
    // dirty flag, not three queued runs.
    for chunk in ["chunk two", "chunk three", "chunk four"] {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        runtime.ingest_chunk(&id, chunk).unwrap();
    }

    let messages = drain_for(&mut rx, 1_000).await;

    // Exactly two runs: the original and one follow-up.
    assert_eq!(snapshot_sequences(&messages), vec![1, 2]);
    assert_eq!(backend.call_count(), 2 * callsight::AGENT_SET.len());
}

#[tokio::test]
async fn test_throttle_coalesces_until_next_event_or_force() {
    let backend = Arc::new(ScriptedBackend::new(Script::Payload {
        text: "{}".to_string(),
        delay_ms: 10,
    }));
    let config = RuntimeConfig {
        throttle_ms: 60_000,
        ..RuntimeConfig::default()
    };
    let (runtime, mut rx) = runtime_with(Arc::clone(&backend), config);

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "first").unwrap();
    let messages = drain_for(&mut rx, 300).await;
    assert_eq!(snapshot_sequences(&messages), vec![1]);

    // A chunk right after completion lands inside the throttle window:
    // marked dirty, no launch.
    runtime.ingest_chunk(&id, "second").unwrap();
    assert_eq!(runtime.current_sequence(&id).unwrap(), 1);

    // A config update is forced and bypasses the throttle.
    runtime
        .update_config(&id, SessionConfig::default().with_prospect_type("referral"))
        .unwrap();
    assert_eq!(runtime.current_sequence(&id).unwrap(), 2);

    let messages = drain_for(&mut rx, 300).await;
    assert_eq!(snapshot_sequences(&messages), vec![2]);
}

#[tokio::test]
async fn test_stuck_run_stops_blocking_new_events() {
    // Calls hang until the 400ms call timeout; the 50ms ceiling clears
    // the pending state long before that.
    let backend = Arc::new(ScriptedBackend::new(Script::DelaySequence {
        text: "{}".to_string(),
        delays: vec![10_000, 10],
    }));
    let config = RuntimeConfig {
        throttle_ms: 0,
        run_ceiling_ms: 50,
        call_timeout_ms: 400,
        ..RuntimeConfig::default()
    };
    let (runtime, mut rx) = runtime_with(Arc::clone(&backend), config);

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "first").unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    // The stuck run no longer blocks admission.
    runtime.ingest_chunk(&id, "second").unwrap();
    assert_eq!(runtime.current_sequence(&id).unwrap(), 2);

    let messages = drain_for(&mut rx, 800).await;
    // Run 2 surfaced; run 1's late all-timeout result was dropped.
    assert_eq!(snapshot_sequences(&messages), vec![2]);
}

#[tokio::test]
async fn test_ended_session_emits_nothing_further() {
    let backend = Arc::new(ScriptedBackend::new(Script::Payload {
        text: "{}".to_string(),
        delay_ms: 200,
    }));
    let (runtime, mut rx) = runtime_with(Arc::clone(&backend), RuntimeConfig::default());

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "only chunk").unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    runtime.end_session(&id).unwrap();

    // The in-flight run settles after destruction: discarded, no drain.
    let messages = drain_for(&mut rx, 500).await;
    assert!(messages.is_empty());
}
