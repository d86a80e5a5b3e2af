//! Fan-out and emission tests: partial ordering, isolated failure, the
//! all-failed snapshot, stream delta batching, and weight overrides.

use std::sync::Arc;

use tokio::sync::mpsc;

use callsight::{
    AnalysisRuntime, OutboundMessage, RuntimeConfig, SessionConfig, AGENT_SET,
};

use crate::fixtures::{drain_for, Script, ScriptedBackend};

fn runtime_with(
    backend: Arc<ScriptedBackend>,
) -> (
    AnalysisRuntime,
    mpsc::UnboundedReceiver<OutboundMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        AnalysisRuntime::new(backend, RuntimeConfig::default(), tx),
        rx,
    )
}

#[tokio::test]
async fn test_fastest_agent_surfaces_first() {
    let backend = Arc::new(
        ScriptedBackend::new(Script::Payload {
            text: "{}".to_string(),
            delay_ms: 120,
        })
        .with_script(
            "indicators",
            Script::Payload {
                text: r#"{"indicators": {"1": 8, "2": 7, "3": 9}}"#.to_string(),
                delay_ms: 10,
            },
        ),
    );
    let (runtime, mut rx) = runtime_with(backend);

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "we keep losing deals").unwrap();

    let messages = drain_for(&mut rx, 600).await;

    let partial_agents: Vec<&str> = messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::Partial { agent, .. } => Some(agent.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(partial_agents.len(), AGENT_SET.len());
    // The fast scorer's slice surfaced without waiting on the slow ones.
    assert_eq!(partial_agents[0], "indicators");

    // Its partial already carries a re-scored readiness.
    let first_readiness = messages
        .iter()
        .find_map(|m| match m {
            OutboundMessage::Partial { readiness, .. } => Some(readiness.clone()),
            _ => None,
        })
        .unwrap();
    assert!(first_readiness.score > 0.0);

    // The final snapshot arrives after every partial.
    assert!(matches!(
        messages.last().unwrap(),
        OutboundMessage::Snapshot { .. }
    ));
}

#[tokio::test]
async fn test_all_agents_failed_still_snapshots() {
    let backend = Arc::new(ScriptedBackend::new(Script::Fail));
    let (runtime, mut rx) = runtime_with(backend);

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "anything").unwrap();

    let messages = drain_for(&mut rx, 600).await;

    let snapshot = messages
        .iter()
        .find_map(|m| match m {
            OutboundMessage::Snapshot { snapshot, .. } => Some(snapshot.clone()),
            _ => None,
        })
        .expect("run-level failure must still emit a snapshot");

    assert_eq!(snapshot.errors.len(), AGENT_SET.len());
    assert!(snapshot
        .errors
        .values()
        .all(|e| e.contains("transport error")));
    assert_eq!(snapshot.readiness.score, 0.0);
    assert_eq!(snapshot.coherence.score, 100);
    assert!(snapshot.hot_buttons.is_empty());
    assert!(snapshot.objections.is_empty());
    // The action field still guides the rep.
    assert!(!snapshot.action.is_empty());
}

#[tokio::test]
async fn test_stream_deltas_batched_and_parsed() {
    let parts = vec![
        r#"{"insights": ["#.to_string(),
        r#""prospect hesitates on price", "#.to_string(),
        r#""asks about onboarding twice"]}"#.to_string(),
    ];
    let full: String = parts.concat();
    let backend = Arc::new(
        ScriptedBackend::new(Script::Payload {
            text: "{}".to_string(),
            delay_ms: 5,
        })
        .with_script(
            "insights",
            Script::Fragments {
                parts,
                delay_ms: 10,
            },
        ),
    );
    let (runtime, mut rx) = runtime_with(backend);

    let id = runtime.start_session(SessionConfig::default()).unwrap();
    runtime.ingest_chunk(&id, "tell me about pricing").unwrap();

    let messages = drain_for(&mut rx, 800).await;

    // The batched deltas reassemble to the full streamed payload.
    let streamed: String = messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::StreamDelta { agent, content, .. } if agent == "insights" => {
                Some(content.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(streamed, full);

    // The accumulated text parsed as JSON at completion.
    let snapshot = messages
        .iter()
        .find_map(|m| match m {
            OutboundMessage::Snapshot { snapshot, .. } => Some(snapshot.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(snapshot.insights.len(), 2);
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn test_weight_overrides_flow_into_snapshot() {
    let backend = Arc::new(
        ScriptedBackend::new(Script::Payload {
            text: "{}".to_string(),
            delay_ms: 5,
        })
        .with_script(
            "indicators",
            Script::Payload {
                text: r#"{"indicators": {"1": 10, "2": 10, "3": 10, "4": 10}}"#.to_string(),
                delay_ms: 5,
            },
        ),
    );
    let (runtime, mut rx) = runtime_with(backend);

    let config = SessionConfig::default().with_weight_override(1, 3.0);
    let id = runtime.start_session(config).unwrap();
    runtime.ingest_chunk(&id, "this problem is costing us badly").unwrap();

    let messages = drain_for(&mut rx, 600).await;
    let snapshot = messages
        .iter()
        .find_map(|m| match m {
            OutboundMessage::Snapshot { snapshot, .. } => Some(snapshot.clone()),
            _ => None,
        })
        .unwrap();

    // Pain pillar at weight 3: max moves from 90 to 105, raw pain
    // contribution is 30 of it.
    assert_eq!(snapshot.readiness.max, 105.0);
    assert_eq!(snapshot.readiness.score, 30.0);
}
