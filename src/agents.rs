//! Logical Agent Catalogue
//!
//! The fixed set of scoring passes one analysis run fans out to. Each
//! agent sees a differently sized recency window of the transcript: fast
//! scorers get a short window for latency, cross-conversation auditors a
//! large one for context. Window size, pool, token budget, and streaming
//! are per-agent properties of the catalogue, not of the caller.

use callsight_llm::{InvokeOptions, PoolKind};
use callsight_scoring::{AiRuleFinding, IndicatorSignals, INDICATOR_COUNT};
use serde_json::Value;

use callsight_core::SessionConfig;

use crate::models::{AgentSlice, HotButton, Objection};

/// Indicator scorer: fast pass mapping recent speech to indicator scores.
pub const AGENT_INDICATORS: &str = "indicators";
/// Hot-button spotter: emotionally loaded quotes worth pressing on.
pub const AGENT_HOT_BUTTONS: &str = "hot_buttons";
/// Objection spotter: explicit pushback and stalls.
pub const AGENT_OBJECTIONS: &str = "objections";
/// Coherence auditor: cross-conversation contradiction findings.
pub const AGENT_COHERENCE: &str = "coherence";
/// Insight synthesizer: free-form coaching observations, streamed.
pub const AGENT_INSIGHTS: &str = "insights";

/// One logical agent in the fan-out set.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub name: &'static str,
    /// Recency window of the transcript this agent sees, in characters.
    pub window_chars: usize,
    pub pool: PoolKind,
    pub max_tokens: u32,
    pub streaming: bool,
}

impl AgentSpec {
    /// Invoke options for this agent under the given call deadline.
    pub fn invoke_options(&self, call_timeout_ms: u64) -> InvokeOptions {
        let options = InvokeOptions::default()
            .with_max_tokens(self.max_tokens)
            .with_timeout_ms(call_timeout_ms)
            .with_pool(self.pool);
        if self.streaming {
            options.streaming()
        } else {
            options
        }
    }
}

/// The fixed fan-out set. One run launches all of these in parallel
/// against the same snapshot.
pub const AGENT_SET: &[AgentSpec] = &[
    AgentSpec {
        name: AGENT_INDICATORS,
        window_chars: 2_400,
        pool: PoolKind::Main,
        max_tokens: 768,
        streaming: false,
    },
    AgentSpec {
        name: AGENT_HOT_BUTTONS,
        window_chars: 1_200,
        pool: PoolKind::Main,
        max_tokens: 384,
        streaming: false,
    },
    AgentSpec {
        name: AGENT_OBJECTIONS,
        window_chars: 1_200,
        pool: PoolKind::Main,
        max_tokens: 384,
        streaming: false,
    },
    AgentSpec {
        name: AGENT_COHERENCE,
        window_chars: 9_000,
        pool: PoolKind::Main,
        max_tokens: 512,
        streaming: false,
    },
    AgentSpec {
        name: AGENT_INSIGHTS,
        window_chars: 9_000,
        pool: PoolKind::Main,
        max_tokens: 640,
        streaming: true,
    },
];

/// Look up an agent spec by name.
pub fn agent_spec(name: &str) -> Option<&'static AgentSpec> {
    AGENT_SET.iter().find(|spec| spec.name == name)
}

/// System prompt for one agent, folding in session configuration.
pub fn system_prompt(spec: &AgentSpec, config: &SessionConfig) -> String {
    let role = match spec.name {
        AGENT_INDICATORS => format!(
            "You score a live sales call. Rate conversational indicators 1-{} \
             from 0 (absent) to 10 (strong), reporting only indicators the \
             recent speech gives evidence for. Respond with a JSON object: \
             {{\"indicators\": {{\"<id>\": <score>}}}}.",
            INDICATOR_COUNT
        ),
        AGENT_HOT_BUTTONS => "You spot emotionally loaded prospect statements on a live sales \
             call. Respond with a JSON object: {\"hotButtons\": [{\"indicator\": <id>, \
             \"quote\": \"<verbatim>\"}]}."
            .to_string(),
        AGENT_OBJECTIONS => "You spot prospect objections and stalls on a live sales call. \
             Respond with a JSON object: {\"objections\": [{\"text\": \"<objection>\"}]}."
            .to_string(),
        AGENT_COHERENCE => "You audit a live sales call for self-contradictions by the prospect. \
             Respond with a JSON object: {\"findings\": [{\"ruleId\": \"<rule>\", \
             \"confidence\": <0..1>, \"evidence\": \"<quote>\"}]}."
            .to_string(),
        AGENT_INSIGHTS => "You coach a sales rep live. Respond with a JSON object: \
             {\"insights\": [\"<short observation>\"]}."
            .to_string(),
        other => format!("You analyze a live sales call ({}).", other),
    };

    let mut prompt = role;
    if let Some(prospect_type) = &config.prospect_type {
        prompt.push_str(&format!(" Prospect type: {}.", prospect_type));
    }
    if let Some(script) = &config.custom_script {
        prompt.push_str(&format!(" The rep follows this script: {}", script));
    }
    prompt
}

/// User prompt carrying the agent's transcript window.
pub fn user_prompt(window: &str) -> String {
    format!("Recent transcript:\n{}", window)
}

/// Parse one agent's payload into its typed slice.
///
/// Parsing is tolerant: malformed entries are skipped, a missing top-level
/// key yields an empty slice rather than a failure. The substrate already
/// guaranteed the payload is a JSON object.
pub fn parse_slice(agent: &str, fields: &Value) -> AgentSlice {
    match agent {
        AGENT_INDICATORS => AgentSlice::Indicators(parse_indicators(fields)),
        AGENT_HOT_BUTTONS => AgentSlice::HotButtons(parse_hot_buttons(fields)),
        AGENT_OBJECTIONS => AgentSlice::Objections(parse_objections(fields)),
        AGENT_COHERENCE => AgentSlice::CoherenceFindings(parse_findings(fields)),
        _ => AgentSlice::Insights(parse_insights(fields)),
    }
}

fn parse_indicators(fields: &Value) -> IndicatorSignals {
    let mut signals = IndicatorSignals::new();
    let Some(map) = fields.get("indicators").and_then(Value::as_object) else {
        return signals;
    };
    for (key, value) in map {
        let Ok(indicator) = key.parse::<u8>() else {
            continue;
        };
        let Some(score) = value.as_f64() else {
            continue;
        };
        // Out-of-range ids are skipped, not fatal.
        let _ = signals.set(indicator, score);
    }
    signals
}

fn parse_hot_buttons(fields: &Value) -> Vec<HotButton> {
    let Some(entries) = fields.get("hotButtons").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let indicator = entry.get("indicator")?.as_u64()? as u8;
            let quote = entry.get("quote")?.as_str()?.trim();
            if quote.is_empty() || indicator == 0 || indicator > INDICATOR_COUNT {
                return None;
            }
            Some(HotButton {
                indicator,
                quote: quote.to_string(),
            })
        })
        .collect()
}

fn parse_objections(fields: &Value) -> Vec<Objection> {
    let Some(entries) = fields.get("objections").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            // Accept both {"text": "..."} entries and bare strings.
            let text = entry
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| entry.as_str())?
                .trim();
            (!text.is_empty()).then(|| Objection {
                text: text.to_string(),
            })
        })
        .collect()
}

fn parse_findings(fields: &Value) -> Vec<AiRuleFinding> {
    let Some(entries) = fields.get("findings").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<AiRuleFinding>(entry.clone()).ok())
        .collect()
}

fn parse_insights(fields: &Value) -> Vec<String> {
    let Some(entries) = fields.get("insights").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| entry.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
