//! Analysis Models
//!
//! Per-run domain entities and the accumulator that folds settling agent
//! slices into the snapshot the dashboard consumes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callsight_core::SessionConfig;
use callsight_llm::AgentOutcome;
use callsight_scoring::{
    compute_coherence, compute_readiness, detect_readiness_penalties, recommend_action,
    AiRuleFinding, CoherenceScore, IndicatorSignals, Pillar, PillarWeights, ReadinessScore,
    TriggeredPenalty,
};

use crate::dedup::{is_duplicate_objection, normalize_text};

/// A conversational moment worth pressing on, anchored to an indicator.
///
/// Identity is the indicator id plus the normalized quote; the core only
/// emits hot buttons additively, never retracts one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotButton {
    pub indicator: u8,
    pub quote: String,
}

impl HotButton {
    /// Normalized identity key for de-duplication.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.indicator, normalize_text(&self.quote))
    }
}

/// A prospect objection surfaced during the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Objection {
    pub text: String,
}

/// One agent's parsed contribution to a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentSlice {
    Indicators(IndicatorSignals),
    HotButtons(Vec<HotButton>),
    Objections(Vec<Objection>),
    CoherenceFindings(Vec<AiRuleFinding>),
    Insights(Vec<String>),
}

/// Full analysis snapshot for one run, emitted partially as agents settle
/// and in full when the run retires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub readiness: ReadinessScore,
    pub readiness_penalties: Vec<TriggeredPenalty>,
    pub action: String,
    pub coherence: CoherenceScore,
    pub pillar_averages: BTreeMap<Pillar, f64>,
    pub hot_buttons: Vec<HotButton>,
    pub objections: Vec<Objection>,
    pub insights: Vec<String>,
    /// Per-agent failure descriptions; empty on a fully clean run.
    pub errors: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
}

/// Mutable run state: everything settled agents have contributed so far.
#[derive(Debug, Default)]
pub struct RunAccumulator {
    signals: IndicatorSignals,
    hot_buttons: Vec<HotButton>,
    objections: Vec<Objection>,
    ai_findings: Vec<AiRuleFinding>,
    insights: Vec<String>,
    errors: BTreeMap<String, String>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one settled agent outcome into the run.
    ///
    /// Failures land in the error map; the parsed slice (if any) is
    /// merged additively with in-run de-duplication.
    pub fn apply(&mut self, agent: &str, outcome: &AgentOutcome, slice: Option<AgentSlice>) {
        if let Some(message) = outcome.error_message() {
            self.errors.insert(agent.to_string(), message);
            return;
        }

        match slice {
            Some(AgentSlice::Indicators(signals)) => self.signals.merge(&signals),
            Some(AgentSlice::HotButtons(buttons)) => {
                for button in buttons {
                    let identity = button.identity();
                    if !self.hot_buttons.iter().any(|b| b.identity() == identity) {
                        self.hot_buttons.push(button);
                    }
                }
            }
            Some(AgentSlice::Objections(objections)) => {
                for objection in objections {
                    let duplicate = self
                        .objections
                        .iter()
                        .any(|o| is_duplicate_objection(&o.text, &objection.text));
                    if !duplicate {
                        self.objections.push(objection);
                    }
                }
            }
            Some(AgentSlice::CoherenceFindings(findings)) => {
                self.ai_findings.extend(findings);
            }
            Some(AgentSlice::Insights(insights)) => {
                self.insights.extend(insights);
            }
            None => {
                self.errors
                    .insert(agent.to_string(), "empty slice".to_string());
            }
        }
    }

    /// Per-agent errors recorded so far.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Current signals, for partial re-scoring.
    pub fn signals(&self) -> &IndicatorSignals {
        &self.signals
    }

    /// Derive the full snapshot from the current accumulator state.
    ///
    /// Deterministic given the same state, transcript, and config; safe to
    /// re-run on every settlement.
    pub fn build_snapshot(&self, transcript: &str, config: &SessionConfig) -> AnalysisSnapshot {
        let weights = PillarWeights::with_overrides(&config.weight_overrides)
            .unwrap_or_else(|_| PillarWeights::default());

        let readiness_penalties = detect_readiness_penalties(&self.signals, transcript);
        let readiness = compute_readiness(&self.signals, &weights, &readiness_penalties);
        let coherence = compute_coherence(&self.signals, transcript, &self.ai_findings);
        let action = recommend_action(&readiness, &self.signals);

        AnalysisSnapshot {
            readiness,
            readiness_penalties,
            action,
            coherence,
            pillar_averages: self.signals.pillar_averages(),
            hot_buttons: self.hot_buttons.clone(),
            objections: self.objections.clone(),
            insights: self.insights.clone(),
            errors: self.errors.clone(),
            generated_at: Utc::now(),
        }
    }
}
