//! Scoring Models
//!
//! Data structures for the deterministic scoring engine: the pillar and
//! indicator model, weights, and the derived readiness/coherence scores.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use callsight_core::{CoreError, CoreResult};

/// Number of conversational indicators. Ids run 1..=INDICATOR_COUNT.
pub const INDICATOR_COUNT: u8 = 27;

/// Minimum confidence for an AI-detected rule to be merged into a run.
pub const MIN_AI_CONFIDENCE: f64 = 0.70;

/// The seven scoring pillars, each owning a fixed slice of indicator ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    PainDesire,
    Urgency,
    Decisiveness,
    Money,
    Responsibility,
    PriceSensitivity,
    Trust,
}

impl Pillar {
    /// All pillars in id order.
    pub fn all() -> [Pillar; 7] {
        [
            Pillar::PainDesire,
            Pillar::Urgency,
            Pillar::Decisiveness,
            Pillar::Money,
            Pillar::Responsibility,
            Pillar::PriceSensitivity,
            Pillar::Trust,
        ]
    }

    /// Numeric pillar id (1..=7), as used in weight overrides.
    pub fn id(&self) -> u8 {
        match self {
            Pillar::PainDesire => 1,
            Pillar::Urgency => 2,
            Pillar::Decisiveness => 3,
            Pillar::Money => 4,
            Pillar::Responsibility => 5,
            Pillar::PriceSensitivity => 6,
            Pillar::Trust => 7,
        }
    }

    /// Look up a pillar by numeric id.
    pub fn from_id(id: u8) -> Option<Pillar> {
        Pillar::all().into_iter().find(|p| p.id() == id)
    }

    /// Indicator ids belonging to this pillar (4/4/4/4/4/3/4).
    pub fn indicators(&self) -> &'static [u8] {
        match self {
            Pillar::PainDesire => &[1, 2, 3, 4],
            Pillar::Urgency => &[5, 6, 7, 8],
            Pillar::Decisiveness => &[9, 10, 11, 12],
            Pillar::Money => &[13, 14, 15, 16],
            Pillar::Responsibility => &[17, 18, 19, 20],
            Pillar::PriceSensitivity => &[21, 22, 23],
            Pillar::Trust => &[24, 25, 26, 27],
        }
    }

    /// The pillar an indicator id belongs to.
    pub fn for_indicator(indicator: u8) -> Option<Pillar> {
        Pillar::all()
            .into_iter()
            .find(|p| p.indicators().contains(&indicator))
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Pillar::PainDesire => "Pain & Desire",
            Pillar::Urgency => "Urgency",
            Pillar::Decisiveness => "Decisiveness",
            Pillar::Money => "Money",
            Pillar::Responsibility => "Responsibility",
            Pillar::PriceSensitivity => "Price Sensitivity",
            Pillar::Trust => "Trust",
        }
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Sparse indicator-to-score mapping for one run.
///
/// Scores live in [0, 10]. An absent entry is "unset": the agent never
/// reported on that indicator, which is different from reporting 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSignals {
    scores: BTreeMap<u8, f64>,
}

impl IndicatorSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one indicator score, clamped to [0, 10].
    pub fn set(&mut self, indicator: u8, score: f64) -> CoreResult<()> {
        if indicator == 0 || indicator > INDICATOR_COUNT {
            return Err(CoreError::validation(format!(
                "indicator id {} out of range",
                indicator
            )));
        }
        self.scores.insert(indicator, score.clamp(0.0, 10.0));
        Ok(())
    }

    /// Score for an indicator, or None if unset.
    pub fn get(&self, indicator: u8) -> Option<f64> {
        self.scores.get(&indicator).copied()
    }

    /// Merge another signal set over this one; newer scores win.
    pub fn merge(&mut self, other: &IndicatorSignals) {
        for (indicator, score) in &other.scores {
            self.scores.insert(*indicator, *score);
        }
    }

    /// Number of set indicators.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Average of this pillar's set, nonzero member indicators.
    ///
    /// Unset members are excluded, and a reported 0 counts as "no signal",
    /// not as a data point. A pillar with no nonzero members averages 0.
    pub fn pillar_average(&self, pillar: Pillar) -> f64 {
        let values: Vec<f64> = pillar
            .indicators()
            .iter()
            .filter_map(|id| self.get(*id))
            .filter(|score| *score > 0.0)
            .collect();
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Averages for all seven pillars.
    pub fn pillar_averages(&self) -> BTreeMap<Pillar, f64> {
        Pillar::all()
            .into_iter()
            .map(|p| (p, self.pillar_average(p)))
            .collect()
    }
}

/// Per-pillar weights applied when aggregating the readiness score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PillarWeights {
    weights: BTreeMap<Pillar, f64>,
}

impl Default for PillarWeights {
    fn default() -> Self {
        let weights = [
            (Pillar::PainDesire, 1.5),
            (Pillar::Urgency, 1.0),
            (Pillar::Decisiveness, 1.0),
            (Pillar::Money, 1.5),
            (Pillar::Responsibility, 1.0),
            (Pillar::PriceSensitivity, 1.5),
            (Pillar::Trust, 1.5),
        ]
        .into_iter()
        .collect();
        Self { weights }
    }
}

impl PillarWeights {
    /// Default weights with per-pillar overrides applied.
    ///
    /// Override keys are numeric pillar ids; values are clamped to
    /// [0, 10] individually. Unknown ids are rejected.
    pub fn with_overrides(overrides: &HashMap<u8, f64>) -> CoreResult<Self> {
        let mut weights = Self::default();
        for (id, weight) in overrides {
            let pillar = Pillar::from_id(*id).ok_or_else(|| {
                CoreError::config(format!("weight override for unknown pillar {}", id))
            })?;
            weights.weights.insert(pillar, weight.clamp(0.0, 10.0));
        }
        Ok(weights)
    }

    /// Weight for one pillar.
    pub fn get(&self, pillar: Pillar) -> f64 {
        self.weights.get(&pillar).copied().unwrap_or(0.0)
    }

    /// Theoretical maximum raw score under these weights.
    pub fn max_score(&self) -> f64 {
        Pillar::all().iter().map(|p| 10.0 * self.get(*p)).sum()
    }
}

/// Qualitative closing-readiness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessLevel {
    High,
    Medium,
    Low,
}

impl ReadinessLevel {
    /// Level for a percentage of the theoretical maximum.
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 72.0 {
            ReadinessLevel::High
        } else if percent >= 50.0 {
            ReadinessLevel::Medium
        } else {
            ReadinessLevel::Low
        }
    }
}

impl std::fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessLevel::High => write!(f, "high"),
            ReadinessLevel::Medium => write!(f, "medium"),
            ReadinessLevel::Low => write!(f, "low"),
        }
    }
}

/// Weighted closing-readiness score derived from one signal set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessScore {
    /// Raw weighted total before penalties and clamping.
    pub raw: f64,
    /// Theoretical maximum under the active weights.
    pub max: f64,
    /// Final score: raw minus penalties, clamped to [0, max], rounded.
    pub score: f64,
    /// Final score as a percentage of max (0 when max is 0).
    pub percent: f64,
    /// Qualitative level from the percentage thresholds.
    pub level: ReadinessLevel,
}

/// Where a triggered penalty came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltySource {
    /// Fixed pattern/threshold match in the deterministic pass.
    Deterministic,
    /// Model-detected, carrying the model's confidence.
    Ai { confidence: f64 },
}

/// One triggered penalty rule with its fixed point value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredPenalty {
    /// Stable rule identifier.
    pub rule_id: String,
    /// Human-readable rule label.
    pub label: String,
    /// Fixed points this trigger deducts.
    pub points: u32,
    /// Deterministic or AI-sourced.
    pub source: PenaltySource,
    /// Evidence text supporting the trigger.
    pub evidence: String,
}

/// Self-consistency score: 100 minus triggered penalties, clamped [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoherenceScore {
    pub score: u32,
    pub penalties: Vec<TriggeredPenalty>,
}

impl CoherenceScore {
    /// Build a score from a penalty list.
    pub fn from_penalties(penalties: Vec<TriggeredPenalty>) -> Self {
        let total: u32 = penalties.iter().map(|p| p.points).sum();
        Self {
            score: 100u32.saturating_sub(total),
            penalties,
        }
    }
}

/// A contradiction rule reported by the coherence-auditor agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiRuleFinding {
    pub rule_id: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: String,
}
