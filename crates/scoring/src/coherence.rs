//! Coherence Rules
//!
//! Detects self-contradictions in the prospect's signals: cross-pillar
//! threshold conjunctions and literal text-pattern conjunctions, plus
//! reconciliation of model-detected rules against the deterministic pass.
//! The whole pass is a pure function of its inputs.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{
    AiRuleFinding, CoherenceScore, IndicatorSignals, PenaltySource, Pillar, TriggeredPenalty,
    MIN_AI_CONFIDENCE,
};

/// A cross-pillar contradiction: one pillar reads strong while another
/// reads weak-but-reported.
struct PillarConflictRule {
    id: &'static str,
    label: &'static str,
    points: u32,
    high_pillar: Pillar,
    high_min: f64,
    low_pillar: Pillar,
    low_max: f64,
}

/// A literal text contradiction: a phrase from set A and a phrase from
/// set B both appear in the transcript.
struct PhraseConflictRule {
    id: &'static str,
    label: &'static str,
    points: u32,
    set_a: &'static [&'static str],
    set_b: &'static [&'static str],
}

const PILLAR_RULES: &[PillarConflictRule] = &[
    PillarConflictRule {
        id: "pain_without_urgency",
        label: "Strong pain but no urgency",
        points: 20,
        high_pillar: Pillar::PainDesire,
        high_min: 7.0,
        low_pillar: Pillar::Urgency,
        low_max: 4.0,
    },
    PillarConflictRule {
        id: "desire_without_money",
        label: "Strong desire but no budget signal",
        points: 15,
        high_pillar: Pillar::PainDesire,
        high_min: 7.0,
        low_pillar: Pillar::Money,
        low_max: 3.0,
    },
    PillarConflictRule {
        id: "decisive_but_stalling",
        label: "Claims decisiveness while stalling",
        points: 15,
        high_pillar: Pillar::Decisiveness,
        high_min: 7.0,
        low_pillar: Pillar::Urgency,
        low_max: 3.0,
    },
    PillarConflictRule {
        id: "trust_price_conflict",
        label: "High trust but price resistance",
        points: 10,
        high_pillar: Pillar::Trust,
        high_min: 7.0,
        low_pillar: Pillar::PriceSensitivity,
        low_max: 3.0,
    },
];

const PHRASE_RULES: &[PhraseConflictRule] = &[
    PhraseConflictRule {
        id: "verbal_commitment_reversal",
        label: "Verbal commitment followed by retreat",
        points: 25,
        set_a: &["sounds great", "i'm ready", "let's do it", "sign me up"],
        set_b: &["need to think", "not sure", "maybe later", "hold off"],
    },
    PhraseConflictRule {
        id: "budget_contradiction",
        label: "Budget claims contradict each other",
        points: 30,
        set_a: &[
            "money isn't an issue",
            "budget isn't a problem",
            "can afford",
        ],
        set_b: &["too expensive", "can't afford", "out of budget"],
    },
    PhraseConflictRule {
        id: "authority_contradiction",
        label: "Claims authority then defers the decision",
        points: 20,
        set_a: &["my decision", "i decide", "up to me"],
        set_b: &[
            "ask my wife",
            "ask my husband",
            "talk to my partner",
            "check with my boss",
        ],
    },
    PhraseConflictRule {
        id: "timeline_contradiction",
        label: "Urgent timeline contradicted later",
        points: 15,
        set_a: &["asap", "right away", "immediately", "urgent"],
        set_b: &["next year", "someday", "eventually", "no rush"],
    },
];

/// Run the deterministic coherence pass over one snapshot.
pub fn detect_deterministic(
    signals: &IndicatorSignals,
    transcript: &str,
) -> Vec<TriggeredPenalty> {
    let mut triggered = Vec::new();
    let haystack = transcript.to_lowercase();

    for rule in PILLAR_RULES {
        let high = signals.pillar_average(rule.high_pillar);
        let low = signals.pillar_average(rule.low_pillar);
        // The low side must be reported (> 0); a silent pillar is not a
        // contradiction, just missing data.
        if high >= rule.high_min && low > 0.0 && low <= rule.low_max {
            triggered.push(TriggeredPenalty {
                rule_id: rule.id.to_string(),
                label: rule.label.to_string(),
                points: rule.points,
                source: PenaltySource::Deterministic,
                evidence: format!(
                    "{} avg {:.2} vs {} avg {:.2}",
                    rule.high_pillar, high, rule.low_pillar, low
                ),
            });
        }
    }

    for rule in PHRASE_RULES {
        let hit_a = rule.set_a.iter().find(|p| haystack.contains(**p));
        let hit_b = rule.set_b.iter().find(|p| haystack.contains(**p));
        if let (Some(a), Some(b)) = (hit_a, hit_b) {
            triggered.push(TriggeredPenalty {
                rule_id: rule.id.to_string(),
                label: rule.label.to_string(),
                points: rule.points,
                source: PenaltySource::Deterministic,
                evidence: format!("\"{}\" together with \"{}\"", a, b),
            });
        }
    }

    triggered
}

/// Merge AI-detected rule findings against the deterministic pass.
///
/// A finding is accepted only when its confidence clears
/// `MIN_AI_CONFIDENCE`, its rule id exists in the catalogue, and the
/// deterministic pass did not already flag that rule id this run.
pub fn reconcile_ai_findings(
    deterministic: &[TriggeredPenalty],
    findings: &[AiRuleFinding],
) -> Vec<TriggeredPenalty> {
    let flagged: HashSet<&str> = deterministic.iter().map(|p| p.rule_id.as_str()).collect();
    let mut merged = Vec::new();
    let mut accepted: HashSet<&str> = HashSet::new();

    for finding in findings {
        if finding.confidence < MIN_AI_CONFIDENCE {
            debug!(rule = %finding.rule_id, confidence = finding.confidence, "AI finding below confidence floor");
            continue;
        }
        if flagged.contains(finding.rule_id.as_str()) {
            debug!(rule = %finding.rule_id, "AI finding suppressed: already flagged deterministically");
            continue;
        }
        if !accepted.insert(finding.rule_id.as_str()) {
            continue;
        }
        let Some((label, points)) = catalogue_entry(&finding.rule_id) else {
            debug!(rule = %finding.rule_id, "AI finding for unknown rule id dropped");
            continue;
        };
        merged.push(TriggeredPenalty {
            rule_id: finding.rule_id.clone(),
            label: label.to_string(),
            points,
            source: PenaltySource::Ai {
                confidence: finding.confidence,
            },
            evidence: finding.evidence.clone(),
        });
    }

    merged
}

/// Compute the coherence score for one snapshot.
pub fn compute_coherence(
    signals: &IndicatorSignals,
    transcript: &str,
    findings: &[AiRuleFinding],
) -> CoherenceScore {
    let mut penalties = detect_deterministic(signals, transcript);
    penalties.extend(reconcile_ai_findings(&penalties, findings));
    CoherenceScore::from_penalties(penalties)
}

/// Label and fixed point value for a catalogued rule id.
fn catalogue_entry(rule_id: &str) -> Option<(&'static str, u32)> {
    PILLAR_RULES
        .iter()
        .map(|r| (r.id, r.label, r.points))
        .chain(PHRASE_RULES.iter().map(|r| (r.id, r.label, r.points)))
        .find(|(id, _, _)| *id == rule_id)
        .map(|(_, label, points)| (label, points))
}
