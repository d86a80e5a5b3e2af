//! Readiness Penalty Catalogue
//!
//! A small fixed-rule set applied on top of the raw readiness total,
//! independent of the coherence catalogue: the two feed different scores
//! with different point values and are kept separately testable. Every
//! matching instance applies, not just the first match.

use crate::models::{IndicatorSignals, PenaltySource, Pillar, TriggeredPenalty};

const PRICE_OBJECTION_PHRASES: &[&str] = &["too expensive", "can't afford", "out of budget"];
const PRICE_RESOLUTION_PHRASES: &[&str] = &["worth it", "makes sense", "fair enough"];
const DEFERRAL_PHRASES: &[&str] = &[
    "ask my wife",
    "ask my husband",
    "talk to my partner",
    "check with my boss",
];

fn penalty(rule_id: &str, label: &str, points: u32, evidence: String) -> TriggeredPenalty {
    TriggeredPenalty {
        rule_id: rule_id.to_string(),
        label: label.to_string(),
        points,
        source: PenaltySource::Deterministic,
        evidence,
    }
}

/// Count non-overlapping occurrences of a phrase.
fn count_occurrences(haystack: &str, phrase: &str) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.find(phrase) {
        count += 1;
        rest = &rest[pos + phrase.len()..];
    }
    count
}

/// Run the readiness penalty catalogue over one snapshot.
pub fn detect_readiness_penalties(
    signals: &IndicatorSignals,
    transcript: &str,
) -> Vec<TriggeredPenalty> {
    let mut triggered = Vec::new();
    let haystack = transcript.to_lowercase();

    // Unresolved price objection: one penalty per objection occurrence
    // when no resolution phrase appears anywhere after.
    let resolved = PRICE_RESOLUTION_PHRASES.iter().any(|p| haystack.contains(p));
    if !resolved {
        for phrase in PRICE_OBJECTION_PHRASES {
            for _ in 0..count_occurrences(&haystack, phrase) {
                triggered.push(penalty(
                    "unresolved_price_objection",
                    "Unresolved price objection",
                    8,
                    format!("\"{}\" with no resolution", phrase),
                ));
            }
        }
    }

    // Decision deferred to an absent party while decisiveness reads weak.
    let decisiveness = signals.pillar_average(Pillar::Decisiveness);
    if decisiveness > 0.0 && decisiveness < 3.0 {
        for phrase in DEFERRAL_PHRASES {
            for _ in 0..count_occurrences(&haystack, phrase) {
                triggered.push(penalty(
                    "deferred_decision",
                    "Decision deferred to absent party",
                    6,
                    format!("\"{}\" at decisiveness avg {:.2}", phrase, decisiveness),
                ));
            }
        }
    }

    // Urgency reported but uniformly flat.
    let urgency_values: Vec<f64> = Pillar::Urgency
        .indicators()
        .iter()
        .filter_map(|id| signals.get(*id))
        .filter(|v| *v > 0.0)
        .collect();
    if !urgency_values.is_empty() && urgency_values.iter().all(|v| *v <= 2.0) {
        triggered.push(penalty(
            "stalled_urgency",
            "Urgency flat across all signals",
            5,
            "all reported urgency indicators at or below 2".to_string(),
        ));
    }

    // Trust reported but weak.
    let trust = signals.pillar_average(Pillar::Trust);
    if trust > 0.0 && trust <= 3.0 {
        triggered.push(penalty(
            "trust_gap",
            "Weak trust signal",
            6,
            format!("trust avg {:.2}", trust),
        ));
    }

    triggered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_penalties_on_clean_snapshot() {
        let penalties = detect_readiness_penalties(&IndicatorSignals::new(), "great call so far");
        assert!(penalties.is_empty());
    }

    #[test]
    fn test_every_matching_instance_applies() {
        // Two occurrences of the same objection phrase: two penalties.
        let transcript = "that's too expensive. I told you, too expensive for this quarter.";
        let penalties = detect_readiness_penalties(&IndicatorSignals::new(), transcript);

        let price: Vec<_> = penalties
            .iter()
            .filter(|p| p.rule_id == "unresolved_price_objection")
            .collect();
        assert_eq!(price.len(), 2);
        assert!(price.iter().all(|p| p.points == 8));
    }

    #[test]
    fn test_resolution_phrase_suppresses_price_penalty() {
        let transcript = "too expensive... although honestly it's worth it for us";
        let penalties = detect_readiness_penalties(&IndicatorSignals::new(), transcript);
        assert!(penalties.is_empty());
    }

    #[test]
    fn test_deferred_decision_needs_weak_decisiveness() {
        let transcript = "I have to ask my wife first";

        // Decisiveness unreported: the rule stays silent.
        let penalties = detect_readiness_penalties(&IndicatorSignals::new(), transcript);
        assert!(penalties.is_empty());

        let mut weak = IndicatorSignals::new();
        weak.set(9, 2.0).unwrap();
        let penalties = detect_readiness_penalties(&weak, transcript);
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].rule_id, "deferred_decision");

        let mut strong = IndicatorSignals::new();
        strong.set(9, 8.0).unwrap();
        let penalties = detect_readiness_penalties(&strong, transcript);
        assert!(penalties.is_empty());
    }

    #[test]
    fn test_stalled_urgency() {
        let mut signals = IndicatorSignals::new();
        signals.set(5, 2.0).unwrap();
        signals.set(6, 1.0).unwrap();
        let penalties = detect_readiness_penalties(&signals, "");
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].rule_id, "stalled_urgency");

        // One urgency signal above the bar clears the rule.
        signals.set(7, 5.0).unwrap();
        assert!(detect_readiness_penalties(&signals, "").is_empty());
    }

    #[test]
    fn test_trust_gap_boundary() {
        let mut signals = IndicatorSignals::new();
        signals.set(24, 3.0).unwrap();
        let penalties = detect_readiness_penalties(&signals, "");
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].rule_id, "trust_gap");

        signals.set(24, 3.1).unwrap();
        assert!(detect_readiness_penalties(&signals, "").is_empty());
    }

    #[test]
    fn test_count_occurrences() {
        assert_eq!(count_occurrences("aaa", "aa"), 1);
        assert_eq!(count_occurrences("no rush, no rush", "no rush"), 2);
        assert_eq!(count_occurrences("abc", "xyz"), 0);
    }
}
