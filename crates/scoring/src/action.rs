//! Recommended Action
//!
//! Derives the single next-step suggestion surfaced on the dashboard from
//! the readiness level and the weakest reported pillar. Deterministic, so
//! a snapshot carries an action even when every agent failed.

use crate::models::{IndicatorSignals, Pillar, ReadinessLevel, ReadinessScore};

/// Pick the next coaching action for the current state of the call.
pub fn recommend_action(readiness: &ReadinessScore, signals: &IndicatorSignals) -> String {
    if signals.is_empty() {
        return "Keep discovery going; not enough signal to steer yet.".to_string();
    }

    if readiness.level == ReadinessLevel::High {
        return "Prospect reads ready; move to the close.".to_string();
    }

    match weakest_reported_pillar(signals) {
        Some(Pillar::PainDesire) => {
            "Dig into the pain; the cost of inaction is not vivid yet.".to_string()
        }
        Some(Pillar::Urgency) => {
            "Build urgency; anchor the timeline to a concrete event.".to_string()
        }
        Some(Pillar::Decisiveness) => {
            "Test decisiveness; ask what would make this a yes today.".to_string()
        }
        Some(Pillar::Money) => {
            "Surface the budget conversation before going further.".to_string()
        }
        Some(Pillar::Responsibility) => {
            "Check ownership; confirm who carries this problem internally.".to_string()
        }
        Some(Pillar::PriceSensitivity) => {
            "Reframe value before price comes up again.".to_string()
        }
        Some(Pillar::Trust) => {
            "Slow down and rebuild trust; bring proof, not pressure.".to_string()
        }
        None => "Keep discovery going; not enough signal to steer yet.".to_string(),
    }
}

/// The reported pillar with the lowest nonzero average.
fn weakest_reported_pillar(signals: &IndicatorSignals) -> Option<Pillar> {
    Pillar::all()
        .into_iter()
        .filter_map(|p| {
            let avg = signals.pillar_average(p);
            (avg > 0.0).then_some((p, avg))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PillarWeights;
    use crate::readiness::compute_readiness;

    #[test]
    fn test_empty_signals_ask_for_more_discovery() {
        let signals = IndicatorSignals::new();
        let readiness = compute_readiness(&signals, &PillarWeights::default(), &[]);
        let action = recommend_action(&readiness, &signals);
        assert!(action.contains("discovery"));
    }

    #[test]
    fn test_high_readiness_recommends_close() {
        let mut signals = IndicatorSignals::new();
        for pillar in Pillar::all() {
            for id in pillar.indicators() {
                signals.set(*id, 9.0).unwrap();
            }
        }
        let readiness = compute_readiness(&signals, &PillarWeights::default(), &[]);
        let action = recommend_action(&readiness, &signals);
        assert!(action.contains("close"));
    }

    #[test]
    fn test_weakest_pillar_drives_action() {
        let mut signals = IndicatorSignals::new();
        for (id, score) in [(1, 8.0), (5, 2.0), (9, 7.0)] {
            signals.set(id, score).unwrap();
        }
        let readiness = compute_readiness(&signals, &PillarWeights::default(), &[]);
        let action = recommend_action(&readiness, &signals);
        assert!(action.to_lowercase().contains("urgency"));
    }
}
