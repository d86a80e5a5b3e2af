//! Readiness Scoring
//!
//! Pure weighted aggregation of pillar averages into the closing-readiness
//! score. Re-run on every agent settlement; must stay O(indicators).

use crate::models::{
    IndicatorSignals, PillarWeights, ReadinessLevel, ReadinessScore, TriggeredPenalty,
};

/// Compute the readiness score for one signal set.
///
/// `penalties` is the readiness penalty catalogue's output for this run;
/// its points are deducted from the raw weighted total before clamping.
pub fn compute_readiness(
    signals: &IndicatorSignals,
    weights: &PillarWeights,
    penalties: &[TriggeredPenalty],
) -> ReadinessScore {
    let raw: f64 = signals
        .pillar_averages()
        .iter()
        .map(|(pillar, avg)| avg * weights.get(*pillar))
        .sum();

    let max = weights.max_score();
    let penalty_points: f64 = penalties.iter().map(|p| p.points as f64).sum();
    let score = (raw - penalty_points).clamp(0.0, max).round();

    let percent = if max > 0.0 { score / max * 100.0 } else { 0.0 };

    ReadinessScore {
        raw,
        max,
        score,
        percent,
        level: ReadinessLevel::from_percent(percent),
    }
}
