use crate::types::{BaselineMetrics, StrategyMetrics};

/// Latency at or above this earns no latency credit.
pub const LATENCY_CEILING_MS: f64 = 500.0;
/// Cost per 1k at or above this earns no cost credit.
pub const COST_CEILING_PER_1K: f64 = 1.0;

pub const HIT_RATE_WEIGHT: f64 = 0.4;
pub const LATENCY_WEIGHT: f64 = 0.3;
pub const COST_WEIGHT: f64 = 0.3;

/// Composite 0-100 promotion score.
///
/// Rises with hit rate, falls with p95 latency and cost; each term is clamped
/// so the result stays in `[0, 100]` for any finite or infinite input.
pub fn composite_score(hit_rate: f64, p95_latency_ms: f64, cost_per_1k: f64) -> f64 {
    let hit_term = unit(hit_rate);
    let latency_term = 1.0 - unit(p95_latency_ms.min(LATENCY_CEILING_MS) / LATENCY_CEILING_MS);
    let cost_term = 1.0 - unit(cost_per_1k.min(COST_CEILING_PER_1K) / COST_CEILING_PER_1K);

    let score = HIT_RATE_WEIGHT * hit_term * 100.0
        + LATENCY_WEIGHT * latency_term * 100.0
        + COST_WEIGHT * cost_term * 100.0;
    clip_score(score)
}

pub fn score_metrics(metrics: &StrategyMetrics) -> f64 {
    composite_score(metrics.hit_rate, metrics.p95_latency_ms, metrics.cost_per_1k)
}

pub fn score_baseline(baseline: &BaselineMetrics) -> f64 {
    composite_score(baseline.hit_rate, baseline.p95_latency_ms, baseline.cost_per_1k)
}

/// Clamp to `[0, 100]`; NaN maps to 0.
pub fn clip_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_and_worst_cases() {
        assert_eq!(composite_score(1.0, 0.0, 0.0), 100.0);
        assert_eq!(composite_score(0.0, 500.0, 1.0), 0.0);
        assert_eq!(composite_score(0.0, 10_000.0, 50.0), 0.0);
    }

    #[test]
    fn test_weighting() {
        let score = composite_score(0.5, 250.0, 0.5);
        assert!((score - 50.0).abs() < 1e-9);
        let only_hits = composite_score(1.0, 500.0, 1.0);
        assert!((only_hits - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_in_each_metric() {
        assert!(composite_score(0.8, 100.0, 0.2) > composite_score(0.7, 100.0, 0.2));
        assert!(composite_score(0.8, 90.0, 0.2) > composite_score(0.8, 100.0, 0.2));
        assert!(composite_score(0.8, 100.0, 0.1) > composite_score(0.8, 100.0, 0.2));
    }

    #[test]
    fn test_bounded_for_degenerate_inputs() {
        for score in [
            composite_score(f64::NAN, f64::NAN, f64::NAN),
            composite_score(7.0, -100.0, -3.0),
            composite_score(-1.0, f64::INFINITY, f64::INFINITY),
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }
}
