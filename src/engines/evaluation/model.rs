use super::scoring::clip_score;
use crate::engines::generation::{Phenotype, Stage};
use crate::engines::workload::Workload;
use crate::types::StrategyMetrics;
use rand::Rng;

pub const BASE_SCORE: f64 = 50.0;
pub const LENGTH_PENALTY_PER_STAGE: f64 = 2.0;
/// Jitter is drawn uniformly from `[-JITTER, JITTER]`.
pub const JITTER: f64 = 5.0;

/// Score adjustments for adjacent stage pairs.
pub const PATTERN_ADJUSTMENTS: &[(Stage, Stage, f64)] = &[
    (Stage::L1Check, Stage::L3Semantic, 15.0),
    (Stage::L1Check, Stage::L2Check, 10.0),
    (Stage::L2Check, Stage::L3Semantic, 8.0),
    (Stage::Normalize, Stage::L1Check, 6.0),
    (Stage::ComplianceCheck, Stage::L1Check, 5.0),
    (Stage::L3Semantic, Stage::LlmCall, 5.0),
    (Stage::Router, Stage::L1Check, 4.0),
    (Stage::LlmCall, Stage::L1Check, -6.0),
    (Stage::LlmCall, Stage::LlmCall, -8.0),
];

pub(crate) const LLM_P50_MS: f64 = 600.0;
pub(crate) const LLM_P95_MS: f64 = 900.0;
pub(crate) const LLM_P99_MS: f64 = 1_400.0;
pub(crate) const LLM_COST_PER_QUERY: f64 = 0.002;
pub(crate) const EMBEDDING_COST_PER_QUERY: f64 = 0.000_04;
pub(crate) const SHARED_CACHE_COST_PER_QUERY: f64 = 0.000_01;

/// Fixed per-lookup latency of each stage, in milliseconds.
pub fn stage_latency_ms(stage: Stage) -> f64 {
    match stage {
        Stage::Normalize => 0.5,
        Stage::ComplianceCheck => 3.0,
        Stage::Router => 0.5,
        Stage::L1Check => 1.0,
        Stage::L2Check => 5.0,
        Stage::L3Semantic => 25.0,
        Stage::Start | Stage::End | Stage::LlmCall => 0.0,
    }
}

/// Share of reusable traffic a cache stage can capture on its own.
fn capture_rate(stage: Stage, normalized: bool) -> f64 {
    let exact_boost = if normalized { 1.2 } else { 1.0 };
    match stage {
        Stage::L1Check => 0.35 * exact_boost,
        Stage::L2Check => 0.45 * exact_boost,
        Stage::L3Semantic => 0.55,
        _ => 0.0,
    }
}

/// Closed-form fitness used by the fast inner loop.
#[derive(Debug, Clone)]
pub struct ClosedFormModel {
    pub base_score: f64,
    pub length_penalty: f64,
    pub jitter: f64,
}

impl Default for ClosedFormModel {
    fn default() -> Self {
        Self {
            base_score: BASE_SCORE,
            length_penalty: LENGTH_PENALTY_PER_STAGE,
            jitter: JITTER,
        }
    }
}

impl ClosedFormModel {
    /// Deterministic part of the score, before jitter and clipping.
    pub fn structural_score(&self, phenotype: &Phenotype) -> f64 {
        let mut score = self.base_score - self.length_penalty * phenotype.len() as f64;
        for (from, to) in phenotype.transitions() {
            score += PATTERN_ADJUSTMENTS
                .iter()
                .filter(|(a, b, _)| *a == from && *b == to)
                .map(|(_, _, delta)| delta)
                .sum::<f64>();
        }
        score
    }

    /// Score in `[0, 100]` including environment noise.
    pub fn score<R: Rng + ?Sized>(&self, phenotype: &Phenotype, rng: &mut R) -> f64 {
        let noise = if self.jitter > 0.0 {
            rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        clip_score(self.structural_score(phenotype) + noise)
    }

    /// Estimate hit rate, latency and cost without replaying the workload.
    pub fn estimate_metrics(&self, phenotype: &Phenotype, workload: &Workload) -> StrategyMetrics {
        let normalized = phenotype.contains(Stage::Normalize);
        let compliant = phenotype.contains(Stage::ComplianceCheck);

        let mut cache_stages: Vec<Stage> = phenotype
            .stages()
            .iter()
            .copied()
            .filter(|s| s.is_cache_lookup())
            .collect();
        cache_stages.sort();
        cache_stages.dedup();

        let miss_share: f64 = cache_stages
            .iter()
            .map(|s| 1.0 - capture_rate(*s, normalized).min(0.95))
            .product();
        let mut hit_rate = workload.stats.repeat_ratio * (1.0 - miss_share);
        if !compliant {
            // Shared tiers refuse regulated payloads without a compliance gate.
            hit_rate *= 1.0 - 0.5 * workload.sensitive_share();
        }
        let hit_rate = hit_rate.clamp(0.0, 1.0);
        let miss_rate = 1.0 - hit_rate;

        let overhead: f64 = phenotype.stages().iter().map(|s| stage_latency_ms(*s)).sum();

        let mut cost_per_query = LLM_COST_PER_QUERY * miss_rate;
        if cache_stages.contains(&Stage::L3Semantic) {
            cost_per_query += EMBEDDING_COST_PER_QUERY;
        }
        if cache_stages.contains(&Stage::L2Check) {
            cost_per_query += SHARED_CACHE_COST_PER_QUERY;
        }

        StrategyMetrics {
            hit_rate,
            p50_latency_ms: overhead + LLM_P50_MS * miss_rate,
            p95_latency_ms: overhead + LLM_P95_MS * miss_rate,
            p99_latency_ms: overhead + LLM_P99_MS * miss_rate,
            cost_per_1k: cost_per_query * 1_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::engines::workload::WorkloadSynthesizer;
    use crate::types::Sector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn phenotype(stages: &[Stage]) -> Phenotype {
        Phenotype(stages.to_vec())
    }

    #[test]
    fn test_structural_score_rewards_known_patterns() {
        let model = ClosedFormModel::default();
        let l1_l3 = model.structural_score(&phenotype(&[Stage::L1Check, Stage::L3Semantic]));
        let l3_l1 = model.structural_score(&phenotype(&[Stage::L3Semantic, Stage::L1Check]));
        assert_eq!(l1_l3, 50.0 - 4.0 + 15.0);
        assert_eq!(l3_l1, 46.0);
    }

    #[test]
    fn test_length_penalty() {
        let model = ClosedFormModel::default();
        assert_eq!(model.structural_score(&Phenotype::default()), 50.0);
        assert_eq!(model.structural_score(&phenotype(&[Stage::Router; 3])), 44.0);
    }

    #[test]
    fn test_score_is_clipped_for_any_noise_draw() {
        let model = ClosedFormModel {
            jitter: 80.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(17);
        let long = phenotype(&[Stage::LlmCall; 10]);
        let good = phenotype(&[Stage::L1Check, Stage::L3Semantic, Stage::LlmCall]);
        for _ in 0..500 {
            assert!((0.0..=100.0).contains(&model.score(&long, &mut rng)));
            assert!((0.0..=100.0).contains(&model.score(&good, &mut rng)));
        }
    }

    #[test]
    fn test_more_cache_tiers_estimate_higher_hit_rate() {
        let synthesizer = WorkloadSynthesizer::with_default_sectors();
        let workload = synthesizer
            .generate_seeded(Sector::Ecommerce, &WorkloadConfig::default(), 5)
            .unwrap();
        let model = ClosedFormModel::default();

        let none = model.estimate_metrics(&Phenotype::default(), &workload);
        let l1 = model.estimate_metrics(&phenotype(&[Stage::L1Check]), &workload);
        let tiered = model.estimate_metrics(
            &phenotype(&[Stage::L1Check, Stage::L2Check, Stage::L3Semantic]),
            &workload,
        );

        assert_eq!(none.hit_rate, 0.0);
        assert!(l1.hit_rate > none.hit_rate);
        assert!(tiered.hit_rate > l1.hit_rate);
        assert!(tiered.cost_per_1k < none.cost_per_1k);
        assert!((0.0..=1.0).contains(&tiered.hit_rate));
    }
}
