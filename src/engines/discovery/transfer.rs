use crate::engines::evaluation::scoring::{COST_CEILING_PER_1K, LATENCY_CEILING_MS};
use crate::types::{BaselineMetrics, IntelligenceTransfer, Strategy, TransferPotential};
use chrono::Utc;
use std::collections::BTreeSet;
use super::candidate::stable_id;

const FEATURE_WEIGHT: f64 = 0.6;
const METRIC_WEIGHT: f64 = 0.4;

fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: BTreeSet<&String> = a.iter().collect();
    let b: BTreeSet<&String> = b.iter().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// 1.0 for identical baselines, falling towards 0 as they diverge.
fn metric_closeness(a: &BaselineMetrics, b: &BaselineMetrics) -> f64 {
    let hit = (a.hit_rate - b.hit_rate).abs().min(1.0);
    let latency = ((a.p95_latency_ms - b.p95_latency_ms).abs() / LATENCY_CEILING_MS).min(1.0);
    let cost = ((a.cost_per_1k - b.cost_per_1k).abs() / COST_CEILING_PER_1K).min(1.0);
    1.0 - (hit + latency + cost) / 3.0
}

/// Blend of structural overlap and measured closeness, in [0, 1].
///
/// Strategies without a baseline are compared on structure alone.
pub fn similarity(a: &Strategy, b: &Strategy) -> f64 {
    let structure = jaccard(&a.features(), &b.features());
    match (&a.baseline, &b.baseline) {
        (Some(x), Some(y)) => FEATURE_WEIGHT * structure + METRIC_WEIGHT * metric_closeness(x, y),
        _ => structure,
    }
}

/// Transfer records from a newly promoted strategy to validated strategies of
/// the same use case in other sectors, best match first.
pub fn detect_transfers(
    source: &Strategy,
    candidates: &[Strategy],
    limit: usize,
) -> Vec<IntelligenceTransfer> {
    let mut scored: Vec<(f64, &Strategy)> = candidates
        .iter()
        .filter(|c| c.use_case == source.use_case)
        .filter(|c| c.sector != source.sector)
        .filter(|c| c.status.is_promoted())
        .map(|c| (similarity(source, c), c))
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    let now = Utc::now();
    scored
        .into_iter()
        .take(limit)
        .map(|(similarity, target)| IntelligenceTransfer {
            id: stable_id(&format!("transfer:{}:{}", source.id, target.id)),
            source_strategy_id: source.id.clone(),
            source_sector: source.sector,
            target_strategy_id: target.id.clone(),
            target_sector: target.sector,
            use_case: source.use_case.clone(),
            similarity,
            potential: TransferPotential::from_similarity(similarity),
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::discovery::candidate::build_candidate;
    use crate::engines::generation::{Phenotype, Stage};
    use crate::engines::workload::Workload;
    use crate::config::WorkloadConfig;
    use crate::types::{Sector, StrategyMetrics, StrategyStatus};

    fn strategy(sector: Sector, use_case: &str, stages: &[Stage], status: StrategyStatus) -> Strategy {
        let workload = Workload::new(sector, WorkloadConfig::default(), Vec::new());
        let metrics = StrategyMetrics {
            hit_rate: 0.8,
            p50_latency_ms: 2.0,
            p95_latency_ms: 100.0,
            p99_latency_ms: 300.0,
            cost_per_1k: 0.4,
        };
        let mut s = build_candidate(&Phenotype(stages.to_vec()), sector, use_case, &workload, &metrics, None);
        s.status = status;
        s.baseline = Some(BaselineMetrics::from(&metrics));
        s
    }

    #[test]
    fn test_identical_strategies_are_fully_similar() {
        let a = strategy(Sector::Healthcare, "document-qa", &[Stage::L1Check, Stage::L3Semantic], StrategyStatus::Validated);
        let b = strategy(Sector::Finance, "document-qa", &[Stage::L1Check, Stage::L3Semantic], StrategyStatus::Validated);
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_detect_filters_and_orders() {
        let source = strategy(Sector::Healthcare, "document-qa", &[Stage::L1Check, Stage::L3Semantic], StrategyStatus::Validated);
        let close = strategy(Sector::Finance, "document-qa", &[Stage::L1Check, Stage::L3Semantic], StrategyStatus::Production);
        let far = strategy(Sector::Legal, "document-qa", &[Stage::L2Check], StrategyStatus::Validated);
        let same_sector = strategy(Sector::Healthcare, "document-qa", &[Stage::L1Check], StrategyStatus::Validated);
        let other_use_case = strategy(Sector::Hpc, "job-diagnostics", &[Stage::L1Check], StrategyStatus::Validated);
        let deprecated = strategy(Sector::Ecommerce, "document-qa", &[Stage::L1Check], StrategyStatus::Deprecated);

        let transfers = detect_transfers(
            &source,
            &[far.clone(), same_sector, other_use_case, deprecated, close.clone()],
            10,
        );

        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].target_strategy_id, close.id);
        assert_eq!(transfers[0].potential, TransferPotential::High);
        assert_eq!(transfers[1].target_strategy_id, far.id);
        assert_eq!(transfers[1].potential, TransferPotential::Low);
        assert!(transfers.iter().all(|t| t.source_sector == Sector::Healthcare));
    }

    #[test]
    fn test_limit_is_respected() {
        let source = strategy(Sector::Healthcare, "document-qa", &[Stage::L1Check], StrategyStatus::Validated);
        let targets = vec![
            strategy(Sector::Finance, "document-qa", &[Stage::L1Check], StrategyStatus::Validated),
            strategy(Sector::Legal, "document-qa", &[Stage::L1Check], StrategyStatus::Validated),
        ];
        assert_eq!(detect_transfers(&source, &targets, 1).len(), 1);
    }

    #[test]
    fn test_transfer_ids_are_stable_across_runs() {
        let source = strategy(Sector::Healthcare, "document-qa", &[Stage::L1Check], StrategyStatus::Validated);
        let targets = vec![strategy(Sector::Finance, "document-qa", &[Stage::L1Check], StrategyStatus::Validated)];
        let first = detect_transfers(&source, &targets, 10);
        let second = detect_transfers(&source, &targets, 10);
        assert_eq!(first[0].id, second[0].id);
    }
}
