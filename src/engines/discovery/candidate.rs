use crate::engines::evaluation::score_metrics;
use crate::engines::generation::{Phenotype, Stage};
use crate::engines::workload::Workload;
use crate::types::{
    CacheTier, EvictionPolicy, RoutingRule, Sector, Strategy, StrategyMetrics, StrategyStatus,
    TierConfig,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.92;
pub const REGULATED_SEMANTIC_THRESHOLD: f64 = 0.95;
const REALTIME_FRESHNESS_SECS: u64 = 60;

/// Name-based UUID for `key`; rewriting a record under the same key upserts it.
pub fn stable_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Deterministic strategy id: the same pipeline for the same target always
/// maps to the same record.
pub fn strategy_id(sector: Sector, use_case: &str, phenotype: &Phenotype) -> String {
    stable_id(&format!("{}:{}:{}", sector, use_case, phenotype.signature()))
}

/// One experiment per strategy and evaluated generation.
pub fn experiment_id(strategy_id: &str, generation: u32) -> String {
    stable_id(&format!("experiment:{}:{}", strategy_id, generation))
}

fn stage_tier(tier: CacheTier) -> Stage {
    match tier {
        CacheTier::L1 => Stage::L1Check,
        CacheTier::L2 => Stage::L2Check,
        CacheTier::L3 => Stage::L3Semantic,
    }
}

/// Freshness requirement of each category seen in the workload.
fn category_freshness(workload: &Workload) -> BTreeMap<&str, (u64, bool)> {
    let mut freshness = BTreeMap::new();
    for query in &workload.queries {
        freshness
            .entry(query.category.as_str())
            .or_insert((query.freshness_secs, query.sensitive));
    }
    freshness
}

fn median_freshness(workload: &Workload) -> u64 {
    let mut values: Vec<u64> = workload.queries.iter().map(|q| q.freshness_secs).collect();
    if values.is_empty() {
        return 300;
    }
    values.sort_unstable();
    values[values.len() / 2]
}

fn tier_config(tier: CacheTier, enabled: bool, sector: Sector, base_ttl: u64) -> TierConfig {
    match tier {
        CacheTier::L1 => TierConfig {
            tier,
            enabled,
            ttl_secs: base_ttl.clamp(60, 3_600),
            max_size: 1_000,
            eviction: EvictionPolicy::Lru,
            semantic_threshold: None,
        },
        CacheTier::L2 => TierConfig {
            tier,
            enabled,
            ttl_secs: (base_ttl * 4).clamp(300, 86_400),
            max_size: 100_000,
            eviction: EvictionPolicy::Lfu,
            semantic_threshold: None,
        },
        CacheTier::L3 => TierConfig {
            tier,
            enabled,
            ttl_secs: (base_ttl * 24).clamp(3_600, 604_800),
            max_size: 50_000,
            eviction: EvictionPolicy::Ttl,
            semantic_threshold: Some(if sector.is_regulated() {
                REGULATED_SEMANTIC_THRESHOLD
            } else {
                DEFAULT_SEMANTIC_THRESHOLD
            }),
        },
    }
}

fn routing_rules(
    phenotype: &Phenotype,
    workload: &Workload,
    tiers: &[TierConfig],
    compliant: bool,
) -> Vec<RoutingRule> {
    if !phenotype.contains(Stage::Router) {
        return Vec::new();
    }

    let enabled = |tier: CacheTier| tiers.iter().any(|t| t.tier == tier && t.enabled);
    let fastest = [CacheTier::L1, CacheTier::L2, CacheTier::L3]
        .into_iter()
        .find(|t| enabled(*t));

    category_freshness(workload)
        .into_iter()
        .map(|(category, (freshness, sensitive))| {
            let (target, reason) = if freshness < REALTIME_FRESHNESS_SECS {
                (None, format!("real-time data ({}s freshness) goes straight to the model", freshness))
            } else if sensitive && !compliant {
                let target = if enabled(CacheTier::L1) { Some(CacheTier::L1) } else { None };
                (target, "regulated data stays out of shared tiers".to_string())
            } else if freshness >= 3_600 && enabled(CacheTier::L3) {
                (Some(CacheTier::L3), "stable answers reuse semantic matches".to_string())
            } else {
                (fastest, "default lookup order".to_string())
            };
            RoutingRule {
                category: category.to_string(),
                target,
                reason,
            }
        })
        .collect()
}

fn strategy_name(sector: Sector, use_case: &str, tiers: &[TierConfig], routed: bool) -> String {
    let mut tier_names: Vec<String> = tiers
        .iter()
        .filter(|t| t.enabled)
        .map(|t| format!("{:?}", t.tier))
        .collect();
    if tier_names.is_empty() {
        tier_names.push("passthrough".to_string());
    }
    let suffix = if routed { " (routed)" } else { "" };
    format!("{} {} {}{}", sector, use_case, tier_names.join("+"), suffix)
}

/// Turn an evaluated pipeline into a persistable strategy in `Testing` state.
pub fn build_candidate(
    phenotype: &Phenotype,
    sector: Sector,
    use_case: &str,
    workload: &Workload,
    metrics: &StrategyMetrics,
    parent_id: Option<String>,
) -> Strategy {
    let base_ttl = median_freshness(workload);
    let tiers: Vec<TierConfig> = [CacheTier::L1, CacheTier::L2, CacheTier::L3]
        .into_iter()
        .map(|tier| tier_config(tier, phenotype.contains(stage_tier(tier)), sector, base_ttl))
        .collect();

    let compliant = phenotype.contains(Stage::ComplianceCheck);
    let compliance_flags = if compliant {
        let flags = sector.compliance_flags();
        if flags.is_empty() {
            vec!["PII-SCRUB".to_string()]
        } else {
            flags
        }
    } else {
        Vec::new()
    };

    let routing_rules = routing_rules(phenotype, workload, &tiers, compliant);
    let now = Utc::now();

    Strategy {
        id: strategy_id(sector, use_case, phenotype),
        name: strategy_name(sector, use_case, &tiers, !routing_rules.is_empty()),
        sector,
        use_case: use_case.to_string(),
        tiers,
        routing_rules,
        compliance_flags,
        status: StrategyStatus::Testing,
        validation_score: score_metrics(metrics),
        baseline: None,
        parent_id,
        signature: phenotype.signature(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::engines::workload::WorkloadSynthesizer;

    fn metrics() -> StrategyMetrics {
        StrategyMetrics {
            hit_rate: 0.8,
            p50_latency_ms: 5.0,
            p95_latency_ms: 120.0,
            p99_latency_ms: 400.0,
            cost_per_1k: 0.3,
        }
    }

    fn workload(sector: Sector) -> Workload {
        WorkloadSynthesizer::with_default_sectors()
            .generate_seeded(sector, &WorkloadConfig::default(), 6)
            .unwrap()
    }

    #[test]
    fn test_tiers_follow_phenotype() {
        let phenotype = Phenotype(vec![Stage::L1Check, Stage::L3Semantic]);
        let strategy =
            build_candidate(&phenotype, Sector::Hpc, "job-diagnostics", &workload(Sector::Hpc), &metrics(), None);

        let enabled: Vec<CacheTier> = strategy.enabled_tiers().map(|t| t.tier).collect();
        assert_eq!(enabled, vec![CacheTier::L1, CacheTier::L3]);
        assert_eq!(strategy.tiers.len(), 3);
        assert_eq!(strategy.tier(CacheTier::L3).and_then(|t| t.semantic_threshold), Some(0.92));
        assert!(strategy.routing_rules.is_empty());
        assert!(strategy.compliance_flags.is_empty());
        assert_eq!(strategy.status, StrategyStatus::Testing);
        assert_eq!(strategy.name, "hpc job-diagnostics L1+L3");
    }

    #[test]
    fn test_ids_are_deterministic_per_target() {
        let phenotype = Phenotype(vec![Stage::L2Check]);
        let a = strategy_id(Sector::Finance, "risk-analysis", &phenotype);
        let b = strategy_id(Sector::Finance, "risk-analysis", &phenotype);
        let c = strategy_id(Sector::Legal, "risk-analysis", &phenotype);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_compliance_and_routing() {
        let phenotype = Phenotype(vec![
            Stage::ComplianceCheck,
            Stage::Router,
            Stage::L1Check,
            Stage::L3Semantic,
        ]);
        let workload = workload(Sector::Finance);
        let strategy =
            build_candidate(&phenotype, Sector::Finance, "document-qa", &workload, &metrics(), None);

        assert_eq!(strategy.compliance_flags, vec!["PCI-DSS".to_string(), "SOX".to_string()]);
        assert_eq!(strategy.tier(CacheTier::L3).and_then(|t| t.semantic_threshold), Some(0.95));

        let market = strategy
            .routing_rules
            .iter()
            .find(|r| r.category == "market_data")
            .unwrap();
        assert_eq!(market.target, None);

        let regulatory = strategy
            .routing_rules
            .iter()
            .find(|r| r.category == "regulatory_docs")
            .unwrap();
        assert_eq!(regulatory.target, Some(CacheTier::L3));
    }
}
