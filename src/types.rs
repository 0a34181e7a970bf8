use crate::error::CachelabError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Industry vertical a workload and a strategy belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Healthcare,
    Finance,
    Hpc,
    Legal,
    Ecommerce,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Healthcare,
        Sector::Finance,
        Sector::Hpc,
        Sector::Legal,
        Sector::Ecommerce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Healthcare => "healthcare",
            Sector::Finance => "finance",
            Sector::Hpc => "hpc",
            Sector::Legal => "legal",
            Sector::Ecommerce => "ecommerce",
        }
    }

    /// Regulatory regimes a cache in this sector has to respect.
    pub fn compliance_flags(&self) -> Vec<String> {
        let flags: &[&str] = match self {
            Sector::Healthcare => &["HIPAA"],
            Sector::Finance => &["PCI-DSS", "SOX"],
            Sector::Legal => &["ATTORNEY-CLIENT"],
            Sector::Hpc | Sector::Ecommerce => &[],
        };
        flags.iter().map(|f| f.to_string()).collect()
    }

    pub fn is_regulated(&self) -> bool {
        !self.compliance_flags().is_empty()
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = CachelabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::ALL
            .iter()
            .copied()
            .find(|sector| sector.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CachelabError::Configuration(format!("Unknown sector: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Physical cache tiers, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheTier {
    L1,
    L2,
    L3,
}

impl CacheTier {
    pub fn label(&self) -> &'static str {
        match self {
            CacheTier::L1 => "L1 in-memory",
            CacheTier::L2 => "L2 shared",
            CacheTier::L3 => "L3 semantic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    Lru,
    Lfu,
    Ttl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: CacheTier,
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_size: usize,
    pub eviction: EvictionPolicy,
    pub semantic_threshold: Option<f64>,
}

/// Sends a query category straight to a tier (or to the LLM when `target` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub category: String,
    pub target: Option<CacheTier>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Testing,
    Validated,
    Deprecated,
    Production,
}

impl StrategyStatus {
    /// Promoted strategies are frozen; only children may be derived from them.
    pub fn is_promoted(&self) -> bool {
        matches!(self, StrategyStatus::Validated | StrategyStatus::Production)
    }
}

/// Measured (or modelled) behaviour of a strategy against a workload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub hit_rate: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub cost_per_1k: f64,
}

/// Metrics frozen onto a strategy when it is promoted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub hit_rate: f64,
    pub p95_latency_ms: f64,
    pub cost_per_1k: f64,
}

impl From<&StrategyMetrics> for BaselineMetrics {
    fn from(metrics: &StrategyMetrics) -> Self {
        Self {
            hit_rate: metrics.hit_rate,
            p95_latency_ms: metrics.p95_latency_ms,
            cost_per_1k: metrics.cost_per_1k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub use_case: String,
    pub tiers: Vec<TierConfig>,
    pub routing_rules: Vec<RoutingRule>,
    pub compliance_flags: Vec<String>,
    pub status: StrategyStatus,
    pub validation_score: f64,
    pub baseline: Option<BaselineMetrics>,
    pub parent_id: Option<String>,
    /// Canonical stage sequence the strategy was derived from.
    pub signature: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Strategy {
    pub fn enabled_tiers(&self) -> impl Iterator<Item = &TierConfig> {
        self.tiers.iter().filter(|t| t.enabled)
    }

    pub fn tier(&self, tier: CacheTier) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.tier == tier && t.enabled)
    }

    /// Feature labels used for similarity and template tagging.
    pub fn features(&self) -> Vec<String> {
        let mut features: Vec<String> = self
            .enabled_tiers()
            .map(|t| format!("{:?}", t.tier).to_lowercase())
            .collect();
        if self.tier(CacheTier::L3).is_some() {
            features.push("semantic-matching".to_string());
        }
        if !self.routing_rules.is_empty() {
            features.push("category-routing".to_string());
        }
        if !self.compliance_flags.is_empty() {
            features.push("compliance-validation".to_string());
        }
        features
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    Replay,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub id: String,
    pub strategy_id: String,
    pub sector: Sector,
    pub workload_queries: usize,
    pub metrics: StrategyMetrics,
    pub score: f64,
    pub iterations: usize,
    pub source: MetricsSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDiscovery {
    pub id: String,
    pub strategy_id: String,
    pub name: String,
    pub sector: Sector,
    pub use_case: String,
    pub score: f64,
    pub improvement_pct: f64,
    pub expected: BaselineMetrics,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPotential {
    High,
    Medium,
    Low,
}

impl TransferPotential {
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 0.8 {
            TransferPotential::High
        } else if similarity >= 0.5 {
            TransferPotential::Medium
        } else {
            TransferPotential::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceTransfer {
    pub id: String,
    pub source_strategy_id: String,
    pub source_sector: Sector,
    pub target_strategy_id: String,
    pub target_sector: Sector,
    pub use_case: String,
    pub similarity: f64,
    pub potential: TransferPotential,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget event emitted once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    pub timestamp: DateTime<Utc>,
    pub sector: Sector,
    pub discoveries: usize,
    pub experiments_run: usize,
    pub best_discovery: Option<PatternDiscovery>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_round_trip_from_str() {
        for sector in Sector::ALL {
            assert_eq!(sector.as_str().parse::<Sector>().unwrap(), sector);
        }
        assert_eq!(" HPC ".parse::<Sector>().unwrap(), Sector::Hpc);
        assert!("retail".parse::<Sector>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_transfer_potential_thresholds() {
        assert_eq!(TransferPotential::from_similarity(0.8), TransferPotential::High);
        assert_eq!(TransferPotential::from_similarity(0.79), TransferPotential::Medium);
        assert_eq!(TransferPotential::from_similarity(0.5), TransferPotential::Medium);
        assert_eq!(TransferPotential::from_similarity(0.1), TransferPotential::Low);
    }
}
