//! Persistence seam for the discovery lab.
//!
//! The lab talks to storage only through [`StrategyRepository`] and emits one
//! summary per cycle through [`EventSink`]. Every write is an upsert keyed by
//! a record id, so re-running an interrupted cycle is safe.

pub mod events;
pub mod file;
pub mod memory;

pub use events::{EventSink, LogEventSink, MemoryEventSink};
pub use file::JsonFileRepository;
pub use memory::InMemoryRepository;

use crate::config::SectorTarget;
use crate::engines::compiler::WizardTemplate;
use crate::engines::generation::Genome;
use crate::error::{CachelabError, Result};
use crate::types::{
    ExperimentResult, IntelligenceTransfer, PatternDiscovery, Sector, Strategy,
};

pub trait StrategyRepository: Send + Sync {
    /// Promoted strategies of a sector, best validation score first.
    fn top_strategies(&self, sector: Sector, limit: usize) -> Result<Vec<Strategy>>;

    fn get_strategy(&self, id: &str) -> Result<Option<Strategy>>;

    /// Create or replace a strategy record.
    ///
    /// Fails with a persistence error when it would change a promoted record.
    fn upsert_strategy(&self, strategy: &Strategy) -> Result<()>;

    /// Promoted strategies of every sector sharing `use_case`.
    fn validated_by_use_case(&self, use_case: &str) -> Result<Vec<Strategy>>;

    fn record_experiment(&self, result: &ExperimentResult) -> Result<()>;

    fn experiments_for(&self, strategy_id: &str) -> Result<Vec<ExperimentResult>>;

    fn record_discovery(&self, discovery: &PatternDiscovery) -> Result<()>;

    fn discoveries(&self, sector: Sector) -> Result<Vec<PatternDiscovery>>;

    fn record_transfer(&self, transfer: &IntelligenceTransfer) -> Result<()>;

    fn transfers(&self) -> Result<Vec<IntelligenceTransfer>>;

    /// Replace the stored population of a target.
    fn save_population(&self, target: &SectorTarget, population: &[Genome]) -> Result<()>;

    fn load_population(&self, target: &SectorTarget) -> Result<Option<Vec<Genome>>>;

    /// Publish the wizard template compiled from a promoted strategy.
    fn save_template(&self, template: &WizardTemplate) -> Result<()>;

    fn template_for(&self, strategy_id: &str) -> Result<Option<WizardTemplate>>;
}

/// Promoted records are frozen; re-writing an identical copy is allowed.
pub(crate) fn check_frozen(existing: Option<&Strategy>, incoming: &Strategy) -> Result<()> {
    match existing {
        Some(current) if current.status.is_promoted() && current != incoming => {
            Err(CachelabError::Persistence(format!(
                "Strategy {} is {:?} and cannot be overwritten",
                current.id, current.status
            )))
        }
        _ => Ok(()),
    }
}

pub(crate) fn rank_promoted<'a>(
    strategies: impl Iterator<Item = &'a Strategy>,
    sector: Sector,
    limit: usize,
) -> Vec<Strategy> {
    let mut ranked: Vec<Strategy> = strategies
        .filter(|s| s.sector == sector && s.status.is_promoted())
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        b.validation_score
            .partial_cmp(&a.validation_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(limit);
    ranked
}

pub(crate) fn by_use_case<'a>(
    strategies: impl Iterator<Item = &'a Strategy>,
    use_case: &str,
) -> Vec<Strategy> {
    let mut matches: Vec<Strategy> = strategies
        .filter(|s| s.use_case == use_case && s.status.is_promoted())
        .cloned()
        .collect();
    matches.sort_by(|a, b| a.id.cmp(&b.id));
    matches
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{
        BaselineMetrics, CacheTier, EvictionPolicy, Sector, Strategy, StrategyStatus, TierConfig,
    };
    use chrono::Utc;

    pub fn strategy(id: &str, sector: Sector, use_case: &str, status: StrategyStatus, score: f64) -> Strategy {
        let now = Utc::now();
        Strategy {
            id: id.to_string(),
            name: format!("{} {}", sector, use_case),
            sector,
            use_case: use_case.to_string(),
            tiers: vec![TierConfig {
                tier: CacheTier::L1,
                enabled: true,
                ttl_secs: 300,
                max_size: 1_000,
                eviction: EvictionPolicy::Lru,
                semantic_threshold: None,
            }],
            routing_rules: Vec::new(),
            compliance_flags: Vec::new(),
            status,
            validation_score: score,
            baseline: Some(BaselineMetrics {
                hit_rate: 0.8,
                p95_latency_ms: 100.0,
                cost_per_1k: 0.2,
            }),
            parent_id: None,
            signature: "l1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
