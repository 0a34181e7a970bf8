use crate::config::DiscoveryConfig;
use crate::error::{CachelabError, Result};
use crate::types::{BaselineMetrics, PatternDiscovery, Strategy, StrategyMetrics, StrategyStatus};
use chrono::Utc;
use super::candidate::stable_id;

/// Relative improvement of `score` over the parent's score, in percent.
///
/// Without a positive parent score there is nothing to divide by, so the
/// improvement is measured in points on the 0-100 scale instead.
pub fn improvement_pct(score: f64, parent_score: Option<f64>) -> f64 {
    match parent_score {
        Some(parent) if parent > 0.0 => (score - parent) * 100.0 / parent.max(1.0),
        Some(parent) => score - parent.max(0.0),
        None => score,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromotionDecision {
    Promote { improvement_pct: f64 },
    Reject { improvement_pct: f64, reason: String },
}

impl PromotionDecision {
    pub fn is_promoted(&self) -> bool {
        matches!(self, PromotionDecision::Promote { .. })
    }

    pub fn improvement_pct(&self) -> f64 {
        match self {
            PromotionDecision::Promote { improvement_pct }
            | PromotionDecision::Reject { improvement_pct, .. } => *improvement_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromotionPolicy {
    pub min_improvement_pct: f64,
    pub min_hit_rate: f64,
}

impl From<&DiscoveryConfig> for PromotionPolicy {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            min_improvement_pct: config.min_improvement_pct,
            min_hit_rate: config.min_hit_rate,
        }
    }
}

impl PromotionPolicy {
    /// Both thresholds are strict: hitting one exactly is not enough.
    pub fn decide(&self, score: f64, parent_score: Option<f64>, hit_rate: f64) -> PromotionDecision {
        let improvement_pct = improvement_pct(score, parent_score);

        if improvement_pct <= self.min_improvement_pct {
            PromotionDecision::Reject {
                improvement_pct,
                reason: format!(
                    "improvement {:.2}% does not exceed {:.2}%",
                    improvement_pct, self.min_improvement_pct
                ),
            }
        } else if hit_rate <= self.min_hit_rate {
            PromotionDecision::Reject {
                improvement_pct,
                reason: format!(
                    "hit rate {:.3} does not exceed {:.3}",
                    hit_rate, self.min_hit_rate
                ),
            }
        } else {
            PromotionDecision::Promote { improvement_pct }
        }
    }

    /// Decide and move `strategy` out of `Testing`.
    ///
    /// A promoted strategy is frozen, so applying a decision to one is rejected.
    pub fn apply(
        &self,
        strategy: &mut Strategy,
        metrics: &StrategyMetrics,
        score: f64,
        parent_score: Option<f64>,
    ) -> Result<PromotionDecision> {
        if strategy.status.is_promoted() {
            return Err(CachelabError::Persistence(format!(
                "Strategy {} is already {:?} and cannot be re-evaluated",
                strategy.id, strategy.status
            )));
        }

        let decision = self.decide(score, parent_score, metrics.hit_rate);
        strategy.validation_score = score;
        strategy.updated_at = Utc::now();

        if decision.is_promoted() {
            strategy.status = StrategyStatus::Validated;
            strategy.baseline = Some(BaselineMetrics::from(metrics));
        } else {
            strategy.status = StrategyStatus::Deprecated;
        }

        Ok(decision)
    }
}

/// Discovery record for a freshly promoted strategy.
pub fn record_discovery(strategy: &Strategy, improvement_pct: f64) -> Option<PatternDiscovery> {
    let expected = strategy.baseline?;
    Some(PatternDiscovery {
        id: stable_id(&format!("discovery:{}", strategy.id)),
        strategy_id: strategy.id.clone(),
        name: strategy.name.clone(),
        sector: strategy.sector,
        use_case: strategy.use_case.clone(),
        score: strategy.validation_score,
        improvement_pct,
        expected,
        discovered_at: Utc::now(),
    })
}
