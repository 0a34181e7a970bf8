use super::traits::{check_unit_interval, invalid, ConfigSection};
use crate::error::CachelabError;
use crate::types::Sector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Promotion needs strictly more than this relative improvement, in percent.
    pub min_improvement_pct: f64,
    /// Promotion needs a strictly higher measured hit rate.
    pub min_hit_rate: f64,
    /// How many top strategies to fetch when picking the parent baseline.
    pub parent_fetch_size: usize,
    /// Cap on transfer records written per promotion.
    pub max_transfers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_improvement_pct: 5.0,
            min_hit_rate: 0.7,
            parent_fetch_size: 5,
            max_transfers: 10,
        }
    }
}

impl ConfigSection for DiscoveryConfig {
    fn section_name() -> &'static str {
        "discovery"
    }

    fn validate(&self) -> Result<(), CachelabError> {
        let section = Self::section_name();
        if !self.min_improvement_pct.is_finite() {
            return Err(invalid(section, "Minimum improvement must be finite"));
        }
        check_unit_interval(section, "Minimum hit rate", self.min_hit_rate)?;
        if self.parent_fetch_size == 0 {
            return Err(invalid(section, "Parent fetch size must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub l1_capacity: usize,
    pub l2_capacity: usize,
    pub l2_ttl_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 2_000,
            l1_capacity: 64,
            l2_capacity: 1_024,
            l2_ttl_secs: 3_600,
        }
    }
}

impl ConfigSection for ReplayConfig {
    fn section_name() -> &'static str {
        "replay"
    }

    fn validate(&self) -> Result<(), CachelabError> {
        let section = Self::section_name();
        if self.timeout_ms == 0 {
            return Err(invalid(section, "Replay timeout must be positive"));
        }
        if self.l1_capacity == 0 || self.l2_capacity == 0 {
            return Err(invalid(section, "Simulated tier capacities must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Attempts made to persist the next generation before the cycle fails.
    pub persist_attempts: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "cachelab-data".to_string(),
            persist_attempts: 2,
        }
    }
}

impl ConfigSection for StorageConfig {
    fn section_name() -> &'static str {
        "storage"
    }

    fn validate(&self) -> Result<(), CachelabError> {
        if self.persist_attempts < 2 {
            return Err(invalid(
                Self::section_name(),
                "Population writes need at least one retry (persist_attempts >= 2)",
            ));
        }
        if self.data_dir.trim().is_empty() {
            return Err(invalid(Self::section_name(), "Data directory must not be empty"));
        }
        Ok(())
    }
}

/// One sector/use-case pair the batch job optimizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTarget {
    pub sector: Sector,
    pub use_case: String,
}

impl SectorTarget {
    pub fn new(sector: Sector, use_case: impl Into<String>) -> Self {
        Self {
            sector,
            use_case: use_case.into(),
        }
    }
}

pub fn default_targets() -> Vec<SectorTarget> {
    vec![
        SectorTarget::new(Sector::Healthcare, "document-qa"),
        SectorTarget::new(Sector::Finance, "document-qa"),
        SectorTarget::new(Sector::Finance, "risk-analysis"),
        SectorTarget::new(Sector::Hpc, "job-diagnostics"),
        SectorTarget::new(Sector::Legal, "document-qa"),
        SectorTarget::new(Sector::Ecommerce, "product-support"),
    ]
}
