use crate::engines::compiler::WizardTemplate;
use crate::engines::generation::Genome;
use crate::types::{DiscoverySummary, IntelligenceTransfer, PatternDiscovery, Sector};
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Discovered(usize),
    NoDiscoveries,
}

/// Everything one cycle produced for a sector target.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub sector: Sector,
    pub use_case: String,
    /// Generation number carried by `population`.
    pub generation: u32,
    /// The next generation, already persisted.
    pub population: Vec<Genome>,
    /// Sampled phenotypes scored this cycle.
    pub experiments_run: usize,
    /// Workload queries pushed through replay across those experiments.
    pub queries_replayed: usize,
    pub best_fitness: f64,
    pub discoveries: Vec<PatternDiscovery>,
    pub transfers: Vec<IntelligenceTransfer>,
    pub templates: Vec<WizardTemplate>,
    /// Ids of candidates dropped as malformed.
    pub dropped: Vec<String>,
}

impl CycleReport {
    pub fn outcome(&self) -> CycleOutcome {
        if self.discoveries.is_empty() {
            CycleOutcome::NoDiscoveries
        } else {
            CycleOutcome::Discovered(self.discoveries.len())
        }
    }

    pub fn best_discovery(&self) -> Option<&PatternDiscovery> {
        self.discoveries.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn summary(&self) -> DiscoverySummary {
        DiscoverySummary {
            timestamp: Utc::now(),
            sector: self.sector,
            discoveries: self.discoveries.len(),
            experiments_run: self.experiments_run,
            best_discovery: self.best_discovery().cloned(),
        }
    }
}
