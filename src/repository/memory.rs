use super::{by_use_case, check_frozen, rank_promoted, StrategyRepository};
use crate::config::SectorTarget;
use crate::engines::compiler::WizardTemplate;
use crate::engines::generation::Genome;
use crate::error::{CachelabError, Result};
use crate::types::{ExperimentResult, IntelligenceTransfer, PatternDiscovery, Sector, Strategy};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    strategies: HashMap<String, Strategy>,
    experiments: HashMap<String, ExperimentResult>,
    discoveries: HashMap<String, PatternDiscovery>,
    transfers: HashMap<String, IntelligenceTransfer>,
    populations: HashMap<(Sector, String), Vec<Genome>>,
    templates: HashMap<String, WizardTemplate>,
}

/// Process-local repository for tests and dry runs.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| CachelabError::Persistence(format!("Repository lock poisoned: {}", e)))
    }
}

fn sorted<T: Clone>(records: impl Iterator<Item = T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut records: Vec<T> = records.collect();
    records.sort_by_key(|r| key(r));
    records
}

impl StrategyRepository for InMemoryRepository {
    fn top_strategies(&self, sector: Sector, limit: usize) -> Result<Vec<Strategy>> {
        let state = self.lock()?;
        Ok(rank_promoted(state.strategies.values(), sector, limit))
    }

    fn get_strategy(&self, id: &str) -> Result<Option<Strategy>> {
        Ok(self.lock()?.strategies.get(id).cloned())
    }

    fn upsert_strategy(&self, strategy: &Strategy) -> Result<()> {
        let mut state = self.lock()?;
        check_frozen(state.strategies.get(&strategy.id), strategy)?;
        state.strategies.insert(strategy.id.clone(), strategy.clone());
        Ok(())
    }

    fn validated_by_use_case(&self, use_case: &str) -> Result<Vec<Strategy>> {
        let state = self.lock()?;
        Ok(by_use_case(state.strategies.values(), use_case))
    }

    fn record_experiment(&self, result: &ExperimentResult) -> Result<()> {
        self.lock()?.experiments.insert(result.id.clone(), result.clone());
        Ok(())
    }

    fn experiments_for(&self, strategy_id: &str) -> Result<Vec<ExperimentResult>> {
        let state = self.lock()?;
        Ok(sorted(
            state.experiments.values().filter(|e| e.strategy_id == strategy_id).cloned(),
            |e| e.id.clone(),
        ))
    }

    fn record_discovery(&self, discovery: &PatternDiscovery) -> Result<()> {
        self.lock()?.discoveries.insert(discovery.id.clone(), discovery.clone());
        Ok(())
    }

    fn discoveries(&self, sector: Sector) -> Result<Vec<PatternDiscovery>> {
        let state = self.lock()?;
        Ok(sorted(
            state.discoveries.values().filter(|d| d.sector == sector).cloned(),
            |d| d.id.clone(),
        ))
    }

    fn record_transfer(&self, transfer: &IntelligenceTransfer) -> Result<()> {
        self.lock()?.transfers.insert(transfer.id.clone(), transfer.clone());
        Ok(())
    }

    fn transfers(&self) -> Result<Vec<IntelligenceTransfer>> {
        let state = self.lock()?;
        Ok(sorted(state.transfers.values().cloned(), |t| t.id.clone()))
    }

    fn save_population(&self, target: &SectorTarget, population: &[Genome]) -> Result<()> {
        self.lock()?
            .populations
            .insert((target.sector, target.use_case.clone()), population.to_vec());
        Ok(())
    }

    fn load_population(&self, target: &SectorTarget) -> Result<Option<Vec<Genome>>> {
        let state = self.lock()?;
        Ok(state
            .populations
            .get(&(target.sector, target.use_case.clone()))
            .cloned())
    }

    fn save_template(&self, template: &WizardTemplate) -> Result<()> {
        self.lock()?
            .templates
            .insert(template.strategy_id.clone(), template.clone());
        Ok(())
    }

    fn template_for(&self, strategy_id: &str) -> Result<Option<WizardTemplate>> {
        Ok(self.lock()?.templates.get(strategy_id).cloned())
    }
}
