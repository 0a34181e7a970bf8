use super::{by_use_case, check_frozen, rank_promoted, StrategyRepository};
use crate::config::SectorTarget;
use crate::engines::compiler::WizardTemplate;
use crate::engines::generation::Genome;
use crate::error::{CachelabError, Result};
use crate::types::{ExperimentResult, IntelligenceTransfer, PatternDiscovery, Sector, Strategy};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STRATEGIES: &str = "strategies";
const EXPERIMENTS: &str = "experiments";
const DISCOVERIES: &str = "discoveries";
const TRANSFERS: &str = "transfers";
const POPULATIONS: &str = "populations";
const TEMPLATES: &str = "templates";

/// One pretty-printed JSON document per record under `<root>/<kind>/<id>.json`.
pub struct JsonFileRepository {
    root: PathBuf,
    write_lock: Mutex<()>,
}

fn persistence(context: &str, path: &Path, err: impl std::fmt::Display) -> CachelabError {
    CachelabError::Persistence(format!("{} {}: {}", context, path.display(), err))
}

/// Keep record keys usable as file names.
fn file_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl JsonFileRepository {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for kind in [STRATEGIES, EXPERIMENTS, DISCOVERIES, TRANSFERS, POPULATIONS, TEMPLATES] {
            let dir = root.join(kind);
            fs::create_dir_all(&dir).map_err(|e| persistence("Failed to create", &dir, e))?;
        }
        debug!("Opened JSON repository at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: &str, key: &str) -> PathBuf {
        self.root.join(kind).join(format!("{}.json", file_key(key)))
    }

    fn write<T: Serialize + ?Sized>(&self, kind: &str, key: &str, value: &T) -> Result<()> {
        let path = self.path(kind, key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, body).map_err(|e| persistence("Failed to write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| persistence("Failed to replace", &path, e))
    }

    fn read<T: DeserializeOwned>(&self, kind: &str, key: &str) -> Result<Option<T>> {
        let path = self.path(kind, key);
        if !path.exists() {
            return Ok(None);
        }
        let body = fs::read_to_string(&path).map_err(|e| persistence("Failed to read", &path, e))?;
        let value = serde_json::from_str(&body).map_err(|e| persistence("Corrupt record", &path, e))?;
        Ok(Some(value))
    }

    fn read_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        let dir = self.root.join(kind);
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| persistence("Failed to list", &dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let body =
                    fs::read_to_string(path).map_err(|e| persistence("Failed to read", path, e))?;
                serde_json::from_str(&body).map_err(|e| persistence("Corrupt record", path, e))
            })
            .collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| CachelabError::Persistence(format!("Repository lock poisoned: {}", e)))
    }

    fn population_key(target: &SectorTarget) -> String {
        format!("{}__{}", target.sector, target.use_case)
    }
}

impl StrategyRepository for JsonFileRepository {
    fn top_strategies(&self, sector: Sector, limit: usize) -> Result<Vec<Strategy>> {
        let all: Vec<Strategy> = self.read_all(STRATEGIES)?;
        Ok(rank_promoted(all.iter(), sector, limit))
    }

    fn get_strategy(&self, id: &str) -> Result<Option<Strategy>> {
        self.read(STRATEGIES, id)
    }

    fn upsert_strategy(&self, strategy: &Strategy) -> Result<()> {
        let _guard = self.lock()?;
        let existing: Option<Strategy> = self.read(STRATEGIES, &strategy.id)?;
        check_frozen(existing.as_ref(), strategy)?;
        self.write(STRATEGIES, &strategy.id, strategy)
    }

    fn validated_by_use_case(&self, use_case: &str) -> Result<Vec<Strategy>> {
        let all: Vec<Strategy> = self.read_all(STRATEGIES)?;
        Ok(by_use_case(all.iter(), use_case))
    }

    fn record_experiment(&self, result: &ExperimentResult) -> Result<()> {
        self.write(EXPERIMENTS, &result.id, result)
    }

    fn experiments_for(&self, strategy_id: &str) -> Result<Vec<ExperimentResult>> {
        let all: Vec<ExperimentResult> = self.read_all(EXPERIMENTS)?;
        Ok(all.into_iter().filter(|e| e.strategy_id == strategy_id).collect())
    }

    fn record_discovery(&self, discovery: &PatternDiscovery) -> Result<()> {
        self.write(DISCOVERIES, &discovery.id, discovery)
    }

    fn discoveries(&self, sector: Sector) -> Result<Vec<PatternDiscovery>> {
        let all: Vec<PatternDiscovery> = self.read_all(DISCOVERIES)?;
        Ok(all.into_iter().filter(|d| d.sector == sector).collect())
    }

    fn record_transfer(&self, transfer: &IntelligenceTransfer) -> Result<()> {
        self.write(TRANSFERS, &transfer.id, transfer)
    }

    fn transfers(&self) -> Result<Vec<IntelligenceTransfer>> {
        self.read_all(TRANSFERS)
    }

    fn save_population(&self, target: &SectorTarget, population: &[Genome]) -> Result<()> {
        let _guard = self.lock()?;
        self.write(POPULATIONS, &Self::population_key(target), population)
    }

    fn load_population(&self, target: &SectorTarget) -> Result<Option<Vec<Genome>>> {
        self.read(POPULATIONS, &Self::population_key(target))
    }

    fn save_template(&self, template: &WizardTemplate) -> Result<()> {
        self.write(TEMPLATES, &template.strategy_id, template)
    }

    fn template_for(&self, strategy_id: &str) -> Result<Option<WizardTemplate>> {
        self.read(TEMPLATES, strategy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::operators::random_genome;
    use crate::repository::test_support::strategy;
    use crate::types::StrategyStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_strategies_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let repo = JsonFileRepository::open(dir.path()).unwrap();
            repo.upsert_strategy(&strategy("s-1", Sector::Legal, "document-qa", StrategyStatus::Validated, 66.0))
                .unwrap();
            repo.upsert_strategy(&strategy("s-2", Sector::Legal, "document-qa", StrategyStatus::Testing, 90.0))
                .unwrap();
        }

        let repo = JsonFileRepository::open(dir.path()).unwrap();
        let top = repo.top_strategies(Sector::Legal, 5).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, "s-1");
        assert_eq!(repo.get_strategy("s-2").unwrap().map(|s| s.status), Some(StrategyStatus::Testing));
        assert!(repo.get_strategy("missing").unwrap().is_none());
    }

    #[test]
    fn test_population_is_replaced_not_appended() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path()).unwrap();
        let target = SectorTarget::new(Sector::Ecommerce, "product-support");
        let mut rng = StdRng::seed_from_u64(5);

        let first: Vec<Genome> = (0..4).map(|_| random_genome(0, &mut rng)).collect();
        let second: Vec<Genome> = (0..4).map(|_| random_genome(1, &mut rng)).collect();
        repo.save_population(&target, &first).unwrap();
        repo.save_population(&target, &second).unwrap();

        let loaded = repo.load_population(&target).unwrap().unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(loaded.iter().all(|g| g.generation == 1));
        assert!(loaded.iter().all(|g| g.is_valid()));
    }

    #[test]
    fn test_corrupt_record_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path()).unwrap();
        fs::write(dir.path().join(STRATEGIES).join("bad.json"), "{not json").unwrap();
        assert!(repo.get_strategy("bad").unwrap_err().is_persistence());
        assert!(repo.top_strategies(Sector::Hpc, 3).unwrap_err().is_persistence());
    }
}
