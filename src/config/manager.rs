use super::{
    discovery::{default_targets, DiscoveryConfig, ReplayConfig, SectorTarget, StorageConfig},
    evolution::EvolutionConfig,
    traits::ConfigSection,
    workload::WorkloadConfig,
};
use crate::error::CachelabError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment variables override file values, e.g. `CACHELAB__EVOLUTION__POPULATION_SIZE=20`.
pub const ENV_PREFIX: &str = "CACHELAB";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub workload: WorkloadConfig,
    pub discovery: DiscoveryConfig,
    pub replay: ReplayConfig,
    pub storage: StorageConfig,
    pub targets: Vec<SectorTarget>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            evolution: EvolutionConfig::default(),
            workload: WorkloadConfig::default(),
            discovery: DiscoveryConfig::default(),
            replay: ReplayConfig::default(),
            storage: StorageConfig::default(),
            targets: default_targets(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), CachelabError> {
        self.evolution.validate()?;
        self.workload.validate()?;
        self.discovery.validate()?;
        self.replay.validate()?;
        self.storage.validate()?;
        if self.targets.is_empty() {
            return Err(CachelabError::Configuration(
                "At least one sector target is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Layer defaults, an optional TOML/JSON file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, CachelabError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let layered = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = layered.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CachelabError> {
        let config = AppConfig::load(Some(path.as_ref()))?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CachelabError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| CachelabError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` to a copy and keep it only if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), CachelabError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::TrafficShape;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cachelab.toml");
        std::fs::write(
            &path,
            "[evolution]\npopulation_size = 24\n\n[workload]\nshape = \"burst\"\nqps = 50.0\n",
        )
        .unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get();

        assert_eq!(config.evolution.population_size, 24);
        assert_eq!(config.evolution.mutation_rate, 0.1);
        assert_eq!(config.workload.shape, TrafficShape::Burst);
        assert_eq!(config.workload.qps, 50.0);
    }

    #[test]
    fn test_rejected_update_keeps_previous_config() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.evolution.population_size = 0);
        assert!(result.is_err());
        assert_eq!(manager.get().evolution.population_size, 10);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let manager = ConfigManager::new();
        manager.update(|c| c.discovery.min_hit_rate = 0.8).unwrap();
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(&path).unwrap();
        assert_eq!(reloaded.get().discovery.min_hit_rate, 0.8);
    }
}
