use super::traits::{check_unit_interval, invalid, ConfigSection};
use crate::error::CachelabError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Share of the ranked population kept as survivors (rounded up, at least one).
    pub survivor_fraction: f64,
    /// Probability that a freshly crossed-over child is mutated.
    pub mutation_rate: f64,
    /// Upper bound on stages emitted by one phenotype unfolding.
    pub max_unfold_steps: usize,
    /// Phenotypes sampled per genome; the fitness is their mean.
    pub unfold_samples: usize,
    /// Size of the evaluation worker pool.
    pub worker_threads: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            survivor_fraction: 0.2,
            mutation_rate: 0.1,
            max_unfold_steps: 10,
            unfold_samples: 3,
            worker_threads: 4,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Number of survivors retained out of `population` ranked members.
    pub fn survivor_count(&self, population: usize) -> usize {
        let survivors = (population as f64 * self.survivor_fraction).ceil() as usize;
        survivors.clamp(1, population.max(1))
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), CachelabError> {
        let section = Self::section_name();
        if self.population_size == 0 {
            return Err(invalid(section, "Population size must be at least 1"));
        }
        if self.survivor_fraction <= 0.0 || self.survivor_fraction > 1.0 {
            return Err(invalid(section, "Survivor fraction must be in (0, 1]"));
        }
        check_unit_interval(section, "Mutation rate", self.mutation_rate)?;
        if self.max_unfold_steps == 0 {
            return Err(invalid(section, "Max unfold steps must be at least 1"));
        }
        if self.unfold_samples == 0 {
            return Err(invalid(section, "Unfold samples must be at least 1"));
        }
        if self.worker_threads == 0 {
            return Err(invalid(section, "Worker threads must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survivor_count_rounds_up_with_minimum_one() {
        let config = EvolutionConfig::default();
        assert_eq!(config.survivor_count(10), 2);
        assert_eq!(config.survivor_count(11), 3);
        assert_eq!(config.survivor_count(3), 1);
        assert_eq!(config.survivor_count(1), 1);
    }

    #[test]
    fn test_rejects_out_of_range_mutation_rate() {
        let config = EvolutionConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
