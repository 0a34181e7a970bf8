use crate::config::{ConfigSection, EvolutionConfig};
use crate::engines::evaluation::{FitnessEvaluator, GenomeEvaluation};
use crate::engines::generation::{
    genome::Genome,
    operators::{crossover, maybe_mutate, random_genome, uniform_selection},
    progress::ProgressCallback,
};
use crate::engines::workload::Workload;
use crate::error::CachelabError;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

/// Candidates that survived evaluation, plus those dropped as malformed.
pub struct EvaluatedPopulation {
    pub evaluations: Vec<GenomeEvaluation>,
    pub dropped: Vec<(String, CachelabError)>,
}

impl EvaluatedPopulation {
    pub fn best_fitness(&self) -> Option<f64> {
        self.evaluations
            .iter()
            .map(|e| e.fitness)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Scored phenotype samples, one experiment each.
    pub fn experiments_run(&self) -> usize {
        self.evaluations.iter().map(|e| e.samples).sum()
    }

    pub fn queries_replayed(&self) -> usize {
        self.evaluations.iter().map(|e| e.iterations).sum()
    }
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    evaluator: FitnessEvaluator,
    pool: rayon::ThreadPool,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig, evaluator: FitnessEvaluator) -> Result<Self, CachelabError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("cachelab-eval-{}", i))
            .build()
            .map_err(|e| CachelabError::Configuration(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            config,
            evaluator,
            pool,
            rng,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Fresh random genomes at generation 0.
    pub fn initialize_population(&mut self, size: usize) -> Vec<Genome> {
        (0..size).map(|_| random_genome(0, &mut self.rng)).collect()
    }

    /// Score every candidate on the worker pool.
    ///
    /// Each candidate gets its own rng seeded from the engine's, so results do
    /// not depend on scheduling. Malformed genomes are dropped and reported.
    pub fn evaluate_population<C: ProgressCallback>(
        &mut self,
        population: &[Genome],
        workload: &Arc<Workload>,
        callback: &mut C,
    ) -> EvaluatedPopulation {
        let generation = population.iter().map(|g| g.generation).max().unwrap_or(0);
        callback.on_generation_start(generation, population.len());

        let seeds: Vec<u64> = population.iter().map(|_| self.rng.gen()).collect();
        let evaluator = &self.evaluator;

        let results: Vec<(String, Result<GenomeEvaluation, CachelabError>)> = self.pool.install(|| {
            population
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(genome, seed)| {
                    let mut rng = StdRng::seed_from_u64(*seed);
                    (genome.id.clone(), evaluator.evaluate_genome(genome, workload, &mut rng))
                })
                .collect()
        });

        let total = results.len();
        let mut evaluations = Vec::with_capacity(total);
        let mut dropped = Vec::new();

        for (i, (id, result)) in results.into_iter().enumerate() {
            match result {
                Ok(evaluation) => evaluations.push(evaluation),
                Err(e) => {
                    warn!("Dropping candidate {}: {}", id, e);
                    dropped.push((id, e));
                }
            }
            callback.on_candidate_evaluated(i + 1, total);
        }

        EvaluatedPopulation {
            evaluations,
            dropped,
        }
    }

    /// Rank, keep the top survivors and breed back up to `target_size`.
    ///
    /// Every member of the result carries generation `max(input) + 1`.
    pub fn next_generation(
        &mut self,
        evaluations: &[GenomeEvaluation],
        target_size: usize,
    ) -> Result<Vec<Genome>, CachelabError> {
        if evaluations.is_empty() {
            return Err(CachelabError::Configuration(
                "No valid candidates left to breed from".to_string(),
            ));
        }

        let mut ranked: Vec<&GenomeEvaluation> = evaluations.iter().collect();
        ranked.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal));

        let next_gen = ranked.iter().map(|e| e.genome.generation).max().unwrap_or(0) + 1;
        let survivor_count = self.config.survivor_count(ranked.len());
        let parents: Vec<Genome> = ranked
            .iter()
            .take(survivor_count)
            .map(|e| e.genome.clone())
            .collect();

        let mut next_generation: Vec<Genome> = parents
            .iter()
            .take(target_size)
            .cloned()
            .map(|mut survivor| {
                survivor.generation = next_gen;
                survivor
            })
            .collect();

        let mut mutated = 0;
        while next_generation.len() < target_size {
            let parent1 = uniform_selection(&parents, &mut self.rng);
            let parent2 = uniform_selection(&parents, &mut self.rng);

            let mut child = crossover(parent1, parent2, &mut self.rng);
            child.generation = next_gen;
            if maybe_mutate(&mut child, self.config.mutation_rate, &mut self.rng) {
                mutated += 1;
            }
            next_generation.push(child);
        }

        info!(
            "Bred generation {}: {} survivors, {} children ({} mutated)",
            next_gen,
            survivor_count.min(target_size),
            target_size.saturating_sub(survivor_count),
            mutated
        );

        Ok(next_generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::engines::evaluation::ClosedFormModel;
    use crate::engines::generation::progress::{
        ChannelProgressCallback, LogProgressCallback, ProgressMessage,
    };
    use crate::engines::workload::WorkloadSynthesizer;
    use crate::types::Sector;

    fn engine(seed: u64) -> EvolutionEngine {
        let config = EvolutionConfig {
            seed: Some(seed),
            worker_threads: 2,
            ..Default::default()
        };
        let evaluator = FitnessEvaluator::new(ClosedFormModel::default(), 2, 10);
        EvolutionEngine::new(config, evaluator).unwrap()
    }

    fn workload() -> Arc<Workload> {
        Arc::new(
            WorkloadSynthesizer::with_default_sectors()
                .generate_seeded(Sector::Legal, &WorkloadConfig::default(), 4)
                .unwrap(),
        )
    }

    #[test]
    fn test_next_generation_keeps_size_and_bumps_generation() {
        let mut engine = engine(1);
        let population = engine.initialize_population(10);
        let (tx, rx) = std::sync::mpsc::channel();
        let mut callback = ChannelProgressCallback::new(tx);

        let evaluated = engine.evaluate_population(&population, &workload(), &mut callback);
        assert_eq!(evaluated.evaluations.len(), 10);
        assert!(evaluated.dropped.is_empty());
        // Ten genomes, two unfold samples each
        assert_eq!(evaluated.experiments_run(), 20);

        let next = engine.next_generation(&evaluated.evaluations, 10).unwrap();
        assert_eq!(next.len(), 10);
        assert!(next.iter().all(|g| g.generation == 1));
        assert!(next.iter().all(|g| g.is_valid()));

        let messages: Vec<ProgressMessage> = rx.try_iter().collect();
        assert_eq!(
            messages.first(),
            Some(&ProgressMessage::GenerationStart {
                generation: 0,
                population: 10
            })
        );
    }

    #[test]
    fn test_survivors_are_the_fittest() {
        let mut engine = engine(2);
        let population = engine.initialize_population(10);
        let evaluated =
            engine.evaluate_population(&population, &workload(), &mut LogProgressCallback);

        let mut fitness: Vec<(String, f64)> = evaluated
            .evaluations
            .iter()
            .map(|e| (e.genome.id.clone(), e.fitness))
            .collect();
        fitness.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let next = engine.next_generation(&evaluated.evaluations, 10).unwrap();
        assert_eq!(next[0].id, fitness[0].0);
        assert_eq!(next[1].id, fitness[1].0);
    }

    #[test]
    fn test_single_survivor_self_crossover() {
        let mut engine = engine(3);
        let population = engine.initialize_population(1);
        let evaluated =
            engine.evaluate_population(&population, &workload(), &mut LogProgressCallback);

        let next = engine.next_generation(&evaluated.evaluations, 4).unwrap();
        assert_eq!(next.len(), 4);
        assert!(next.iter().all(|g| g.is_valid() && g.generation == 1));
    }

    #[test]
    fn test_invalid_candidates_are_dropped() {
        let mut engine = engine(4);
        let mut population = engine.initialize_population(3);
        population[1].matrix[2][2] = 5.0;

        let evaluated =
            engine.evaluate_population(&population, &workload(), &mut LogProgressCallback);
        assert_eq!(evaluated.evaluations.len(), 2);
        assert_eq!(evaluated.dropped.len(), 1);
        assert_eq!(evaluated.dropped[0].0, population[1].id);
    }

    #[test]
    fn test_empty_population_cannot_breed() {
        let mut engine = engine(5);
        assert!(engine.next_generation(&[], 10).unwrap_err().is_configuration());
    }

    #[test]
    fn test_same_seed_same_fitness() {
        let workload = workload();
        let mut a = engine(9);
        let mut b = engine(9);
        let pop_a = a.initialize_population(5);
        let pop_b = b.initialize_population(5);
        let matrices = |pop: &[Genome]| pop.iter().map(|g| g.matrix).collect::<Vec<_>>();
        assert_eq!(matrices(&pop_a), matrices(&pop_b));

        let fa: Vec<f64> = a
            .evaluate_population(&pop_a, &workload, &mut LogProgressCallback)
            .evaluations
            .iter()
            .map(|e| e.fitness)
            .collect();
        let fb: Vec<f64> = b
            .evaluate_population(&pop_b, &workload, &mut LogProgressCallback)
            .evaluations
            .iter()
            .map(|e| e.fitness)
            .collect();
        assert_eq!(fa, fb);
    }
}
