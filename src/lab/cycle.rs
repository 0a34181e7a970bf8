use super::report::CycleReport;
use crate::config::{AppConfig, SectorTarget};
use crate::engines::compiler::{compile, LabMetadata, WizardTemplate};
use crate::engines::discovery::{
    build_candidate, detect_transfers, experiment_id, record_discovery, strategy_id,
    PromotionPolicy,
};
use crate::engines::evaluation::{
    ClosedFormModel, ExperimentRunner, FitnessEvaluator, GenomeEvaluation, GuardedReplay,
    ReplaySimulator, DEFAULT_REPLAY_THREAD_LIMIT,
};
use crate::engines::generation::{EvolutionEngine, Genome, HallOfFame, ProgressCallback};
use crate::engines::workload::{Workload, WorkloadSynthesizer};
use crate::error::{CachelabError, Result};
use crate::repository::{EventSink, StrategyRepository};
use crate::types::{
    ExperimentResult, IntelligenceTransfer, PatternDiscovery, Strategy,
};
use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// Keeps workload draws independent of the engine's own stream under a fixed seed
const WORKLOAD_SEED_SALT: u64 = 0x5eed_cafe;

/// Runs discovery cycles against injected storage and event collaborators.
///
/// Each lab owns its engine, rng and synthesizer; nothing is shared between
/// instances.
pub struct DiscoveryLab {
    config: AppConfig,
    repository: Arc<dyn StrategyRepository>,
    events: Box<dyn EventSink>,
    synthesizer: WorkloadSynthesizer,
    engine: EvolutionEngine,
    policy: PromotionPolicy,
    workload_rng: StdRng,
}

#[derive(Default)]
struct DiscoveryOutput {
    discoveries: Vec<PatternDiscovery>,
    transfers: Vec<IntelligenceTransfer>,
    templates: Vec<WizardTemplate>,
    /// Signatures rejected this cycle; kept out of the breeding pool.
    deprecated: HashSet<String>,
}

fn build_evaluator(config: &AppConfig, runner: Option<Arc<dyn ExperimentRunner>>) -> FitnessEvaluator {
    let evaluator = FitnessEvaluator::new(
        ClosedFormModel::default(),
        config.evolution.unfold_samples,
        config.evolution.max_unfold_steps,
    );
    match runner {
        // One live replay per worker, plus headroom for timed-out stragglers
        Some(runner) => evaluator.with_replay(
            GuardedReplay::new(runner, Duration::from_millis(config.replay.timeout_ms))
                .with_thread_limit(config.evolution.worker_threads + DEFAULT_REPLAY_THREAD_LIMIT),
        ),
        None => evaluator,
    }
}

impl DiscoveryLab {
    /// Lab replaying through the built-in tier simulator when replay is enabled.
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn StrategyRepository>,
        events: Box<dyn EventSink>,
    ) -> Result<Self> {
        let runner: Option<Arc<dyn ExperimentRunner>> = if config.replay.enabled {
            Some(Arc::new(ReplaySimulator::new(config.replay.clone())))
        } else {
            None
        };
        Self::with_runner(config, repository, events, runner)
    }

    /// Lab with a caller-supplied replay backend (`None` uses the closed-form model only).
    pub fn with_runner(
        config: AppConfig,
        repository: Arc<dyn StrategyRepository>,
        events: Box<dyn EventSink>,
        runner: Option<Arc<dyn ExperimentRunner>>,
    ) -> Result<Self> {
        config.validate()?;

        let evaluator = build_evaluator(&config, runner);
        let engine = EvolutionEngine::new(config.evolution.clone(), evaluator)?;
        let workload_rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ WORKLOAD_SEED_SALT),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            policy: PromotionPolicy::from(&config.discovery),
            config,
            repository,
            events,
            synthesizer: WorkloadSynthesizer::with_default_sectors(),
            engine,
            workload_rng,
        })
    }

    pub fn with_synthesizer(mut self, synthesizer: WorkloadSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn StrategyRepository> {
        &self.repository
    }

    /// Stored population for `target`, or a fresh generation-0 population.
    pub fn load_or_seed(&mut self, target: &SectorTarget) -> Result<Vec<Genome>> {
        match self.repository.load_population(target)? {
            Some(population) if !population.is_empty() => {
                debug!(
                    "Loaded {} genomes for {} {}",
                    population.len(),
                    target.sector,
                    target.use_case
                );
                Ok(population)
            }
            _ => {
                info!("Seeding a new population for {} {}", target.sector, target.use_case);
                Ok(self
                    .engine
                    .initialize_population(self.config.evolution.population_size))
            }
        }
    }

    /// Load (or seed) the target's population and run one cycle on it.
    pub fn run_target<C: ProgressCallback>(
        &mut self,
        target: &SectorTarget,
        callback: &mut C,
    ) -> Result<CycleReport> {
        let population = self.load_or_seed(target)?;
        self.run_cycle(target, &population, callback)
    }

    /// One evaluate → discover → select → breed pass.
    ///
    /// Promotion decisions run before breeding so that signatures deprecated
    /// this cycle never parent the next generation. When every candidate was
    /// deprecated the full population breeds instead.
    ///
    /// Returns `Err` only when the cycle cannot produce a next generation
    /// (bad target, nothing evaluable, population not persisted) or a
    /// repository call other than event emission fails.
    pub fn run_cycle<C: ProgressCallback>(
        &mut self,
        target: &SectorTarget,
        population: &[Genome],
        callback: &mut C,
    ) -> Result<CycleReport> {
        if population.is_empty() {
            return Err(CachelabError::Configuration(format!(
                "Empty population for {} {}",
                target.sector, target.use_case
            )));
        }

        let workload = Arc::new(self.synthesizer.generate(
            target.sector,
            &self.config.workload,
            &mut self.workload_rng,
        )?);
        info!(
            "Cycle for {} {}: {} candidates against {} queries ({:.1} qps, peak {:.0})",
            target.sector,
            target.use_case,
            population.len(),
            workload.len(),
            workload.stats.qps,
            workload.stats.peak_qps
        );

        let evaluated = self.engine.evaluate_population(population, &workload, callback);
        if evaluated.evaluations.is_empty() {
            return Err(CachelabError::Configuration(format!(
                "All {} candidates for {} {} were malformed",
                population.len(),
                target.sector,
                target.use_case
            )));
        }
        let best_fitness = evaluated.best_fitness().unwrap_or(0.0);
        let experiments_run = evaluated.experiments_run();
        let queries_replayed = evaluated.queries_replayed();
        let generation = evaluated
            .evaluations
            .iter()
            .map(|e| e.genome.generation)
            .max()
            .unwrap_or(0)
            + 1;

        let output = self.discover(target, &workload, &evaluated.evaluations, generation)?;

        let breeding: Vec<GenomeEvaluation> = evaluated
            .evaluations
            .iter()
            .filter(|e| !output.deprecated.contains(&e.phenotype.signature()))
            .cloned()
            .collect();
        let pool = if breeding.is_empty() {
            warn!(
                "Every candidate for {} {} was deprecated; breeding from the full population",
                target.sector, target.use_case
            );
            evaluated.evaluations.clone()
        } else {
            breeding
        };

        let next = self.engine.next_generation(&pool, population.len())?;
        let survivors = self.config.evolution.survivor_count(pool.len());
        callback.on_generation_complete(generation, best_fitness, survivors);

        self.persist_population(target, &next)?;

        let report = CycleReport {
            sector: target.sector,
            use_case: target.use_case.clone(),
            generation,
            population: next,
            experiments_run,
            queries_replayed,
            best_fitness,
            discoveries: output.discoveries,
            transfers: output.transfers,
            templates: output.templates,
            dropped: evaluated.dropped.into_iter().map(|(id, _)| id).collect(),
        };

        if let Err(e) = self.events.emit(&report.summary()) {
            warn!("Discovery summary for {} was not delivered: {}", target.sector, e);
        }

        info!(
            "Cycle for {} {} finished: {:?}, best fitness {:.2}",
            target.sector,
            target.use_case,
            report.outcome(),
            best_fitness
        );
        Ok(report)
    }

    fn persist_population(&self, target: &SectorTarget, population: &[Genome]) -> Result<()> {
        let attempts = self.config.storage.persist_attempts.max(2);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.repository.save_population(target, population) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Persisting generation for {} {} failed (attempt {}/{}): {}",
                        target.sector, target.use_case, attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CachelabError::Persistence("Population was not persisted".to_string())
        }))
    }

    fn parent_for(&self, target: &SectorTarget) -> Result<Option<Strategy>> {
        let top = self
            .repository
            .top_strategies(target.sector, self.config.discovery.parent_fetch_size)?;
        Ok(top.into_iter().find(|s| s.use_case == target.use_case))
    }

    fn discover(
        &self,
        target: &SectorTarget,
        workload: &Workload,
        evaluations: &[GenomeEvaluation],
        generation: u32,
    ) -> Result<DiscoveryOutput> {
        let mut output = DiscoveryOutput::default();

        let mut distinct = HallOfFame::new(evaluations.len());
        for evaluation in evaluations {
            distinct.try_add(evaluation.clone());
        }

        let mut parent = self.parent_for(target)?;

        for evaluation in distinct.get_all() {
            let id = strategy_id(target.sector, &target.use_case, &evaluation.phenotype);
            if let Some(existing) = self.repository.get_strategy(&id)? {
                if existing.status.is_promoted() {
                    debug!("{} is already {:?}; skipping", existing.name, existing.status);
                    continue;
                }
            }

            let report = &evaluation.report;
            let mut candidate = build_candidate(
                &evaluation.phenotype,
                target.sector,
                &target.use_case,
                workload,
                &report.metrics,
                parent.as_ref().map(|p| p.id.clone()),
            );
            let decision = self.policy.apply(
                &mut candidate,
                &report.metrics,
                report.score,
                parent.as_ref().map(|p| p.validation_score),
            )?;

            self.repository.upsert_strategy(&candidate)?;
            self.repository.record_experiment(&ExperimentResult {
                id: experiment_id(&candidate.id, generation),
                strategy_id: candidate.id.clone(),
                sector: target.sector,
                workload_queries: workload.len(),
                metrics: report.metrics,
                score: report.score,
                iterations: evaluation.iterations,
                source: report.source,
                created_at: Utc::now(),
            })?;

            let discovery = match record_discovery(&candidate, decision.improvement_pct()) {
                Some(discovery) => discovery,
                None => {
                    debug!("{} deprecated: {:?}", candidate.name, decision);
                    output.deprecated.insert(evaluation.phenotype.signature());
                    continue;
                }
            };
            info!(
                "Promoted {} (score {:.2}, +{:.2}%)",
                candidate.name, discovery.score, discovery.improvement_pct
            );
            self.repository.record_discovery(&discovery)?;

            let peers = self.repository.validated_by_use_case(&target.use_case)?;
            let transfers =
                detect_transfers(&candidate, &peers, self.config.discovery.max_transfers);
            for transfer in &transfers {
                self.repository.record_transfer(transfer)?;
            }

            let template = self.publish(&candidate, generation)?;

            output.discoveries.push(discovery);
            output.transfers.extend(transfers);
            output.templates.push(template);
            parent = Some(candidate);
        }

        Ok(output)
    }

    fn publish(&self, strategy: &Strategy, generation: u32) -> Result<WizardTemplate> {
        let experiments = self.repository.experiments_for(&strategy.id)?;
        let metadata = LabMetadata {
            validation_runs: experiments.len(),
            queries_replayed: experiments.iter().map(|e| e.workload_queries).sum(),
            generation,
        };
        let template = compile(strategy, &metadata)?;
        self.repository.save_template(&template)?;
        Ok(template)
    }
}
