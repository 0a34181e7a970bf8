use super::model::ClosedFormModel;
use super::replay::GuardedReplay;
use super::scoring::score_metrics;
use crate::engines::generation::{phenotype::unfold, Genome, Phenotype};
use crate::engines::workload::Workload;
use crate::error::CachelabError;
use crate::types::{MetricsSource, StrategyMetrics};
use log::warn;
use rand::Rng;
use std::sync::Arc;

/// Outcome of scoring one phenotype against one workload.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessReport {
    /// 0-100; the composite score for replays, the closed-form score otherwise.
    pub score: f64,
    pub metrics: StrategyMetrics,
    pub source: MetricsSource,
    /// Queries replayed, or 1 for a closed-form estimate.
    pub iterations: usize,
}

/// A genome scored over several unfoldings.
#[derive(Debug, Clone)]
pub struct GenomeEvaluation {
    pub genome: Genome,
    /// Mean score across samples.
    pub fitness: f64,
    /// The best-scoring sample.
    pub phenotype: Phenotype,
    pub report: FitnessReport,
    /// Phenotypes unfolded and scored, one experiment each.
    pub samples: usize,
    /// Queries replayed across all samples.
    pub iterations: usize,
}

pub struct FitnessEvaluator {
    model: ClosedFormModel,
    replay: Option<GuardedReplay>,
    samples: usize,
    max_steps: usize,
}

impl FitnessEvaluator {
    pub fn new(model: ClosedFormModel, samples: usize, max_steps: usize) -> Self {
        Self {
            model,
            replay: None,
            samples: samples.max(1),
            max_steps,
        }
    }

    pub fn with_replay(mut self, replay: GuardedReplay) -> Self {
        self.replay = Some(replay);
        self
    }

    pub fn model(&self) -> &ClosedFormModel {
        &self.model
    }

    /// Replay when available; any evaluation error falls back to the model.
    pub fn evaluate_phenotype<R: Rng + ?Sized>(
        &self,
        phenotype: &Phenotype,
        workload: &Arc<Workload>,
        rng: &mut R,
    ) -> FitnessReport {
        if let Some(replay) = &self.replay {
            match replay.run(phenotype, workload) {
                Ok(metrics) => {
                    return FitnessReport {
                        score: score_metrics(&metrics),
                        metrics,
                        source: MetricsSource::Replay,
                        iterations: workload.len(),
                    }
                }
                Err(e) => warn!("Falling back to closed-form fitness for {}: {}", phenotype, e),
            }
        }

        FitnessReport {
            score: self.model.score(phenotype, rng),
            metrics: self.model.estimate_metrics(phenotype, workload),
            source: MetricsSource::Model,
            iterations: 1,
        }
    }

    /// Unfold `samples` phenotypes and average their scores.
    ///
    /// A genome violating the stochastic invariants is a configuration error.
    pub fn evaluate_genome<R: Rng + ?Sized>(
        &self,
        genome: &Genome,
        workload: &Arc<Workload>,
        rng: &mut R,
    ) -> Result<GenomeEvaluation, CachelabError> {
        genome.validate()?;

        let mut best: Option<(Phenotype, FitnessReport)> = None;
        let mut total_score = 0.0;
        let mut iterations = 0;

        for _ in 0..self.samples {
            let phenotype = unfold(genome, self.max_steps, rng);
            let report = self.evaluate_phenotype(&phenotype, workload, rng);
            total_score += report.score;
            iterations += report.iterations;

            let better = best.as_ref().map_or(true, |(_, b)| report.score > b.score);
            if better {
                best = Some((phenotype, report));
            }
        }

        let (phenotype, report) = best.ok_or_else(|| {
            CachelabError::Evaluation(format!("Genome {} produced no samples", genome.id))
        })?;
        let fitness = total_score / self.samples as f64;

        let mut evaluated = genome.clone();
        evaluated.fitness = Some(fitness);
        evaluated.phenotype = Some(phenotype.clone());

        Ok(GenomeEvaluation {
            genome: evaluated,
            fitness,
            phenotype,
            report,
            samples: self.samples,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::engines::evaluation::replay::{ExperimentRunner, ReplaySimulator};
    use crate::engines::generation::operators::random_genome;
    use crate::engines::generation::Stage;
    use crate::engines::workload::WorkloadSynthesizer;
    use crate::types::Sector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    struct FailingRunner;

    impl ExperimentRunner for FailingRunner {
        fn name(&self) -> &str {
            "failing"
        }

        fn replay(&self, _: &Phenotype, _: &Workload) -> crate::error::Result<StrategyMetrics> {
            Err(CachelabError::Evaluation("backend unavailable".to_string()))
        }
    }

    fn workload() -> Arc<Workload> {
        Arc::new(
            WorkloadSynthesizer::with_default_sectors()
                .generate_seeded(Sector::Finance, &WorkloadConfig::default(), 2)
                .unwrap(),
        )
    }

    #[test]
    fn test_replay_failure_falls_back_to_model() {
        let evaluator = FitnessEvaluator::new(ClosedFormModel::default(), 1, 10).with_replay(
            GuardedReplay::new(Arc::new(FailingRunner), Duration::from_secs(1)),
        );
        let mut rng = StdRng::seed_from_u64(3);
        let report =
            evaluator.evaluate_phenotype(&Phenotype(vec![Stage::L1Check]), &workload(), &mut rng);
        assert_eq!(report.source, MetricsSource::Model);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn test_replay_success_uses_composite_score() {
        let evaluator = FitnessEvaluator::new(ClosedFormModel::default(), 1, 10).with_replay(
            GuardedReplay::new(Arc::new(ReplaySimulator::default()), Duration::from_secs(5)),
        );
        let workload = workload();
        let mut rng = StdRng::seed_from_u64(3);
        let report = evaluator.evaluate_phenotype(
            &Phenotype(vec![Stage::L1Check, Stage::L3Semantic]),
            &workload,
            &mut rng,
        );
        assert_eq!(report.source, MetricsSource::Replay);
        assert_eq!(report.iterations, workload.len());
        assert_eq!(report.score, score_metrics(&report.metrics));
    }

    #[test]
    fn test_evaluate_genome_records_fitness_and_phenotype() {
        let evaluator = FitnessEvaluator::new(ClosedFormModel::default(), 3, 10);
        let mut rng = StdRng::seed_from_u64(8);
        let genome = random_genome(0, &mut rng);
        let evaluation = evaluator.evaluate_genome(&genome, &workload(), &mut rng).unwrap();

        assert!((0.0..=100.0).contains(&evaluation.fitness));
        assert_eq!(evaluation.genome.fitness, Some(evaluation.fitness));
        assert_eq!(evaluation.genome.phenotype.as_ref(), Some(&evaluation.phenotype));
        assert!(evaluation.report.score >= evaluation.fitness);
        assert_eq!(evaluation.samples, 3);
        assert_eq!(evaluation.iterations, 3);
    }

    #[test]
    fn test_invalid_genome_is_configuration_error() {
        let evaluator = FitnessEvaluator::new(ClosedFormModel::default(), 1, 10);
        let mut rng = StdRng::seed_from_u64(8);
        let mut genome = random_genome(0, &mut rng);
        genome.matrix[0][0] += 1.0;
        let err = evaluator.evaluate_genome(&genome, &workload(), &mut rng).unwrap_err();
        assert!(err.is_configuration());
    }
}
