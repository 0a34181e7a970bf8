pub mod fitness;
pub mod model;
pub mod replay;
pub mod scoring;

pub use fitness::{FitnessEvaluator, FitnessReport, GenomeEvaluation};
pub use model::ClosedFormModel;
pub use replay::{ExperimentRunner, GuardedReplay, ReplaySimulator, DEFAULT_REPLAY_THREAD_LIMIT};
pub use scoring::{composite_score, score_metrics};
