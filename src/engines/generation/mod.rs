pub mod stage;
pub mod genome;
pub mod operators;
pub mod phenotype;
pub mod hall_of_fame;
pub mod evolution_engine;
pub mod progress;

pub use stage::{Stage, STAGE_COUNT};
pub use genome::{Genome, TransitionMatrix};
pub use phenotype::{unfold, Phenotype};
pub use hall_of_fame::HallOfFame;
pub use evolution_engine::{EvaluatedPopulation, EvolutionEngine};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressCallback, ProgressMessage};
