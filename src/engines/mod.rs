pub mod compiler;
pub mod discovery;
pub mod evaluation;
pub mod generation;
pub mod workload;
