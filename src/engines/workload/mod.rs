pub mod distributions;
pub mod query;
pub mod sectors;
pub mod synthesizer;

pub use query::{Query, Workload, WorkloadStats};
pub use sectors::{CategorySpec, SectorProfile};
pub use synthesizer::{generate, WorkloadSynthesizer};
