pub mod cycle;
pub mod report;

pub use cycle::DiscoveryLab;
pub use report::{CycleOutcome, CycleReport};
