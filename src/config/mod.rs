pub mod traits;
pub mod evolution;
pub mod workload;
pub mod discovery;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use evolution::EvolutionConfig;
pub use workload::{TrafficShape, WorkloadConfig};
pub use discovery::{DiscoveryConfig, ReplayConfig, SectorTarget, StorageConfig};
pub use traits::ConfigSection;
