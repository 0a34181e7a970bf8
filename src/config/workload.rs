use super::traits::{check_unit_interval, invalid, ConfigSection};
use crate::error::CachelabError;
use serde::{Deserialize, Serialize};

/// Statistical shape of synthesized traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficShape {
    Uniform,
    Zipfian,
    Pareto,
    Burst,
}

/// Parameters of one `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub duration_secs: u64,
    pub qps: f64,
    pub shape: TrafficShape,
    /// Probability that a tick spikes instantaneous QPS (up to 4x).
    pub burstiness: f64,
    pub compliance: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            duration_secs: 120,
            qps: 10.0,
            shape: TrafficShape::Zipfian,
            burstiness: 0.1,
            compliance: true,
        }
    }
}

impl WorkloadConfig {
    /// Number of queries a run of this config emits.
    pub fn total_queries(&self) -> usize {
        (self.duration_secs as f64 * self.qps).round() as usize
    }
}

impl ConfigSection for WorkloadConfig {
    fn section_name() -> &'static str {
        "workload"
    }

    fn validate(&self) -> Result<(), CachelabError> {
        let section = Self::section_name();
        if self.duration_secs == 0 {
            return Err(invalid(section, "Duration must be at least one second"));
        }
        if !(self.qps > 0.0) || !self.qps.is_finite() {
            return Err(invalid(section, "QPS must be a positive number"));
        }
        check_unit_interval(section, "Burstiness", self.burstiness)
    }
}
