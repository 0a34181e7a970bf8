use super::{CategorySpec, SectorProfile};
use crate::types::{Priority, Sector};

const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "job_failures",
        weight: 0.35,
        priority: Priority::High,
        freshness_secs: 600,
        response_bytes: (1_000, 4_000),
        sensitive: false,
        templates: &[
            "Why did {entity} fail with {term}?",
            "Suggest a fix for {term} in {entity}.",
        ],
    },
    CategorySpec {
        name: "scheduler_config",
        weight: 0.25,
        priority: Priority::Normal,
        freshness_secs: 86_400,
        response_bytes: (800, 2_500),
        sensitive: false,
        templates: &[
            "How do I request {term} in a Slurm batch script?",
            "What partition limits apply to {term}?",
        ],
    },
    CategorySpec {
        name: "performance_tuning",
        weight: 0.25,
        priority: Priority::Normal,
        freshness_secs: 172_800,
        response_bytes: (1_500, 5_000),
        sensitive: false,
        templates: &["How can {entity} reduce time spent in {term}?"],
    },
    CategorySpec {
        name: "allocation_usage",
        weight: 0.15,
        priority: Priority::Low,
        freshness_secs: 3_600,
        response_bytes: (200, 700),
        sensitive: false,
        templates: &["How many {term} hours has {entity} consumed?"],
    },
];

const VOCABULARY: &[&str] = &[
    "OOM kill",
    "MPI_Allreduce",
    "GPU nodes",
    "NCCL timeout",
    "checkpoint I/O",
    "node-hours",
];

pub struct HpcProfile;

impl SectorProfile for HpcProfile {
    fn sector(&self) -> Sector {
        Sector::Hpc
    }

    fn categories(&self) -> &'static [CategorySpec] {
        CATEGORIES
    }

    fn entity_prefix(&self) -> &'static str {
        "job"
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn entity_pool_size(&self) -> usize {
        80
    }
}
