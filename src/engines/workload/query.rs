use crate::config::WorkloadConfig;
use crate::types::{Priority, Sector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub sector: Sector,
    /// Milliseconds since the start of the workload.
    pub offset_ms: u64,
    pub category: String,
    pub entity_id: String,
    /// What the query is about: the entity for entity-scoped templates,
    /// otherwise the vocabulary term.
    pub topic: String,
    pub payload: String,
    pub priority: Priority,
    /// Maximum acceptable age of a cached answer.
    pub freshness_secs: u64,
    pub sensitive: bool,
    pub expected_response_bytes: usize,
}

impl Query {
    /// Key under which two queries ask for the same underlying answer.
    pub fn semantic_key(&self) -> (&str, &str) {
        (&self.category, &self.topic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStats {
    pub total_queries: usize,
    pub duration_secs: u64,
    pub qps: f64,
    /// Highest number of queries landing in a single one-second bucket.
    pub peak_qps: f64,
    pub category_distribution: BTreeMap<String, f64>,
    pub unique_keys: usize,
    /// Share of queries whose `(category, topic)` key was already seen.
    pub repeat_ratio: f64,
}

impl WorkloadStats {
    pub fn from_queries(queries: &[Query], duration_secs: u64) -> Self {
        let total = queries.len();

        let mut per_second: BTreeMap<u64, usize> = BTreeMap::new();
        let mut per_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut repeats = 0usize;

        for query in queries {
            *per_second.entry(query.offset_ms / 1000).or_insert(0) += 1;
            *per_category.entry(query.category.clone()).or_insert(0) += 1;
            if !seen.insert(query.semantic_key()) {
                repeats += 1;
            }
        }

        let category_distribution = per_category
            .into_iter()
            .map(|(name, count)| (name, count as f64 / total.max(1) as f64))
            .collect();

        Self {
            total_queries: total,
            duration_secs,
            qps: total as f64 / duration_secs.max(1) as f64,
            peak_qps: per_second.values().copied().max().unwrap_or(0) as f64,
            category_distribution,
            unique_keys: seen.len(),
            repeat_ratio: if total == 0 { 0.0 } else { repeats as f64 / total as f64 },
        }
    }
}

/// Ordered synthetic query batch for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub sector: Sector,
    pub config: WorkloadConfig,
    pub queries: Vec<Query>,
    pub stats: WorkloadStats,
}

impl Workload {
    pub fn new(sector: Sector, config: WorkloadConfig, queries: Vec<Query>) -> Self {
        let stats = WorkloadStats::from_queries(&queries, config.duration_secs);
        Self {
            sector,
            config,
            queries,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn sensitive_share(&self) -> f64 {
        if self.queries.is_empty() {
            return 0.0;
        }
        self.queries.iter().filter(|q| q.sensitive).count() as f64 / self.queries.len() as f64
    }
}
