use super::model::{stage_latency_ms, EMBEDDING_COST_PER_QUERY, SHARED_CACHE_COST_PER_QUERY};
use crate::config::ReplayConfig;
use crate::engines::generation::{Phenotype, Stage};
use crate::engines::workload::{Query, Workload};
use crate::error::{CachelabError, Result};
use crate::types::StrategyMetrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Replay threads a [`GuardedReplay`] lets run at once, abandoned ones included.
pub const DEFAULT_REPLAY_THREAD_LIMIT: usize = 16;

/// Real-time categories a router sends straight to the model.
pub const ROUTER_BYPASS_FRESHNESS_SECS: u64 = 60;

/// Replays a workload against a pipeline and measures it.
pub trait ExperimentRunner: Send + Sync {
    fn name(&self) -> &str;

    fn replay(&self, phenotype: &Phenotype, workload: &Workload) -> Result<StrategyMetrics>;
}

/// Bounded exact-match tier with least-recently-used eviction.
struct LruTier {
    capacity: usize,
    ttl_ms: Option<u64>,
    entries: HashMap<String, (u64, u64)>,
    tick: u64,
}

impl LruTier {
    fn new(capacity: usize, ttl_secs: Option<u64>) -> Self {
        Self {
            capacity,
            ttl_ms: ttl_secs.map(|s| s * 1_000),
            entries: HashMap::with_capacity(capacity),
            tick: 0,
        }
    }

    fn lookup(&mut self, key: &str, now_ms: u64, freshness_secs: u64) -> bool {
        self.tick += 1;
        let max_age = match self.ttl_ms {
            Some(ttl) => ttl.min(freshness_secs * 1_000),
            None => freshness_secs * 1_000,
        };
        match self.entries.get_mut(key) {
            Some((stored_ms, last_used)) if now_ms.saturating_sub(*stored_ms) <= max_age => {
                *last_used = self.tick;
                true
            }
            _ => false,
        }
    }

    fn store(&mut self, key: &str, now_ms: u64) {
        self.tick += 1;
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key.to_string(), (now_ms, self.tick));
    }
}

/// Per-replay tier state, fed one query at a time.
struct TierSimulation<'a> {
    phenotype: &'a Phenotype,
    compliant: bool,
    normalized: bool,
    l1: LruTier,
    l2: LruTier,
    l3: HashMap<String, u64>,
    latencies: Vec<f64>,
    hits: usize,
    cost: f64,
}

impl<'a> TierSimulation<'a> {
    fn new(phenotype: &'a Phenotype, config: &ReplayConfig) -> Self {
        Self {
            phenotype,
            compliant: phenotype.contains(Stage::ComplianceCheck),
            normalized: phenotype.contains(Stage::Normalize),
            l1: LruTier::new(config.l1_capacity, None),
            l2: LruTier::new(config.l2_capacity, Some(config.l2_ttl_secs)),
            l3: HashMap::new(),
            latencies: Vec::new(),
            hits: 0,
            cost: 0.0,
        }
    }

    fn exact_key(&self, query: &Query) -> String {
        if self.normalized {
            query.payload.trim().to_lowercase()
        } else {
            query.payload.clone()
        }
    }

    fn process_query(&mut self, query: &Query) {
        let now = query.offset_ms;
        let exact = self.exact_key(query);
        let semantic = format!("{}::{}", query.category, query.topic);
        let shared_allowed = !query.sensitive || self.compliant;

        let mut latency = 0.0;
        let mut bypass = false;
        let mut hit = false;
        let mut visited: Vec<Stage> = Vec::new();

        for stage in self.phenotype.stages().iter().copied() {
            match stage {
                Stage::Router => {
                    latency += stage_latency_ms(stage);
                    bypass = query.freshness_secs < ROUTER_BYPASS_FRESHNESS_SECS;
                }
                Stage::L1Check if !bypass => {
                    latency += stage_latency_ms(stage);
                    visited.push(stage);
                    hit = self.l1.lookup(&exact, now, query.freshness_secs);
                }
                Stage::L2Check if !bypass && shared_allowed => {
                    latency += stage_latency_ms(stage);
                    self.cost += SHARED_CACHE_COST_PER_QUERY;
                    visited.push(stage);
                    hit = self.l2.lookup(&exact, now, query.freshness_secs);
                }
                Stage::L3Semantic if !bypass && shared_allowed => {
                    latency += stage_latency_ms(stage);
                    self.cost += EMBEDDING_COST_PER_QUERY;
                    visited.push(stage);
                    hit = self
                        .l3
                        .get(&semantic)
                        .is_some_and(|stored| now.saturating_sub(*stored) <= query.freshness_secs * 1_000);
                }
                Stage::L1Check | Stage::L2Check | Stage::L3Semantic => {}
                Stage::LlmCall => {
                    // An explicit model call answers the query outright.
                    break;
                }
                other => latency += stage_latency_ms(other),
            }
            if hit {
                break;
            }
        }

        if hit {
            self.hits += 1;
            // Promote into the faster tiers that missed on the way down.
            visited.pop();
            for stage in visited {
                self.write(stage, &exact, &semantic, now);
            }
        } else {
            latency += llm_latency_ms(query);
            self.cost += llm_cost(query);
            for stage in visited {
                self.write(stage, &exact, &semantic, now);
            }
        }

        self.latencies.push(latency);
    }

    fn write(&mut self, stage: Stage, exact: &str, semantic: &str, now: u64) {
        match stage {
            Stage::L1Check => self.l1.store(exact, now),
            Stage::L2Check => self.l2.store(exact, now),
            Stage::L3Semantic => {
                self.l3.insert(semantic.to_string(), now);
            }
            _ => {}
        }
    }

    fn finish(mut self) -> StrategyMetrics {
        let total = self.latencies.len();
        self.latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        StrategyMetrics {
            hit_rate: if total == 0 { 0.0 } else { self.hits as f64 / total as f64 },
            p50_latency_ms: percentile(&self.latencies, 0.50),
            p95_latency_ms: percentile(&self.latencies, 0.95),
            p99_latency_ms: percentile(&self.latencies, 0.99),
            cost_per_1k: if total == 0 { 0.0 } else { self.cost / total as f64 * 1_000.0 },
        }
    }
}

fn llm_latency_ms(query: &Query) -> f64 {
    400.0 + query.expected_response_bytes as f64 / 4.0
}

fn llm_cost(query: &Query) -> f64 {
    0.0015 + query.expected_response_bytes as f64 * 2e-7
}

/// Nearest-rank percentile over sorted samples.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Replays workloads through simulated L1/L2/L3 tiers.
#[derive(Debug, Clone, Default)]
pub struct ReplaySimulator {
    config: ReplayConfig,
}

impl ReplaySimulator {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }
}

impl ExperimentRunner for ReplaySimulator {
    fn name(&self) -> &str {
        "tier-simulator"
    }

    fn replay(&self, phenotype: &Phenotype, workload: &Workload) -> Result<StrategyMetrics> {
        let mut simulation = TierSimulation::new(phenotype, &self.config);
        for query in &workload.queries {
            simulation.process_query(query);
        }
        Ok(simulation.finish())
    }
}

/// Runs an [`ExperimentRunner`] on a helper thread and gives up after `timeout`.
///
/// A timed-out thread keeps running until its replay returns, so the number
/// of live helper threads is capped; clones share the cap.
#[derive(Clone)]
pub struct GuardedReplay {
    runner: Arc<dyn ExperimentRunner>,
    timeout: Duration,
    live: Arc<AtomicUsize>,
    thread_limit: usize,
}

/// Holds one slot of the live-thread count until dropped.
struct LiveThread(Arc<AtomicUsize>);

impl Drop for LiveThread {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl GuardedReplay {
    pub fn new(runner: Arc<dyn ExperimentRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            live: Arc::new(AtomicUsize::new(0)),
            thread_limit: DEFAULT_REPLAY_THREAD_LIMIT,
        }
    }

    pub fn with_thread_limit(mut self, limit: usize) -> Self {
        self.thread_limit = limit.max(1);
        self
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    /// Helper threads still running, finished or abandoned.
    pub fn live_threads(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn claim_thread(&self) -> Result<LiveThread> {
        let limit = self.thread_limit;
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .map_err(|n| {
                CachelabError::Evaluation(format!(
                    "{} replay threads still running for {}; refusing to start another",
                    n,
                    self.runner.name()
                ))
            })?;
        Ok(LiveThread(Arc::clone(&self.live)))
    }

    pub fn run(&self, phenotype: &Phenotype, workload: &Arc<Workload>) -> Result<StrategyMetrics> {
        let slot = self.claim_thread()?;
        let (tx, rx) = mpsc::channel();
        let runner = Arc::clone(&self.runner);
        let phenotype = phenotype.clone();
        let workload = Arc::clone(workload);

        thread::Builder::new()
            .name("cachelab-replay".to_string())
            .spawn(move || {
                let _slot = slot;
                let _ = tx.send(runner.replay(&phenotype, &workload));
            })
            .map_err(|e| CachelabError::Evaluation(format!("Failed to start replay: {}", e)))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result.and_then(check_metrics),
            Err(RecvTimeoutError::Timeout) => Err(CachelabError::Evaluation(format!(
                "Replay with {} timed out after {:?}",
                self.runner.name(),
                self.timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(CachelabError::Evaluation(format!(
                "Replay with {} exited without a result",
                self.runner.name()
            ))),
        }
    }
}

/// Reject results no real replay could produce.
fn check_metrics(metrics: StrategyMetrics) -> Result<StrategyMetrics> {
    let values = [
        metrics.hit_rate,
        metrics.p50_latency_ms,
        metrics.p95_latency_ms,
        metrics.p99_latency_ms,
        metrics.cost_per_1k,
    ];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) || metrics.hit_rate > 1.0 {
        return Err(CachelabError::Evaluation(format!(
            "Malformed replay result: {:?}",
            metrics
        )));
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrafficShape, WorkloadConfig};
    use crate::engines::workload::WorkloadSynthesizer;
    use crate::types::Sector;

    fn workload(sector: Sector) -> Arc<Workload> {
        let config = WorkloadConfig {
            duration_secs: 60,
            qps: 10.0,
            shape: TrafficShape::Zipfian,
            burstiness: 0.1,
            compliance: true,
        };
        Arc::new(
            WorkloadSynthesizer::with_default_sectors()
                .generate_seeded(sector, &config, 21)
                .unwrap(),
        )
    }

    struct SlowRunner;

    impl ExperimentRunner for SlowRunner {
        fn name(&self) -> &str {
            "slow"
        }

        fn replay(&self, _: &Phenotype, _: &Workload) -> Result<StrategyMetrics> {
            thread::sleep(Duration::from_millis(500));
            Err(CachelabError::Evaluation("unreachable".to_string()))
        }
    }

    struct BrokenRunner;

    impl ExperimentRunner for BrokenRunner {
        fn name(&self) -> &str {
            "broken"
        }

        fn replay(&self, _: &Phenotype, _: &Workload) -> Result<StrategyMetrics> {
            Ok(StrategyMetrics {
                hit_rate: 1.7,
                p50_latency_ms: 1.0,
                p95_latency_ms: 1.0,
                p99_latency_ms: 1.0,
                cost_per_1k: 0.1,
            })
        }
    }

    #[test]
    fn test_no_cache_never_hits() {
        let workload = workload(Sector::Hpc);
        let metrics = ReplaySimulator::default()
            .replay(&Phenotype(vec![Stage::LlmCall]), &workload)
            .unwrap();
        assert_eq!(metrics.hit_rate, 0.0);
        assert!(metrics.p95_latency_ms >= 400.0);
        assert!(metrics.cost_per_1k > 1.0);
    }

    #[test]
    fn test_semantic_tier_improves_hit_rate() {
        let workload = workload(Sector::Hpc);
        let simulator = ReplaySimulator::default();
        let l1 = simulator.replay(&Phenotype(vec![Stage::L1Check]), &workload).unwrap();
        let l1_l3 = simulator
            .replay(&Phenotype(vec![Stage::L1Check, Stage::L3Semantic]), &workload)
            .unwrap();
        assert!(l1_l3.hit_rate > l1.hit_rate);
        assert!(l1_l3.cost_per_1k < l1.cost_per_1k);
    }

    #[test]
    fn test_sensitive_queries_need_compliance_for_shared_tiers() {
        let workload = workload(Sector::Healthcare);
        let simulator = ReplaySimulator::default();
        let open = simulator.replay(&Phenotype(vec![Stage::L3Semantic]), &workload).unwrap();
        let gated = simulator
            .replay(&Phenotype(vec![Stage::ComplianceCheck, Stage::L3Semantic]), &workload)
            .unwrap();
        assert!(gated.hit_rate > open.hit_rate);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&samples, 0.95), 95.0);
        assert_eq!(percentile(&samples, 0.50), 50.0);
        assert_eq!(percentile(&[3.0], 0.99), 3.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_guarded_replay_times_out() {
        let guarded = GuardedReplay::new(Arc::new(SlowRunner), Duration::from_millis(20));
        let err = guarded.run(&Phenotype::default(), &workload(Sector::Hpc)).unwrap_err();
        assert!(matches!(err, CachelabError::Evaluation(_)));
    }

    #[test]
    fn test_guarded_replay_rejects_malformed_metrics() {
        let guarded = GuardedReplay::new(Arc::new(BrokenRunner), Duration::from_secs(5));
        let err = guarded.run(&Phenotype::default(), &workload(Sector::Hpc)).unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut tier = LruTier::new(2, None);
        tier.store("a", 0);
        tier.store("b", 0);
        assert!(tier.lookup("a", 1, 60));
        tier.store("c", 2);
        assert!(tier.lookup("a", 3, 60));
        assert!(!tier.lookup("b", 3, 60));
        assert!(tier.lookup("c", 3, 60));
    }

    #[test]
    fn test_stale_entries_miss() {
        let mut tier = LruTier::new(4, Some(10));
        tier.store("a", 0);
        assert!(tier.lookup("a", 5_000, 60));
        assert!(!tier.lookup("a", 11_000, 60));
        assert!(!tier.lookup("a", 2_000, 1));
    }

    #[test]
    fn test_full_pipeline_clears_promotion_bar_on_default_workloads() {
        let synthesizer = WorkloadSynthesizer::with_default_sectors();
        let pipeline = Phenotype(vec![
            Stage::Normalize,
            Stage::ComplianceCheck,
            Stage::L1Check,
            Stage::L2Check,
            Stage::L3Semantic,
        ]);
        for sector in Sector::ALL {
            let workload = synthesizer
                .generate_seeded(sector, &WorkloadConfig::default(), 13)
                .unwrap();
            let metrics = ReplaySimulator::default().replay(&pipeline, &workload).unwrap();
            assert!(metrics.hit_rate > 0.7, "{} hit rate {:.3}", sector, metrics.hit_rate);
        }
    }

    #[test]
    fn test_abandoned_threads_count_against_the_limit() {
        let guarded = GuardedReplay::new(Arc::new(SlowRunner), Duration::from_millis(20))
            .with_thread_limit(1);
        let workload = workload(Sector::Hpc);

        let first = guarded.run(&Phenotype::default(), &workload).unwrap_err();
        assert!(first.to_string().contains("timed out"));
        assert_eq!(guarded.live_threads(), 1);

        let second = guarded.clone().run(&Phenotype::default(), &workload).unwrap_err();
        assert!(second.to_string().contains("still running"), "{}", second);

        thread::sleep(Duration::from_millis(800));
        assert_eq!(guarded.live_threads(), 0);
    }
}
