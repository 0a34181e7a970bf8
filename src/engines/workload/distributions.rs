use crate::config::TrafficShape;
use crate::error::CachelabError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Share of the entity pool that is "hot".
pub const HOT_POOL_FRACTION: f64 = 0.2;
/// Share of references that land in the hot pool.
pub const HOT_REFERENCE_SHARE: f64 = 0.8;
pub const ZIPF_EXPONENT: f64 = 1.1;
pub const PARETO_ALPHA: f64 = 1.5;
/// Largest instantaneous QPS multiplier during a spike.
pub const MAX_SPIKE_FACTOR: f64 = 4.0;

/// Draws entity indices following the 80/20 rule.
///
/// Under [`TrafficShape::Zipfian`] the hot pool itself is rank-skewed;
/// otherwise picks inside each pool are uniform.
#[derive(Debug, Clone)]
pub struct EntitySampler {
    pool_size: usize,
    hot_size: usize,
    hot_ranks: Option<WeightedIndex<f64>>,
}

impl EntitySampler {
    pub fn new(pool_size: usize, shape: TrafficShape) -> Result<Self, CachelabError> {
        if pool_size == 0 {
            return Err(CachelabError::Configuration(
                "Entity pool must not be empty".to_string(),
            ));
        }
        let hot_size = ((pool_size as f64 * HOT_POOL_FRACTION).ceil() as usize).clamp(1, pool_size);

        let hot_ranks = match shape {
            TrafficShape::Zipfian => {
                let weights = (1..=hot_size).map(|rank| 1.0 / (rank as f64).powf(ZIPF_EXPONENT));
                Some(WeightedIndex::new(weights).map_err(|e| {
                    CachelabError::Configuration(format!("Invalid Zipf weights: {}", e))
                })?)
            }
            _ => None,
        };

        Ok(Self {
            pool_size,
            hot_size,
            hot_ranks,
        })
    }

    pub fn hot_size(&self) -> usize {
        self.hot_size
    }

    pub fn is_hot(&self, index: usize) -> bool {
        index < self.hot_size
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let cold_size = self.pool_size - self.hot_size;
        if cold_size == 0 || rng.gen::<f64>() < HOT_REFERENCE_SHARE {
            match &self.hot_ranks {
                Some(ranks) => ranks.sample(rng),
                None => rng.gen_range(0..self.hot_size),
            }
        } else {
            self.hot_size + rng.gen_range(0..cold_size)
        }
    }
}

/// Spacing between consecutive queries, including QPS spikes.
#[derive(Debug, Clone)]
pub struct ArrivalProcess {
    base_qps: f64,
    shape: TrafficShape,
    spike_probability: f64,
    spike_ticks_left: usize,
    spike_factor: f64,
}

impl ArrivalProcess {
    pub fn new(base_qps: f64, shape: TrafficShape, burstiness: f64) -> Self {
        let spike_probability = match shape {
            TrafficShape::Burst => (burstiness * 2.0).min(1.0),
            _ => burstiness,
        };
        Self {
            base_qps,
            shape,
            spike_probability,
            spike_ticks_left: 0,
            spike_factor: 1.0,
        }
    }

    /// Instantaneous QPS for the next tick.
    pub fn next_qps<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if self.spike_ticks_left > 0 {
            self.spike_ticks_left -= 1;
            return self.base_qps * self.spike_factor;
        }

        if self.spike_probability > 0.0 && rng.gen::<f64>() < self.spike_probability {
            self.spike_factor = rng.gen_range(1.0..=MAX_SPIKE_FACTOR);
            if self.shape == TrafficShape::Burst {
                // Bursts persist for a handful of ticks.
                self.spike_ticks_left = rng.gen_range(2..8);
            }
            return self.base_qps * self.spike_factor;
        }

        self.base_qps
    }

    /// Milliseconds until the next query at the given instantaneous rate.
    pub fn interval_ms<R: Rng + ?Sized>(&self, instant_qps: f64, rng: &mut R) -> f64 {
        let mean = 1000.0 / instant_qps;
        match self.shape {
            TrafficShape::Pareto => {
                let scale = mean * (PARETO_ALPHA - 1.0) / PARETO_ALPHA;
                let u = 1.0 - rng.gen::<f64>();
                scale / u.powf(1.0 / PARETO_ALPHA)
            }
            _ => mean,
        }
    }
}

/// Discrete distribution over category indices.
pub fn category_distribution(weights: &[f64]) -> Result<WeightedIndex<f64>, CachelabError> {
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > 1e-6 {
        return Err(CachelabError::Configuration(format!(
            "Category weights must sum to 1, got {}",
            total
        )));
    }
    WeightedIndex::new(weights.iter().copied())
        .map_err(|e| CachelabError::Configuration(format!("Invalid category weights: {}", e)))
}
