use super::distributions::{category_distribution, ArrivalProcess, EntitySampler};
use super::query::{Query, Workload};
use super::sectors::{default_profiles, CategorySpec, SectorProfile};
use crate::config::{ConfigSection, WorkloadConfig};
use crate::error::CachelabError;
use crate::types::Sector;
use log::debug;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Registry of sector profiles that turns a [`WorkloadConfig`] into queries.
pub struct WorkloadSynthesizer {
    profiles: HashMap<Sector, Box<dyn SectorProfile>>,
}

impl Default for WorkloadSynthesizer {
    fn default() -> Self {
        Self::with_default_sectors()
    }
}

impl WorkloadSynthesizer {
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    pub fn with_default_sectors() -> Self {
        let mut synthesizer = Self::empty();
        for profile in default_profiles() {
            synthesizer.register(profile);
        }
        synthesizer
    }

    /// Register (or replace) the generator for a sector.
    pub fn register(&mut self, profile: Box<dyn SectorProfile>) {
        self.profiles.insert(profile.sector(), profile);
    }

    pub fn sectors(&self) -> Vec<Sector> {
        let mut sectors: Vec<Sector> = self.profiles.keys().copied().collect();
        sectors.sort();
        sectors
    }

    pub fn profile(&self, sector: Sector) -> Result<&dyn SectorProfile, CachelabError> {
        self.profiles
            .get(&sector)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                CachelabError::Configuration(format!("No workload generator for sector {}", sector))
            })
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        sector: Sector,
        config: &WorkloadConfig,
        rng: &mut R,
    ) -> Result<Workload, CachelabError> {
        generate(self.profile(sector)?, config, rng)
    }

    pub fn generate_seeded(
        &self,
        sector: Sector,
        config: &WorkloadConfig,
        seed: u64,
    ) -> Result<Workload, CachelabError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate(sector, config, &mut rng)
    }
}

/// Synthesize `duration * qps` queries for one sector.
///
/// All randomness comes from `rng`; the same seed yields the same workload.
pub fn generate<R: Rng + ?Sized>(
    profile: &dyn SectorProfile,
    config: &WorkloadConfig,
    rng: &mut R,
) -> Result<Workload, CachelabError> {
    config.validate()?;

    let sector = profile.sector();
    let categories = profile.categories();
    let weights: Vec<f64> = categories.iter().map(|c| c.weight).collect();
    let category_index = category_distribution(&weights)?;
    let entities = EntitySampler::new(profile.entity_pool_size(), config.shape)?;
    let mut arrivals = ArrivalProcess::new(config.qps, config.shape, config.burstiness);

    let total = config.total_queries();
    let mut queries = Vec::with_capacity(total);
    let mut clock_ms = 0.0f64;

    for tick in 0..total {
        let instant_qps = arrivals.next_qps(rng);
        let category = &categories[category_index.sample(rng)];
        let entity_id = format!("{}-{:04}", profile.entity_prefix(), entities.sample(rng));
        let sensitive = config.compliance && category.sensitive;
        let (payload, topic) =
            render_payload(category, &entity_id, profile.vocabulary(), sensitive, rng);
        let expected_response_bytes =
            rng.gen_range(category.response_bytes.0..=category.response_bytes.1);

        queries.push(Query {
            id: format!("{}-{:06}", sector, tick),
            sector,
            offset_ms: clock_ms.round() as u64,
            category: category.name.to_string(),
            entity_id,
            topic,
            payload,
            priority: category.priority,
            freshness_secs: category.freshness_secs,
            sensitive,
            expected_response_bytes,
        });

        clock_ms += arrivals.interval_ms(instant_qps, rng);
    }

    let workload = Workload::new(sector, config.clone(), queries);
    debug!(
        "Synthesized {} {} queries (peak {:.0} qps, repeat ratio {:.2})",
        workload.stats.total_queries, sector, workload.stats.peak_qps, workload.stats.repeat_ratio
    );
    Ok(workload)
}

/// Payload text and the topic it asks about.
fn render_payload<R: Rng + ?Sized>(
    category: &CategorySpec,
    entity_id: &str,
    vocabulary: &[&str],
    pseudonymize: bool,
    rng: &mut R,
) -> (String, String) {
    let template = category.templates[rng.gen_range(0..category.templates.len())];
    let term = vocabulary[rng.gen_range(0..vocabulary.len())];
    let entity = if pseudonymize {
        pseudonym(entity_id)
    } else {
        entity_id.to_string()
    };
    let topic = if template.contains("{entity}") {
        entity_id.to_string()
    } else {
        term.to_string()
    };
    (template.replace("{entity}", &entity).replace("{term}", term), topic)
}

/// Stable within a build; only has to keep raw ids out of payloads.
fn pseudonym(entity_id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    entity_id.hash(&mut hasher);
    format!("ref-{:012x}", hasher.finish() & 0xffff_ffff_ffff)
}
