use anyhow::{Context, Result};
use cachelab::config::AppConfig;
use cachelab::engines::generation::LogProgressCallback;
use cachelab::lab::DiscoveryLab;
use cachelab::repository::{JsonFileRepository, LogEventSink};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    let repository = JsonFileRepository::open(&config.storage.data_dir)
        .with_context(|| format!("Failed to open data directory {}", config.storage.data_dir))?;
    let targets = config.targets.clone();

    let mut lab = DiscoveryLab::new(config, Arc::new(repository), Box::new(LogEventSink))
        .context("Failed to build discovery lab")?;

    let mut failed = 0;
    for target in &targets {
        match lab.run_target(target, &mut LogProgressCallback) {
            Ok(report) => info!(
                "{} {}: generation {}, {:?}, {} experiments over {} queries, best fitness {:.2}",
                report.sector,
                report.use_case,
                report.generation,
                report.outcome(),
                report.experiments_run,
                report.queries_replayed,
                report.best_fitness
            ),
            Err(e) => {
                error!("Cycle for {} {} failed: {}", target.sector, target.use_case, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} cycles failed", failed, targets.len());
    }
    Ok(())
}
