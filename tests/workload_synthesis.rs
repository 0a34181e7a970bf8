use cachelab::config::{TrafficShape, WorkloadConfig};
use cachelab::engines::workload::WorkloadSynthesizer;
use cachelab::types::Sector;

fn config(shape: TrafficShape) -> WorkloadConfig {
    WorkloadConfig {
        duration_secs: 10,
        qps: 10.0,
        shape,
        burstiness: 0.3,
        compliance: true,
    }
}

#[test]
fn test_same_seed_same_workload_for_every_sector() {
    let synthesizer = WorkloadSynthesizer::with_default_sectors();

    for sector in Sector::ALL {
        for shape in [
            TrafficShape::Uniform,
            TrafficShape::Zipfian,
            TrafficShape::Pareto,
            TrafficShape::Burst,
        ] {
            let a = synthesizer.generate_seeded(sector, &config(shape), 77).unwrap();
            let b = synthesizer.generate_seeded(sector, &config(shape), 77).unwrap();
            assert_eq!(a.queries, b.queries, "{} {:?}", sector, shape);
            assert_eq!(a.stats, b.stats, "{} {:?}", sector, shape);
        }
    }
}

#[test]
fn test_different_seeds_diverge() {
    let synthesizer = WorkloadSynthesizer::with_default_sectors();
    let a = synthesizer
        .generate_seeded(Sector::Finance, &config(TrafficShape::Zipfian), 1)
        .unwrap();
    let b = synthesizer
        .generate_seeded(Sector::Finance, &config(TrafficShape::Zipfian), 2)
        .unwrap();
    assert_ne!(a.queries, b.queries);
}

#[test]
fn test_query_count_and_ordering() {
    let synthesizer = WorkloadSynthesizer::with_default_sectors();
    let workload = synthesizer
        .generate_seeded(Sector::Legal, &config(TrafficShape::Burst), 3)
        .unwrap();

    assert_eq!(workload.len(), 100);
    assert_eq!(workload.stats.total_queries, 100);
    assert!(workload
        .queries
        .windows(2)
        .all(|w| w[0].offset_ms <= w[1].offset_ms));
    assert!(workload.queries.iter().all(|q| q.sector == Sector::Legal));

    let share: f64 = workload.stats.category_distribution.values().sum();
    assert!((share - 1.0).abs() < 1e-9);
    assert!(workload.stats.peak_qps >= 1.0);
}

#[test]
fn test_compliance_flag_controls_sensitivity() {
    let synthesizer = WorkloadSynthesizer::with_default_sectors();
    let mut relaxed = config(TrafficShape::Uniform);
    relaxed.compliance = false;

    let strict = synthesizer
        .generate_seeded(Sector::Healthcare, &config(TrafficShape::Uniform), 9)
        .unwrap();
    let open = synthesizer
        .generate_seeded(Sector::Healthcare, &relaxed, 9)
        .unwrap();

    assert!(strict.sensitive_share() > 0.0);
    assert_eq!(open.sensitive_share(), 0.0);
}

#[test]
fn test_missing_sector_is_configuration_error() {
    let synthesizer = WorkloadSynthesizer::empty();
    let err = synthesizer
        .generate_seeded(Sector::Hpc, &config(TrafficShape::Uniform), 1)
        .unwrap_err();
    assert!(err.is_configuration());
}
