pub mod healthcare;
pub mod finance;
pub mod hpc;
pub mod legal;
pub mod ecommerce;

pub use healthcare::HealthcareProfile;
pub use finance::FinanceProfile;
pub use hpc::HpcProfile;
pub use legal::LegalProfile;
pub use ecommerce::EcommerceProfile;

use crate::types::{Priority, Sector};

/// Static description of one query category.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub name: &'static str,
    /// Share of traffic; a sector's weights sum to 1.
    pub weight: f64,
    pub priority: Priority,
    pub freshness_secs: u64,
    /// Inclusive range of expected response sizes in bytes.
    pub response_bytes: (usize, usize),
    /// Carries regulated data when the workload runs in compliance mode.
    pub sensitive: bool,
    /// Payload templates; `{entity}` and `{term}` are substituted.
    pub templates: &'static [&'static str],
}

/// Statistical shape of one sector's traffic.
pub trait SectorProfile: Send + Sync {
    fn sector(&self) -> Sector;

    fn categories(&self) -> &'static [CategorySpec];

    /// Prefix for entity ids, e.g. `patient`.
    fn entity_prefix(&self) -> &'static str;

    fn vocabulary(&self) -> &'static [&'static str];

    fn entity_pool_size(&self) -> usize {
        100
    }
}

pub fn default_profiles() -> Vec<Box<dyn SectorProfile>> {
    vec![
        Box::new(HealthcareProfile),
        Box::new(FinanceProfile),
        Box::new(HpcProfile),
        Box::new(LegalProfile),
        Box::new(EcommerceProfile),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_profile_is_well_formed() {
        for profile in default_profiles() {
            let categories = profile.categories();
            assert!(!categories.is_empty(), "{} has no categories", profile.sector());

            let total: f64 = categories.iter().map(|c| c.weight).sum();
            assert!((total - 1.0).abs() < 1e-9, "{} weights sum to {}", profile.sector(), total);

            for category in categories {
                assert!(!category.templates.is_empty(), "{} has no templates", category.name);
                assert!(category.response_bytes.0 <= category.response_bytes.1);
                assert!(category.freshness_secs > 0);
            }
            assert!(!profile.vocabulary().is_empty());
            assert!(profile.entity_pool_size() > 0);
        }
    }

    #[test]
    fn test_one_profile_per_sector() {
        let sectors: Vec<Sector> = default_profiles().iter().map(|p| p.sector()).collect();
        assert_eq!(sectors, Sector::ALL.to_vec());
    }
}
