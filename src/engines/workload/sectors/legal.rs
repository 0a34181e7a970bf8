use super::{CategorySpec, SectorProfile};
use crate::types::{Priority, Sector};

const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "case_law",
        weight: 0.30,
        priority: Priority::Normal,
        freshness_secs: 604_800,
        response_bytes: (2_000, 6_000),
        sensitive: false,
        templates: &[
            "Find precedent on {term}.",
            "How have appellate courts treated {term}?",
        ],
    },
    CategorySpec {
        name: "contract_review",
        weight: 0.30,
        priority: Priority::High,
        freshness_secs: 3_600,
        response_bytes: (1_500, 4_500),
        sensitive: true,
        templates: &[
            "Flag unusual {term} clauses in {entity}.",
            "Does {entity} limit liability for {term}?",
        ],
    },
    CategorySpec {
        name: "statute_lookup",
        weight: 0.25,
        priority: Priority::Normal,
        freshness_secs: 2_592_000,
        response_bytes: (500, 2_000),
        sensitive: false,
        templates: &["Quote the statute governing {term}."],
    },
    CategorySpec {
        name: "client_matters",
        weight: 0.15,
        priority: Priority::High,
        freshness_secs: 900,
        response_bytes: (400, 1_500),
        sensitive: true,
        templates: &["What is the status of {term} for {entity}?"],
    },
];

const VOCABULARY: &[&str] = &[
    "indemnification",
    "force majeure",
    "non-compete",
    "data processing",
    "discovery deadlines",
    "arbitration",
];

pub struct LegalProfile;

impl SectorProfile for LegalProfile {
    fn sector(&self) -> Sector {
        Sector::Legal
    }

    fn categories(&self) -> &'static [CategorySpec] {
        CATEGORIES
    }

    fn entity_prefix(&self) -> &'static str {
        "matter"
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn entity_pool_size(&self) -> usize {
        60
    }
}
