use super::{CategorySpec, SectorProfile};
use crate::types::{Priority, Sector};

const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "clinical_guidelines",
        weight: 0.30,
        priority: Priority::Normal,
        freshness_secs: 86_400,
        response_bytes: (1_500, 4_000),
        sensitive: false,
        templates: &[
            "What is the first-line treatment for {term}?",
            "Summarize current guidelines for managing {term}.",
            "Which screening interval is recommended for {term}?",
        ],
    },
    CategorySpec {
        name: "drug_interactions",
        weight: 0.25,
        priority: Priority::High,
        freshness_secs: 43_200,
        response_bytes: (600, 1_800),
        sensitive: false,
        templates: &[
            "Does {term} interact with warfarin?",
            "List contraindications for {term} in renal impairment.",
        ],
    },
    CategorySpec {
        name: "patient_history",
        weight: 0.20,
        priority: Priority::High,
        freshness_secs: 300,
        response_bytes: (800, 2_500),
        sensitive: true,
        templates: &[
            "Summarize the history of {entity} related to {term}.",
            "When was {entity} last treated for {term}?",
        ],
    },
    CategorySpec {
        name: "lab_results",
        weight: 0.15,
        priority: Priority::Critical,
        freshness_secs: 60,
        response_bytes: (300, 900),
        sensitive: true,
        templates: &[
            "Interpret the latest {term} panel for {entity}.",
            "Is the {term} trend for {entity} within normal range?",
        ],
    },
    CategorySpec {
        name: "billing_codes",
        weight: 0.10,
        priority: Priority::Low,
        freshness_secs: 604_800,
        response_bytes: (200, 600),
        sensitive: false,
        templates: &["Which ICD-10 code applies to {term}?"],
    },
];

const VOCABULARY: &[&str] = &[
    "type 2 diabetes",
    "hypertension",
    "atrial fibrillation",
    "asthma",
    "metformin",
    "lisinopril",
    "CKD stage 3",
    "lipid",
];

pub struct HealthcareProfile;

impl SectorProfile for HealthcareProfile {
    fn sector(&self) -> Sector {
        Sector::Healthcare
    }

    fn categories(&self) -> &'static [CategorySpec] {
        CATEGORIES
    }

    fn entity_prefix(&self) -> &'static str {
        "patient"
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn entity_pool_size(&self) -> usize {
        100
    }
}
