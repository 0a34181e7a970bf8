use super::{CategorySpec, SectorProfile};
use crate::types::{Priority, Sector};

const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "market_data",
        weight: 0.35,
        priority: Priority::Critical,
        freshness_secs: 15,
        response_bytes: (200, 800),
        sensitive: false,
        templates: &[
            "What is the current spread on {term}?",
            "Summarize intraday movement for {term}.",
        ],
    },
    CategorySpec {
        name: "risk_analysis",
        weight: 0.20,
        priority: Priority::High,
        freshness_secs: 900,
        response_bytes: (1_200, 3_500),
        sensitive: true,
        templates: &[
            "Compute VaR exposure of {entity} to {term}.",
            "How concentrated is {entity} in {term}?",
        ],
    },
    CategorySpec {
        name: "regulatory_docs",
        weight: 0.20,
        priority: Priority::Normal,
        freshness_secs: 604_800,
        response_bytes: (2_000, 6_000),
        sensitive: false,
        templates: &[
            "Explain the reporting obligations for {term}.",
            "Summarize the latest guidance on {term}.",
        ],
    },
    CategorySpec {
        name: "account_support",
        weight: 0.15,
        priority: Priority::Normal,
        freshness_secs: 120,
        response_bytes: (300, 1_000),
        sensitive: true,
        templates: &["Why was the {term} transfer on {entity} delayed?"],
    },
    CategorySpec {
        name: "fraud_alerts",
        weight: 0.10,
        priority: Priority::Critical,
        freshness_secs: 30,
        response_bytes: (400, 1_200),
        sensitive: true,
        templates: &["Is the {term} activity on {entity} consistent with fraud?"],
    },
];

const VOCABULARY: &[&str] = &[
    "EUR/USD",
    "US10Y",
    "wire",
    "card-not-present",
    "Basel III",
    "MiFID II",
    "equity options",
    "corporate bonds",
];

pub struct FinanceProfile;

impl SectorProfile for FinanceProfile {
    fn sector(&self) -> Sector {
        Sector::Finance
    }

    fn categories(&self) -> &'static [CategorySpec] {
        CATEGORIES
    }

    fn entity_prefix(&self) -> &'static str {
        "account"
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn entity_pool_size(&self) -> usize {
        100
    }
}
