use super::{CategorySpec, SectorProfile};
use crate::types::{Priority, Sector};

const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "product_questions",
        weight: 0.40,
        priority: Priority::Normal,
        freshness_secs: 86_400,
        response_bytes: (400, 1_500),
        sensitive: false,
        templates: &[
            "Is {entity} compatible with {term}?",
            "What are the dimensions of {entity}?",
            "Compare {entity} with other {term} options.",
        ],
    },
    CategorySpec {
        name: "order_status",
        weight: 0.25,
        priority: Priority::High,
        freshness_secs: 60,
        response_bytes: (200, 500),
        sensitive: true,
        templates: &["Where is my {term} order for {entity}?"],
    },
    CategorySpec {
        name: "recommendations",
        weight: 0.20,
        priority: Priority::Low,
        freshness_secs: 21_600,
        response_bytes: (600, 2_000),
        sensitive: false,
        templates: &["Suggest {term} accessories for {entity}."],
    },
    CategorySpec {
        name: "returns_policy",
        weight: 0.15,
        priority: Priority::Normal,
        freshness_secs: 604_800,
        response_bytes: (300, 900),
        sensitive: false,
        templates: &["Can I return a {term} item after opening it?"],
    },
];

const VOCABULARY: &[&str] = &[
    "USB-C",
    "express",
    "packaging",
    "outdoor",
    "gift",
    "wireless",
];

pub struct EcommerceProfile;

impl SectorProfile for EcommerceProfile {
    fn sector(&self) -> Sector {
        Sector::Ecommerce
    }

    fn categories(&self) -> &'static [CategorySpec] {
        CATEGORIES
    }

    fn entity_prefix(&self) -> &'static str {
        "sku"
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn entity_pool_size(&self) -> usize {
        100
    }
}
