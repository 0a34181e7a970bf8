pub mod candidate;
pub mod promotion;
pub mod transfer;

pub use candidate::{build_candidate, experiment_id, stable_id, strategy_id};
pub use promotion::{improvement_pct, record_discovery, PromotionDecision, PromotionPolicy};
pub use transfer::{detect_transfers, similarity};
