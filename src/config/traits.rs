use crate::error::CachelabError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), CachelabError>;
}

pub(crate) fn invalid(section: &str, message: &str) -> CachelabError {
    CachelabError::Configuration(format!("[{}] {}", section, message))
}

pub(crate) fn check_unit_interval(section: &str, name: &str, value: f64) -> Result<(), CachelabError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(section, &format!("{} must be between 0 and 1", name)));
    }
    Ok(())
}
