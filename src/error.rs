use thiserror::Error;

#[derive(Error, Debug)]
pub enum CachelabError {
    /// Malformed genome or strategy, or a sector without a workload generator.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fitness computation failed (replay timeout, malformed result).
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A collaborator write or read failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CachelabError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, CachelabError::Configuration(_) | CachelabError::Config(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, CachelabError::Persistence(_) | CachelabError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, CachelabError>;
