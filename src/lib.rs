pub mod config;
pub mod engines;
pub mod error;
pub mod lab;
pub mod repository;
pub mod types;

pub use error::{CachelabError, Result};
