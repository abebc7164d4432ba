//! Harvester: a resilient seed-domain text crawler
//!
//! This crate follows outbound links from a fixed set of seed URL prefixes,
//! extracts cleaned English text from each page, and writes it as JSON
//! records into time-boxed shard files. Visited URLs and discovered external
//! domains persist across restarts, and a watchdog/supervisor pair keeps the
//! crawl alive when the fetch engine stalls.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Shard error: {0}")]
    Shard(#[from] output::ShardError),

    #[error("Invalid engine state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub use config::Config;
pub use crawler::{Engine, EngineReport, Supervisor};
pub use output::CrawlRecord;
pub use state::EngineState;
pub use url::{LinkFilter, LinkVerdict};
