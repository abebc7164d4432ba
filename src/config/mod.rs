//! Configuration loading for the harvester
//!
//! Configuration is a TOML file with kebab-case keys. Everything except the
//! seed list, the user agent and the data directory has a default.
//!
//! # Example
//!
//! ```no_run
//! use harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Shards rotate every {}s", config.crawler.shard_interval_secs);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, FilterConfig, OutputConfig, UserAgentConfig, DEFAULT_DENY_LIST,
    DEFAULT_SKIP_EXTENSIONS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
