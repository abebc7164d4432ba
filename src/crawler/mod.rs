//! Crawler module for page fetching, extraction and crawl supervision
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through a bounded pool
//! - Text and link extraction from HTML
//! - The frontier and the traversal engine
//! - The liveness watchdog and the restart supervisor

mod engine;
mod extractor;
mod fetcher;
mod frontier;
mod supervisor;
mod watchdog;

pub use engine::{Engine, EngineReport, Termination};
pub use extractor::{
    clean_text, extract_content, extract_links, parse_page, ExtractError, ExtractedContent,
    ParsedPage, DEFAULT_MIN_TEXT_LENGTH,
};
pub use fetcher::{build_http_client, fetch_url, FetchEvent, FetchPool, FetchResult};
pub use frontier::Frontier;
pub use supervisor::Supervisor;
pub use watchdog::{StopSignal, Watchdog, WatchdogOutcome};

use crate::config::Config;
use crate::HarvestError;

/// Runs the crawl until the process is killed
///
/// Engine terminations are followed by a restart, so this only returns
/// early if the HTTP client cannot be built.
pub async fn crawl(config: Config) -> Result<(), HarvestError> {
    Supervisor::new(config)?.run().await;
    Ok(())
}

/// Runs a single engine cycle and reports how it ended
pub async fn crawl_once(config: Config) -> Result<EngineReport, HarvestError> {
    Supervisor::new(config)?.run_cycle().await
}
