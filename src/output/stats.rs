//! Statistics over the durable crawl files
//!
//! Read-only: nothing here touches an open shard's contents beyond reading.

use crate::config::Config;
use crate::output::record::CrawlRecord;
use crate::output::shard::list_shards;
use crate::storage::FileSet;
use crate::HarvestError;

/// Summary of what the crawl has produced so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStatistics {
    pub visited_urls: usize,
    pub discovered_domains: usize,
    pub shard_files: usize,
    /// Shards that parse as a JSON array of records
    pub closed_shards: usize,
    /// Records across the closed shards
    pub records: usize,
}

/// Loads statistics from the files named in the configuration
pub fn load_statistics(config: &Config) -> Result<HarvestStatistics, HarvestError> {
    let output = &config.output;
    let visited_urls = count_entries(&output.visited_path())?;
    let discovered_domains = count_entries(&output.domains_path())?;

    let shards = list_shards(&output.data_dir(), &output.shard_prefix)?;
    let mut stats = HarvestStatistics {
        visited_urls,
        discovered_domains,
        shard_files: shards.len(),
        ..Default::default()
    };

    for path in &shards {
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Vec<CrawlRecord>>(&content) {
            Ok(records) => {
                stats.closed_shards += 1;
                stats.records += records.len();
            }
            Err(e) => tracing::debug!("Shard {} not readable yet: {}", path.display(), e),
        }
    }

    Ok(stats)
}

fn count_entries(path: &std::path::Path) -> Result<usize, HarvestError> {
    if !path.exists() {
        return Ok(0);
    }
    Ok(FileSet::open(path)?.len()?)
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");
    println!("  Visited URLs:       {}", stats.visited_urls);
    println!("  Discovered domains: {}", stats.discovered_domains);
    println!(
        "  Shard files:        {} ({} closed)",
        stats.shard_files, stats.closed_shards
    );
    println!("  Records:            {}", stats.records);

    let open = stats.shard_files - stats.closed_shards;
    if open > 0 {
        println!("\n  {} shard(s) still open or unterminated", open);
    }
}
