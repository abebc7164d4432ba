//! Crawl output
//!
//! This module handles:
//! - The `CrawlRecord` shape written for every extracted page
//! - Time-boxed JSON shard files and their repair
//! - Statistics over the files a crawl has produced

mod record;
mod shard;
pub mod stats;

pub use record::CrawlRecord;
pub use shard::{
    list_shards, repair_orphaned_shards, repair_shard, ClosedShard, RepairOutcome, Shard,
    ShardError, ShardResult, ShardWriter,
};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
