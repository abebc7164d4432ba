//! Harvester main entry point
//!
//! This is the command-line interface for the harvester seed-domain crawler.

use anyhow::Context;
use clap::Parser;
use harvester::config::{load_config_with_hash, Config};
use harvester::crawler::{crawl, crawl_once};
use harvester::output::{load_statistics, print_statistics};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Harvester: a resilient seed-domain text crawler
///
/// Harvester follows links from a set of seed URL prefixes, extracts the
/// English text of every page it reaches, and writes it to time-boxed JSON
/// shard files. A watchdog restarts the crawl whenever it stalls.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version)]
#[command(about = "A resilient seed-domain text crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single engine cycle and exit instead of restarting forever
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    dry_run: bool,

    /// Show statistics from the data directory and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        let stats = load_statistics(&config).context("failed to read crawl files")?;
        println!("Data directory: {}\n", config.output.data_dir().display());
        print_statistics(&stats);
    } else if cli.once {
        let report = crawl_once(config).await.context("engine cycle failed")?;
        tracing::info!(
            "Cycle finished ({:?}): {} pages fetched, {} records, {} skipped, {} failed, {} abandoned",
            report.termination,
            report.pages_fetched,
            report.records_written,
            report.pages_skipped,
            report.fetch_failures,
            report.abandoned
        );
    } else {
        tracing::info!("Starting supervised crawl with {} seed(s)", config.seeds.len());
        crawl(config).await.context("crawl failed to start")?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("harvester=info,warn"),
            1 => EnvFilter::new("harvester=debug,info"),
            2 => EnvFilter::new("harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Harvester Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Max concurrent fetches: {}", crawler.max_concurrent_fetches);
    println!("  Min text length: {}", crawler.min_text_length);
    println!("  Idle timeout: {}s", crawler.idle_timeout_secs);
    println!("  Watchdog poll: {}ms", crawler.poll_interval_ms);
    println!("  Drain grace: {}s", crawler.drain_grace_secs);
    println!("  Shard interval: {}s", crawler.shard_interval_secs);
    println!("  Restart delay: {}ms", crawler.restart_delay_ms);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir().display());
    println!("  Visited URLs: {}", config.output.visited_path().display());
    println!("  Linked domains: {}", config.output.domains_path().display());
    println!("  Shard prefix: {}", config.output.shard_prefix);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!(
        "\nFilter: {} deny pattern(s), skipping {}",
        config.filter.deny.len(),
        config.filter.skip_extensions.join(" ")
    );

    println!("\n✓ Configuration is valid");
}
