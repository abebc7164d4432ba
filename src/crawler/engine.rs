//! Traversal engine - one crawl run from seeds to termination
//!
//! The engine owns the frontier and drives the fetch pool from a single
//! control loop:
//! - Dispatch seeds and unvisited URLs from the frontier while the pool has capacity
//! - On each completion: mark visited, extract, write a record, enqueue links
//! - Rotate the output shard when its interval elapses
//! - Stop when the frontier is exhausted or the watchdog raises the stop signal

use crate::config::Config;
use crate::crawler::extractor::{extract_links, parse_page, ExtractedContent};
use crate::crawler::fetcher::{FetchEvent, FetchPool, FetchResult};
use crate::crawler::frontier::Frontier;
use crate::crawler::watchdog::StopSignal;
use crate::output::{repair_orphaned_shards, CrawlRecord, ShardWriter};
use crate::state::{EngineState, Heartbeat};
use crate::storage::{DomainRegistry, VisitedStore};
use crate::url::{extract_domain, top_level_domain, top_level_domain_of, LinkFilter};
use crate::HarvestError;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use url::Url;

/// Why an engine run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Nothing left to fetch and nothing in flight
    Exhausted,
    /// The watchdog stopped the run
    Stalled,
}

/// Counters for one engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub pages_fetched: usize,
    pub records_written: usize,
    /// Pages fetched but not extractable (parse, locale, length)
    pub pages_skipped: usize,
    pub fetch_failures: usize,
    /// In-flight fetches dropped when the drain grace period ran out
    pub abandoned: usize,
    pub shards_closed: usize,
    pub termination: Termination,
}

impl EngineReport {
    fn new() -> Self {
        Self {
            pages_fetched: 0,
            records_written: 0,
            pages_skipped: 0,
            fetch_failures: 0,
            abandoned: 0,
            shards_closed: 0,
            termination: Termination::Exhausted,
        }
    }
}

enum Step {
    Stop,
    WatchdogGone,
    RotateCheck,
    Fetch(FetchEvent),
}

/// A single crawl run
pub struct Engine {
    config: Arc<Config>,
    filter: LinkFilter,
    pool: FetchPool,
    frontier: Frontier,
    visited: VisitedStore,
    domains: DomainRegistry,
    shards: ShardWriter,
    heartbeat: Arc<Heartbeat>,
    state: EngineState,
    report: EngineReport,
    started: Instant,
}

impl Engine {
    /// Builds an engine in the `Idle` state
    ///
    /// Repairs shards a previous process left open, loads the visited and
    /// domain files, opens a fresh shard and seeds the frontier. Every seed
    /// is enqueued: a seed visited by an earlier run is fetched again only
    /// to rediscover its links.
    pub fn new(
        config: Arc<Config>,
        client: Client,
        heartbeat: Arc<Heartbeat>,
    ) -> Result<Self, HarvestError> {
        let output = &config.output;
        let data_dir = output.data_dir();
        std::fs::create_dir_all(&data_dir)?;

        let repaired = repair_orphaned_shards(&data_dir, &output.shard_prefix)?;
        if repaired > 0 {
            tracing::info!("Repaired {} unterminated shard(s)", repaired);
        }

        let visited = VisitedStore::open(&output.visited_path())?;
        let domains = DomainRegistry::open(&output.domains_path())?;
        let shards = ShardWriter::open(
            &data_dir,
            &output.shard_prefix,
            config.crawler.shard_interval(),
        )?;

        let frontier = Frontier::seeded(&config.seeds);
        let mut revisits = 0;
        for seed in &config.seeds {
            if visited.contains(seed)? {
                revisits += 1;
            }
        }
        if revisits > 0 {
            tracing::info!("{} seed(s) already visited; following their links only", revisits);
        }

        let pool = FetchPool::new(client, config.crawler.max_concurrent_fetches as usize);
        let filter = LinkFilter::from_config(&config);

        Ok(Self {
            config,
            filter,
            pool,
            frontier,
            visited,
            domains,
            shards,
            heartbeat,
            state: EngineState::Idle,
            report: EngineReport::new(),
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Number of URLs waiting in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    fn transition(&mut self, to: EngineState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("Engine state {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Runs the engine until it terminates
    ///
    /// Shard and storage failures end the run with an error after the
    /// in-flight fetches are abandoned and the shard is closed.
    pub async fn run(mut self, mut stop: StopSignal) -> Result<EngineReport, HarvestError> {
        self.transition(EngineState::Running)?;
        self.started = Instant::now();
        tracing::info!(
            "Engine running with {} seed(s) in frontier",
            self.frontier.len()
        );

        let termination = match self.crawl(&mut stop).await {
            Ok(termination) => termination,
            Err(e) => {
                self.transition(EngineState::Draining)?;
                let abandoned = self.pool.abort_all();
                tracing::error!(
                    "Engine failed, abandoning {} in-flight fetch(es): {}",
                    abandoned,
                    e
                );
                if let Err(close_err) = self.finish() {
                    tracing::error!("Failed to finalize after error: {}", close_err);
                }
                self.state = EngineState::Terminated;
                return Err(e);
            }
        };

        if termination == Termination::Stalled {
            self.transition(EngineState::Stalled)?;
        }
        self.transition(EngineState::Draining)?;
        self.drain().await?;
        self.finish()?;
        self.transition(EngineState::Terminated)?;

        self.report.termination = termination;
        tracing::info!(
            "Engine terminated ({:?}): {} fetched, {} records, {} skipped, {} failed, {} URLs queued in {:?}",
            termination,
            self.report.pages_fetched,
            self.report.records_written,
            self.report.pages_skipped,
            self.report.fetch_failures,
            self.frontier.seen(),
            self.started.elapsed()
        );
        Ok(self.report)
    }

    async fn crawl(&mut self, stop: &mut StopSignal) -> Result<Termination, HarvestError> {
        let check_period = self.config.crawler.shard_interval().min(Duration::from_secs(1));
        let mut rotation = tokio::time::interval(check_period);
        rotation.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watchdog_alive = true;

        loop {
            if *stop.borrow() {
                return Ok(Termination::Stalled);
            }
            self.dispatch()?;

            let step = tokio::select! {
                biased;
                changed = stop.changed(), if watchdog_alive => match changed {
                    Ok(()) => Step::Stop,
                    Err(_) => Step::WatchdogGone,
                },
                _ = rotation.tick() => Step::RotateCheck,
                event = self.pool.next_event() => Step::Fetch(event),
            };

            match step {
                // The loop head re-reads the flag
                Step::Stop => {}
                Step::WatchdogGone => {
                    tracing::warn!("Watchdog dropped its signal; running unsupervised");
                    watchdog_alive = false;
                }
                Step::RotateCheck => {
                    self.shards.rotate_if_due(Instant::now())?;
                }
                Step::Fetch(FetchEvent::Idle) => {
                    // Idle is activity too: the watchdog should not fire on an
                    // engine that simply ran out of work.
                    self.heartbeat.beat();
                    tracing::info!("Frontier exhausted, nothing in flight");
                    return Ok(Termination::Exhausted);
                }
                Step::Fetch(FetchEvent::Completed { url, result }) => {
                    self.handle_completion(url, result)?;
                }
            }
        }
    }

    /// Moves unvisited frontier URLs (and every seed) into the pool while it has capacity
    fn dispatch(&mut self) -> Result<(), HarvestError> {
        if !self.state.accepts_fetches() {
            return Ok(());
        }
        while self.pool.has_capacity() {
            let Some(url) = self.frontier.pop() else {
                break;
            };
            if self.visited.contains(&url)? && !self.is_seed(&url) {
                tracing::trace!("Skipping visited URL {}", url);
                continue;
            }
            tracing::debug!("Fetching {}", url);
            self.pool.submit(url);
        }
        Ok(())
    }

    fn is_seed(&self, url: &str) -> bool {
        self.filter.seeds().iter().any(|seed| seed == url)
    }

    /// Waits up to the grace period for in-flight fetches, then abandons them
    async fn drain(&mut self) -> Result<(), HarvestError> {
        let in_flight = self.pool.in_flight();
        if in_flight == 0 {
            return Ok(());
        }
        tracing::info!("Draining {} in-flight fetch(es)", in_flight);

        let deadline = tokio::time::Instant::now() + self.config.crawler.drain_grace();
        while self.pool.in_flight() > 0 {
            match tokio::time::timeout_at(deadline, self.pool.next_event()).await {
                Ok(FetchEvent::Completed { url, result }) => self.handle_completion(url, result)?,
                Ok(FetchEvent::Idle) => break,
                Err(_) => {
                    let abandoned = self.pool.abort_all();
                    tracing::warn!(
                        "Drain grace period elapsed, abandoning {} fetch(es)",
                        abandoned
                    );
                    self.report.abandoned += abandoned;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Closes the shard and flushes the visited/domain files
    fn finish(&mut self) -> Result<(), HarvestError> {
        let close_result = self.shards.close();
        self.report.shards_closed = self.shards.closed_shards().len();
        close_result?;
        self.visited.sync()?;
        self.domains.sync()?;
        Ok(())
    }

    fn handle_completion(&mut self, url: String, result: FetchResult) -> Result<(), HarvestError> {
        let (final_url, body) = match result {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            failure => {
                self.report.fetch_failures += 1;
                tracing::warn!(
                    "Fetch failed for {}: {}",
                    url,
                    failure.failure_reason().unwrap_or_default()
                );
                self.visited.mark_visited(&url)?;
                return Ok(());
            }
        };

        self.report.pages_fetched += 1;
        self.heartbeat.beat();

        // A seed visited by an earlier run: its record exists, only its links matter.
        if self.visited.contains(&url)? {
            tracing::debug!("Revisited seed {} for links", url);
            if let Ok(page_url) = Url::parse(&final_url) {
                let links = extract_links(&body, &page_url);
                self.enqueue_links(&links)?;
            }
            return Ok(());
        }

        // A redirect may land on a page some earlier fetch already recorded.
        if final_url != url && self.visited.contains(&final_url)? {
            tracing::debug!("{} redirected to visited {}", url, final_url);
            self.visited.mark_visited(&url)?;
            return Ok(());
        }

        let page_url = match Url::parse(&final_url) {
            Ok(page_url) => page_url,
            Err(e) => {
                tracing::warn!("Unparsable final URL {}: {}", final_url, e);
                self.visited.mark_visited(&url)?;
                return Ok(());
            }
        };

        // Marked before the record is written: a failure in between loses the
        // record instead of producing a duplicate on the next run.
        self.visited.mark_visited(&url)?;
        if final_url != url {
            self.visited.mark_visited(&final_url)?;
        }

        let parsed = parse_page(&body, &page_url, self.config.crawler.min_text_length);
        match parsed.content {
            Ok(content) => self.write_record(&page_url, content, &parsed.links)?,
            Err(reason) => {
                self.report.pages_skipped += 1;
                tracing::debug!("No record for {}: {}", final_url, reason);
            }
        }

        self.enqueue_links(&parsed.links)?;
        self.report_progress();
        Ok(())
    }

    fn write_record(
        &mut self,
        page_url: &Url,
        content: ExtractedContent,
        page_links: &[String],
    ) -> Result<(), HarvestError> {
        let host = extract_domain(page_url).unwrap_or_default();

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for link in page_links {
            if self.filter.is_reportable(link, &host) && seen.insert(link.as_str()) {
                links.push(link.clone());
            }
        }

        let record = CrawlRecord {
            url: page_url.to_string(),
            text: content.text,
            domain: top_level_domain(&host),
            links,
            title: content.title,
        };
        self.shards.append(&record)?;
        self.report.records_written += 1;

        for link in &record.links {
            if let Some(domain) = top_level_domain_of(link) {
                if !self.filter.is_seed_domain(&domain) {
                    self.domains.record(&domain)?;
                }
            }
        }
        Ok(())
    }

    fn enqueue_links(&mut self, links: &[String]) -> Result<(), HarvestError> {
        for link in links {
            if !self.filter.is_crawlable(link) || self.visited.contains(link)? {
                continue;
            }
            self.frontier.push(link.clone());
        }
        Ok(())
    }

    fn report_progress(&self) {
        let fetched = self.report.pages_fetched;
        if fetched > 0 && fetched % 10 == 0 {
            let rate = fetched as f64 / self.started.elapsed().as_secs_f64().max(0.001);
            tracing::info!(
                "Progress: {} pages fetched, {} records, {} in frontier, {:.2} pages/sec",
                fetched,
                self.report.records_written,
                self.frontier.len(),
                rate
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::build_http_client;
    use tempfile::TempDir;

    fn config_for(dir: &std::path::Path, seeds: &[&str]) -> Arc<Config> {
        let seeds = seeds
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", ");
        Arc::new(
            parse_config(&format!(
                r#"
seeds = [{}]

[crawler]
idle-timeout-secs = 5
poll-interval-ms = 50

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
data-dir = "{}"
"#,
                seeds,
                dir.display()
            ))
            .unwrap(),
        )
    }

    fn engine(config: Arc<Config>) -> Engine {
        let client = build_http_client(&config.user_agent).unwrap();
        Engine::new(config, client, Arc::new(Heartbeat::new())).unwrap()
    }

    #[tokio::test]
    async fn test_new_engine_is_idle_and_seeded() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/", "https://www.who.int/"]);

        let engine = engine(config);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.frontier_size(), 2);
        assert!(dir.path().join("visited_urls.txt").exists());
    }

    #[tokio::test]
    async fn test_visited_seeds_are_still_enqueued() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("visited_urls.txt"), "https://www.cdc.gov/\n").unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/", "https://www.who.int/"]);

        let engine = engine(config);
        assert_eq!(engine.frontier_size(), 2);
    }

    #[tokio::test]
    async fn test_run_terminates_when_frontier_exhausted() {
        let dir = TempDir::new().unwrap();
        // Nothing listens on the discard port, so the only fetch fails fast
        let config = config_for(dir.path(), &["http://127.0.0.1:9/"]);

        let (_tx, stop) = tokio::sync::watch::channel(false);
        let report = engine(config).run(stop).await.unwrap();

        assert_eq!(report.termination, Termination::Exhausted);
        assert_eq!(report.pages_fetched, 0);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.shards_closed, 1);
    }

    #[test]
    fn test_dispatch_waits_for_running_state() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/"]);

        let mut engine = engine(config);
        engine.dispatch().unwrap();

        assert_eq!(engine.pool.in_flight(), 0);
        assert_eq!(engine.frontier_size(), 1);
    }

    #[test]
    fn test_url_is_visited_before_its_record_is_written() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/"]);
        let mut engine = engine(config);

        // A failing shard stands in for a crash between the two writes
        engine.shards.close().unwrap();

        let url = "https://www.cdc.gov/flu/".to_string();
        let body = format!(
            r#"<html lang="en"><head><title>Flu</title></head><body><p>{}</p></body></html>"#,
            "Influenza is a contagious respiratory illness caused by influenza viruses. ".repeat(3)
        );
        let result = FetchResult::Success {
            final_url: url.clone(),
            status_code: 200,
            body,
        };

        let err = engine.handle_completion(url.clone(), result).unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Shard(crate::output::ShardError::Closed)
        ));
        assert!(engine.visited.contains(&url).unwrap());
    }

    #[tokio::test]
    async fn test_raised_stop_signal_stalls_engine() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/"]);
        let engine = engine(config);

        let (tx, stop) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();
        let report = engine.run(stop).await.unwrap();

        assert_eq!(report.termination, Termination::Stalled);
        assert_eq!(report.records_written, 0);
    }

    #[test]
    fn test_invalid_transition_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &["https://www.cdc.gov/"]);

        let mut engine = engine(config);
        let err = engine.transition(EngineState::Terminated).unwrap_err();
        assert!(matches!(
            err,
            HarvestError::InvalidTransition {
                from: EngineState::Idle,
                to: EngineState::Terminated
            }
        ));
    }
}
