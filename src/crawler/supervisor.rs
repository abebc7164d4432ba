//! Supervisor - keeps the crawl running across engine terminations
//!
//! Each cycle builds a fresh heartbeat, watchdog and engine. When the
//! engine terminates, whether the frontier ran dry, the watchdog fired or
//! a storage error ended the run, the supervisor waits the configured
//! restart delay and starts the next cycle. Persistent state (visited URLs,
//! discovered domains, shards) carries over through the data directory.

use crate::config::Config;
use crate::crawler::engine::{Engine, EngineReport};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::watchdog::{Watchdog, WatchdogOutcome};
use crate::state::Heartbeat;
use crate::HarvestError;
use reqwest::Client;
use std::sync::Arc;

pub struct Supervisor {
    config: Arc<Config>,
    client: Client,
    cycles: u64,
}

impl Supervisor {
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self {
            config: Arc::new(config),
            client,
            cycles: 0,
        })
    }

    /// Number of engine cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs one engine instance under a fresh watchdog
    pub async fn run_cycle(&mut self) -> Result<EngineReport, HarvestError> {
        self.cycles += 1;
        tracing::info!("Starting engine cycle {}", self.cycles);

        let heartbeat = Arc::new(Heartbeat::new());
        let (watchdog, stop) = Watchdog::new(
            Arc::clone(&heartbeat),
            self.config.crawler.idle_timeout(),
            self.config.crawler.poll_interval(),
        );

        let engine = Engine::new(
            Arc::clone(&self.config),
            self.client.clone(),
            Arc::clone(&heartbeat),
        )?;

        // Loading the visited file does not count against the idle timeout
        heartbeat.beat();
        let watchdog = watchdog.spawn();

        let result = engine.run(stop).await;

        // The engine dropped its receiver, so the watchdog exits on its next poll
        match watchdog.await {
            Ok(WatchdogOutcome::Fired { idle_for }) => {
                tracing::debug!("Watchdog fired after {:?} idle", idle_for)
            }
            Ok(WatchdogOutcome::Released) => {}
            Err(e) => tracing::warn!("Watchdog task failed: {}", e),
        }

        result
    }

    /// Runs engine cycles forever
    pub async fn run(mut self) {
        loop {
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    "Cycle {} ended ({:?}): {} records written, {} pages fetched",
                    self.cycles,
                    report.termination,
                    report.records_written,
                    report.pages_fetched
                ),
                Err(e) => tracing::error!("Cycle {} failed: {}", self.cycles, e),
            }

            let delay = self.config.crawler.restart_delay();
            tracing::info!("Restarting engine in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
