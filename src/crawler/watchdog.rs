//! Liveness watchdog
//!
//! Polls the shared heartbeat at a fixed cadence. Once the crawl has been
//! idle for longer than the timeout it raises the stop signal and exits.
//! One watchdog serves one engine instance and is never restarted.

use crate::state::Heartbeat;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Receiving side of the stop signal, held by the engine
pub type StopSignal = watch::Receiver<bool>;

/// How a watchdog run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// Idle timeout exceeded; the engine was told to stop
    Fired { idle_for: Duration },
    /// The engine went away first
    Released,
}

pub struct Watchdog {
    heartbeat: Arc<Heartbeat>,
    timeout: Duration,
    poll_interval: Duration,
    stop_tx: watch::Sender<bool>,
}

impl Watchdog {
    /// Creates a watchdog and the stop signal it controls
    pub fn new(
        heartbeat: Arc<Heartbeat>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> (Self, StopSignal) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let watchdog = Self {
            heartbeat,
            timeout,
            poll_interval,
            stop_tx,
        };
        (watchdog, stop_rx)
    }

    /// Polls until the heartbeat goes stale or every receiver is dropped
    pub async fn run(self) -> WatchdogOutcome {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if self.stop_tx.is_closed() {
                return WatchdogOutcome::Released;
            }

            let idle_for = self.heartbeat.idle_for();
            if idle_for > self.timeout {
                tracing::warn!(
                    "No crawl activity for {:.1}s (timeout {}s), stopping engine",
                    idle_for.as_secs_f64(),
                    self.timeout.as_secs()
                );
                if self.stop_tx.send(true).is_err() {
                    tracing::debug!("Engine already gone when the watchdog fired");
                }
                return WatchdogOutcome::Fired { idle_for };
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<WatchdogOutcome> {
        tokio::spawn(self.run())
    }
}
