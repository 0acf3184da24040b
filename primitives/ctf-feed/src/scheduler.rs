//! Fixed-period driver for the pipeline.
//!
//! Ticks run one at a time on the calling task. Missed ticks are dropped,
//! not replayed. Shutdown is only observed between ticks.

use std::future::Future;
use std::time::Duration;

use ctftime_source::EventSource;
use discord_sink::Dispatcher;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::pipeline::{FatalError, Pipeline};
use crate::store::KnownEventStore;

/// Why the scheduler stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// Shutdown arrived before the session became ready.
    NeverReady,
    /// Shutdown arrived between ticks.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Wait for `ready`, then tick immediately and every period after that
    /// until `shutdown` completes or a tick reports a fatal error.
    pub async fn run<S, D, K, R, F>(
        &self,
        pipeline: &mut Pipeline<S, D, K>,
        ready: R,
        shutdown: F,
    ) -> Result<SchedulerExit, FatalError>
    where
        S: EventSource,
        D: Dispatcher,
        K: KnownEventStore,
        R: Future<Output = Result<(), FatalError>>,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tokio::select! {
            _ = &mut shutdown => return Ok(SchedulerExit::NeverReady),
            result = ready => result?,
        }

        info!(period_secs = self.period.as_secs(), "Session ready, starting event checks");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping event checks");
                    return Ok(SchedulerExit::Shutdown);
                }
                _ = interval.tick() => {
                    let report = pipeline.tick().await?;
                    info!(
                        fetched = report.fetched,
                        new = report.new_ids.len(),
                        dispatched = report.dispatched,
                        failed = report.failed.len(),
                        persisted = report.persisted,
                        "Event check finished"
                    );
                }
            }
        }
    }
}
