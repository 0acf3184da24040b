//! New-event detection and announcement.
//!
//! One [`Pipeline::tick`] runs `FETCHING → DIFFING → DISPATCHING → PERSISTING`
//! and returns to idle. An id is marked known *before* its announcement is
//! sent, so a failed send is never retried and never duplicated.

use ctftime_source::{EventId, EventSource};
use discord_sink::{ChannelHandle, DiscordError, Dispatcher};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::format::Formatter;
use crate::store::{KnownEventStore, KnownEvents};

/// Errors that stop the bot rather than a single tick.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("No announcement channel configured")]
    ChannelUnconfigured,

    #[error("Can't find a text channel named '{0}' (check the name and that the bot can view it)")]
    ChannelNotFound(String),

    #[error("Discord session failed: {0}")]
    Session(#[source] DiscordError),
}

/// Where a tick currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Fetching,
    Diffing,
    Dispatching,
    Persisting,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Events returned by the source (0 when the fetch failed).
    pub fetched: usize,
    /// Set when the fetch failed and the tick ran on an empty list.
    pub fetch_failed: bool,
    /// Set when channel lookup hit a transient error and nothing was diffed.
    pub channel_unavailable: bool,
    /// Ids seen for the first time, in source order.
    pub new_ids: Vec<EventId>,
    /// Announcements Discord accepted.
    pub dispatched: usize,
    /// Ids whose announcement failed. They stay known.
    pub failed: Vec<EventId>,
    /// Whether the known set was written this tick.
    pub persisted: bool,
}

/// Owns the known-event set and the collaborators that feed and drain it.
pub struct Pipeline<S, D, K> {
    source: S,
    dispatcher: D,
    store: K,
    known: KnownEvents,
    channel_name: String,
    formatter: Formatter,
    phase: TickPhase,
}

impl<S, D, K> Pipeline<S, D, K>
where
    S: EventSource,
    D: Dispatcher,
    K: KnownEventStore,
{
    pub fn new(
        source: S,
        dispatcher: D,
        store: K,
        known: KnownEvents,
        channel_name: impl Into<String>,
        formatter: Formatter,
    ) -> Self {
        Self {
            source,
            dispatcher,
            store,
            known,
            channel_name: channel_name.into(),
            formatter,
            phase: TickPhase::Idle,
        }
    }

    /// Read-only view of the announced ids.
    pub fn known(&self) -> &KnownEvents {
        &self.known
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    pub(crate) fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    fn enter(&mut self, phase: TickPhase) {
        debug!(?phase, "tick phase");
        self.phase = phase;
    }

    /// Run one detection cycle.
    ///
    /// Only configuration-class failures are returned; everything else is
    /// logged and reflected in the [`TickReport`].
    pub async fn tick(&mut self) -> Result<TickReport, FatalError> {
        let result = self.run_tick().await;
        self.enter(TickPhase::Idle);
        result
    }

    async fn run_tick(&mut self) -> Result<TickReport, FatalError> {
        let mut report = TickReport::default();

        self.enter(TickPhase::Fetching);
        let events = match self.source.fetch_upcoming_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Failed to fetch CTF events");
                report.fetch_failed = true;
                Vec::new()
            }
        };
        report.fetched = events.len();

        let Some(channel) = self.resolve_channel().await? else {
            report.channel_unavailable = true;
            return Ok(report);
        };

        self.enter(TickPhase::Diffing);
        let fresh: Vec<_> = events
            .iter()
            .filter(|event| !self.known.contains(event.id))
            .collect();
        debug!(fetched = report.fetched, fresh = fresh.len(), "diffed against known events");

        self.enter(TickPhase::Dispatching);
        for event in fresh {
            // Duplicate ids within one listing are announced once.
            if !self.known.insert(event.id) {
                continue;
            }
            report.new_ids.push(event.id);

            let message = self.formatter.announcement(event, &self.source).await;
            match self.dispatcher.send(&channel, &message).await {
                Ok(ack) => {
                    report.dispatched += 1;
                    info!(event_id = %event.id, title = %event.title, message_id = %ack.id, "Sent new event notification");
                }
                Err(e) => {
                    report.failed.push(event.id);
                    error!(event_id = %event.id, title = %event.title, error = %e, "Failed to send notification");
                }
            }
        }

        if !report.new_ids.is_empty() {
            self.enter(TickPhase::Persisting);
            match self.store.save(&self.known) {
                Ok(()) => report.persisted = true,
                Err(e) => error!(error = %e, "Failed to save known events"),
            }
        }

        Ok(report)
    }

    /// `Ok(None)` on a transient lookup failure; the tick is skipped.
    async fn resolve_channel(&self) -> Result<Option<ChannelHandle>, FatalError> {
        if self.channel_name.trim().is_empty() {
            return Err(FatalError::ChannelUnconfigured);
        }

        match self.dispatcher.resolve_channel(&self.channel_name).await {
            Ok(Some(channel)) => Ok(Some(channel)),
            Ok(None) => Err(FatalError::ChannelNotFound(self.channel_name.clone())),
            Err(e) if e.is_auth() => Err(FatalError::Session(e)),
            Err(e) => {
                warn!(channel = %self.channel_name, error = %e, "Channel lookup failed, skipping this tick");
                Ok(None)
            }
        }
    }
}
