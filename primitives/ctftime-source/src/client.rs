//! HTTP client for the CTFtime v1 API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::event::{Event, Team};

/// Public CTFtime API root.
pub const DEFAULT_API_URL: &str = "https://ctftime.org/api/v1";

const DEFAULT_SEARCH_DAYS: u32 = 90;
const DEFAULT_LIMIT: u32 = 20;

/// Read-only access to competition listings.
///
/// Implementations report failures as errors; deciding whether a failure is
/// fatal is left to the caller.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Competitions in the configured upcoming window, in API order.
    async fn fetch_upcoming_events(&self) -> SourceResult<Vec<Event>>;

    /// Team details for an organizer.
    async fn fetch_team(&self, team_id: u64) -> SourceResult<Team>;
}

/// CTFtime API client.
#[derive(Debug, Clone)]
pub struct CtftimeClient {
    client: Client,
    base_url: String,
    search_days: u32,
    limit: u32,
}

impl CtftimeClient {
    /// Create a client rooted at `base_url` (e.g. [`DEFAULT_API_URL`]).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            search_days: DEFAULT_SEARCH_DAYS,
            limit: DEFAULT_LIMIT,
        })
    }

    /// Set the look-ahead window and result cap used by
    /// [`EventSource::fetch_upcoming_events`].
    pub fn with_window(mut self, search_days: u32, limit: u32) -> Self {
        self.search_days = search_days;
        self.limit = limit;
        self
    }

    /// Competitions overlapping `[start, finish]`, at most `limit` of them.
    pub async fn fetch_events_between(
        &self,
        start: DateTime<Utc>,
        finish: DateTime<Utc>,
        limit: u32,
    ) -> SourceResult<Vec<Event>> {
        let url = format!("{}/events/", self.base_url);
        let query = [
            ("limit", limit.to_string()),
            ("start", start.timestamp().to_string()),
            ("finish", finish.timestamp().to_string()),
        ];

        let events: Vec<Event> = self.get_json(&url, &query).await?;
        debug!(count = events.len(), "fetched CTFtime events");
        Ok(events)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl EventSource for CtftimeClient {
    async fn fetch_upcoming_events(&self) -> SourceResult<Vec<Event>> {
        let now = Utc::now();
        let finish = now + chrono::Duration::days(i64::from(self.search_days));
        self.fetch_events_between(now, finish, self.limit).await
    }

    async fn fetch_team(&self, team_id: u64) -> SourceResult<Team> {
        let url = format!("{}/teams/{team_id}/", self.base_url);
        self.get_json(&url, &[]).await
    }
}
