//! Competition data model as returned by the CTFtime API.
//!
//! Only `id` carries identity. Everything else is descriptive metadata used
//! when rendering an announcement.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public page for a single competition on CTFtime.
const EVENT_PAGE_BASE: &str = "https://ctftime.org/event";

/// Stable CTFtime identifier of one competition instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Length of a competition as reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDuration {
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
}

/// Organizer reference embedded in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    /// CTFtime team id, used to look up the team's country.
    pub id: u64,
    pub name: String,
}

/// One upcoming or running competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    #[serde(default)]
    pub duration: EventDuration,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub restrictions: String,
    /// Official competition site; empty when the organizers did not give one.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub organizers: Vec<Organizer>,
}

impl Event {
    /// Canonical CTFtime page for this event.
    pub fn event_page_url(&self) -> String {
        format!("{EVENT_PAGE_BASE}/{}", self.id)
    }

    /// Whether the competition window contains `now` (both ends inclusive).
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.finish
    }
}

/// Team details from `/teams/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub name: String,
    /// ISO 3166-1 alpha-2 code. CTFtime sends an empty string for unknown.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub country: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
