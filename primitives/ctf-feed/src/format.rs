//! Turns a competition listing into a Discord announcement.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use ctftime_source::{Event, EventSource, Organizer};
use discord_sink::{Embed, OutboundMessage, colors};
use futures::future::join_all;
use tracing::warn;

/// Asia/Taipei, which observes no daylight saving.
pub const DEFAULT_OFFSET_HOURS: i32 = 8;

/// Shown when an organizer's country cannot be determined.
pub const UNKNOWN_FLAG: &str = "🌍";

/// Organizers beyond this many are not looked up or listed.
const MAX_ORGANIZERS: usize = 3;

pub const SCHEDULE_FIELD: &str = "🕐 Schedule";
pub const DETAILS_FIELD: &str = "📋 Details";
pub const LINKS_FIELD: &str = "🔗 Links";

/// Flag emoji for an ISO 3166-1 alpha-2 code.
pub fn country_flag(code: Option<&str>) -> String {
    let Some(code) = code.map(str::trim) else {
        return UNKNOWN_FLAG.to_string();
    };
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return UNKNOWN_FLAG.to_string();
    }

    code.to_ascii_uppercase()
        .chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

/// Renders timestamps and announcements in a fixed display timezone.
#[derive(Debug, Clone)]
pub struct Formatter {
    zone: FixedOffset,
}

impl Formatter {
    pub fn new(zone: FixedOffset) -> Self {
        Self { zone }
    }

    /// Whole-hour offset east of UTC. `None` when out of range.
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(Self::new)
    }

    /// Label such as `UTC+8`.
    pub fn zone_label(&self) -> String {
        let seconds = self.zone.local_minus_utc();
        let sign = if seconds < 0 { '-' } else { '+' };
        let hours = seconds.abs() / 3600;
        let minutes = (seconds.abs() % 3600) / 60;
        if minutes == 0 {
            format!("UTC{sign}{hours}")
        } else {
            format!("UTC{sign}{hours}:{minutes:02}")
        }
    }

    /// `MM-DD HH:MM (UTC+8) | HH:MM UTC`
    pub fn dual_time(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} ({}) | {}",
            at.with_timezone(&self.zone).format("%m-%d %H:%M"),
            self.zone_label(),
            at.format("%H:%M UTC")
        )
    }

    /// Build the announcement for a newly seen event.
    ///
    /// Organizer lookups that fail fall back to [`UNKNOWN_FLAG`]; this never
    /// fails as a whole.
    pub async fn announcement<S>(&self, event: &Event, source: &S) -> OutboundMessage
    where
        S: EventSource + ?Sized,
    {
        let organizers = self.organizer_flags(event, source).await;

        let headline = match organizers.first() {
            Some((Some(flag), _)) => format!("**{flag} {}**", event.title),
            _ => format!("**{}**", event.title),
        };

        let schedule = format!(
            "**Start:** {}\n**End:** {}\n**Duration:** {} day(s) {} hour(s)",
            self.dual_time(event.start),
            self.dual_time(event.finish),
            event.duration.days,
            event.duration.hours
        );

        let mut details = vec![format!("**Weight:** {}", event.weight)];
        let format = if event.format.is_empty() {
            "Unknown"
        } else {
            event.format.as_str()
        };
        details.push(format!("**Format:** {format}"));
        if !event.restrictions.is_empty() {
            details.push(format!("**Restrictions:** {}", event.restrictions));
        }
        if !organizers.is_empty() {
            let listed: Vec<String> = organizers
                .iter()
                .map(|(flag, name)| {
                    format!("{} {name}", flag.as_deref().unwrap_or(UNKNOWN_FLAG))
                })
                .collect();
            details.push(format!("**Organizers:** {}", listed.join(", ")));
        }

        let mut links = Vec::new();
        if !event.url.is_empty() {
            links.push(format!("🌐 **Website:** {}", event.url));
        }
        links.push(format!("📊 **CTFtime:** {}", event.event_page_url()));

        let embed = Embed::new("🆕 New CTF competition announced!")
            .with_description(headline)
            .with_color(colors::GREEN)
            .field(SCHEDULE_FIELD, schedule, false)
            .field(DETAILS_FIELD, details.join("\n"), true)
            .field(LINKS_FIELD, links.join("\n"), false)
            .with_footer(format!("Event ID: {} | CTFtime.org", event.id));

        OutboundMessage::embed(embed)
    }

    /// Flag (when the country is known) and name of each listed organizer.
    async fn organizer_flags<S>(&self, event: &Event, source: &S) -> Vec<(Option<String>, String)>
    where
        S: EventSource + ?Sized,
    {
        let listed: Vec<&Organizer> = event.organizers.iter().take(MAX_ORGANIZERS).collect();
        let lookups = listed.iter().map(|org| source.fetch_team(org.id));
        let results = join_all(lookups).await;

        listed
            .into_iter()
            .zip(results)
            .map(|(org, result)| match result {
                Ok(team) => {
                    let flag = team
                        .country
                        .as_deref()
                        .map(|code| country_flag(Some(code)))
                        .filter(|flag| flag != UNKNOWN_FLAG);
                    (flag, org.name.clone())
                }
                Err(e) => {
                    warn!(organizer = %org.name, team_id = org.id, error = %e, "Organizer lookup failed");
                    (None, org.name.clone())
                }
            })
            .collect()
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::from_offset_hours(DEFAULT_OFFSET_HOURS).unwrap_or_else(|| Self::new(Utc.fix()))
    }
}

/// Compact countdown such as `3d 4h` or `5h`.
pub fn countdown(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let total = (to - from).num_hours().max(0);
    let (days, hours) = (total / 24, total % 24);
    if days > 0 {
        format!("{days}d {hours}h")
    } else {
        format!("{hours}h")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use ctftime_source::{Event, EventSource, SourceError, SourceResult, Team};

    /// Event source serving canned responses.
    #[derive(Debug, Default)]
    pub struct StaticSource {
        pub events: Mutex<Vec<SourceResult<Vec<Event>>>>,
        pub teams: HashMap<u64, Team>,
        pub fetches: Mutex<usize>,
        pub first_fetch_delay: Option<Duration>,
    }

    impl StaticSource {
        /// Each call to `fetch_upcoming_events` pops the next response;
        /// once exhausted every call returns an empty list.
        pub fn with_responses(responses: Vec<SourceResult<Vec<Event>>>) -> Self {
            Self {
                events: Mutex::new(responses.into_iter().rev().collect()),
                ..Self::default()
            }
        }

        pub fn with_team(mut self, id: u64, name: &str, country: Option<&str>) -> Self {
            self.teams.insert(
                id,
                Team {
                    name: name.to_string(),
                    country: country.map(str::to_string),
                },
            );
            self
        }

        /// Make the first fetch take `delay` before answering.
        pub fn with_first_fetch_delay(mut self, delay: Duration) -> Self {
            self.first_fetch_delay = Some(delay);
            self
        }

        pub fn fetch_count(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl EventSource for StaticSource {
        async fn fetch_upcoming_events(&self) -> SourceResult<Vec<Event>> {
            let delay = {
                let mut fetches = self.fetches.lock().unwrap();
                *fetches += 1;
                if *fetches == 1 {
                    self.first_fetch_delay
                } else {
                    None
                }
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.events.lock().unwrap().pop().unwrap_or(Ok(Vec::new()))
        }

        async fn fetch_team(&self, team_id: u64) -> SourceResult<Team> {
            self.teams.get(&team_id).cloned().ok_or(SourceError::Status {
                status: 404,
                url: format!("/teams/{team_id}/"),
            })
        }
    }

    pub fn event(id: u64, title: &str) -> Event {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "start": "2025-06-01T00:00:00+00:00",
            "finish": "2025-06-02T12:00:00+00:00",
            "duration": {"days": 1, "hours": 12},
            "weight": 24.5,
            "format": "Jeopardy",
            "restrictions": "Open",
            "url": "https://example.org",
            "organizers": []
        }))
        .unwrap()
    }
}
