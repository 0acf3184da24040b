//! Plain-text listings for the read-only subcommands.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use ctftime_source::Event;

use crate::format::{Formatter, countdown};
use crate::store::KnownEvents;

/// Upper bound for `upcoming --limit`.
pub const MAX_UPCOMING: usize = 10;
pub const DEFAULT_UPCOMING: usize = 5;

/// Next `limit` events (capped at [`MAX_UPCOMING`]) in source order.
pub fn render_upcoming(
    events: &[Event],
    now: DateTime<Utc>,
    formatter: &Formatter,
    limit: usize,
) -> String {
    let shown = &events[..events.len().min(limit.min(MAX_UPCOMING))];
    if shown.is_empty() {
        return "No upcoming CTF competitions found.\n".to_string();
    }

    let mut out = format!("📅 Next {} CTF competition(s):\n", shown.len());
    for event in shown {
        let _ = write!(
            out,
            "\n🏁 {}\n   📅 {}\n   ⏱️ Starts in: {}\n   ⚖️ Weight: {}\n   📊 {}\n",
            event.title,
            formatter.dual_time(event.start),
            countdown(now, event.start),
            event.weight,
            event.event_page_url()
        );
    }
    out
}

/// Events running at `now` with the time left until they finish.
pub fn render_current(events: &[Event], now: DateTime<Utc>, formatter: &Formatter) -> String {
    let running: Vec<&Event> = events.iter().filter(|e| e.is_running_at(now)).collect();
    if running.is_empty() {
        return "🏃 No CTF competitions are running right now.\n".to_string();
    }

    let mut out = format!("🏃 {} CTF competition(s) running now:\n", running.len());
    for event in running {
        let _ = write!(
            out,
            "\n⚡ {}\n   🏁 Ends: {}\n   ⏰ Remaining: {}\n   ⚖️ Weight: {}\n   📊 {}\n",
            event.title,
            formatter.dual_time(event.finish),
            countdown(now, event.finish),
            event.weight,
            event.event_page_url()
        );
    }
    out
}

/// Summary of the state file. `None` means nothing has been stored yet.
pub fn render_known(known: Option<&KnownEvents>) -> String {
    match known {
        None => "No state file yet; nothing has been announced.\n".to_string(),
        Some(known) if known.is_empty() => "0 known events.\n".to_string(),
        Some(known) => {
            let ids: Vec<String> = known.iter().map(|id| id.to_string()).collect();
            format!("{} known events:\n{}\n", known.len(), ids.join(", "))
        }
    }
}
