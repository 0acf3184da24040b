//! CTFtime Source - Competition Listing Client
//!
//! Fetches upcoming Capture-The-Flag competitions from the CTFtime public API
//! and resolves organizer teams to their country.
//!
//! The client is read-only and never retries; callers decide what a failed
//! fetch means for them. The bot treats every [`SourceError`] as "no data this
//! call" and simply tries again on its next tick.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ctftime_source::{CtftimeClient, EventSource};
//!
//! let client = CtftimeClient::new("https://ctftime.org/api/v1", Duration::from_secs(30))?
//!     .with_window(90, 20);
//! for event in client.fetch_upcoming_events().await? {
//!     println!("{} {}", event.id, event.title);
//! }
//! ```

mod client;
mod error;
mod event;

pub use client::{CtftimeClient, DEFAULT_API_URL, EventSource};
pub use error::{SourceError, SourceResult};
pub use event::{Event, EventDuration, EventId, Organizer, Team};
