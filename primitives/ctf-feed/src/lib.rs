//! CTF competition announcer.
//!
//! Polls CTFtime for upcoming competitions and posts one Discord embed per
//! competition it has not announced before. Announced ids are kept in a JSON
//! state file so restarts do not repeat announcements.
//!
//! # Usage
//!
//! ```bash
//! # Run the bot (token and channel from the environment or .env)
//! DISCORD_BOT_TOKEN=... ANNOUNCEMENT_CHANNEL=ctftime ctf-feed
//!
//! # Check every 10 minutes, keep state elsewhere
//! ctf-feed run --interval-minutes 10 --known-events-file /var/lib/ctf-feed/known.json
//!
//! # Read-only listings
//! ctf-feed upcoming --limit 3
//! ctf-feed current
//! ctf-feed known
//! ```

pub mod config;
pub mod format;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod store;

pub use config::{Args, Command, ConfigError, Settings};
pub use format::Formatter;
pub use pipeline::{FatalError, Pipeline, TickPhase, TickReport};
pub use scheduler::{Scheduler, SchedulerExit};
pub use store::{JsonFileStore, KnownEventStore, KnownEvents, StoreError, load_or_init};
