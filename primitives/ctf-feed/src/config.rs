//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or an environment variable; a `.env`
//! file in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ctftime_source::{CtftimeClient, DEFAULT_API_URL as CTFTIME_API_URL, SourceError};
use secrecy::SecretString;
use thiserror::Error;

use crate::format::{DEFAULT_OFFSET_HOURS, Formatter};
use crate::report::DEFAULT_UPCOMING;
use crate::store::DEFAULT_KNOWN_EVENTS_FILE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DISCORD_BOT_TOKEN is not set (put it in the environment or a .env file)")]
    MissingToken,

    #[error("ANNOUNCEMENT_CHANNEL is empty (for example: ANNOUNCEMENT_CHANNEL=ctftime)")]
    EmptyChannel,

    #[error("Display UTC offset {0} is out of range")]
    InvalidOffset(i32),
}

/// Announces newly listed CTF competitions to a Discord channel.
#[derive(Parser)]
#[command(name = "ctf-feed")]
#[command(about = "Announces newly listed CTFtime competitions to a Discord channel")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the announcement bot (default).
    Run,

    /// Print the next upcoming competitions.
    Upcoming {
        /// How many to show (at most 10).
        #[arg(short, long, default_value_t = DEFAULT_UPCOMING)]
        limit: usize,
    },

    /// Print competitions running right now.
    Current,

    /// Print the ids already announced.
    Known,
}

#[derive(clap::Args, Clone)]
pub struct Settings {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Name of the text channel to announce in.
    #[arg(long, env = "ANNOUNCEMENT_CHANNEL", default_value = "ctftime", global = true)]
    pub channel: String,

    /// Minutes between checks.
    #[arg(
        long,
        env = "CHECK_INTERVAL_MINUTES",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub interval_minutes: u64,

    /// How many days ahead to look for competitions.
    #[arg(long, env = "SEARCH_DAYS", default_value_t = 90, global = true)]
    pub search_days: u32,

    /// Maximum competitions per query.
    #[arg(long, env = "EVENT_LIMIT", default_value_t = 20, global = true)]
    pub event_limit: u32,

    /// State file holding announced event ids.
    #[arg(long, env = "KNOWN_EVENTS_FILE", default_value = DEFAULT_KNOWN_EVENTS_FILE, global = true)]
    pub known_events_file: PathBuf,

    /// CTFtime API root.
    #[arg(long, env = "CTFTIME_API_URL", default_value = CTFTIME_API_URL, global = true)]
    pub ctftime_api_url: String,

    /// Discord REST API root.
    #[arg(long, env = "DISCORD_API_URL", default_value = discord_sink::DEFAULT_API_URL, global = true)]
    pub discord_api_url: String,

    /// Whole-hour UTC offset used for displayed times.
    #[arg(
        long,
        env = "DISPLAY_UTC_OFFSET_HOURS",
        default_value_t = DEFAULT_OFFSET_HOURS,
        allow_hyphen_values = true,
        global = true
    )]
    pub display_utc_offset_hours: i32,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub http_timeout_secs: u64,

    /// Log level when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON.
    #[arg(long, env = "JSON_LOGS", global = true)]
    pub json_logs: bool,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("channel", &self.channel)
            .field("interval_minutes", &self.interval_minutes)
            .field("search_days", &self.search_days)
            .field("event_limit", &self.event_limit)
            .field("known_events_file", &self.known_events_file)
            .field("ctftime_api_url", &self.ctftime_api_url)
            .field("discord_api_url", &self.discord_api_url)
            .field("display_utc_offset_hours", &self.display_utc_offset_hours)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl Settings {
    /// The bot token; missing or blank is a configuration error.
    pub fn bot_token(&self) -> Result<SecretString, ConfigError> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(SecretString::from(token.to_string())),
            _ => Err(ConfigError::MissingToken),
        }
    }

    pub fn channel_name(&self) -> Result<&str, ConfigError> {
        let name = self.channel.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        Ok(name)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn formatter(&self) -> Result<Formatter, ConfigError> {
        if !(-12..=14).contains(&self.display_utc_offset_hours) {
            return Err(ConfigError::InvalidOffset(self.display_utc_offset_hours));
        }
        Formatter::from_offset_hours(self.display_utc_offset_hours)
            .ok_or(ConfigError::InvalidOffset(self.display_utc_offset_hours))
    }

    pub fn ctftime_client(&self) -> Result<CtftimeClient, SourceError> {
        Ok(CtftimeClient::new(&self.ctftime_api_url, self.http_timeout())?
            .with_window(self.search_days, self.event_limit))
    }
}
