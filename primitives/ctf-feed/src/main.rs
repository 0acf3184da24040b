//! ctf-feed - CTF Competition Announcer
//!
//! Polls CTFtime on an interval and posts one Discord embed for every
//! competition not announced before. The state file keeps restarts quiet.
//!
//! # Usage
//!
//! ```bash
//! # Run the bot (DISCORD_BOT_TOKEN may also come from .env)
//! DISCORD_BOT_TOKEN=... ctf-feed --channel ctftime
//!
//! # Check every 10 minutes with JSON logs
//! ctf-feed run --interval-minutes 10 --json-logs
//!
//! # Read-only listings
//! ctf-feed upcoming --limit 3
//! ctf-feed current
//! ctf-feed known
//! ```
//!
//! # Exit Codes
//!
//! - `0` - shut down by SIGTERM or Ctrl-C, or a listing printed
//! - `1` - configuration error, missing channel, or rejected bot token

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use ctf_feed::report;
use ctf_feed::{
    Args, Command, FatalError, JsonFileStore, KnownEventStore, Pipeline, Scheduler, Settings,
    load_or_init,
};
use ctftime_source::EventSource;
use discord_sink::DiscordClient;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    setup_logging(&args.settings.log_level, args.settings.json_logs);

    let result = match args.command.unwrap_or(Command::Run) {
        Command::Run => run_bot(&args.settings).await,
        Command::Upcoming { limit } => upcoming(&args.settings, limit).await,
        Command::Current => current(&args.settings).await,
        Command::Known => known(&args.settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_bot(settings: &Settings) -> anyhow::Result<()> {
    let token = settings.bot_token()?;
    let channel = settings.channel_name()?.to_string();
    let formatter = settings.formatter()?;

    let store = JsonFileStore::new(&settings.known_events_file);
    let known = load_or_init(&store);

    let source = settings
        .ctftime_client()
        .context("Failed to create CTFtime client")?;
    let discord = Arc::new(
        DiscordClient::new(token, settings.discord_api_url.as_str(), settings.http_timeout())
            .context("Failed to create Discord client")?,
    );

    info!(
        channel = %channel,
        interval_minutes = settings.interval_minutes,
        known = known.len(),
        state_file = %settings.known_events_file.display(),
        "Starting ctf-feed"
    );

    let mut pipeline = Pipeline::new(
        source,
        Arc::clone(&discord),
        store,
        known,
        channel,
        formatter,
    );

    let ready = async {
        discord
            .login()
            .await
            .map(|_| ())
            .map_err(FatalError::Session)
    };

    match Scheduler::new(settings.interval())
        .run(&mut pipeline, ready, shutdown_signal())
        .await
    {
        Ok(exit) => {
            info!(?exit, known = pipeline.known().len(), "ctf-feed stopped");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::from(e).context("Fatal error, closing session")),
    }
}

async fn upcoming(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let formatter = settings.formatter()?;
    let client = settings.ctftime_client()?;
    let events = client
        .fetch_upcoming_events()
        .await
        .context("Failed to fetch upcoming events")?;

    print!("{}", report::render_upcoming(&events, Utc::now(), &formatter, limit));
    Ok(())
}

async fn current(settings: &Settings) -> anyhow::Result<()> {
    let formatter = settings.formatter()?;
    let client = settings.ctftime_client()?;
    let now = Utc::now();
    let events = client
        .fetch_events_between(now - Duration::days(7), now + Duration::days(1), settings.event_limit)
        .await
        .context("Failed to fetch running events")?;

    print!("{}", report::render_current(&events, now, &formatter));
    Ok(())
}

fn known(settings: &Settings) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&settings.known_events_file);
    let loaded = store.load()?;
    print!("{}", report::render_known(loaded.as_ref()));
    Ok(())
}

/// Resolves on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = ctrl_c => info!("Received Ctrl-C"),
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
            let _ = ctrl_c.await;
        }
    }
}
