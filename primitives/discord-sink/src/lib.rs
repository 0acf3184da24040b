//! Discord Sink - Channel Message Poster
//!
//! A thin Discord REST client exposing exactly what an announcement bot
//! needs: confirm the session, find a text channel by name, post an embed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use discord_sink::{DiscordClient, Dispatcher, Embed, OutboundMessage};
//!
//! let client = DiscordClient::new(token, DEFAULT_API_URL, Duration::from_secs(30))?;
//! let me = client.login().await?;
//! if let Some(channel) = client.resolve_channel("ctftime").await? {
//!     client.send(&channel, &OutboundMessage::embed(Embed::new("hello"))).await?;
//! }
//! ```

mod client;
mod embed;
mod error;

pub use client::{
    ChannelHandle, CurrentUser, DEFAULT_API_URL, DiscordClient, Dispatcher, MessageAck,
};
pub use embed::{Embed, EmbedField, EmbedFooter, OutboundMessage, colors};
pub use error::{DiscordError, DiscordResult};
