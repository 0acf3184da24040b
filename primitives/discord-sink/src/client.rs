//! Discord REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::embed::OutboundMessage;
use crate::error::{DiscordError, DiscordResult};

/// Discord REST API root.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Channel type for guild text channels.
const GUILD_TEXT: u8 = 0;

/// Destination capability consumed by the announcement pipeline.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Find a text channel by name (case-insensitive).
    ///
    /// `Ok(None)` means the lookup worked and no such channel is visible.
    async fn resolve_channel(&self, name: &str) -> DiscordResult<Option<ChannelHandle>>;

    /// Deliver a message to a resolved channel.
    async fn send(
        &self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> DiscordResult<MessageAck>;
}

#[async_trait]
impl<T: Dispatcher + ?Sized> Dispatcher for std::sync::Arc<T> {
    async fn resolve_channel(&self, name: &str) -> DiscordResult<Option<ChannelHandle>> {
        (**self).resolve_channel(name).await
    }

    async fn send(
        &self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> DiscordResult<MessageAck> {
        (**self).send(channel, message).await
    }
}

/// A resolved text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: String,
    pub guild_id: String,
}

/// Acknowledgement for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageAck {
    /// Id of the created message.
    pub id: String,
}

/// The bot account behind the token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct PartialGuild {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GuildChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after: Option<f64>,
}

/// Discord bot client over the REST API.
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl DiscordClient {
    /// Create a client for the given bot token.
    pub fn new(
        token: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> DiscordResult<Self> {
        if token.expose_secret().trim().is_empty() {
            return Err(DiscordError::Auth("bot token is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscordError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Verify the token and return the bot user. Success means the session
    /// is ready to resolve channels and post.
    pub async fn login(&self) -> DiscordResult<CurrentUser> {
        debug!("Checking Discord credentials...");
        let user: CurrentUser = self.execute(self.get("/users/@me")).await?;
        info!(user = %user.username, id = %user.id, "Logged in to Discord");
        Ok(user)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> DiscordResult<T> {
        let response = request
            .header(
                "Authorization",
                format!("Bot {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
        let message = parsed
            .as_ref()
            .map(|b| b.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => DiscordError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => DiscordError::RateLimited {
                retry_after_secs: parsed.and_then(|b| b.retry_after).unwrap_or(1.0),
            },
            _ => DiscordError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Dispatcher for DiscordClient {
    async fn resolve_channel(&self, name: &str) -> DiscordResult<Option<ChannelHandle>> {
        let wanted = name.trim().trim_start_matches('#').to_lowercase();
        let guilds: Vec<PartialGuild> = self.execute(self.get("/users/@me/guilds")).await?;
        let total = guilds.len();
        let mut last_error = None;
        let mut failed = 0;

        for guild in guilds {
            let channels: Vec<GuildChannel> = match self
                .execute(self.get(&format!("/guilds/{}/channels", guild.id)))
                .await
            {
                Ok(channels) => channels,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(guild = %guild.name, error = %e, "Skipping guild, channel list unavailable");
                    failed += 1;
                    last_error = Some(e);
                    continue;
                }
            };

            let found = channels.into_iter().find(|c| {
                c.kind == GUILD_TEXT
                    && c.name.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str())
            });

            if let Some(channel) = found {
                debug!(guild = %guild.name, channel = %channel.id, "Resolved announcement channel");
                return Ok(Some(ChannelHandle {
                    id: channel.id,
                    name: channel.name.unwrap_or_default(),
                    guild_id: guild.id,
                }));
            }
        }

        // Nothing could be searched, so absence is not proven.
        match last_error {
            Some(e) if failed == total => Err(e),
            _ => Ok(None),
        }
    }

    async fn send(
        &self,
        channel: &ChannelHandle,
        message: &OutboundMessage,
    ) -> DiscordResult<MessageAck> {
        let request = self
            .post(&format!("/channels/{}/messages", channel.id))
            .json(message);
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::Embed;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DiscordClient {
        DiscordClient::new(
            SecretString::from("test-token".to_string()),
            server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    async fn mount_guilds(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "100", "name": "Home"},
                {"id": "200", "name": "Team"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/100/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "101", "type": 4, "name": "ctftime"},
                {"id": "102", "type": 0, "name": "general"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/200/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "201", "type": 2, "name": "voice"},
                {"id": "202", "type": 0, "name": "CTFtime"}
            ])))
            .mount(server)
            .await;
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = DiscordClient::new(
            SecretString::from("  ".to_string()),
            DEFAULT_API_URL,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(DiscordError::Auth(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = DiscordClient::new(
            SecretString::from("super-secret".to_string()),
            DEFAULT_API_URL,
            Duration::from_secs(1),
        )
        .unwrap();
        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_login_sends_bot_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .and(header("Authorization", "Bot test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1", "username": "ctf-bot"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server).login().await.unwrap();
        assert_eq!(user.username, "ctf-bot");
    }

    #[tokio::test]
    async fn test_login_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "401: Unauthorized", "code": 0})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login().await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Authentication error: 401: Unauthorized");
    }

    #[tokio::test]
    async fn test_resolve_channel_skips_non_text_and_ignores_case() {
        let server = MockServer::start().await;
        mount_guilds(&server).await;

        let channel = client_for(&server)
            .resolve_channel("ctftime")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            channel,
            ChannelHandle {
                id: "202".to_string(),
                name: "CTFtime".to_string(),
                guild_id: "200".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_channel_accepts_hash_prefix() {
        let server = MockServer::start().await;
        mount_guilds(&server).await;

        let channel = client_for(&server).resolve_channel("#General").await.unwrap();
        assert_eq!(channel.map(|c| c.id), Some("102".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_channel_not_found() {
        let server = MockServer::start().await;
        mount_guilds(&server).await;

        let channel = client_for(&server).resolve_channel("announcements").await.unwrap();
        assert!(channel.is_none());
    }

    #[tokio::test]
    async fn test_resolve_channel_transport_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = client_for(&server).resolve_channel("ctftime").await.unwrap_err();
        assert!(matches!(err, DiscordError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_resolve_channel_skips_failing_guild() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "100", "name": "Locked"},
                {"id": "200", "name": "Team"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/100/channels"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"message": "Missing Access", "code": 50001})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/200/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "202", "type": 0, "name": "ctftime"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let channel = client.resolve_channel("ctftime").await.unwrap();
        assert_eq!(channel.map(|c| c.id), Some("202".to_string()));

        let missing = client.resolve_channel("announcements").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_resolve_channel_every_guild_failing_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "100", "name": "Locked"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/100/channels"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"message": "Missing Access", "code": 50001})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).resolve_channel("ctftime").await.unwrap_err();
        assert!(matches!(err, DiscordError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_send_posts_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/202/messages"))
            .and(body_partial_json(serde_json::json!({
                "embeds": [{"title": "New CTF"}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "9001"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let channel = ChannelHandle {
            id: "202".to_string(),
            name: "ctftime".to_string(),
            guild_id: "200".to_string(),
        };
        let ack = client_for(&server)
            .send(&channel, &OutboundMessage::embed(Embed::new("New CTF")))
            .await
            .unwrap();
        assert_eq!(ack.id, "9001");
    }

    #[tokio::test]
    async fn test_send_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/202/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "message": "You are being rate limited.",
                "retry_after": 2.5,
                "global": false
            })))
            .mount(&server)
            .await;

        let channel = ChannelHandle {
            id: "202".to_string(),
            name: "ctftime".to_string(),
            guild_id: "200".to_string(),
        };
        let err = client_for(&server)
            .send(&channel, &OutboundMessage::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiscordError::RateLimited { retry_after_secs } if retry_after_secs == 2.5
        ));
    }
}
