use crate::types::{RelayConfig, RelayError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use interfaces::defs::DeliverySink;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10/";

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Posts notifications to one Discord channel through the bot REST API.
pub struct DiscordSink {
    client: Client,
    endpoint: Url,
    token: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl DiscordSink {
    pub fn new(token: &str, channel_id: &str, config: &RelayConfig) -> Result<Self> {
        Self::with_api_base(DISCORD_API_BASE, token, channel_id, config)
    }

    pub fn with_api_base(api_base: &str, token: &str, channel_id: &str, config: &RelayConfig) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(RelayError::Config("Discord bot token is empty".to_string()));
        }
        if channel_id.is_empty() || !channel_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(RelayError::Config(format!("Invalid Discord channel id '{}'", channel_id)));
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: channel_messages_url(api_base, channel_id)?,
            token: token.trim().to_string(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn post_message(&self, content: &str) -> Result<()> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.retry_delay,
            initial_interval: self.retry_delay,
            max_interval: self.retry_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(self.retry_delay * 60),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header(AUTHORIZATION, format!("Bot {}", self.token))
                .json(&CreateMessage { content })
                .send()
                .await;

            let delay = match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!("Delivered message ({} chars)", content.chars().count());
                        return Ok(());
                    }

                    let body = response.text().await.unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(RelayError::Delivery(format!("HTTP {}: {}", status, body)));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = retry_after(&body);
                        last_error = Some(RelayError::RateLimited {
                            seconds: wait.map(|d| d.as_secs_f64()).unwrap_or_default(),
                        });
                        wait.or_else(|| backoff.next_backoff())
                    } else {
                        last_error = Some(RelayError::Delivery(format!("HTTP {}: {}", status, body)));
                        backoff.next_backoff()
                    }
                }
                Err(e) => {
                    last_error = Some(RelayError::Http(e));
                    backoff.next_backoff()
                }
            };

            if attempt < self.max_retries {
                if let Some(delay) = delay {
                    warn!("Delivery attempt {} failed, retrying in {:?}", attempt + 1, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        error!("Failed to deliver message after {} attempts", self.max_retries + 1);
        Err(last_error.unwrap_or_else(|| RelayError::Delivery("Unknown error".to_string())))
    }
}

impl DeliverySink for DiscordSink {
    async fn deliver(&self, message: &str) -> anyhow::Result<()> {
        Ok(self.post_message(message).await?)
    }
}

/// Prints notifications instead of posting them.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl DeliverySink for StdoutSink {
    async fn deliver(&self, message: &str) -> anyhow::Result<()> {
        println!("{}\n---", message);
        Ok(())
    }
}

fn channel_messages_url(api_base: &str, channel_id: &str) -> Result<Url> {
    let base = if api_base.ends_with('/') {
        Url::parse(api_base)?
    } else {
        Url::parse(&format!("{}/", api_base))?
    };
    Ok(base.join(&format!("channels/{}/messages", channel_id))?)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Wait time from a Discord 429 body, e.g. `{"retry_after": 0.64, "global": false}`.
fn retry_after(body: &str) -> Option<Duration> {
    let parsed: RateLimitBody = serde_json::from_str(body).ok()?;
    Duration::try_from_secs_f64(parsed.retry_after).ok()
}
