use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::error::ChannelError;
use crate::types::{ContactInfo, GroupInfo, OutboundMedia, OutboundText, SendResult, SessionStatus};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 1;
const DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 10;

/// Operations a tenant's messaging channel must support. A single gateway
/// instance can serve every tenant; per-tenant credentials are supplied by
/// the caller on each request.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    async fn send_text(&self, api_token: &str, msg: &OutboundText) -> Result<SendResult, ChannelError>;
    async fn send_media(&self, api_token: &str, msg: &OutboundMedia) -> Result<SendResult, ChannelError>;
    async fn list_groups(&self, api_token: &str) -> Result<Vec<GroupInfo>, ChannelError>;
    async fn list_contacts(&self, api_token: &str) -> Result<Vec<ContactInfo>, ChannelError>;
    async fn session_status(&self, api_token: &str) -> Result<SessionStatus, ChannelError>;
}

/// HTTP client for an Evolution-API-style WhatsApp gateway.
pub struct HttpChannelClient {
    http: Client,
    base_url: String,
}

impl HttpChannelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post_with_retry(&self, path: &str, api_token: &str, body: serde_json::Value) -> Result<serde_json::Value, ChannelError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        let mut delay_secs = BACKOFF_BASE_SECS;

        loop {
            attempt += 1;
            let result = self
                .http
                .post(&url)
                .bearer_auth(api_token)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(resp) => match classify_response(resp).await {
                    Ok(value) => return Ok(value),
                    Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                        let wait = match &err {
                            ChannelError::RateLimited { retry_after_secs } => *retry_after_secs,
                            _ => delay_secs,
                        };
                        warn!(attempt, max = MAX_ATTEMPTS, error = %err, wait_secs = wait, "channel send failed, retrying");
                        sleep(Duration::from_secs(wait)).await;
                        delay_secs *= 2;
                    }
                    Err(err) => return Err(err),
                },
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(attempt, max = MAX_ATTEMPTS, error = %e, "channel request failed, retrying");
                    sleep(Duration::from_secs(delay_secs)).await;
                    delay_secs *= 2;
                }
                Err(e) => return Err(ChannelError::Transient(e.to_string())),
            }
        }
    }
}

async fn classify_response(resp: reqwest::Response) -> Result<serde_json::Value, ChannelError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ChannelError::Transient(e.to_string()));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ChannelError::Unauthorized(status.to_string()))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECS);
            Err(ChannelError::RateLimited { retry_after_secs })
        }
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            Err(ChannelError::InvalidRecipient(status.to_string()))
        }
        StatusCode::CONFLICT | StatusCode::SERVICE_UNAVAILABLE => Err(ChannelError::SessionDisconnected),
        s if s.is_server_error() => Err(ChannelError::Transient(format!("server error {s}"))),
        s => Err(ChannelError::Transient(format!("unexpected status {s}"))),
    }
}

#[async_trait]
impl ChannelClient for HttpChannelClient {
    async fn send_text(&self, api_token: &str, msg: &OutboundText) -> Result<SendResult, ChannelError> {
        let body = json!({ "to": msg.to, "body": msg.body });
        let value = self.post_with_retry("/messages/send-text", api_token, body).await?;
        parse_send_result(value)
    }

    async fn send_media(&self, api_token: &str, msg: &OutboundMedia) -> Result<SendResult, ChannelError> {
        let body = json!({
            "to": msg.to,
            "mediaUrl": msg.media_url,
            "mimeType": msg.mime_type,
            "caption": msg.caption,
        });
        let value = self.post_with_retry("/messages/send-media", api_token, body).await?;
        parse_send_result(value)
    }

    async fn list_groups(&self, api_token: &str) -> Result<Vec<GroupInfo>, ChannelError> {
        let value = self.post_with_retry("/groups/list", api_token, json!({})).await?;
        serde_json::from_value(value).map_err(|e| ChannelError::Transient(e.to_string()))
    }

    async fn list_contacts(&self, api_token: &str) -> Result<Vec<ContactInfo>, ChannelError> {
        let value = self.post_with_retry("/contacts/list", api_token, json!({})).await?;
        serde_json::from_value(value).map_err(|e| ChannelError::Transient(e.to_string()))
    }

    async fn session_status(&self, api_token: &str) -> Result<SessionStatus, ChannelError> {
        let value = self.post_with_retry("/session/status", api_token, json!({})).await?;
        let status = value
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("disconnected");
        Ok(match status {
            "connected" => SessionStatus::Connected,
            "connecting" => SessionStatus::Connecting,
            "qr_required" => SessionStatus::QrRequired,
            _ => SessionStatus::Disconnected,
        })
    }
}

fn parse_send_result(value: serde_json::Value) -> Result<SendResult, ChannelError> {
    let channel_message_id = value
        .get("id")
        .or_else(|| value.get("messageId"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChannelError::Transient("gateway response missing message id".into()))?
        .to_string();
    Ok(SendResult { channel_message_id })
}
