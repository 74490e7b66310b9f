use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Disposition of an inbound webhook event after the router has dispatched
/// it. Append-only audit trail; never overwrites the original payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventStatus {
    Received,
    Processed,
    Ignored,
    Failed,
}

impl fmt::Display for WebhookEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Processed => "processed",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for WebhookEventStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "processed" => Ok(Self::Processed),
            "ignored" => Ok(Self::Ignored),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown webhook event status: {other}")),
        }
    }
}

/// An append-only record of an inbound webhook delivery, independent of
/// whatever downstream processing it triggered.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: String,
    pub tenant: conversa_core::ids::TenantId,
    pub kind: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
    pub processing_status: WebhookEventStatus,
}

impl WebhookEvent {
    pub fn received(tenant: conversa_core::ids::TenantId, kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            tenant,
            kind: kind.into(),
            payload: payload.into(),
            received_at: Utc::now(),
            processing_status: WebhookEventStatus::Received,
        }
    }
}
