use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conversa_core::ids::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for RecurringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RecurringPattern {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown recurring pattern: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledMessageStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl fmt::Display for ScheduledMessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ScheduledMessageStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown scheduled message status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: String,
    pub tenant: TenantId,
    pub message_content: String,
    pub target_groups: Vec<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: ScheduledMessageStatus,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_interval: Option<u32>,
    pub next_send_at: Option<DateTime<Utc>>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub total_sent: u32,
    pub total_failed: u32,
}

impl ScheduledMessage {
    pub fn new(
        tenant: TenantId,
        message_content: String,
        target_groups: Vec<String>,
        scheduled_at: DateTime<Utc>,
        recurring_pattern: Option<RecurringPattern>,
        recurring_interval: Option<u32>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            tenant,
            message_content,
            target_groups,
            scheduled_at,
            status: ScheduledMessageStatus::Pending,
            recurring_pattern,
            recurring_interval,
            next_send_at: None,
            last_sent_at: None,
            total_sent: 0,
            total_failed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResult {
    pub scheduled_message_id: String,
    pub target: String,
    pub success: bool,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
