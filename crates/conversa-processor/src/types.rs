use chrono::{DateTime, Utc};

use conversa_core::ids::TenantId;

/// Normalized inbound event handed off by the webhook router after it has
/// stripped channel-specific envelope fields.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub tenant: TenantId,
    pub from: String,
    pub channel_message_id: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-tenant secrets the processor needs but doesn't own the lifecycle of
/// (key issuance/rotation is out of scope here).
pub struct TenantCredentials {
    pub llm_api_key: String,
    pub channel_api_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DuplicateEvent,
    EchoOrSelf,
    BotDisabled,
}

#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Stopped(StopReason),
    HandoverTriggered { reason: String },
    Replied { message: String, discovery_call_offered: bool, degraded: bool },
}
