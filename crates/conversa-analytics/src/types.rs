use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conversa_core::domain::{JourneyStage, MessageRole};
use conversa_core::ids::{ContactId, MessageId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub contact: ContactId,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub journey_start: JourneyStage,
    pub journey_end: JourneyStage,
    pub message_count: u32,
    pub lead_score: Option<f64>,
    pub engagement_score: Option<f64>,
    pub flags: Vec<String>,
}

/// Inactivity beyond this threshold opens a new session for a contact.
pub const SESSION_INACTIVITY_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAnalytics {
    pub message_id: MessageId,
    pub role: MessageRole,
    pub length: u32,
    pub handler_kind: String,
    pub rag_docs: u32,
    pub rag_latency_ms: Option<u64>,
    pub personalization_level: Option<String>,
    pub response_strategy: Option<String>,
    pub communication_style: Option<String>,
    pub intents: Vec<String>,
    pub business_category: Option<String>,
    pub urgency: Option<String>,
    pub latency_ms: u64,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_estimate: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadScore {
    pub contact: ContactId,
    pub overall: f64,
    pub engagement: f64,
    pub intent: f64,
    pub fit: f64,
    pub timing: f64,
    pub behavior_snapshot: String,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub endpoint: String,
    pub op: String,
    pub latency_ms: u64,
    pub status: String,
    pub model: Option<String>,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: String,
    pub total_messages: u32,
    pub total_sessions: u32,
    pub conversion_rate: f64,
    pub journey_distribution: Vec<(String, u32)>,
    pub ai_handled: u32,
    pub human_handled: u32,
}

/// One record headed for durable storage via the bounded drain queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalyticsEvent {
    Session(ConversationSession),
    Message(MessageAnalytics),
    Lead(LeadScore),
    Performance(PerformanceSample),
}
