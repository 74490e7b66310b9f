//! Core domain entities shared by every component: [`Contact`], [`Conversation`],
//! [`Message`], and the small enums that describe their state machines.
//!
//! Newtype ids and enums implement `Display`/`FromStr` throughout; profile
//! fields live flat on `Contact` rather than split across tables.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContactId, ConversationId, TenantId};

/// Forward-only funnel position; `advance_journey` in `conversa-context` is
/// the only writer that moves a contact between stages under normal
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    Discovery,
    Interest,
    Evaluation,
    Decision,
}

impl Default for JourneyStage {
    fn default() -> Self {
        Self::Discovery
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovery => "discovery",
            Self::Interest => "interest",
            Self::Evaluation => "evaluation",
            Self::Decision => "decision",
        };
        write!(f, "{s}")
    }
}

impl FromStr for JourneyStage {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Self::Discovery),
            "interest" => Ok(Self::Interest),
            "evaluation" => Ok(Self::Evaluation),
            "decision" => Ok(Self::Decision),
            other => Err(format!("unknown journey stage: {other}")),
        }
    }
}

impl JourneyStage {
    /// The stage this one advances to on the next forward transition, or
    /// `None` if already terminal.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Discovery => Some(Self::Interest),
            Self::Interest => Some(Self::Evaluation),
            Self::Evaluation => Some(Self::Decision),
            Self::Decision => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EngagementLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown engagement level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalLevel {
    #[default]
    NonTechnical,
    BusinessUser,
    Technical,
    Developer,
    Executive,
}

impl fmt::Display for TechnicalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NonTechnical => "non_technical",
            Self::BusinessUser => "business_user",
            Self::Technical => "technical",
            Self::Developer => "developer",
            Self::Executive => "executive",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TechnicalLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "non_technical" => Ok(Self::NonTechnical),
            "business_user" => Ok(Self::BusinessUser),
            "technical" => Ok(Self::Technical),
            "developer" => Ok(Self::Developer),
            "executive" => Ok(Self::Executive),
            other => Err(format!("unknown technical level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTimePattern {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl fmt::Display for ResponseTimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ResponseTimePattern {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Self::Fast),
            "medium" => Ok(Self::Medium),
            "slow" => Ok(Self::Slow),
            other => Err(format!("unknown response time pattern: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMakingStyle {
    #[default]
    Intuitive,
    Analytical,
}

impl fmt::Display for DecisionMakingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Intuitive => "intuitive",
            Self::Analytical => "analytical",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DecisionMakingStyle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intuitive" => Ok(Self::Intuitive),
            "analytical" => Ok(Self::Analytical),
            other => Err(format!("unknown decision making style: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InformationPreference {
    Brief,
    #[default]
    Moderate,
    Detailed,
}

impl fmt::Display for InformationPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Brief => "brief",
            Self::Moderate => "moderate",
            Self::Detailed => "detailed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for InformationPreference {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brief" => Ok(Self::Brief),
            "moderate" => Ok(Self::Moderate),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("unknown information preference: {other}")),
        }
    }
}

/// A contact (end-user) addressable on the chat channel, scoped to a tenant.
///
/// `phone_number` is always stored in the canonical digits-only,
/// country-code-prefixed form chosen at the tenant boundary — see
/// `conversa_core::phone::canonicalize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant: TenantId,
    pub phone_number: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub lead_status: LeadStatus,
    pub journey_stage: JourneyStage,
    pub engagement_level: EngagementLevel,
    pub information_preference: InformationPreference,
    pub response_time_pattern: ResponseTimePattern,
    pub decision_making_style: DecisionMakingStyle,
    pub technical_level: TechnicalLevel,
    pub decision_maker: bool,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    pub industry_focus: Option<String>,
    pub company_size: Option<String>,
    pub prefer_as_example: bool,
    pub topics_discussed: BTreeSet<String>,
    pub questions_asked: Vec<String>,
    pub pain_points_mentioned: BTreeSet<String>,
    pub goals_expressed: BTreeSet<String>,
    pub competitors_mentioned: BTreeSet<String>,
    pub conversation_count: u32,
    pub total_interactions: u32,
    pub first_contact_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// A fresh contact with nothing learned about it yet.
    pub fn new(tenant: TenantId, phone_number: String) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::new(),
            tenant,
            phone_number,
            name: None,
            company: None,
            email: None,
            position: None,
            lead_status: LeadStatus::default(),
            journey_stage: JourneyStage::default(),
            engagement_level: EngagementLevel::default(),
            information_preference: InformationPreference::default(),
            response_time_pattern: ResponseTimePattern::default(),
            decision_making_style: DecisionMakingStyle::default(),
            technical_level: TechnicalLevel::default(),
            decision_maker: false,
            budget_range: None,
            timeline: None,
            industry_focus: None,
            company_size: None,
            prefer_as_example: false,
            topics_discussed: BTreeSet::new(),
            questions_asked: Vec::new(),
            pain_points_mentioned: BTreeSet::new(),
            goals_expressed: BTreeSet::new(),
            competitors_mentioned: BTreeSet::new(),
            conversation_count: 0,
            total_interactions: 0,
            first_contact_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Engaged,
    Qualified,
    Hot,
    Proposal,
    Won,
    Lost,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Engaged => "engaged",
            Self::Qualified => "qualified",
            Self::Hot => "hot",
            Self::Proposal => "proposal",
            Self::Won => "won",
            Self::Lost => "lost",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LeadStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "engaged" => Ok(Self::Engaged),
            "qualified" => Ok(Self::Qualified),
            "hot" => Ok(Self::Hot),
            "proposal" => Ok(Self::Proposal),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(format!("unknown lead status: {other}")),
        }
    }
}

impl LeadStatus {
    /// True for statuses the knowledge store boosts toward services/pricing/sales
    /// categories.
    pub fn is_priority(self) -> bool {
        matches!(self, Self::Qualified | Self::Hot | Self::Proposal)
    }
}

/// The durable thread of messages between a tenant and a contact. Exactly
/// one per `(tenant, contact)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub tenant: TenantId,
    pub contact: ContactId,
    pub bot_enabled: bool,
    pub handover_requested: bool,
    pub handover_timestamp: Option<DateTime<Utc>>,
    /// Stage tag ("10m"/"20m"/"30m"/"45m") -> timestamp sent. Reset on
    /// re-enablement.
    pub handover_updates_sent: HashMap<String, DateTime<Utc>>,
    pub handover_resolved_at: Option<DateTime<Utc>>,
    pub handover_resolution_reason: Option<String>,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(tenant: TenantId, contact: ContactId) -> Self {
        Self {
            id: ConversationId::new(),
            tenant,
            contact,
            bot_enabled: true,
            handover_requested: false,
            handover_timestamp: None,
            handover_updates_sent: HashMap::new(),
            handover_resolved_at: None,
            handover_resolution_reason: None,
            last_message_at: Utc::now(),
        }
    }
}

/// Scratchpad of short-lived conversational context, distinct from the
/// durable `Contact` profile: what's still open, what's being discussed
/// right now. Overwritten each turn rather than accumulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation: ConversationId,
    pub current_topic: Option<String>,
    pub unresolved_questions: Vec<String>,
    pub action_items: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(conversation: ConversationId) -> Self {
        Self {
            conversation,
            current_topic: None,
            unresolved_questions: Vec::new(),
            action_items: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MessageRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// Monotonic delivery status. See [`MessageStatus::can_transition_to`] for
/// the allowed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MessageStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

impl MessageStatus {
    fn rank(self) -> Option<u8> {
        match self {
            Self::Queued => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Failed => None, // terminal, not part of the forward chain
        }
    }

    /// Whether moving from `self` to `next` is a legal monotonic transition.
    /// `Failed` is terminal and reachable from any non-terminal state;
    /// transitions to an earlier state in the forward chain are rejected.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        if next == Self::Failed {
            return self.rank().is_some();
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to >= from,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub channel_message_id: Option<String>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
    pub error_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journey_stage_next_chain() {
        assert_eq!(JourneyStage::Discovery.next(), Some(JourneyStage::Interest));
        assert_eq!(JourneyStage::Interest.next(), Some(JourneyStage::Evaluation));
        assert_eq!(JourneyStage::Evaluation.next(), Some(JourneyStage::Decision));
        assert_eq!(JourneyStage::Decision.next(), None);
    }

    #[test]
    fn message_status_forward_chain_allowed() {
        assert!(MessageStatus::Queued.can_transition_to(MessageStatus::Sent));
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Delivered));
        assert!(MessageStatus::Delivered.can_transition_to(MessageStatus::Read));
        assert!(MessageStatus::Queued.can_transition_to(MessageStatus::Read));
    }

    #[test]
    fn message_status_reverse_transition_rejected() {
        assert!(!MessageStatus::Delivered.can_transition_to(MessageStatus::Sent));
        assert!(!MessageStatus::Read.can_transition_to(MessageStatus::Queued));
    }

    #[test]
    fn message_status_failed_is_terminal_but_reachable() {
        assert!(MessageStatus::Queued.can_transition_to(MessageStatus::Failed));
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Failed));
        assert!(!MessageStatus::Failed.can_transition_to(MessageStatus::Sent));
    }

    #[test]
    fn same_status_idempotent_reapply() {
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Sent));
    }
}
