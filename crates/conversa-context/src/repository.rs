use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use conversa_core::domain::{
    Contact, Conversation, ConversationState, DecisionMakingStyle, EngagementLevel,
    InformationPreference, JourneyStage, LeadStatus, Message, MessageRole, MessageStatus,
    ResponseTimePattern, TechnicalLevel,
};
use conversa_core::ids::{ContactId, ConversationId, TenantId};

use crate::api_keys::{ApiKey, ApiKeyKind};
use crate::error::ContextError;
use crate::signals::{infer_behavior, next_journey_stage};
use crate::webhook_events::{WebhookEvent, WebhookEventStatus};

/// Persists contacts and conversations, and folds inbound-message signal
/// extraction (journey advancement, behavioral inference) into both.
pub struct ContextRepository {
    db: Mutex<Connection>,
}

impl ContextRepository {
    pub fn new(conn: Connection) -> Result<Self, ContextError> {
        crate::db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn get_or_create_contact(&self, tenant: &TenantId, phone_number: &str) -> Result<Contact, ContextError> {
        let db = self.db.lock().unwrap();
        if let Some(contact) = query_contact(&db, tenant, phone_number)? {
            return Ok(contact);
        }

        let contact = Contact::new(tenant.clone(), phone_number.to_string());
        insert_contact(&db, &contact)?;
        Ok(contact)
    }

    pub fn get_or_create_conversation(&self, tenant: &TenantId, contact: &ContactId) -> Result<Conversation, ContextError> {
        let db = self.db.lock().unwrap();
        if let Some(conversation) = query_conversation(&db, tenant, contact)? {
            return Ok(conversation);
        }

        let conversation = Conversation::new(tenant.clone(), contact.clone());
        insert_conversation(&db, &conversation)?;
        Ok(conversation)
    }

    pub fn conversation_state(&self, tenant: &TenantId, contact: &ContactId) -> Result<Conversation, ContextError> {
        let db = self.db.lock().unwrap();
        query_conversation(&db, tenant, contact)?
            .ok_or_else(|| ContextError::ConversationNotFound(contact.to_string()))
    }

    pub fn save_conversation(&self, conversation: &Conversation) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        update_conversation(&db, conversation)
    }

    /// Re-read the message against the current journey stage's signal set
    /// and advance on a match. Never regresses and never skips a stage.
    pub fn advance_journey(&self, contact: &Contact, message: &str) -> Result<Contact, ContextError> {
        match next_journey_stage(contact.journey_stage, message) {
            Some(stage) => {
                let mut updated = contact.clone();
                updated.journey_stage = stage;
                updated.updated_at = Utc::now();
                self.save_contact(&updated)?;
                Ok(updated)
            }
            None => Ok(contact.clone()),
        }
    }

    /// Infer and persist behavioral trait updates from a single message.
    pub fn update_behavior(
        &self,
        contact: &Contact,
        message: &str,
        response_time_secs: Option<i64>,
    ) -> Result<Contact, ContextError> {
        let inferred = infer_behavior(message, response_time_secs);
        let mut updated = contact.clone();
        if let Some(v) = inferred.engagement_level {
            updated.engagement_level = v;
        }
        if let Some(v) = inferred.information_preference {
            updated.information_preference = v;
        }
        if let Some(v) = inferred.response_time_pattern {
            updated.response_time_pattern = v;
        }
        if let Some(v) = inferred.decision_making_style {
            updated.decision_making_style = v;
        }
        updated.updated_at = Utc::now();
        self.save_contact(&updated)?;
        Ok(updated)
    }

    /// Merge newly observed topics/questions/pain-points/goals/competitors
    /// into the contact's running sets, and bump interaction counters.
    /// Set fields union rather than replace: a topic once discussed stays
    /// recorded even if a later turn doesn't repeat it.
    pub fn merge_signals(
        &self,
        contact: &Contact,
        topics: BTreeSet<String>,
        questions: Vec<String>,
        pain_points: BTreeSet<String>,
        goals: BTreeSet<String>,
        competitors: BTreeSet<String>,
    ) -> Result<Contact, ContextError> {
        let mut updated = contact.clone();
        updated.topics_discussed.extend(topics);
        updated.questions_asked.extend(questions);
        updated.pain_points_mentioned.extend(pain_points);
        updated.goals_expressed.extend(goals);
        updated.competitors_mentioned.extend(competitors);
        updated.total_interactions += 1;
        updated.updated_at = Utc::now();
        self.save_contact(&updated)?;
        Ok(updated)
    }

    pub fn save_contact(&self, contact: &Contact) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        update_contact(&db, contact)
    }

    /// Current scratchpad state for a conversation, or a fresh empty one if
    /// nothing has been recorded yet.
    pub fn conversation_scratchpad(&self, conversation: &ConversationId) -> Result<ConversationState, ContextError> {
        let db = self.db.lock().unwrap();
        Ok(query_conversation_state(&db, conversation)?
            .unwrap_or_else(|| ConversationState::new(conversation.clone())))
    }

    pub fn save_conversation_state(&self, state: &ConversationState) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        upsert_conversation_state(&db, state)
    }

    /// Persists one message. A unique-index conflict on `channel_message_id`
    /// (the durable half of the idempotency check, the LRU cache is the
    /// fast half) surfaces as `DuplicateMessage` rather than a raw SQLite
    /// error, so the caller can treat re-delivery as success.
    pub fn insert_message(&self, message: &Message) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        match insert_message_row(&db, message) {
            Err(ContextError::Database(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(ContextError::DuplicateMessage)
            }
            other => other,
        }
    }

    /// Advances a message's delivery status by `channel_message_id`,
    /// rejecting any transition that would move it backward in the forward
    /// chain (`queued -> sent -> delivered -> read`); `failed` is reachable
    /// from any non-terminal state.
    pub fn update_message_status(
        &self,
        channel_message_id: &str,
        status: MessageStatus,
        error_reason: Option<String>,
    ) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        let current = query_message_status(&db, channel_message_id)?;
        let Some(current) = current else { return Ok(()) };
        if !current.can_transition_to(status) {
            return Ok(());
        }
        update_message_status_row(&db, channel_message_id, status, error_reason)
    }

    /// Most recent messages in a conversation, oldest first, capped at
    /// `limit`.
    pub fn recent_messages(&self, conversation: &ConversationId, limit: usize) -> Result<Vec<Message>, ContextError> {
        let db = self.db.lock().unwrap();
        query_recent_messages(&db, conversation, limit)
    }

    /// All conversations currently awaiting a human that haven't yet been
    /// resolved, across every tenant.
    pub fn conversations_pending_rescue(&self) -> Result<Vec<Conversation>, ContextError> {
        let db = self.db.lock().unwrap();
        query_conversations_pending_rescue(&db)
    }

    pub fn contact_by_id(&self, contact: &ContactId) -> Result<Contact, ContextError> {
        let db = self.db.lock().unwrap();
        query_contact_by_id(&db, contact)?.ok_or_else(|| ContextError::ContactNotFound(contact.to_string()))
    }

    pub fn insert_api_key(&self, key: &ApiKey) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO api_keys (id, tenant_id, kind, name, encrypted_secret, active, last_used_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                key.id,
                key.tenant.as_str(),
                key.kind.to_string(),
                key.name,
                key.encrypted_secret,
                key.active,
                key.last_used_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// The active key of `kind` for `tenant`, if one has been provisioned.
    /// Absence is not an error — callers fall back to a deployment-wide
    /// default credential.
    pub fn active_api_key(&self, tenant: &TenantId, kind: ApiKeyKind) -> Result<Option<ApiKey>, ContextError> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, tenant_id, kind, name, encrypted_secret, active, last_used_at
             FROM api_keys WHERE tenant_id = ?1 AND kind = ?2 AND active = 1
             ORDER BY rowid DESC LIMIT 1",
            params![tenant.as_str(), kind.to_string()],
            row_to_api_key,
        )
        .optional()
        .map_err(ContextError::from)
    }

    pub fn touch_api_key_usage(&self, id: &str) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        db.execute("UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2", params![Utc::now().to_rfc3339(), id])?;
        Ok(())
    }

    /// Appends the raw webhook delivery to the audit trail. Never fails the
    /// caller's dispatch — insertion happens regardless of how the event is
    /// ultimately handled.
    pub fn insert_webhook_event(&self, event: &WebhookEvent) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO webhook_events (id, tenant_id, kind, payload, received_at, processing_status)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                event.id,
                event.tenant.as_str(),
                event.kind,
                event.payload,
                event.received_at.to_rfc3339(),
                event.processing_status.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn mark_webhook_event_status(&self, id: &str, status: WebhookEventStatus) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE webhook_events SET processing_status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        Ok(())
    }
}

fn row_to_api_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
    let last_used_at: Option<String> = row.get(6)?;
    Ok(ApiKey {
        id: row.get(0)?,
        tenant: TenantId::from(row.get::<_, String>(1)?),
        kind: ApiKeyKind::from_str(&row.get::<_, String>(2)?).unwrap_or(ApiKeyKind::Llm),
        name: row.get(3)?,
        encrypted_secret: row.get(4)?,
        active: row.get(5)?,
        last_used_at: last_used_at.and_then(|s| s.parse().ok()),
    })
}

fn set_to_json(set: &BTreeSet<String>) -> String {
    serde_json::to_string(set).unwrap_or_else(|_| "[]".to_string())
}

fn json_to_set(s: &str) -> BTreeSet<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn vec_to_json(v: &[String]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string())
}

fn json_to_vec(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn map_to_json(m: &HashMap<String, DateTime<Utc>>) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

fn json_to_map(s: &str) -> HashMap<String, DateTime<Utc>> {
    serde_json::from_str(s).unwrap_or_default()
}

fn insert_contact(db: &Connection, c: &Contact) -> Result<(), ContextError> {
    db.execute(
        "INSERT INTO contacts (
            id, tenant_id, phone_number, name, company, email, position, lead_status, journey_stage,
            engagement_level, information_preference, response_time_pattern, decision_making_style,
            technical_level, decision_maker, budget_range, timeline, industry_focus, company_size,
            prefer_as_example, topics_discussed, questions_asked, pain_points_mentioned,
            goals_expressed, competitors_mentioned, conversation_count, total_interactions,
            first_contact_at, updated_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27,?28,?29)",
        params![
            c.id.as_str(),
            c.tenant.as_str(),
            c.phone_number,
            c.name,
            c.company,
            c.email,
            c.position,
            c.lead_status.to_string(),
            c.journey_stage.to_string(),
            c.engagement_level.to_string(),
            c.information_preference.to_string(),
            c.response_time_pattern.to_string(),
            c.decision_making_style.to_string(),
            c.technical_level.to_string(),
            c.decision_maker,
            c.budget_range,
            c.timeline,
            c.industry_focus,
            c.company_size,
            c.prefer_as_example,
            set_to_json(&c.topics_discussed),
            vec_to_json(&c.questions_asked),
            set_to_json(&c.pain_points_mentioned),
            set_to_json(&c.goals_expressed),
            set_to_json(&c.competitors_mentioned),
            c.conversation_count,
            c.total_interactions,
            c.first_contact_at.to_rfc3339(),
            c.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn update_contact(db: &Connection, c: &Contact) -> Result<(), ContextError> {
    db.execute(
        "UPDATE contacts SET
            name=?1, company=?2, email=?3, position=?4, lead_status=?5, journey_stage=?6,
            engagement_level=?7, information_preference=?8, response_time_pattern=?9,
            decision_making_style=?10, technical_level=?11, decision_maker=?12,
            budget_range=?13, timeline=?14, industry_focus=?15, company_size=?16,
            prefer_as_example=?17, topics_discussed=?18, questions_asked=?19,
            pain_points_mentioned=?20, goals_expressed=?21, competitors_mentioned=?22,
            conversation_count=?23, total_interactions=?24, updated_at=?25
         WHERE id=?26",
        params![
            c.name,
            c.company,
            c.email,
            c.position,
            c.lead_status.to_string(),
            c.journey_stage.to_string(),
            c.engagement_level.to_string(),
            c.information_preference.to_string(),
            c.response_time_pattern.to_string(),
            c.decision_making_style.to_string(),
            c.technical_level.to_string(),
            c.decision_maker,
            c.budget_range,
            c.timeline,
            c.industry_focus,
            c.company_size,
            c.prefer_as_example,
            set_to_json(&c.topics_discussed),
            vec_to_json(&c.questions_asked),
            set_to_json(&c.pain_points_mentioned),
            set_to_json(&c.goals_expressed),
            set_to_json(&c.competitors_mentioned),
            c.conversation_count,
            c.total_interactions,
            c.updated_at.to_rfc3339(),
            c.id.as_str(),
        ],
    )?;
    Ok(())
}

fn query_contact(db: &Connection, tenant: &TenantId, phone_number: &str) -> Result<Option<Contact>, ContextError> {
    db.query_row(
        "SELECT id, tenant_id, phone_number, name, company, email, position, lead_status, journey_stage,
                engagement_level, information_preference, response_time_pattern, decision_making_style,
                technical_level, decision_maker, budget_range, timeline, industry_focus, company_size,
                prefer_as_example, topics_discussed, questions_asked, pain_points_mentioned,
                goals_expressed, competitors_mentioned, conversation_count, total_interactions,
                first_contact_at, updated_at
         FROM contacts WHERE tenant_id = ?1 AND phone_number = ?2",
        params![tenant.as_str(), phone_number],
        row_to_contact,
    )
    .optional()
    .map_err(ContextError::from)
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let first_contact_at: String = row.get(27)?;
    let updated_at: String = row.get(28)?;
    Ok(Contact {
        id: ContactId::from(row.get::<_, String>(0)?),
        tenant: TenantId::from(row.get::<_, String>(1)?),
        phone_number: row.get(2)?,
        name: row.get(3)?,
        company: row.get(4)?,
        email: row.get(5)?,
        position: row.get(6)?,
        lead_status: LeadStatus::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
        journey_stage: JourneyStage::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
        engagement_level: EngagementLevel::from_str(&row.get::<_, String>(9)?).unwrap_or_default(),
        information_preference: InformationPreference::from_str(&row.get::<_, String>(10)?).unwrap_or_default(),
        response_time_pattern: ResponseTimePattern::from_str(&row.get::<_, String>(11)?).unwrap_or_default(),
        decision_making_style: DecisionMakingStyle::from_str(&row.get::<_, String>(12)?).unwrap_or_default(),
        technical_level: TechnicalLevel::from_str(&row.get::<_, String>(13)?).unwrap_or_default(),
        decision_maker: row.get(14)?,
        budget_range: row.get(15)?,
        timeline: row.get(16)?,
        industry_focus: row.get(17)?,
        company_size: row.get(18)?,
        prefer_as_example: row.get(19)?,
        topics_discussed: json_to_set(&row.get::<_, String>(20)?),
        questions_asked: json_to_vec(&row.get::<_, String>(21)?),
        pain_points_mentioned: json_to_set(&row.get::<_, String>(22)?),
        goals_expressed: json_to_set(&row.get::<_, String>(23)?),
        competitors_mentioned: json_to_set(&row.get::<_, String>(24)?),
        conversation_count: row.get(25)?,
        total_interactions: row.get(26)?,
        first_contact_at: first_contact_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn insert_conversation(db: &Connection, c: &Conversation) -> Result<(), ContextError> {
    db.execute(
        "INSERT INTO conversations (
            id, tenant_id, contact_id, bot_enabled, handover_requested, handover_timestamp,
            handover_updates_sent, handover_resolved_at, handover_resolution_reason, last_message_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            c.id.as_str(),
            c.tenant.as_str(),
            c.contact.as_str(),
            c.bot_enabled,
            c.handover_requested,
            c.handover_timestamp.map(|t| t.to_rfc3339()),
            map_to_json(&c.handover_updates_sent),
            c.handover_resolved_at.map(|t| t.to_rfc3339()),
            c.handover_resolution_reason,
            c.last_message_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn update_conversation(db: &Connection, c: &Conversation) -> Result<(), ContextError> {
    db.execute(
        "UPDATE conversations SET
            bot_enabled=?1, handover_requested=?2, handover_timestamp=?3,
            handover_updates_sent=?4, handover_resolved_at=?5, handover_resolution_reason=?6,
            last_message_at=?7
         WHERE id=?8",
        params![
            c.bot_enabled,
            c.handover_requested,
            c.handover_timestamp.map(|t| t.to_rfc3339()),
            map_to_json(&c.handover_updates_sent),
            c.handover_resolved_at.map(|t| t.to_rfc3339()),
            c.handover_resolution_reason,
            c.last_message_at.to_rfc3339(),
            c.id.as_str(),
        ],
    )?;
    Ok(())
}

fn query_conversation(db: &Connection, tenant: &TenantId, contact: &ContactId) -> Result<Option<Conversation>, ContextError> {
    db.query_row(
        "SELECT id, tenant_id, contact_id, bot_enabled, handover_requested, handover_timestamp,
                handover_updates_sent, handover_resolved_at, handover_resolution_reason, last_message_at
         FROM conversations WHERE tenant_id = ?1 AND contact_id = ?2",
        params![tenant.as_str(), contact.as_str()],
        row_to_conversation,
    )
    .optional()
    .map_err(ContextError::from)
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let handover_timestamp: Option<String> = row.get(5)?;
    let handover_resolved_at: Option<String> = row.get(7)?;
    let last_message_at: String = row.get(9)?;
    Ok(Conversation {
        id: ConversationId::from(row.get::<_, String>(0)?),
        tenant: TenantId::from(row.get::<_, String>(1)?),
        contact: ContactId::from(row.get::<_, String>(2)?),
        bot_enabled: row.get(3)?,
        handover_requested: row.get(4)?,
        handover_timestamp: handover_timestamp.and_then(|s| s.parse().ok()),
        handover_updates_sent: json_to_map(&row.get::<_, String>(6)?),
        handover_resolved_at: handover_resolved_at.and_then(|s| s.parse().ok()),
        handover_resolution_reason: row.get(8)?,
        last_message_at: last_message_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn query_conversations_pending_rescue(db: &Connection) -> Result<Vec<Conversation>, ContextError> {
    let mut stmt = db.prepare(
        "SELECT id, tenant_id, contact_id, bot_enabled, handover_requested, handover_timestamp,
                handover_updates_sent, handover_resolved_at, handover_resolution_reason, last_message_at
         FROM conversations WHERE handover_requested = 1 AND handover_resolved_at IS NULL",
    )?;
    let rows = stmt.query_map([], row_to_conversation)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn query_contact_by_id(db: &Connection, contact: &ContactId) -> Result<Option<Contact>, ContextError> {
    db.query_row(
        "SELECT id, tenant_id, phone_number, name, company, email, position, lead_status, journey_stage,
                engagement_level, information_preference, response_time_pattern, decision_making_style,
                technical_level, decision_maker, budget_range, timeline, industry_focus, company_size,
                prefer_as_example, topics_discussed, questions_asked, pain_points_mentioned,
                goals_expressed, competitors_mentioned, conversation_count, total_interactions,
                first_contact_at, updated_at
         FROM contacts WHERE id = ?1",
        params![contact.as_str()],
        row_to_contact,
    )
    .optional()
    .map_err(ContextError::from)
}

fn upsert_conversation_state(db: &Connection, s: &ConversationState) -> Result<(), ContextError> {
    db.execute(
        "INSERT INTO conversation_states (conversation_id, current_topic, unresolved_questions, action_items, updated_at)
         VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(conversation_id) DO UPDATE SET
            current_topic=excluded.current_topic,
            unresolved_questions=excluded.unresolved_questions,
            action_items=excluded.action_items,
            updated_at=excluded.updated_at",
        params![
            s.conversation.as_str(),
            s.current_topic,
            vec_to_json(&s.unresolved_questions),
            vec_to_json(&s.action_items),
            s.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn query_conversation_state(db: &Connection, conversation: &ConversationId) -> Result<Option<ConversationState>, ContextError> {
    db.query_row(
        "SELECT conversation_id, current_topic, unresolved_questions, action_items, updated_at
         FROM conversation_states WHERE conversation_id = ?1",
        params![conversation.as_str()],
        |row| {
            let updated_at: String = row.get(4)?;
            Ok(ConversationState {
                conversation: ConversationId::from(row.get::<_, String>(0)?),
                current_topic: row.get(1)?,
                unresolved_questions: json_to_vec(&row.get::<_, String>(2)?),
                action_items: json_to_vec(&row.get::<_, String>(3)?),
                updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
            })
        },
    )
    .optional()
    .map_err(ContextError::from)
}

fn insert_message_row(db: &Connection, m: &Message) -> Result<(), ContextError> {
    db.execute(
        "INSERT INTO messages (
            id, conversation_id, role, content, channel_message_id, status,
            created_at, status_updated_at, error_reason
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            m.id.as_str(),
            m.conversation.as_str(),
            m.role.to_string(),
            m.content,
            m.channel_message_id,
            m.status.to_string(),
            m.created_at.to_rfc3339(),
            m.status_updated_at.to_rfc3339(),
            m.error_reason,
        ],
    )?;
    Ok(())
}

fn update_message_status_row(
    db: &Connection,
    channel_message_id: &str,
    status: MessageStatus,
    error_reason: Option<String>,
) -> Result<(), ContextError> {
    db.execute(
        "UPDATE messages SET status=?1, status_updated_at=?2, error_reason=?3 WHERE channel_message_id=?4",
        params![
            status.to_string(),
            Utc::now().to_rfc3339(),
            error_reason,
            channel_message_id,
        ],
    )?;
    Ok(())
}

fn query_message_status(db: &Connection, channel_message_id: &str) -> Result<Option<MessageStatus>, ContextError> {
    let raw: Option<String> = db
        .query_row(
            "SELECT status FROM messages WHERE channel_message_id = ?1",
            params![channel_message_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(ContextError::from)?;
    Ok(raw.and_then(|s| MessageStatus::from_str(&s).ok()))
}

fn query_recent_messages(db: &Connection, conversation: &ConversationId, limit: usize) -> Result<Vec<Message>, ContextError> {
    let mut stmt = db.prepare(
        "SELECT id, conversation_id, role, content, channel_message_id, status,
                created_at, status_updated_at, error_reason
         FROM messages WHERE conversation_id = ?1
         ORDER BY created_at DESC LIMIT ?2",
    )?;
    let mut rows: Vec<Message> = stmt
        .query_map(params![conversation.as_str(), limit as i64], row_to_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.reverse();
    Ok(rows)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let status_updated_at: String = row.get(7)?;
    Ok(Message {
        id: conversa_core::ids::MessageId::from(row.get::<_, String>(0)?),
        conversation: ConversationId::from(row.get::<_, String>(1)?),
        role: MessageRole::from_str(&role).unwrap_or(MessageRole::User),
        content: row.get(3)?,
        channel_message_id: row.get(4)?,
        status: MessageStatus::from_str(&status).unwrap_or(MessageStatus::Queued),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        status_updated_at: status_updated_at.parse().unwrap_or_else(|_| Utc::now()),
        error_reason: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ContextRepository {
        ContextRepository::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn get_or_create_contact_is_idempotent() {
        let repo = repo();
        let tenant = TenantId::new();
        let a = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let b = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn advance_journey_persists_forward_transition() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let advanced = repo.advance_journey(&contact, "what's the pricing?").unwrap();
        assert_eq!(advanced.journey_stage, JourneyStage::Interest);

        let reloaded = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        assert_eq!(reloaded.journey_stage, JourneyStage::Interest);
    }

    #[test]
    fn merge_signals_unions_rather_than_replaces() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();

        let first = repo
            .merge_signals(
                &contact,
                BTreeSet::from(["pricing".to_string()]),
                vec![],
                BTreeSet::new(),
                BTreeSet::new(),
                BTreeSet::new(),
            )
            .unwrap();
        let second = repo
            .merge_signals(
                &first,
                BTreeSet::from(["integrations".to_string()]),
                vec![],
                BTreeSet::new(),
                BTreeSet::new(),
                BTreeSet::new(),
            )
            .unwrap();

        assert!(second.topics_discussed.contains("pricing"));
        assert!(second.topics_discussed.contains("integrations"));
        assert_eq!(second.total_interactions, 2);
    }

    #[test]
    fn conversation_state_round_trips() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let conversation = repo.get_or_create_conversation(&tenant, &contact.id).unwrap();

        let mut state = repo.conversation_scratchpad(&conversation.id).unwrap();
        assert!(state.current_topic.is_none());

        state.current_topic = Some("pricing".to_string());
        state.unresolved_questions.push("what's the enterprise tier cost?".to_string());
        repo.save_conversation_state(&state).unwrap();

        let reloaded = repo.conversation_scratchpad(&conversation.id).unwrap();
        assert_eq!(reloaded.current_topic.as_deref(), Some("pricing"));
        assert_eq!(reloaded.unresolved_questions.len(), 1);
    }

    #[test]
    fn get_or_create_conversation_defaults_bot_enabled() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let conversation = repo.get_or_create_conversation(&tenant, &contact.id).unwrap();
        assert!(conversation.bot_enabled);
        assert!(!conversation.handover_requested);
    }

    fn new_message(conversation: &ConversationId, channel_message_id: Option<&str>) -> Message {
        let now = Utc::now();
        Message {
            id: conversa_core::ids::MessageId::new(),
            conversation: conversation.clone(),
            role: MessageRole::User,
            content: "hello there".to_string(),
            channel_message_id: channel_message_id.map(str::to_string),
            status: MessageStatus::Delivered,
            created_at: now,
            status_updated_at: now,
            error_reason: None,
        }
    }

    #[test]
    fn duplicate_channel_message_id_is_reported() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let conversation = repo.get_or_create_conversation(&tenant, &contact.id).unwrap();

        let message = new_message(&conversation.id, Some("wamid.123"));
        repo.insert_message(&message).unwrap();

        let duplicate = new_message(&conversation.id, Some("wamid.123"));
        assert!(matches!(repo.insert_message(&duplicate), Err(ContextError::DuplicateMessage)));
    }

    #[test]
    fn messages_without_channel_id_never_collide() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let conversation = repo.get_or_create_conversation(&tenant, &contact.id).unwrap();

        repo.insert_message(&new_message(&conversation.id, None)).unwrap();
        repo.insert_message(&new_message(&conversation.id, None)).unwrap();

        let history = repo.recent_messages(&conversation.id, 10).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn message_status_advances_but_never_regresses() {
        let repo = repo();
        let tenant = TenantId::new();
        let contact = repo.get_or_create_contact(&tenant, "15551234567").unwrap();
        let conversation = repo.get_or_create_conversation(&tenant, &contact.id).unwrap();

        let mut message = new_message(&conversation.id, Some("wamid.456"));
        message.status = MessageStatus::Sent;
        repo.insert_message(&message).unwrap();

        repo.update_message_status("wamid.456", MessageStatus::Delivered, None).unwrap();
        let history = repo.recent_messages(&conversation.id, 10).unwrap();
        assert_eq!(history[0].status, MessageStatus::Delivered);

        repo.update_message_status("wamid.456", MessageStatus::Sent, None).unwrap();
        let history = repo.recent_messages(&conversation.id, 10).unwrap();
        assert_eq!(history[0].status, MessageStatus::Delivered);
    }

    #[test]
    fn active_api_key_returns_none_when_unprovisioned() {
        let repo = repo();
        let tenant = TenantId::new();
        assert!(repo.active_api_key(&tenant, ApiKeyKind::Llm).unwrap().is_none());
    }

    #[test]
    fn active_api_key_ignores_deactivated_rows() {
        let repo = repo();
        let tenant = TenantId::new();
        let mut key = ApiKey {
            id: "key-1".to_string(),
            tenant: tenant.clone(),
            kind: ApiKeyKind::Channel,
            name: "primary".to_string(),
            encrypted_secret: "ciphertext".to_string(),
            active: true,
            last_used_at: None,
        };
        repo.insert_api_key(&key).unwrap();
        let found = repo.active_api_key(&tenant, ApiKeyKind::Channel).unwrap().unwrap();
        assert_eq!(found.id, "key-1");

        key.id = "key-2".to_string();
        key.active = false;
        repo.insert_api_key(&key).unwrap();
        let still_found = repo.active_api_key(&tenant, ApiKeyKind::Channel).unwrap().unwrap();
        assert_eq!(still_found.id, "key-1");
    }

    #[test]
    fn webhook_event_audit_round_trips_status() {
        let repo = repo();
        let tenant = TenantId::new();
        let event = WebhookEvent::received(tenant, "messages.upsert", "{}");
        repo.insert_webhook_event(&event).unwrap();
        repo.mark_webhook_event_status(&event.id, WebhookEventStatus::Processed).unwrap();
    }
}
