use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::types::{AnalyticsEvent, ConversationSession, DailyAggregate, LeadScore, MessageAnalytics, PerformanceSample};

/// Durable store for drained analytics events and the materialized daily
/// aggregate.
pub struct AnalyticsRepository {
    db: Mutex<Connection>,
}

impl AnalyticsRepository {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn persist_batch(&self, events: Vec<AnalyticsEvent>) -> Result<()> {
        let db = self.db.lock().unwrap();
        for event in events {
            match event {
                AnalyticsEvent::Session(s) => insert_session(&db, &s)?,
                AnalyticsEvent::Message(m) => insert_message_analytics(&db, &m)?,
                AnalyticsEvent::Lead(l) => upsert_lead_score(&db, &l)?,
                AnalyticsEvent::Performance(p) => insert_performance_sample(&db, &p)?,
            }
        }
        Ok(())
    }

    /// Materializes one day's aggregate. Safe to re-run for the same date —
    /// the upsert replaces any prior row rather than double-counting.
    pub fn aggregate_day(&self, date: NaiveDate) -> Result<DailyAggregate> {
        let db = self.db.lock().unwrap();
        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc().to_rfc3339();
        let day_end = (date + chrono::Duration::days(1)).and_hms_opt(0, 0, 0).unwrap().and_utc().to_rfc3339();

        let total_messages: u32 = db.query_row(
            "SELECT COUNT(*) FROM message_analytics WHERE created_at >= ?1 AND created_at < ?2",
            params![day_start, day_end],
            |row| row.get(0),
        )?;
        let ai_handled: u32 = db.query_row(
            "SELECT COUNT(*) FROM message_analytics WHERE created_at >= ?1 AND created_at < ?2 AND handler_kind = 'ai'",
            params![day_start, day_end],
            |row| row.get(0),
        )?;
        let human_handled: u32 = db.query_row(
            "SELECT COUNT(*) FROM message_analytics WHERE created_at >= ?1 AND created_at < ?2 AND handler_kind = 'human'",
            params![day_start, day_end],
            |row| row.get(0),
        )?;
        let total_sessions: u32 = db.query_row(
            "SELECT COUNT(*) FROM conversation_sessions WHERE started_at >= ?1 AND started_at < ?2",
            params![day_start, day_end],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(
            "SELECT journey_end, COUNT(*) FROM conversation_sessions
             WHERE started_at >= ?1 AND started_at < ?2 GROUP BY journey_end",
        )?;
        let journey_distribution: Vec<(String, u32)> = stmt
            .query_map(params![day_start, day_end], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        let closed: u32 = journey_distribution.iter().find(|(stage, _)| stage == "decision").map(|(_, n)| *n).unwrap_or(0);
        let conversion_rate = if total_sessions > 0 { closed as f64 / total_sessions as f64 } else { 0.0 };

        let aggregate = DailyAggregate {
            date: date.to_string(),
            total_messages,
            total_sessions,
            conversion_rate,
            journey_distribution,
            ai_handled,
            human_handled,
        };

        db.execute(
            "INSERT INTO daily_aggregates (date, total_messages, total_sessions, conversion_rate, journey_distribution, ai_handled, human_handled)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(date) DO UPDATE SET
                total_messages=excluded.total_messages,
                total_sessions=excluded.total_sessions,
                conversion_rate=excluded.conversion_rate,
                journey_distribution=excluded.journey_distribution,
                ai_handled=excluded.ai_handled,
                human_handled=excluded.human_handled",
            params![
                aggregate.date,
                aggregate.total_messages,
                aggregate.total_sessions,
                aggregate.conversion_rate,
                serde_json::to_string(&aggregate.journey_distribution).unwrap_or_else(|_| "[]".to_string()),
                aggregate.ai_handled,
                aggregate.human_handled,
            ],
        )?;

        Ok(aggregate)
    }
}

fn insert_session(db: &Connection, s: &ConversationSession) -> Result<()> {
    db.execute(
        "INSERT INTO conversation_sessions (
            session_id, contact_id, started_at, last_activity_at, journey_start, journey_end,
            message_count, lead_score, engagement_score, flags
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
         ON CONFLICT(session_id) DO UPDATE SET
            last_activity_at=excluded.last_activity_at,
            journey_end=excluded.journey_end,
            message_count=excluded.message_count,
            lead_score=excluded.lead_score,
            engagement_score=excluded.engagement_score,
            flags=excluded.flags",
        params![
            s.session_id,
            s.contact.as_str(),
            s.started_at.to_rfc3339(),
            s.last_activity_at.to_rfc3339(),
            s.journey_start.to_string(),
            s.journey_end.to_string(),
            s.message_count,
            s.lead_score,
            s.engagement_score,
            serde_json::to_string(&s.flags).unwrap_or_else(|_| "[]".to_string()),
        ],
    )?;
    Ok(())
}

fn insert_message_analytics(db: &Connection, m: &MessageAnalytics) -> Result<()> {
    db.execute(
        "INSERT INTO message_analytics (
            message_id, role, length, handler_kind, rag_docs, rag_latency_ms, personalization_level,
            response_strategy, communication_style, intents, business_category, urgency,
            latency_ms, tokens_in, tokens_out, cost_estimate, created_at
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
         ON CONFLICT(message_id) DO NOTHING",
        params![
            m.message_id.as_str(),
            m.role.to_string(),
            m.length,
            m.handler_kind,
            m.rag_docs,
            m.rag_latency_ms,
            m.personalization_level,
            m.response_strategy,
            m.communication_style,
            serde_json::to_string(&m.intents).unwrap_or_else(|_| "[]".to_string()),
            m.business_category,
            m.urgency,
            m.latency_ms,
            m.tokens_in,
            m.tokens_out,
            m.cost_estimate,
            m.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn upsert_lead_score(db: &Connection, l: &LeadScore) -> Result<()> {
    db.execute(
        "INSERT INTO lead_scores (contact_id, overall, engagement, intent, fit, timing, behavior_snapshot, calculated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(contact_id) DO UPDATE SET
            overall=excluded.overall,
            engagement=excluded.engagement,
            intent=excluded.intent,
            fit=excluded.fit,
            timing=excluded.timing,
            behavior_snapshot=excluded.behavior_snapshot,
            calculated_at=excluded.calculated_at",
        params![
            l.contact.as_str(),
            l.overall,
            l.engagement,
            l.intent,
            l.fit,
            l.timing,
            l.behavior_snapshot,
            l.calculated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_performance_sample(db: &Connection, p: &PerformanceSample) -> Result<()> {
    db.execute(
        "INSERT INTO performance_samples (endpoint, op, latency_ms, status, model, tokens, cost, error_reason, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![p.endpoint, p.op, p.latency_ms, p.status, p.model, p.tokens, p.cost, p.error_reason, p.created_at.to_rfc3339()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use conversa_core::domain::JourneyStage;
    use conversa_core::ids::ContactId;

    fn repo() -> AnalyticsRepository {
        AnalyticsRepository::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn aggregate_day_is_idempotent() {
        let repo = repo();
        let now = Utc::now();
        repo.persist_batch(vec![AnalyticsEvent::Session(ConversationSession {
            session_id: "s1".to_string(),
            contact: ContactId::new(),
            started_at: now,
            last_activity_at: now,
            journey_start: JourneyStage::Discovery,
            journey_end: JourneyStage::Decision,
            message_count: 4,
            lead_score: Some(0.8),
            engagement_score: Some(0.6),
            flags: vec![],
        })])
        .unwrap();

        let today = now.date_naive();
        let first = repo.aggregate_day(today).unwrap();
        let second = repo.aggregate_day(today).unwrap();
        assert_eq!(first.total_sessions, second.total_sessions);
        assert_eq!(first.conversion_rate, 1.0);
    }
}
