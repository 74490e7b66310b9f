use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use conversa_core::ids::TenantId;

use crate::error::{Result, SchedulerError};
use crate::types::{MessageResult, RecurringPattern, ScheduledMessage, ScheduledMessageStatus};

/// Persists scheduled campaign messages and their per-target delivery
/// results, and advances recurrence on fired messages.
pub struct ScheduleRepository {
    db: Mutex<Connection>,
}

impl ScheduleRepository {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn insert(&self, message: &ScheduledMessage) -> Result<()> {
        let db = self.db.lock().unwrap();
        insert_scheduled_message(&db, message)
    }

    pub fn get(&self, id: &str) -> Result<ScheduledMessage> {
        let db = self.db.lock().unwrap();
        query_scheduled_message(&db, id)?.ok_or_else(|| SchedulerError::NotFound(id.to_string()))
    }

    pub fn cancel(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE scheduled_messages SET status = ?1 WHERE id = ?2 AND status IN ('pending', 'processing')",
            params![ScheduledMessageStatus::Cancelled.to_string(), id],
        )?;
        if n == 0 {
            return Err(SchedulerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Messages whose `next_send_at` (or initial `scheduled_at`) has arrived
    /// and that are still pending.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>> {
        let db = self.db.lock().unwrap();
        query_due(&db, now)
    }

    pub fn mark_processing(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE scheduled_messages SET status = ?1 WHERE id = ?2",
            params![ScheduledMessageStatus::Processing.to_string(), id],
        )?;
        Ok(())
    }

    pub fn record_result(&self, result: &MessageResult) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO scheduled_message_results
                (scheduled_message_id, target, success, error_reason, created_at)
             VALUES (?1,?2,?3,?4,?5)",
            params![
                result.scheduled_message_id,
                result.target,
                result.success,
                result.error_reason,
                result.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Finalize a fired message: tally sent/failed counts and either
    /// schedule the next recurrence or mark it done.
    pub fn finish_run(&self, id: &str, sent: u32, failed: u32, next_send_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().unwrap();
        let status = if next_send_at.is_some() { ScheduledMessageStatus::Pending } else { ScheduledMessageStatus::Sent };
        db.execute(
            "UPDATE scheduled_messages SET
                status = ?1, total_sent = total_sent + ?2, total_failed = total_failed + ?3,
                last_sent_at = ?4, next_send_at = ?5
             WHERE id = ?6",
            params![status.to_string(), sent, failed, now.to_rfc3339(), next_send_at.map(|t| t.to_rfc3339()), id],
        )?;
        Ok(())
    }
}

fn insert_scheduled_message(db: &Connection, m: &ScheduledMessage) -> Result<()> {
    db.execute(
        "INSERT INTO scheduled_messages (
            id, tenant_id, message_content, target_groups, scheduled_at, status,
            recurring_pattern, recurring_interval, next_send_at, last_sent_at,
            total_sent, total_failed
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        params![
            m.id,
            m.tenant.as_str(),
            m.message_content,
            serde_json::to_string(&m.target_groups).unwrap_or_else(|_| "[]".to_string()),
            m.scheduled_at.to_rfc3339(),
            m.status.to_string(),
            m.recurring_pattern.map(|p| p.to_string()),
            m.recurring_interval,
            m.next_send_at.map(|t| t.to_rfc3339()),
            m.last_sent_at.map(|t| t.to_rfc3339()),
            m.total_sent,
            m.total_failed,
        ],
    )?;
    Ok(())
}

fn query_due(db: &Connection, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>> {
    let mut stmt = db.prepare(
        "SELECT id, tenant_id, message_content, target_groups, scheduled_at, status,
                recurring_pattern, recurring_interval, next_send_at, last_sent_at,
                total_sent, total_failed
         FROM scheduled_messages
         WHERE status = 'pending'
           AND COALESCE(next_send_at, scheduled_at) <= ?1",
    )?;
    let rows = stmt.query_map(params![now.to_rfc3339()], row_to_scheduled_message)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn query_scheduled_message(db: &Connection, id: &str) -> Result<Option<ScheduledMessage>> {
    db.query_row(
        "SELECT id, tenant_id, message_content, target_groups, scheduled_at, status,
                recurring_pattern, recurring_interval, next_send_at, last_sent_at,
                total_sent, total_failed
         FROM scheduled_messages WHERE id = ?1",
        params![id],
        row_to_scheduled_message,
    )
    .optional()
    .map_err(SchedulerError::from)
}

fn row_to_scheduled_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledMessage> {
    let target_groups: String = row.get(3)?;
    let scheduled_at: String = row.get(4)?;
    let recurring_pattern: Option<String> = row.get(6)?;
    let next_send_at: Option<String> = row.get(8)?;
    let last_sent_at: Option<String> = row.get(9)?;
    Ok(ScheduledMessage {
        id: row.get(0)?,
        tenant: TenantId::from(row.get::<_, String>(1)?),
        message_content: row.get(2)?,
        target_groups: serde_json::from_str(&target_groups).unwrap_or_default(),
        scheduled_at: scheduled_at.parse().unwrap_or_else(|_| Utc::now()),
        status: ScheduledMessageStatus::from_str(&row.get::<_, String>(5)?).unwrap_or(ScheduledMessageStatus::Pending),
        recurring_pattern: recurring_pattern.and_then(|p| RecurringPattern::from_str(&p).ok()),
        recurring_interval: row.get(7)?,
        next_send_at: next_send_at.and_then(|s| s.parse().ok()),
        last_sent_at: last_sent_at.and_then(|s| s.parse().ok()),
        total_sent: row.get(10)?,
        total_failed: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn repo() -> ScheduleRepository {
        ScheduleRepository::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn message(id: &str, scheduled_at: DateTime<Utc>) -> ScheduledMessage {
        ScheduledMessage {
            id: id.to_string(),
            tenant: TenantId::new(),
            message_content: "hello campaign".to_string(),
            target_groups: vec!["group-1".to_string()],
            scheduled_at,
            status: ScheduledMessageStatus::Pending,
            recurring_pattern: None,
            recurring_interval: None,
            next_send_at: None,
            last_sent_at: None,
            total_sent: 0,
            total_failed: 0,
        }
    }

    #[test]
    fn due_returns_only_messages_whose_time_has_come() {
        let repo = repo();
        let now = Utc::now();
        repo.insert(&message("past", now - Duration::minutes(5))).unwrap();
        repo.insert(&message("future", now + Duration::minutes(5))).unwrap();

        let due = repo.due(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "past");
    }

    #[test]
    fn cancel_rejects_already_terminal_messages() {
        let repo = repo();
        let now = Utc::now();
        repo.insert(&message("m1", now)).unwrap();
        repo.finish_run("m1", 1, 0, None, now).unwrap();

        assert!(repo.cancel("m1").is_err());
    }

    #[test]
    fn finish_run_with_next_send_at_keeps_message_pending() {
        let repo = repo();
        let now = Utc::now();
        repo.insert(&message("m1", now)).unwrap();
        repo.finish_run("m1", 1, 0, Some(now + Duration::days(1)), now).unwrap();

        let reloaded = repo.get("m1").unwrap();
        assert_eq!(reloaded.status, ScheduledMessageStatus::Pending);
        assert_eq!(reloaded.total_sent, 1);
        assert!(reloaded.next_send_at.is_some());
    }
}
