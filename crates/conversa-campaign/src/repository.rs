use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use conversa_core::ids::TenantId;

use crate::error::{CampaignError, Result};
use crate::types::{Campaign, CampaignStatus, MessageResult, TargetOutcome};

/// Persists bulk-send campaigns and their per-target results.
pub struct CampaignRepository {
    db: Mutex<Connection>,
}

impl CampaignRepository {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn insert(&self, campaign: &Campaign) -> Result<()> {
        let db = self.db.lock().unwrap();
        insert_campaign(&db, campaign)
    }

    pub fn get(&self, id: &str) -> Result<Campaign> {
        let db = self.db.lock().unwrap();
        query_campaign(&db, id)?.ok_or_else(|| CampaignError::NotFound(id.to_string()))
    }

    pub fn set_status(&self, id: &str, status: CampaignStatus, now: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().unwrap();
        match status {
            CampaignStatus::Running => db.execute(
                "UPDATE campaigns SET status = ?1, started_at = ?2 WHERE id = ?3",
                params![status.to_string(), now.to_rfc3339(), id],
            )?,
            CampaignStatus::Completed | CampaignStatus::Partial | CampaignStatus::Failed | CampaignStatus::Cancelled => db.execute(
                "UPDATE campaigns SET status = ?1, finished_at = ?2 WHERE id = ?3",
                params![status.to_string(), now.to_rfc3339(), id],
            )?,
            CampaignStatus::Pending => db.execute("UPDATE campaigns SET status = ?1 WHERE id = ?2", params![status.to_string(), id])?,
        };
        Ok(())
    }

    /// Marks a running campaign cancelled. Refuses once it's already
    /// terminal — the in-flight send loop checks this flag between targets.
    pub fn request_cancel(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE campaigns SET status = ?1 WHERE id = ?2 AND status IN ('pending', 'running')",
            params![CampaignStatus::Cancelled.to_string(), id],
        )?;
        if n == 0 {
            return Err(CampaignError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn is_cancelled(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let status: String = db.query_row("SELECT status FROM campaigns WHERE id = ?1", params![id], |row| row.get(0))?;
        Ok(status == CampaignStatus::Cancelled.to_string())
    }

    pub fn record_result(&self, result: &MessageResult) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO campaign_results (campaign_id, target, outcome, reason, created_at) VALUES (?1,?2,?3,?4,?5)",
            params![
                result.campaign_id,
                result.target,
                outcome_str(result.outcome),
                result.reason,
                result.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn bump_counters(&self, id: &str, sent: u32, failed: u32, skipped: u32) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE campaigns SET total_sent = total_sent + ?1, total_failed = total_failed + ?2,
             total_skipped = total_skipped + ?3 WHERE id = ?4",
            params![sent, failed, skipped, id],
        )?;
        Ok(())
    }
}

fn outcome_str(outcome: TargetOutcome) -> &'static str {
    match outcome {
        TargetOutcome::Sent => "sent",
        TargetOutcome::Failed => "failed",
        TargetOutcome::Skipped => "skipped",
    }
}

fn insert_campaign(db: &Connection, c: &Campaign) -> Result<()> {
    db.execute(
        "INSERT INTO campaigns (
            id, tenant_id, message_content, recipients, status,
            total_sent, total_failed, total_skipped, created_at, started_at, finished_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            c.id,
            c.tenant.as_str(),
            c.message_content,
            serde_json::to_string(&c.recipients).unwrap_or_else(|_| "[]".to_string()),
            c.status.to_string(),
            c.total_sent,
            c.total_failed,
            c.total_skipped,
            c.created_at.to_rfc3339(),
            c.started_at.map(|t| t.to_rfc3339()),
            c.finished_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn query_campaign(db: &Connection, id: &str) -> Result<Option<Campaign>> {
    db.query_row(
        "SELECT id, tenant_id, message_content, recipients, status,
                total_sent, total_failed, total_skipped, created_at, started_at, finished_at
         FROM campaigns WHERE id = ?1",
        params![id],
        row_to_campaign,
    )
    .optional()
    .map_err(CampaignError::from)
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let recipients: String = row.get(3)?;
    let created_at: String = row.get(8)?;
    let started_at: Option<String> = row.get(9)?;
    let finished_at: Option<String> = row.get(10)?;
    Ok(Campaign {
        id: row.get(0)?,
        tenant: TenantId::from(row.get::<_, String>(1)?),
        message_content: row.get(2)?,
        recipients: serde_json::from_str(&recipients).unwrap_or_default(),
        status: CampaignStatus::from_str(&row.get::<_, String>(4)?).unwrap_or(CampaignStatus::Pending),
        total_sent: row.get(5)?,
        total_failed: row.get(6)?,
        total_skipped: row.get(7)?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        started_at: started_at.and_then(|s| s.parse().ok()),
        finished_at: finished_at.and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> CampaignRepository {
        CampaignRepository::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn insert_and_fetch_round_trips() {
        let repo = repo();
        let campaign = Campaign::new(TenantId::new(), "hello all".to_string(), vec!["15551234567".to_string()]);
        repo.insert(&campaign).unwrap();
        let reloaded = repo.get(&campaign.id).unwrap();
        assert_eq!(reloaded.message_content, "hello all");
        assert_eq!(reloaded.status, CampaignStatus::Pending);
    }

    #[test]
    fn cancel_is_rejected_once_terminal() {
        let repo = repo();
        let campaign = Campaign::new(TenantId::new(), "hi".to_string(), vec![]);
        repo.insert(&campaign).unwrap();
        repo.set_status(&campaign.id, CampaignStatus::Completed, Utc::now()).unwrap();
        assert!(repo.request_cancel(&campaign.id).is_err());
    }
}
