use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    create_campaigns_table(conn)?;
    create_campaign_results_table(conn)
}

fn create_campaigns_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS campaigns (
            id                TEXT PRIMARY KEY,
            tenant_id         TEXT NOT NULL,
            message_content   TEXT NOT NULL,
            recipients        TEXT NOT NULL DEFAULT '[]',
            status            TEXT NOT NULL DEFAULT 'pending',
            total_sent        INTEGER NOT NULL DEFAULT 0,
            total_failed      INTEGER NOT NULL DEFAULT 0,
            total_skipped     INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL,
            started_at        TEXT,
            finished_at       TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_campaigns_tenant ON campaigns(tenant_id);",
    )
}

fn create_campaign_results_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS campaign_results (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id  TEXT NOT NULL,
            target       TEXT NOT NULL,
            outcome      TEXT NOT NULL,
            reason       TEXT,
            created_at   TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_campaign_results_parent ON campaign_results(campaign_id);",
    )
}
