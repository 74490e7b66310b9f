use rusqlite::{Connection, Result};

/// Initialize scheduled-message tables. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_scheduled_messages_table(conn)?;
    create_message_results_table(conn)
}

fn create_scheduled_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_messages (
            id                   TEXT PRIMARY KEY,
            tenant_id            TEXT NOT NULL,
            message_content      TEXT NOT NULL,
            target_groups        TEXT NOT NULL DEFAULT '[]',
            scheduled_at         TEXT NOT NULL,
            status               TEXT NOT NULL DEFAULT 'pending',
            recurring_pattern    TEXT,
            recurring_interval   INTEGER,
            next_send_at         TEXT,
            last_sent_at         TEXT,
            total_sent           INTEGER NOT NULL DEFAULT 0,
            total_failed         INTEGER NOT NULL DEFAULT 0
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_scheduled_messages_due
            ON scheduled_messages(status, next_send_at);
        CREATE INDEX IF NOT EXISTS idx_scheduled_messages_tenant
            ON scheduled_messages(tenant_id);",
    )
}

fn create_message_results_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_message_results (
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            scheduled_message_id     TEXT NOT NULL,
            target                   TEXT NOT NULL,
            success                  INTEGER NOT NULL,
            error_reason             TEXT,
            created_at               TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_scheduled_message_results_parent
            ON scheduled_message_results(scheduled_message_id);",
    )
}
