use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    create_sessions_table(conn)?;
    create_message_analytics_table(conn)?;
    create_lead_scores_table(conn)?;
    create_performance_samples_table(conn)?;
    create_daily_aggregates_table(conn)
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_sessions (
            session_id          TEXT PRIMARY KEY,
            contact_id          TEXT NOT NULL,
            started_at          TEXT NOT NULL,
            last_activity_at    TEXT NOT NULL,
            journey_start       TEXT NOT NULL,
            journey_end         TEXT NOT NULL,
            message_count       INTEGER NOT NULL DEFAULT 0,
            lead_score          REAL,
            engagement_score    REAL,
            flags               TEXT NOT NULL DEFAULT '[]'
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_sessions_contact ON conversation_sessions(contact_id, last_activity_at);",
    )
}

fn create_message_analytics_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS message_analytics (
            message_id              TEXT PRIMARY KEY,
            role                    TEXT NOT NULL,
            length                  INTEGER NOT NULL,
            handler_kind            TEXT NOT NULL,
            rag_docs                INTEGER NOT NULL DEFAULT 0,
            rag_latency_ms          INTEGER,
            personalization_level   TEXT,
            response_strategy       TEXT,
            communication_style     TEXT,
            intents                 TEXT NOT NULL DEFAULT '[]',
            business_category       TEXT,
            urgency                 TEXT,
            latency_ms              INTEGER NOT NULL,
            tokens_in               INTEGER NOT NULL DEFAULT 0,
            tokens_out              INTEGER NOT NULL DEFAULT 0,
            cost_estimate           REAL NOT NULL DEFAULT 0.0,
            created_at              TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_message_analytics_created ON message_analytics(created_at);",
    )
}

fn create_lead_scores_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lead_scores (
            contact_id          TEXT PRIMARY KEY,
            overall              REAL NOT NULL,
            engagement           REAL NOT NULL,
            intent                REAL NOT NULL,
            fit                   REAL NOT NULL,
            timing                REAL NOT NULL,
            behavior_snapshot     TEXT NOT NULL,
            calculated_at         TEXT NOT NULL
        ) STRICT;",
    )
}

fn create_performance_samples_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS performance_samples (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint        TEXT NOT NULL,
            op              TEXT NOT NULL,
            latency_ms      INTEGER NOT NULL,
            status          TEXT NOT NULL,
            model           TEXT,
            tokens          INTEGER,
            cost            REAL,
            error_reason    TEXT,
            created_at      TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_performance_samples_created ON performance_samples(created_at);",
    )
}

fn create_daily_aggregates_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS daily_aggregates (
            date                    TEXT PRIMARY KEY,
            total_messages          INTEGER NOT NULL,
            total_sessions          INTEGER NOT NULL,
            conversion_rate         REAL NOT NULL,
            journey_distribution    TEXT NOT NULL,
            ai_handled              INTEGER NOT NULL,
            human_handled           INTEGER NOT NULL
        ) STRICT;",
    )
}
