use rusqlite::{Connection, Result};

/// Initialize contact/conversation tables. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_contacts_table(conn)?;
    create_conversations_table(conn)?;
    create_conversation_states_table(conn)?;
    create_messages_table(conn)?;
    create_api_keys_table(conn)?;
    create_webhook_events_table(conn)
}

fn create_contacts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS contacts (
            id                      TEXT PRIMARY KEY,
            tenant_id               TEXT NOT NULL,
            phone_number            TEXT NOT NULL,
            name                    TEXT,
            company                 TEXT,
            email                   TEXT,
            position                TEXT,
            lead_status             TEXT NOT NULL DEFAULT 'new',
            journey_stage           TEXT NOT NULL DEFAULT 'discovery',
            engagement_level        TEXT NOT NULL DEFAULT 'medium',
            information_preference  TEXT NOT NULL DEFAULT 'moderate',
            response_time_pattern   TEXT NOT NULL DEFAULT 'medium',
            decision_making_style   TEXT NOT NULL DEFAULT 'intuitive',
            technical_level         TEXT NOT NULL DEFAULT 'non_technical',
            decision_maker          INTEGER NOT NULL DEFAULT 0,
            budget_range            TEXT,
            timeline                TEXT,
            industry_focus          TEXT,
            company_size            TEXT,
            prefer_as_example       INTEGER NOT NULL DEFAULT 1,
            topics_discussed        TEXT NOT NULL DEFAULT '[]',
            questions_asked         TEXT NOT NULL DEFAULT '[]',
            pain_points_mentioned   TEXT NOT NULL DEFAULT '[]',
            goals_expressed         TEXT NOT NULL DEFAULT '[]',
            competitors_mentioned   TEXT NOT NULL DEFAULT '[]',
            conversation_count      INTEGER NOT NULL DEFAULT 0,
            total_interactions      INTEGER NOT NULL DEFAULT 0,
            first_contact_at        TEXT NOT NULL,
            updated_at               TEXT NOT NULL,
            UNIQUE(tenant_id, phone_number)
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_contacts_tenant ON contacts(tenant_id);",
    )
}

fn create_conversations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id                          TEXT PRIMARY KEY,
            tenant_id                   TEXT NOT NULL,
            contact_id                  TEXT NOT NULL,
            bot_enabled                 INTEGER NOT NULL DEFAULT 1,
            handover_requested          INTEGER NOT NULL DEFAULT 0,
            handover_timestamp          TEXT,
            handover_updates_sent       TEXT NOT NULL DEFAULT '{}',
            handover_resolved_at        TEXT,
            handover_resolution_reason  TEXT,
            last_message_at             TEXT NOT NULL,
            UNIQUE(tenant_id, contact_id)
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_conversations_tenant ON conversations(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_conversations_handover
            ON conversations(handover_requested, handover_timestamp)
            WHERE handover_requested = 1;",
    )
}

fn create_conversation_states_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_states (
            conversation_id         TEXT PRIMARY KEY,
            current_topic           TEXT,
            unresolved_questions    TEXT NOT NULL DEFAULT '[]',
            action_items            TEXT NOT NULL DEFAULT '[]',
            updated_at              TEXT NOT NULL
        ) STRICT;",
    )
}

fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id                   TEXT PRIMARY KEY,
            conversation_id      TEXT NOT NULL,
            role                 TEXT NOT NULL,
            content              TEXT NOT NULL,
            channel_message_id   TEXT,
            status               TEXT NOT NULL DEFAULT 'queued',
            created_at           TEXT NOT NULL,
            status_updated_at    TEXT NOT NULL,
            error_reason         TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_channel_message_id
            ON messages(channel_message_id) WHERE channel_message_id IS NOT NULL;",
    )
}

fn create_api_keys_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS api_keys (
            id                TEXT PRIMARY KEY,
            tenant_id         TEXT NOT NULL,
            kind              TEXT NOT NULL,
            name              TEXT NOT NULL,
            encrypted_secret  TEXT NOT NULL,
            active            INTEGER NOT NULL DEFAULT 1,
            last_used_at      TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_api_keys_tenant_kind ON api_keys(tenant_id, kind, active);",
    )
}

fn create_webhook_events_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS webhook_events (
            id                  TEXT PRIMARY KEY,
            tenant_id           TEXT NOT NULL,
            kind                TEXT NOT NULL,
            payload             TEXT NOT NULL,
            received_at         TEXT NOT NULL,
            processing_status   TEXT NOT NULL DEFAULT 'received'
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_webhook_events_tenant ON webhook_events(tenant_id, received_at);",
    )
}
