use rusqlite::{Connection, Result};

/// Initialize knowledge tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_knowledge_table(conn)?;
    create_fts_index(conn)
}

fn create_knowledge_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS knowledge_entries (
            id          TEXT PRIMARY KEY,
            tenant_id   TEXT NOT NULL,
            topic       TEXT NOT NULL,
            content     TEXT NOT NULL,
            category    TEXT NOT NULL,
            source      TEXT NOT NULL,
            embedding   BLOB NOT NULL,
            word_count  INTEGER NOT NULL DEFAULT 0,
            filename    TEXT,
            modified_at TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_knowledge_tenant
            ON knowledge_entries(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_knowledge_category
            ON knowledge_entries(tenant_id, category);",
    )
}

/// FTS5 index over topic/content, used as a fallback when no embedding
/// provider is configured and for the `source` tiebreak in ranked search.
fn create_fts_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS knowledge_fts
            USING fts5(topic, content, content='knowledge_entries', content_rowid='rowid');",
    )
}

/// Pack a float vector into a little-endian byte blob for storage.
pub fn encode_embedding(vec: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Inverse of [`encode_embedding`].
pub fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_round_trips() {
        let original = vec![0.1_f32, -0.5, 3.25, 0.0];
        let encoded = encode_embedding(&original);
        let decoded = decode_embedding(&encoded);
        assert_eq!(original, decoded);
    }
}
