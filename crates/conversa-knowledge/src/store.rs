use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use conversa_core::domain::LeadStatus;
use conversa_core::ids::TenantId;

use crate::db::{decode_embedding, encode_embedding};
use crate::error::KnowledgeError;
use crate::similarity::cosine_similarity;
use crate::types::{category, IngestRequest, KnowledgeEntry, KnowledgeStats, SearchResult};

/// Minimum cosine similarity for a knowledge entry to be considered relevant.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;
/// Additive score boost applied to sales-relevant categories when the
/// querying contact is a priority lead.
const PRIORITY_BOOST: f32 = 0.15;

pub struct KnowledgeStore {
    db: Mutex<Connection>,
    embedding_dimensions: usize,
}

impl KnowledgeStore {
    pub fn new(conn: Connection, embedding_dimensions: usize) -> Result<Self, KnowledgeError> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            embedding_dimensions,
        })
    }

    pub fn ingest(&self, tenant: &TenantId, req: IngestRequest) -> Result<KnowledgeEntry, KnowledgeError> {
        if req.embedding.len() != self.embedding_dimensions {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.embedding_dimensions,
                got: req.embedding.len(),
            });
        }

        let db = self.db.lock().unwrap();
        let now = Utc::now();
        let id = Uuid::now_v7().to_string();
        let embedding_blob = encode_embedding(&req.embedding);
        let word_count = req.content.split_whitespace().count() as u32;
        let modified_at = req.modified_at.map(|t| t.to_rfc3339());

        db.execute(
            "INSERT INTO knowledge_entries
             (id, tenant_id, topic, content, category, source, embedding, word_count, filename, modified_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                id,
                tenant.as_str(),
                req.topic,
                req.content,
                req.category,
                req.source,
                embedding_blob,
                word_count,
                req.filename,
                modified_at,
                now.to_rfc3339(),
            ],
        )?;
        db.execute(
            "INSERT INTO knowledge_fts(rowid, topic, content)
             SELECT rowid, topic, content FROM knowledge_entries WHERE id = ?1",
            params![id],
        )?;

        Ok(KnowledgeEntry {
            id,
            tenant: tenant.clone(),
            topic: req.topic,
            content: req.content,
            category: req.category,
            source: req.source,
            word_count,
            filename: req.filename,
            modified_at: req.modified_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Retrieve the top `limit` entries most relevant to `query_embedding`,
    /// restricted to `category_filter` when set and boosted toward
    /// services/pricing/sales content when `lead_status` is a priority
    /// status. Entries below [`SIMILARITY_THRESHOLD`] are excluded.
    ///
    /// Ordering: score desc, then `updated_at` desc, then `source` as a
    /// final deterministic tiebreak.
    pub fn search(
        &self,
        tenant: &TenantId,
        query_embedding: &[f32],
        category_filter: Option<&str>,
        lead_status: Option<LeadStatus>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, tenant_id, topic, content, category, source, embedding,
                    word_count, filename, modified_at, created_at, updated_at
             FROM knowledge_entries
             WHERE tenant_id = ?1
               AND (?2 IS NULL OR category = ?2)",
        )?;

        let rows = stmt.query_map(params![tenant.as_str(), category_filter], row_to_entry)?;

        let is_priority_lead = lead_status.map(|s| s.is_priority()).unwrap_or(false);
        let mut scored: Vec<SearchResult> = Vec::new();

        for row in rows {
            let (entry, embedding_blob) = row?;
            let embedding = decode_embedding(&embedding_blob);
            let mut score = cosine_similarity(query_embedding, &embedding);

            if is_priority_lead
                && matches!(
                    entry.category.as_str(),
                    category::SERVICES | category::PRICING | category::SALES
                )
            {
                score += PRIORITY_BOOST;
            }

            if score >= SIMILARITY_THRESHOLD {
                scored.push(SearchResult { entry, score });
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.entry.updated_at.cmp(&a.entry.updated_at))
                .then_with(|| a.entry.source.cmp(&b.entry.source))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    pub fn stats(&self, tenant: &TenantId) -> Result<KnowledgeStats, KnowledgeError> {
        let db = self.db.lock().unwrap();
        let total_entries: u64 = db.query_row(
            "SELECT COUNT(*) FROM knowledge_entries WHERE tenant_id = ?1",
            params![tenant.as_str()],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(
            "SELECT category, COUNT(*) FROM knowledge_entries
             WHERE tenant_id = ?1 GROUP BY category ORDER BY category",
        )?;
        let categories = stmt
            .query_map(params![tenant.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(KnowledgeStats {
            total_entries,
            categories,
        })
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(KnowledgeEntry, Vec<u8>)> {
    let modified_at: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    let entry = KnowledgeEntry {
        id: row.get(0)?,
        tenant: TenantId::from(row.get::<_, String>(1)?),
        topic: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        source: row.get(5)?,
        word_count: row.get(7)?,
        filename: row.get(8)?,
        modified_at: modified_at.and_then(|t| t.parse().ok()),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    };
    Ok((entry, row.get(6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KnowledgeStore {
        KnowledgeStore::new(Connection::open_in_memory().unwrap(), 3).unwrap()
    }

    fn ingest(store: &KnowledgeStore, tenant: &TenantId, topic: &str, category: &str, embedding: Vec<f32>) {
        store
            .ingest(
                tenant,
                IngestRequest {
                    topic: topic.to_string(),
                    content: format!("content for {topic}"),
                    category: category.to_string(),
                    source: "manual".to_string(),
                    embedding,
                    filename: None,
                    modified_at: None,
                },
            )
            .unwrap();
    }

    #[test]
    fn ingest_computes_word_count_and_keeps_file_metadata() {
        let store = store();
        let tenant = TenantId::new();
        let modified_at = Utc::now();

        let entry = store
            .ingest(
                &tenant,
                IngestRequest {
                    topic: "onboarding guide".to_string(),
                    content: "four simple words here".to_string(),
                    category: "general".to_string(),
                    source: "upload".to_string(),
                    embedding: vec![1.0, 0.0, 0.0],
                    filename: Some("onboarding.md".to_string()),
                    modified_at: Some(modified_at),
                },
            )
            .unwrap();

        assert_eq!(entry.word_count, 4);
        assert_eq!(entry.filename.as_deref(), Some("onboarding.md"));
        assert_eq!(
            entry.modified_at.unwrap().timestamp(),
            modified_at.timestamp()
        );

        let results = store.search(&tenant, &[1.0, 0.0, 0.0], None, None, 5).unwrap();
        assert_eq!(results[0].entry.word_count, 4);
        assert_eq!(results[0].entry.filename.as_deref(), Some("onboarding.md"));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let store = store();
        let tenant = TenantId::new();
        let err = store.ingest(
            &tenant,
            IngestRequest {
                topic: "x".into(),
                content: "y".into(),
                category: "general".into(),
                source: "manual".into(),
                embedding: vec![1.0, 2.0],
                filename: None,
                modified_at: None,
            },
        );
        assert!(matches!(err, Err(KnowledgeError::DimensionMismatch { .. })));
    }

    #[test]
    fn search_filters_below_threshold() {
        let store = store();
        let tenant = TenantId::new();
        ingest(&store, &tenant, "pricing plans", "pricing", vec![1.0, 0.0, 0.0]);

        let results = store
            .search(&tenant, &[0.0, 1.0, 0.0], None, None, 5)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_orders_by_score_desc() {
        let store = store();
        let tenant = TenantId::new();
        ingest(&store, &tenant, "exact match", "general", vec![1.0, 0.0, 0.0]);
        ingest(&store, &tenant, "close match", "general", vec![0.9, 0.1, 0.0]);

        let results = store.search(&tenant, &[1.0, 0.0, 0.0], None, None, 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.topic, "exact match");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn priority_lead_boosts_sales_categories() {
        let store = store();
        let tenant = TenantId::new();
        ingest(&store, &tenant, "pricing", "pricing", vec![0.6, 0.4, 0.0]);
        ingest(&store, &tenant, "faq", "general", vec![0.6, 0.4, 0.0]);

        let without_boost = store
            .search(&tenant, &[0.6, 0.4, 0.0], None, None, 5)
            .unwrap();
        let with_boost = store
            .search(&tenant, &[0.6, 0.4, 0.0], None, Some(LeadStatus::Hot), 5)
            .unwrap();

        let pricing_score_plain = without_boost
            .iter()
            .find(|r| r.entry.category == "pricing")
            .unwrap()
            .score;
        let pricing_score_boosted = with_boost
            .iter()
            .find(|r| r.entry.category == "pricing")
            .unwrap()
            .score;
        assert!(pricing_score_boosted > pricing_score_plain);
    }

    #[test]
    fn stats_groups_by_category() {
        let store = store();
        let tenant = TenantId::new();
        ingest(&store, &tenant, "a", "pricing", vec![1.0, 0.0, 0.0]);
        ingest(&store, &tenant, "b", "pricing", vec![1.0, 0.0, 0.0]);
        ingest(&store, &tenant, "c", "general", vec![1.0, 0.0, 0.0]);

        let stats = store.stats(&tenant).unwrap();
        assert_eq!(stats.total_entries, 3);
        assert!(stats.categories.contains(&("pricing".to_string(), 2)));
    }
}
