use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conversa_core::ids::TenantId;

/// Categories used for priority boosting and operator filtering. Stored as
/// free text so tenants can add their own, but these are the ones the
/// qualifier/RAG pipeline knows to boost for engaged leads.
pub mod category {
    pub const SERVICES: &str = "services";
    pub const PRICING: &str = "pricing";
    pub const SALES: &str = "sales";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub tenant: TenantId,
    pub topic: String,
    pub content: String,
    pub category: String,
    pub source: String,
    /// Word count of `content`, computed at ingest time.
    pub word_count: u32,
    /// Source filename, when the entry was ingested from a file rather than
    /// typed in directly.
    pub filename: Option<String>,
    /// Filesystem modification time of the source file, when known.
    pub modified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub topic: String,
    pub content: String,
    pub category: String,
    pub source: String,
    pub embedding: Vec<f32>,
    pub filename: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: KnowledgeEntry,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_entries: u64,
    pub categories: Vec<(String, u64)>,
}
