//! Tenant-scoped knowledge base: SQLite-backed storage with an in-process
//! cosine-similarity search over stored embeddings, category filtering, and
//! priority boosting for engaged leads.

pub mod db;
pub mod error;
pub mod similarity;
pub mod store;
pub mod types;

pub use error::KnowledgeError;
pub use store::{KnowledgeStore, SIMILARITY_THRESHOLD};
pub use types::{category, IngestRequest, KnowledgeEntry, KnowledgeStats, SearchResult};
