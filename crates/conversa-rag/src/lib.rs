//! Retrieval-augmented reply generation: intent detection, query enrichment,
//! personalization-driven prompting, and graceful degradation when the
//! model or knowledge base is unavailable.

pub mod history;
pub mod intent;
pub mod params;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod query;

pub use pipeline::{generate_reply, ReplyOutcome};
