//! Pluggable LLM provider interface plus the per-tenant key-resolution
//! cache shared by every component that calls out to a model.

pub mod error;
pub mod key_cache;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use key_cache::KeyCache;
pub use openai::OpenAiProvider;
pub use provider::{ChatMessage, ChatParams, ChatRequest, ChatResponse, LlmProvider, Role};
