use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Parameters that vary by personalization style (verbosity, creativity).
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub params: ChatParams,
    /// When set, the provider is asked to return a JSON object matching this
    /// shape description rather than free text (used by extraction,
    /// handover classification, and lead qualification).
    pub json_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// Common interface for chat-completion and embedding providers. A single
/// implementation backs every tenant; the caller supplies a per-tenant,
/// already-decrypted API key on each call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete_chat(&self, api_key: &str, req: &ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Embed a batch of strings into fixed-dimension vectors. Callers must
    /// truncate any string longer than 8000 characters before calling this;
    /// implementations truncate defensively too.
    async fn embed(&self, api_key: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    fn embedding_dimensions(&self) -> usize;
}
