use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::error::LlmError;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Role};

const MAX_EMBED_CHARS: usize = 8000;
const MAX_ATTEMPTS: u32 = 3;
const EMBEDDING_DIMENSIONS: usize = 1536;

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    embedding_model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_chat(&self, api_key: &str, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut messages = vec![json!({ "role": "system", "content": req.system })];
        for m in &req.messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": m.content }));
        }

        let mut body = json!({
            "model": req.params.model,
            "messages": messages,
            "temperature": req.params.temperature,
            "max_tokens": req.params.max_tokens,
        });
        if req.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let value = self.post_with_retry(&url, api_key, body).await?;

        let parsed: ChatCompletionResponse =
            serde_json::from_value(value).map_err(|e| LlmError::Parse(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("no choices returned".into()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            tokens_in: parsed.usage.prompt_tokens,
            tokens_out: parsed.usage.completion_tokens,
        })
    }

    async fn embed(&self, api_key: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let truncated: Vec<String> = inputs
            .iter()
            .map(|s| s.chars().take(MAX_EMBED_CHARS).collect())
            .collect();

        let body = json!({ "model": self.embedding_model, "input": truncated });
        let url = format!("{}/v1/embeddings", self.base_url);
        let value = self.post_with_retry(&url, api_key, body).await?;

        let parsed: EmbeddingResponse =
            serde_json::from_value(value).map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn embedding_dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

impl OpenAiProvider {
    async fn post_with_retry(&self, url: &str, api_key: &str, body: serde_json::Value) -> Result<serde_json::Value, LlmError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let resp = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Http(e.to_string()))?;

            let status = resp.status();
            if status.as_u16() == 429 {
                let retry_after_ms = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs * 1000)
                    .unwrap_or(2000);
                if attempt < MAX_ATTEMPTS {
                    warn!(attempt, retry_after_ms, "llm rate limited, retrying");
                    sleep(Duration::from_millis(retry_after_ms)).await;
                    continue;
                }
                return Err(LlmError::RateLimited { retry_after_ms });
            }

            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                if status.is_server_error() && attempt < MAX_ATTEMPTS {
                    warn!(attempt, status = status.as_u16(), "llm server error, retrying");
                    sleep(Duration::from_millis(500 * attempt as u64)).await;
                    continue;
                }
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: text,
                });
            }

            return resp
                .json::<serde_json::Value>()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()));
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
