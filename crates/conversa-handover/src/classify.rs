//! Decides whether a message is a genuine request for a human versus a
//! question the bot can keep handling itself.

use conversa_llm::{ChatMessage, ChatParams, ChatRequest, LlmProvider, Role};
use serde::Deserialize;
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are an expert customer service classifier. Your job is to \
determine if a customer message is genuinely requesting to speak with a human agent, or if \
it's a question/request that an AI chatbot should handle.\n\n\
HANDOVER REQUIRED (requires_human: true):\n\
- Explicit requests for human contact: \"I want to talk to a human\", \"Can I speak to someone?\"\n\
- Complex technical support beyond bot capabilities\n\
- Complaints requiring human empathy\n\
- Account-specific issues: billing problems, subscription changes\n\
- Situations requiring human judgment: negotiating terms, special cases\n\n\
NO HANDOVER NEEDED (requires_human: false):\n\
- Questions about bot memory/capabilities: \"What's my name?\", \"Do you remember what I told you?\"\n\
- Product information requests: pricing, feature explanations\n\
- General questions the bot can answer\n\n\
Respond with JSON: {\"requires_human\": boolean, \"reason\": string, \"confidence\": 0.0-1.0}";

const EXPLICIT_KEYWORDS: &[&str] = &[
    "speak to a human",
    "talk to a human",
    "human agent",
    "human support",
    "speak to someone",
    "talk to someone",
    "connect me to",
    "transfer me to",
    "escalate to",
    "human representative",
    "real person",
    "live agent",
    "customer service rep",
];

const COMPLAINT_KEYWORDS: &[&str] = &[
    "frustrated",
    "angry",
    "terrible service",
    "this doesn't work",
    "billing issue",
    "account problem",
    "cancel my",
    "refund",
];

#[derive(Debug, Clone)]
pub struct Classification {
    pub should_handover: bool,
    pub reason: String,
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    requires_human: bool,
    reason: Option<String>,
    confidence: Option<f32>,
}

/// Falls back to conservative keyword matching when the model is
/// unavailable or returns something unparseable. Only triggers on
/// unambiguous human-request or complaint phrasing.
pub fn fallback_classify(message: &str) -> Classification {
    let message_lower = message.to_lowercase();

    for keyword in EXPLICIT_KEYWORDS {
        if message_lower.contains(keyword) {
            return Classification {
                should_handover: true,
                reason: format!("explicit human request: '{keyword}'"),
                confidence: 0.9,
            };
        }
    }
    for keyword in COMPLAINT_KEYWORDS {
        if message_lower.contains(keyword) {
            return Classification {
                should_handover: true,
                reason: format!("complaint detected: '{keyword}'"),
                confidence: 0.7,
            };
        }
    }
    Classification {
        should_handover: false,
        reason: "no clear human request detected".to_string(),
        confidence: 0.8,
    }
}

/// Runs the model classifier; on any failure, falls back to
/// [`fallback_classify`] so a down provider never blocks a reply.
pub async fn classify(
    provider: &dyn LlmProvider,
    api_key: &str,
    message: &str,
    customer_context_json: Option<&str>,
) -> Classification {
    match run_model(provider, api_key, message, customer_context_json).await {
        Ok(classification) => classification,
        Err(err) => {
            warn!(error = %err, "handover classification failed, falling back to keyword detection");
            fallback_classify(message)
        }
    }
}

async fn run_model(
    provider: &dyn LlmProvider,
    api_key: &str,
    message: &str,
    customer_context_json: Option<&str>,
) -> Result<Classification, conversa_llm::LlmError> {
    let context_block = customer_context_json
        .map(|c| format!("\nCustomer Context: {c}"))
        .unwrap_or_default();
    let user_content = format!(
        "Classify this customer message:\n\nMESSAGE: \"{message}\"{context_block}\n\n\
         Is this customer genuinely requesting to speak with a human agent, or asking a question \
         that the AI chatbot should handle? Respond with JSON classification:"
    );

    let req = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![ChatMessage { role: Role::User, content: user_content }],
        params: ChatParams { temperature: 0.1, max_tokens: 200, ..ChatParams::default() },
        json_mode: true,
    };
    let response = provider.complete_chat(api_key, &req).await?;
    let raw: RawClassification = serde_json::from_str(&response.content)
        .map_err(|e| conversa_llm::LlmError::Parse(e.to_string()))?;

    Ok(Classification {
        should_handover: raw.requires_human,
        reason: raw.reason.unwrap_or_else(|| "AI classification".to_string()),
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_detects_explicit_request() {
        let c = fallback_classify("I really want to talk to a human please");
        assert!(c.should_handover);
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn fallback_detects_complaint_with_lower_confidence() {
        let c = fallback_classify("I have a billing issue I need resolved");
        assert!(c.should_handover);
        assert_eq!(c.confidence, 0.7);
    }

    #[test]
    fn fallback_does_not_trigger_on_memory_questions() {
        let c = fallback_classify("do you remember what I told you earlier?");
        assert!(!c.should_handover);
    }
}
