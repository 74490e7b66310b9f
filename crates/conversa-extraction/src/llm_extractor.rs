//! Structured-JSON extraction backed by a [`LlmProvider`]. Falls back to
//! regex extraction for anything the model omits or when the call fails.

use conversa_llm::{ChatMessage, ChatParams, ChatRequest, LlmProvider, Role};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

use crate::regex_fallback;
use crate::types::{ExtractedInfo, Field, LLM_DEFAULT_CONFIDENCE};

const SYSTEM_PROMPT: &str = "You extract structured sales and contact information from a single \
customer message. Only report fields you are confident about; omit anything not present in the \
message. Reply with a JSON object with these optional keys: name, email, company, position, \
industry_focus, company_size, technical_level, budget_range, timeline, decision_maker (bool), \
pain_points_mentioned (array of strings), goals_expressed (array of strings), \
competitors_mentioned (array of strings), topics_discussed (array of strings), and confidence \
(0.0-1.0, your overall confidence in this extraction). Do not invent values.";

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    name: Option<String>,
    email: Option<String>,
    company: Option<String>,
    position: Option<String>,
    industry_focus: Option<String>,
    company_size: Option<String>,
    technical_level: Option<String>,
    budget_range: Option<String>,
    timeline: Option<String>,
    decision_maker: Option<bool>,
    #[serde(default)]
    pain_points_mentioned: Vec<String>,
    #[serde(default)]
    goals_expressed: Vec<String>,
    #[serde(default)]
    competitors_mentioned: Vec<String>,
    #[serde(default)]
    topics_discussed: Vec<String>,
    confidence: Option<f32>,
}

fn field<T>(value: Option<T>, confidence: f32) -> Option<Field<T>> {
    value.map(|value| Field { value, confidence })
}

fn raw_into_extracted(raw: RawExtraction) -> ExtractedInfo {
    let confidence = raw.confidence.unwrap_or(LLM_DEFAULT_CONFIDENCE).clamp(0.0, 1.0);
    ExtractedInfo {
        name: field(raw.name, confidence),
        email: field(raw.email.map(|e| e.to_lowercase()), confidence),
        company: field(raw.company, confidence),
        position: field(raw.position, confidence),
        industry_focus: field(raw.industry_focus, confidence),
        company_size: field(raw.company_size, confidence),
        technical_level: field(raw.technical_level, confidence),
        budget_range: field(raw.budget_range, confidence),
        timeline: field(raw.timeline, confidence),
        decision_maker: field(raw.decision_maker, confidence),
        pain_points_mentioned: BTreeSet::from_iter(raw.pain_points_mentioned),
        goals_expressed: BTreeSet::from_iter(raw.goals_expressed),
        competitors_mentioned: BTreeSet::from_iter(raw.competitors_mentioned),
        topics_discussed: BTreeSet::from_iter(raw.topics_discussed),
    }
}

/// Runs the model first; on any failure (network, parse, rate limit) falls
/// back to [`regex_fallback::extract`] so a down provider never stalls the
/// conversation pipeline.
pub async fn extract(
    provider: &dyn LlmProvider,
    api_key: &str,
    message: &str,
) -> ExtractedInfo {
    match run_model(provider, api_key, message).await {
        Ok(info) => info,
        Err(err) => {
            warn!(error = %err, "llm extraction failed, falling back to regex extraction");
            regex_fallback::extract(message)
        }
    }
}

async fn run_model(
    provider: &dyn LlmProvider,
    api_key: &str,
    message: &str,
) -> Result<ExtractedInfo, conversa_llm::LlmError> {
    let req = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![ChatMessage { role: Role::User, content: message.to_string() }],
        params: ChatParams { temperature: 0.0, ..ChatParams::default() },
        json_mode: true,
    };
    let response = provider.complete_chat(api_key, &req).await?;
    let raw: RawExtraction = serde_json::from_str(&response.content)
        .map_err(|e| conversa_llm::LlmError::Parse(e.to_string()))?;
    Ok(raw_into_extracted(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json() {
        let raw: RawExtraction = serde_json::from_str(r#"{"name": "Jane Doe", "confidence": 0.95}"#).unwrap();
        let info = raw_into_extracted(raw);
        assert_eq!(info.name.unwrap().value, "Jane Doe");
    }

    #[test]
    fn defaults_confidence_when_absent() {
        let raw: RawExtraction = serde_json::from_str(r#"{"email": "a@b.com"}"#).unwrap();
        let info = raw_into_extracted(raw);
        assert_eq!(info.email.unwrap().confidence, LLM_DEFAULT_CONFIDENCE);
    }

    #[test]
    fn merges_list_fields() {
        let raw: RawExtraction =
            serde_json::from_str(r#"{"pain_points_mentioned": ["slow", "manual"]}"#).unwrap();
        let info = raw_into_extracted(raw);
        assert!(info.pain_points_mentioned.contains("slow"));
        assert!(info.pain_points_mentioned.contains("manual"));
    }
}
