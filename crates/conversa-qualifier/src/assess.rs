//! Structured LLM scoring of whether a lead is ready for a discovery-call
//! offer.

use conversa_llm::{ChatMessage, ChatParams, ChatRequest, LlmProvider, Role};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You score how ready a B2B lead is for a sales discovery call, based \
on the conversation so far. Consider buying signals: budget mentioned, timeline urgency, decision-\
making authority, specific pain points, company scale. Respond with JSON: {\"score\": 0-100, \
\"confidence\": 0.0-1.0, \"reasons\": [string, ...]}. Be conservative — only high scores for clear, \
strong signals.";

const QUALIFIED_MIN_SCORE: u8 = 80;
const QUALIFIED_MIN_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Clone)]
pub struct Assessment {
    pub qualified: bool,
    pub score: u8,
    pub confidence: f32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    score: Option<u8>,
    confidence: Option<f32>,
    #[serde(default)]
    reasons: Vec<String>,
}

fn unqualified(reason: &str) -> Assessment {
    Assessment { qualified: false, score: 0, confidence: 0.0, reasons: vec![reason.to_string()] }
}

/// Scores one utterance against its recent history. Callers must already
/// have passed [`crate::gate::passes_pre_gate`]; this makes a model call
/// unconditionally otherwise.
pub async fn assess(
    provider: &dyn LlmProvider,
    api_key: &str,
    utterance: &str,
    history: &[String],
) -> Assessment {
    match run_model(provider, api_key, utterance, history).await {
        Ok(assessment) => assessment,
        Err(_) => unqualified("qualification call failed"),
    }
}

async fn run_model(
    provider: &dyn LlmProvider,
    api_key: &str,
    utterance: &str,
    history: &[String],
) -> Result<Assessment, conversa_llm::LlmError> {
    let history_block = if history.is_empty() {
        String::new()
    } else {
        format!("\nRecent conversation:\n{}", history.join("\n"))
    };
    let user_content = format!("Latest message: \"{utterance}\"{history_block}");

    let req = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![ChatMessage { role: Role::User, content: user_content }],
        params: ChatParams { temperature: 0.1, max_tokens: 300, ..ChatParams::default() },
        json_mode: true,
    };
    let response = provider.complete_chat(api_key, &req).await?;
    let raw: RawAssessment = serde_json::from_str(&response.content)
        .map_err(|e| conversa_llm::LlmError::Parse(e.to_string()))?;

    let score = raw.score.unwrap_or(0);
    let confidence = raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
    Ok(Assessment {
        qualified: score >= QUALIFIED_MIN_SCORE && confidence >= QUALIFIED_MIN_CONFIDENCE,
        score,
        confidence,
        reasons: raw.reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_on_high_score_and_confidence() {
        let raw = RawAssessment { score: Some(85), confidence: Some(0.9), reasons: vec!["budget mentioned".into()] };
        let qualified = raw.score.unwrap() >= QUALIFIED_MIN_SCORE && raw.confidence.unwrap() >= QUALIFIED_MIN_CONFIDENCE;
        assert!(qualified);
    }

    #[test]
    fn rejects_high_score_with_low_confidence() {
        let raw = RawAssessment { score: Some(90), confidence: Some(0.5), reasons: vec![] };
        let qualified = raw.score.unwrap() >= QUALIFIED_MIN_SCORE && raw.confidence.unwrap() >= QUALIFIED_MIN_CONFIDENCE;
        assert!(!qualified);
    }

    #[test]
    fn unqualified_helper_reports_zero() {
        let a = unqualified("no model available");
        assert!(!a.qualified);
        assert_eq!(a.score, 0);
    }
}
