//! Lexical signal tables used to infer journey progression and behavioral
//! traits from raw message text, without a model call on the hot path.

use conversa_core::domain::{DecisionMakingStyle, EngagementLevel, JourneyStage, ResponseTimePattern};

const INTEREST_SIGNALS: &[&str] = &[
    "interested",
    "tell me more",
    "how does",
    "what are the benefits",
    "pricing",
    "cost",
    "demo",
    "trial",
    "examples",
    "case studies",
];

const EVALUATION_SIGNALS: &[&str] = &[
    "compare",
    "vs",
    "versus",
    "alternatives",
    "competitors",
    "timeline",
    "implementation",
    "requirements",
    "features",
    "integration",
    "security",
    "compliance",
];

const DECISION_SIGNALS: &[&str] = &[
    "ready to",
    "want to proceed",
    "let's do this",
    "sign up",
    "get started",
    "next steps",
    "contract",
    "agreement",
    "when can we",
    "schedule",
    "meeting",
    "call",
];

/// Inspect `message` for the signal set that matches `current_stage`'s
/// forward transition, returning the next stage if found. Never skips a
/// stage and never regresses.
pub fn next_journey_stage(current_stage: JourneyStage, message: &str) -> Option<JourneyStage> {
    let lower = message.to_lowercase();
    let signals = match current_stage {
        JourneyStage::Discovery => INTEREST_SIGNALS,
        JourneyStage::Interest => EVALUATION_SIGNALS,
        JourneyStage::Evaluation => DECISION_SIGNALS,
        JourneyStage::Decision => return None,
    };
    if signals.iter().any(|s| lower.contains(s)) {
        current_stage.next()
    } else {
        None
    }
}

const HIGH_ENGAGEMENT_SIGNALS: &[&str] = &[
    "excited",
    "amazing",
    "perfect",
    "exactly what we need",
    "love this",
    "impressive",
    "wow",
    "fantastic",
];

const LOW_ENGAGEMENT_SIGNALS: &[&str] =
    &["maybe", "not sure", "think about it", "later", "busy", "not now", "hmm"];

const ANALYTICAL_SIGNALS: &[&str] = &[
    "data", "statistics", "metrics", "roi", "analysis", "compare", "research", "study", "evidence",
];

const INTUITIVE_SIGNALS: &[&str] =
    &["feel", "sense", "gut", "instinct", "seems right", "looks good", "sounds great"];

const LONG_MESSAGE_CHARS: usize = 100;
const SHORT_MESSAGE_CHARS: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct BehaviorUpdate {
    pub engagement_level: Option<EngagementLevel>,
    pub information_preference: Option<conversa_core::domain::InformationPreference>,
    pub response_time_pattern: Option<ResponseTimePattern>,
    pub decision_making_style: Option<DecisionMakingStyle>,
}

/// Infer behavioral trait updates from a single message, matching the
/// original heuristics: engagement and decision style are keyword-matched,
/// information preference is message-length based, and response time is
/// classified from the gap since the previous message when available.
pub fn infer_behavior(message: &str, response_time_secs: Option<i64>) -> BehaviorUpdate {
    let lower = message.to_lowercase();
    let mut update = BehaviorUpdate::default();

    if HIGH_ENGAGEMENT_SIGNALS.iter().any(|s| lower.contains(s)) {
        update.engagement_level = Some(EngagementLevel::High);
    } else if LOW_ENGAGEMENT_SIGNALS.iter().any(|s| lower.contains(s)) {
        update.engagement_level = Some(EngagementLevel::Low);
    }

    let len = message.chars().count();
    if len > LONG_MESSAGE_CHARS {
        update.information_preference = Some(conversa_core::domain::InformationPreference::Detailed);
    } else if len < SHORT_MESSAGE_CHARS {
        update.information_preference = Some(conversa_core::domain::InformationPreference::Brief);
    }

    if let Some(secs) = response_time_secs {
        update.response_time_pattern = Some(if secs < 60 {
            ResponseTimePattern::Fast
        } else if secs > 3600 {
            ResponseTimePattern::Slow
        } else {
            ResponseTimePattern::Medium
        });
    }

    if ANALYTICAL_SIGNALS.iter().any(|s| lower.contains(s)) {
        update.decision_making_style = Some(DecisionMakingStyle::Analytical);
    } else if INTUITIVE_SIGNALS.iter().any(|s| lower.contains(s)) {
        update.decision_making_style = Some(DecisionMakingStyle::Intuitive);
    }

    update
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_advances_on_pricing_question() {
        let next = next_journey_stage(JourneyStage::Discovery, "What's the pricing like?");
        assert_eq!(next, Some(JourneyStage::Interest));
    }

    #[test]
    fn discovery_stays_put_without_signal() {
        let next = next_journey_stage(JourneyStage::Discovery, "hello there");
        assert_eq!(next, None);
    }

    #[test]
    fn interest_advances_to_evaluation_on_comparison() {
        let next = next_journey_stage(JourneyStage::Interest, "How do you compare to competitors?");
        assert_eq!(next, Some(JourneyStage::Evaluation));
    }

    #[test]
    fn evaluation_advances_to_decision_on_readiness() {
        let next = next_journey_stage(JourneyStage::Evaluation, "We're ready to proceed, what are next steps?");
        assert_eq!(next, Some(JourneyStage::Decision));
    }

    #[test]
    fn decision_is_terminal() {
        assert_eq!(next_journey_stage(JourneyStage::Decision, "let's sign up"), None);
    }

    #[test]
    fn infers_high_engagement() {
        let update = infer_behavior("This is amazing, exactly what we need!", None);
        assert_eq!(update.engagement_level, Some(EngagementLevel::High));
    }

    #[test]
    fn infers_fast_response_time() {
        let update = infer_behavior("ok", Some(30));
        assert_eq!(update.response_time_pattern, Some(ResponseTimePattern::Fast));
    }

    #[test]
    fn infers_analytical_style() {
        let update = infer_behavior("Can you share the ROI metrics and data?", None);
        assert_eq!(update.decision_making_style, Some(DecisionMakingStyle::Analytical));
    }
}
