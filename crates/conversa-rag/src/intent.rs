//! Fixed-lexicon intent detection used to steer retrieval and decide
//! whether a discovery-call offer belongs in the reply.

pub const PRICING: &str = "pricing";
pub const DISCOVERY_CALL: &str = "discovery_call";
pub const SERVICES: &str = "services";
pub const TECHNICAL: &str = "technical";
pub const COMPANY: &str = "company";
pub const SUPPORT: &str = "support";
pub const INDUSTRY_SPECIFIC: &str = "industry_specific";
pub const LEAD_QUALIFICATION: &str = "lead_qualification";

const LEXICON: &[(&str, &[&str])] = &[
    (PRICING, &["price", "cost", "pricing", "package", "plan", "fee", "budget", "expensive", "cheap", "how much", "quote"]),
    (DISCOVERY_CALL, &["discovery", "consultation", "call", "meeting", "demo", "discuss", "talk", "schedule"]),
    (SERVICES, &["service", "solution", "automation", "ai", "what do you do", "offerings", "capabilities"]),
    (TECHNICAL, &["api", "integration", "technical", "requirements", "how does it work", "implementation"]),
    (COMPANY, &["about", "team", "experience", "who are you", "company", "background"]),
    (SUPPORT, &["help", "support", "problem", "issue", "trouble", "assistance"]),
    (INDUSTRY_SPECIFIC, &["healthcare", "finance", "retail", "manufacturing", "education"]),
    (LEAD_QUALIFICATION, &["interested", "demo", "trial", "consultation", "meeting", "call"]),
];

const PRICING_TRIGGERS: &[&str] =
    &["how much", "what does it cost", "pricing", "price", "budget", "quote", "cost", "fee"];

#[derive(Debug, Clone)]
pub struct IntentAnalysis {
    pub intents: Vec<&'static str>,
    pub has_pricing_intent: bool,
    pub should_offer_discovery_call: bool,
}

/// Runs the fixed lexicon over one message; a message can match any number
/// of intents (including zero, meaning general/unclassified).
pub fn analyze(message: &str) -> IntentAnalysis {
    let message_lower = message.to_lowercase();
    let mut intents: Vec<&'static str> = LEXICON
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| message_lower.contains(k)))
        .map(|(intent, _)| *intent)
        .collect();

    let has_pricing_intent = PRICING_TRIGGERS.iter().any(|t| message_lower.contains(t));
    let should_offer_discovery_call =
        has_pricing_intent || intents.contains(&DISCOVERY_CALL) || intents.contains(&LEAD_QUALIFICATION);

    intents.dedup();
    IntentAnalysis { intents, has_pricing_intent, should_offer_discovery_call }
}

/// Maps detected intents onto knowledge-base categories for retrieval
/// filtering/boosting.
pub fn categories_for(intents: &[&str]) -> Vec<&'static str> {
    let mut categories = Vec::new();
    for intent in intents {
        let mapped: &[&str] = match *intent {
            PRICING => &[conversa_knowledge::category::SERVICES, conversa_knowledge::category::PRICING],
            SERVICES => &[conversa_knowledge::category::SERVICES],
            TECHNICAL => &[conversa_knowledge::category::SERVICES],
            LEAD_QUALIFICATION => &[conversa_knowledge::category::SALES, conversa_knowledge::category::SERVICES],
            _ => &[],
        };
        for c in mapped {
            if !categories.contains(c) {
                categories.push(*c);
            }
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pricing_and_triggers_discovery_call() {
        let analysis = analyze("how much does this cost?");
        assert!(analysis.intents.contains(&PRICING));
        assert!(analysis.has_pricing_intent);
        assert!(analysis.should_offer_discovery_call);
    }

    #[test]
    fn general_message_has_no_intents() {
        let analysis = analyze("ok thanks");
        assert!(analysis.intents.is_empty());
        assert!(!analysis.should_offer_discovery_call);
    }

    #[test]
    fn maps_pricing_intent_to_categories() {
        let cats = categories_for(&[PRICING]);
        assert!(cats.contains(&conversa_knowledge::category::SERVICES));
        assert!(cats.contains(&conversa_knowledge::category::PRICING));
    }
}
