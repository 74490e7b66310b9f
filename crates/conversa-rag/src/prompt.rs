use conversa_core::domain::{Contact, ConversationState};
use conversa_knowledge::SearchResult;
use conversa_personalization::Strategy;

use crate::intent::IntentAnalysis;

const MAX_DOC_CHARS: usize = 1200;
const MAX_DOCS: usize = 3;

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Builds the system prompt when retrieval surfaced at least one document:
/// grounds the reply in the top matches and instructs the model not to
/// fabricate beyond them.
fn rag_prompt(docs: &[SearchResult], contact: &Contact) -> String {
    let mut prompt = String::from(
        "You are a helpful sales and support assistant. Base your answer on the retrieved \
         documents below. If they don't cover the question, say so honestly instead of making \
         something up.\n\nRETRIEVED DOCUMENTS:\n",
    );
    for (i, doc) in docs.iter().take(MAX_DOCS).enumerate() {
        let content = truncate(&doc.entry.content, MAX_DOC_CHARS);
        prompt.push_str(&format!("\n[{}] {} ({})\n{}\n", i + 1, doc.entry.topic, doc.entry.source, content));
    }
    prompt.push_str(&format!("\n\nCUSTOMER PHONE: {}\n", contact.phone_number));
    prompt
}

/// Builds the fallback system prompt when retrieval found nothing:
/// a generic, personalization-driven prompt with no document grounding.
fn fallback_prompt(contact: &Contact) -> String {
    let mut prompt = String::from(
        "You are a helpful sales and support assistant. No specific knowledge-base documents \
         matched this question, so answer from general product knowledge and invite the \
         customer to ask anything more specific.\n",
    );
    if let Some(name) = &contact.name {
        prompt.push_str(&format!("\nCustomer name: {name}\n"));
    }
    prompt
}

fn discovery_call_guidance(intent: &IntentAnalysis, contact: &Contact, discovery_call_url: &str) -> String {
    let mut guidance = String::from("\n\n--- DISCOVERY CALL GUIDANCE ---\n");

    if intent.has_pricing_intent {
        if contact.lead_status.is_priority() {
            guidance.push_str(&format!(
                "Pricing query from a qualified lead: provide detailed pricing information, \
                 emphasize ROI and business value, and offer a discovery call for a custom \
                 solution design. Include the link: {discovery_call_url}\n"
            ));
        } else {
            guidance.push_str(&format!(
                "Pricing query from a new lead: acknowledge the interest, explain pricing \
                 depends on specific needs, and invite a discovery call for an accurate quote. \
                 Include the link: {discovery_call_url}\n"
            ));
        }
    }
    if intent.intents.contains(&crate::intent::DISCOVERY_CALL) {
        guidance.push_str(&format!(
            "Discovery call requested directly: confirm enthusiastically, mention it's free and \
             takes 30-45 minutes, and include the link: {discovery_call_url}\n"
        ));
    }
    guidance
}

fn continuity_guidance(state: &ConversationState) -> String {
    if state.unresolved_questions.is_empty() {
        return String::new();
    }
    format!(
        "\n\nCONVERSATION CONTINUITY:\n- Previous unresolved questions: {}\n- Current topic: {}\n",
        state.unresolved_questions.join(", "),
        state.current_topic.as_deref().unwrap_or("general inquiry"),
    )
}

/// Assembles the complete system prompt for one reply: retrieval-grounded
/// or fallback base, personalization guidance, discovery-call guidance (if
/// applicable), and conversation continuity notes.
pub fn build_system_prompt(
    docs: &[SearchResult],
    contact: &Contact,
    strategy: &Strategy,
    intent: &IntentAnalysis,
    conversation_state: &ConversationState,
    discovery_call_allowed: bool,
    discovery_call_url: &str,
) -> String {
    let mut prompt =
        if docs.is_empty() { fallback_prompt(contact) } else { rag_prompt(docs, contact) };

    prompt.push_str(&conversa_personalization::prompt::render(strategy, contact));

    if intent.should_offer_discovery_call && discovery_call_allowed {
        prompt.push_str(&discovery_call_guidance(intent, contact, discovery_call_url));
    }
    prompt.push_str(&continuity_guidance(conversation_state));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;
    use conversa_personalization::plan;

    fn contact() -> Contact {
        Contact::new(TenantId::new(), "15551234567".to_string())
    }

    #[test]
    fn uses_rag_prompt_when_docs_present() {
        let c = contact();
        let entry = conversa_knowledge::KnowledgeEntry {
            id: "1".into(),
            tenant: TenantId::new(),
            topic: "pricing".into(),
            content: "our starter plan is $99/mo".into(),
            category: "pricing".into(),
            source: "docs".into(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let docs = vec![SearchResult { entry, score: 0.9 }];
        let strategy = plan(&c);
        let intent = crate::intent::analyze("what's the price?");
        let state = ConversationState::new(conversa_core::ids::ConversationId::new());
        let prompt = build_system_prompt(&docs, &c, &strategy, &intent, &state, true, "https://example.test/call");
        assert!(prompt.contains("RETRIEVED DOCUMENTS"));
        assert!(prompt.contains("$99/mo"));
    }

    #[test]
    fn uses_fallback_prompt_when_no_docs() {
        let c = contact();
        let strategy = plan(&c);
        let intent = crate::intent::analyze("hello");
        let state = ConversationState::new(conversa_core::ids::ConversationId::new());
        let prompt = build_system_prompt(&[], &c, &strategy, &intent, &state, true, "https://example.test/call");
        assert!(!prompt.contains("RETRIEVED DOCUMENTS"));
    }

    #[test]
    fn includes_continuity_when_questions_unresolved() {
        let c = contact();
        let strategy = plan(&c);
        let intent = crate::intent::analyze("hello");
        let mut state = ConversationState::new(conversa_core::ids::ConversationId::new());
        state.unresolved_questions.push("pricing for 50 seats?".to_string());
        let prompt = build_system_prompt(&[], &c, &strategy, &intent, &state, true, "https://example.test/call");
        assert!(prompt.contains("CONVERSATION CONTINUITY"));
    }

    #[test]
    fn suppresses_discovery_call_guidance_when_not_allowed() {
        let c = contact();
        let strategy = plan(&c);
        let intent = crate::intent::analyze("what's the price?");
        let state = ConversationState::new(conversa_core::ids::ConversationId::new());
        let prompt = build_system_prompt(&[], &c, &strategy, &intent, &state, false, "https://example.test/call");
        assert!(!prompt.contains("DISCOVERY CALL GUIDANCE"));
        assert!(!prompt.contains("example.test/call"));
    }
}
