use std::time::Instant;

use conversa_core::domain::{Contact, ConversationState, Message, MessageRole};
use conversa_core::ids::TenantId;
use conversa_knowledge::KnowledgeStore;
use conversa_llm::{ChatMessage, ChatRequest, LlmProvider, Role};
use conversa_personalization::Strategy;
use tracing::warn;

use crate::intent::IntentAnalysis;
use crate::{history, intent, params, postprocess, prompt, query};

const GRACEFUL_DEGRADATION_MESSAGE: &str =
    "Thanks for reaching out — I'm having trouble pulling up an answer right now. \
     A member of our team will follow up with you shortly.";

/// Outcome of one reply-generation attempt, including whether the graceful
/// degradation path was used (signalled to analytics as an error sample) and
/// everything the caller needs to record a `MessageAnalytics` sample without
/// recomputing personalization/intent analysis itself.
pub struct ReplyOutcome {
    pub reply: String,
    pub used_rag: bool,
    pub degraded: bool,
    pub discovery_call_offered: bool,
    pub strategy: Strategy,
    pub intents: Vec<&'static str>,
    pub rag_docs: usize,
    pub rag_latency_ms: Option<u64>,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

fn history_to_messages(history: &[Message], limit: usize) -> Vec<ChatMessage> {
    history
        .iter()
        .rev()
        .take(limit)
        .rev()
        .map(|m| ChatMessage {
            role: match m.role {
                MessageRole::User => Role::User,
                MessageRole::Assistant => Role::Assistant,
                MessageRole::System => Role::System,
            },
            content: m.content.clone(),
        })
        .collect()
}

/// One successful model completion plus the bits of the attempt the caller
/// needs to report analytics without redoing the work.
struct Completion {
    content: String,
    tokens_in: u32,
    tokens_out: u32,
    rag_docs: usize,
}

#[allow(clippy::too_many_arguments)]
async fn try_rag(
    provider: &dyn LlmProvider,
    api_key: &str,
    store: &KnowledgeStore,
    tenant: &TenantId,
    contact: &Contact,
    message: &str,
    history_messages: Vec<ChatMessage>,
    conversation_state: &ConversationState,
    model: &str,
    strategy: &Strategy,
    analysis: &IntentAnalysis,
    discovery_call_allowed: bool,
    discovery_call_url: &str,
) -> Result<Completion, conversa_llm::LlmError> {
    let categories = intent::categories_for(&analysis.intents);
    let category_filter = categories.first().copied();

    let enriched = query::enriched_query(message, contact);
    let embeddings = provider.embed(api_key, &[enriched]).await?;
    let embedding = embeddings.into_iter().next().ok_or_else(|| {
        conversa_llm::LlmError::Parse("embedding response was empty".to_string())
    })?;

    let docs = store
        .search(tenant, &embedding, category_filter, Some(contact.lead_status), 3)
        .map_err(|e| conversa_llm::LlmError::Parse(e.to_string()))?;
    let rag_docs = docs.len();

    let system = prompt::build_system_prompt(
        &docs,
        contact,
        strategy,
        analysis,
        conversation_state,
        discovery_call_allowed,
        discovery_call_url,
    );
    let request = ChatRequest {
        system,
        messages: history_messages,
        params: params::model_params(model, strategy.communication_style),
        json_mode: false,
    };
    let response = provider.complete_chat(api_key, &request).await?;
    Ok(Completion { content: response.content, tokens_in: response.tokens_in, tokens_out: response.tokens_out, rag_docs })
}

#[allow(clippy::too_many_arguments)]
async fn try_fallback(
    provider: &dyn LlmProvider,
    api_key: &str,
    contact: &Contact,
    history_messages: Vec<ChatMessage>,
    conversation_state: &ConversationState,
    model: &str,
    strategy: &Strategy,
    analysis: &IntentAnalysis,
    discovery_call_allowed: bool,
    discovery_call_url: &str,
) -> Result<Completion, conversa_llm::LlmError> {
    let system = prompt::build_system_prompt(
        &[],
        contact,
        strategy,
        analysis,
        conversation_state,
        discovery_call_allowed,
        discovery_call_url,
    );
    let request = ChatRequest {
        system,
        messages: history_messages,
        params: params::model_params(model, strategy.communication_style),
        json_mode: false,
    };
    let response = provider.complete_chat(api_key, &request).await?;
    Ok(Completion { content: response.content, tokens_in: response.tokens_in, tokens_out: response.tokens_out, rag_docs: 0 })
}

/// Generates one reply for an inbound message: retrieval-grounded first,
/// falling back to a non-RAG personalized reply on any retrieval/model
/// failure, and to a fixed message if even that fails.
///
/// `discovery_call_allowed` is the caller's cooldown decision: both CTA
/// injection points (the intent-based prompt guidance and the strategy-driven
/// link append) are gated on it, so a call that isn't allowed never reaches
/// the customer regardless of what intent/strategy would otherwise suggest.
#[allow(clippy::too_many_arguments)]
pub async fn generate_reply(
    provider: &dyn LlmProvider,
    api_key: &str,
    store: &KnowledgeStore,
    tenant: &TenantId,
    contact: &Contact,
    conversation_state: &ConversationState,
    message: &str,
    history_msgs: &[Message],
    model: &str,
    is_first_contact: bool,
    discovery_call_allowed: bool,
    discovery_call_url: &str,
) -> ReplyOutcome {
    let strategy = conversa_personalization::plan(contact);
    let analysis = intent::analyze(message);
    let limit = history::history_limit(strategy.personalization_level);
    let chat_history = history_to_messages(history_msgs, limit);
    let rag_start = Instant::now();

    match try_rag(
        provider,
        api_key,
        store,
        tenant,
        contact,
        message,
        chat_history.clone(),
        conversation_state,
        model,
        &strategy,
        &analysis,
        discovery_call_allowed,
        discovery_call_url,
    )
    .await
    {
        Ok(completion) => {
            let rag_latency_ms = rag_start.elapsed().as_millis() as u64;
            let reply = postprocess::apply(
                completion.content,
                contact,
                &strategy,
                is_first_contact,
                discovery_call_allowed,
                discovery_call_url,
            );
            let discovery_call_offered = reply.contains(discovery_call_url);
            return ReplyOutcome {
                reply,
                used_rag: true,
                degraded: false,
                discovery_call_offered,
                strategy,
                intents: analysis.intents,
                rag_docs: completion.rag_docs,
                rag_latency_ms: Some(rag_latency_ms),
                tokens_in: completion.tokens_in,
                tokens_out: completion.tokens_out,
            };
        }
        Err(e) => warn!(error = %e, "rag reply generation failed, falling back to no-rag path"),
    }

    match try_fallback(
        provider,
        api_key,
        contact,
        chat_history,
        conversation_state,
        model,
        &strategy,
        &analysis,
        discovery_call_allowed,
        discovery_call_url,
    )
    .await
    {
        Ok(completion) => {
            let reply = postprocess::apply(
                completion.content,
                contact,
                &strategy,
                is_first_contact,
                discovery_call_allowed,
                discovery_call_url,
            );
            let discovery_call_offered = reply.contains(discovery_call_url);
            ReplyOutcome {
                reply,
                used_rag: false,
                degraded: false,
                discovery_call_offered,
                strategy,
                intents: analysis.intents,
                rag_docs: 0,
                rag_latency_ms: None,
                tokens_in: completion.tokens_in,
                tokens_out: completion.tokens_out,
            }
        }
        Err(e) => {
            warn!(error = %e, "fallback reply generation failed, returning graceful degradation message");
            ReplyOutcome {
                reply: GRACEFUL_DEGRADATION_MESSAGE.to_string(),
                used_rag: false,
                degraded: true,
                discovery_call_offered: false,
                strategy,
                intents: analysis.intents,
                rag_docs: 0,
                rag_latency_ms: None,
                tokens_in: 0,
                tokens_out: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_to_messages_keeps_only_the_most_recent() {
        let now = chrono::Utc::now();
        let conversation = conversa_core::ids::ConversationId::new();
        let history: Vec<Message> = (0..10)
            .map(|i| Message {
                id: conversa_core::ids::MessageId::new(),
                conversation: conversation.clone(),
                role: MessageRole::User,
                content: format!("message {i}"),
                channel_message_id: None,
                status: conversa_core::domain::MessageStatus::Delivered,
                created_at: now,
                status_updated_at: now,
                error_reason: None,
            })
            .collect();

        let limited = history_to_messages(&history, 3);
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].content, "message 7");
        assert_eq!(limited[2].content, "message 9");
    }
}
