use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use conversa_analytics::{AnalyticsEvent, AnalyticsQueue, ConversationSession, LeadScore, MessageAnalytics, PerformanceSample};
use conversa_channel::{ChannelClient, OutboundText, RateLimiter};
use conversa_context::ContextRepository;
use conversa_core::domain::{Message, MessageRole, MessageStatus};
use conversa_core::ids::{MessageId, TenantId};
use conversa_core::phone;
use conversa_knowledge::KnowledgeStore;
use conversa_llm::LlmProvider;
use conversa_qualifier::DiscoveryCallCooldown;

use crate::idempotency::IdempotencyCache;
use crate::types::{InboundEvent, ProcessOutcome, StopReason, TenantCredentials};

const IDEMPOTENCY_CACHE_CAPACITY: usize = 4096;
const QUALIFICATION_HISTORY_WINDOW: usize = 6;
/// Wall-clock budget for one reply-generation attempt. Exceeding it doesn't
/// cancel the call — the reply still goes out — but the performance sample
/// is tagged `status=timeout` instead of `status=ok` so it's visible in
/// aggregates.
const REPLY_LATENCY_BUDGET_MS: u64 = 60_000;

/// Wires C1/C2/C3/C4/C5/C7/C8/C9 into the inbound message pipeline
/// described for the message processor: idempotency, context update,
/// gating, handover, qualification, reply generation, and send.
pub struct MessageProcessor {
    channel: Arc<dyn ChannelClient>,
    llm: Arc<dyn LlmProvider>,
    knowledge: Arc<KnowledgeStore>,
    context: Arc<ContextRepository>,
    cooldown: Arc<DiscoveryCallCooldown>,
    rate_limiter: Arc<RateLimiter>,
    analytics: Arc<AnalyticsQueue>,
    idempotency: IdempotencyCache,
    model: String,
    discovery_call_url: String,
}

impl MessageProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: Arc<dyn ChannelClient>,
        llm: Arc<dyn LlmProvider>,
        knowledge: Arc<KnowledgeStore>,
        context: Arc<ContextRepository>,
        cooldown: Arc<DiscoveryCallCooldown>,
        rate_limiter: Arc<RateLimiter>,
        analytics: Arc<AnalyticsQueue>,
        model: String,
        discovery_call_url: String,
    ) -> Self {
        Self {
            channel,
            llm,
            knowledge,
            context,
            cooldown,
            rate_limiter,
            analytics,
            idempotency: IdempotencyCache::new(IDEMPOTENCY_CACHE_CAPACITY),
            model,
            discovery_call_url,
        }
    }

    pub async fn process(
        &self,
        event: InboundEvent,
        credentials: &TenantCredentials,
        bot_number: Option<&str>,
    ) -> Result<ProcessOutcome, conversa_context::ContextError> {
        let from = phone::canonicalize(&event.from);

        if let Some(bot_number) = bot_number {
            if from == phone::canonicalize(bot_number) {
                return Ok(ProcessOutcome::Stopped(StopReason::EchoOrSelf));
            }
        }

        if let Some(channel_message_id) = &event.channel_message_id {
            if self.idempotency.is_duplicate(channel_message_id) {
                return Ok(ProcessOutcome::Stopped(StopReason::DuplicateEvent));
            }
        }

        let contact = self.context.get_or_create_contact(&event.tenant, &from)?;
        let is_first_contact = contact.total_interactions == 0;
        let conversation = self.context.get_or_create_conversation(&event.tenant, &contact.id)?;

        let inbound = Message {
            id: MessageId::new(),
            conversation: conversation.id.clone(),
            role: MessageRole::User,
            content: event.text.clone(),
            channel_message_id: event.channel_message_id.clone(),
            status: MessageStatus::Delivered,
            created_at: event.timestamp,
            status_updated_at: event.timestamp,
            error_reason: None,
        };
        match self.context.insert_message(&inbound) {
            Ok(()) => {}
            Err(conversa_context::ContextError::DuplicateMessage) => {
                return Ok(ProcessOutcome::Stopped(StopReason::DuplicateEvent));
            }
            Err(e) => return Err(e),
        }

        let contact = self.context.advance_journey(&contact, &event.text)?;
        let contact = self.context.update_behavior(&contact, &event.text, None)?;

        let extracted = conversa_extraction::llm_extractor::extract(
            self.llm.as_ref(),
            &credentials.llm_api_key,
            &event.text,
        )
        .await;
        let mut updated_contact = contact.clone();
        conversa_extraction::merge::merge(&mut updated_contact, &extracted);
        self.context.save_contact(&updated_contact)?;
        let contact = self.context.merge_signals(
            &updated_contact,
            extracted.topics_discussed.clone(),
            Vec::new(),
            extracted.pain_points_mentioned.clone(),
            extracted.goals_expressed.clone(),
            extracted.competitors_mentioned.clone(),
        )?;

        let conversation_state = self.context.conversation_scratchpad(&conversation.id)?;

        if !conversation.bot_enabled {
            return Ok(ProcessOutcome::Stopped(StopReason::BotDisabled));
        }

        let classification = conversa_handover::classify(
            self.llm.as_ref(),
            &credentials.llm_api_key,
            &event.text,
            None,
        )
        .await;
        if classification.should_handover {
            let mut updated_conversation = conversation.clone();
            updated_conversation.handover_requested = true;
            updated_conversation.handover_timestamp = Some(Utc::now());
            updated_conversation.bot_enabled = false;
            self.context.save_conversation(&updated_conversation)?;

            let ack = "Thanks for reaching out — I'm connecting you with a member of our team \
                       who will follow up shortly.";
            self.persist_and_send(MessageId::new(), &event.tenant, &conversation.id, &from, ack, credentials).await?;
            info!(reason = %classification.reason, "conversation handed over to a human");
            return Ok(ProcessOutcome::HandoverTriggered { reason: classification.reason });
        }

        let history = self.context.recent_messages(&conversation.id, QUALIFICATION_HISTORY_WINDOW)?;
        let mut discovery_call_allowed = false;
        if conversa_qualifier::passes_pre_gate(&event.text, history.len()) {
            let history_text: Vec<String> = history.iter().map(|m| m.content.clone()).collect();
            let assessment = conversa_qualifier::assess(
                self.llm.as_ref(),
                &credentials.llm_api_key,
                &event.text,
                &history_text,
            )
            .await;
            self.record_lead_score(&contact.id, &assessment);
            if assessment.qualified && self.cooldown.is_elapsed(&contact.id) {
                discovery_call_allowed = true;
            }
        }

        let reply_start = Instant::now();
        let outcome = conversa_rag::generate_reply(
            self.llm.as_ref(),
            &credentials.llm_api_key,
            self.knowledge.as_ref(),
            &event.tenant,
            &contact,
            &conversation_state,
            &event.text,
            &history,
            &self.model,
            is_first_contact,
            discovery_call_allowed,
            &self.discovery_call_url,
        )
        .await;
        let latency_ms = reply_start.elapsed().as_millis() as u64;

        if outcome.discovery_call_offered {
            self.cooldown.record_offer(&contact.id);
        }

        let message_id = MessageId::new();
        self.record_reply_analytics(message_id.clone(), &contact, &outcome, latency_ms);

        self.persist_and_send(message_id, &event.tenant, &conversation.id, &from, &outcome.reply, credentials).await?;
        self.record_session(&contact, &conversation.id);

        Ok(ProcessOutcome::Replied {
            message: outcome.reply,
            discovery_call_offered: outcome.discovery_call_offered,
            degraded: outcome.degraded,
        })
    }

    fn record_lead_score(&self, contact: &conversa_core::ids::ContactId, assessment: &conversa_qualifier::Assessment) {
        let overall = f64::from(assessment.score) / 100.0;
        self.analytics.record(AnalyticsEvent::Lead(LeadScore {
            contact: contact.clone(),
            overall,
            engagement: overall,
            intent: overall,
            fit: f64::from(assessment.confidence),
            timing: overall,
            behavior_snapshot: assessment.reasons.join("; "),
            calculated_at: Utc::now(),
        }));
    }

    fn record_session(&self, contact: &conversa_core::domain::Contact, conversation_id: &conversa_core::ids::ConversationId) {
        self.analytics.record(AnalyticsEvent::Session(ConversationSession {
            session_id: conversation_id.to_string(),
            contact: contact.id.clone(),
            started_at: contact.first_contact_at,
            last_activity_at: Utc::now(),
            journey_start: contact.journey_stage,
            journey_end: contact.journey_stage,
            message_count: contact.total_interactions,
            lead_score: None,
            engagement_score: None,
            flags: Vec::new(),
        }));
    }

    fn record_reply_analytics(
        &self,
        message_id: MessageId,
        contact: &conversa_core::domain::Contact,
        outcome: &conversa_rag::ReplyOutcome,
        latency_ms: u64,
    ) {
        let status = if outcome.degraded {
            "error"
        } else if latency_ms > REPLY_LATENCY_BUDGET_MS {
            "timeout"
        } else {
            "ok"
        };
        self.analytics.record(AnalyticsEvent::Performance(PerformanceSample {
            endpoint: "conversa_rag::generate_reply".to_string(),
            op: if outcome.used_rag { "rag".to_string() } else { "fallback".to_string() },
            latency_ms,
            status: status.to_string(),
            model: Some(self.model.clone()),
            tokens: Some(outcome.tokens_in + outcome.tokens_out),
            cost: None,
            error_reason: outcome.degraded.then(|| "double model failure".to_string()),
            created_at: Utc::now(),
        }));

        self.analytics.record(AnalyticsEvent::Message(MessageAnalytics {
            message_id,
            role: MessageRole::Assistant,
            length: outcome.reply.chars().count() as u32,
            handler_kind: "ai".to_string(),
            rag_docs: outcome.rag_docs as u32,
            rag_latency_ms: outcome.rag_latency_ms,
            personalization_level: Some(outcome.strategy.personalization_level.to_string()),
            response_strategy: Some(outcome.strategy.response_strategy.to_string()),
            communication_style: Some(outcome.strategy.communication_style.to_string()),
            intents: outcome.intents.iter().map(|s| s.to_string()).collect(),
            business_category: contact.industry_focus.clone(),
            urgency: Some(outcome.strategy.urgency_level.to_string()),
            latency_ms,
            tokens_in: outcome.tokens_in,
            tokens_out: outcome.tokens_out,
            cost_estimate: 0.0,
            created_at: Utc::now(),
        }));
    }

    async fn persist_and_send(
        &self,
        message_id: MessageId,
        tenant: &TenantId,
        conversation_id: &conversa_core::ids::ConversationId,
        to: &str,
        body: &str,
        credentials: &TenantCredentials,
    ) -> Result<(), conversa_context::ContextError> {
        let now = Utc::now();
        let mut outbound = Message {
            id: message_id,
            conversation: conversation_id.clone(),
            role: MessageRole::Assistant,
            content: body.to_string(),
            channel_message_id: None,
            status: MessageStatus::Queued,
            created_at: now,
            status_updated_at: now,
            error_reason: None,
        };

        if !self.rate_limiter.try_acquire(tenant) {
            warn!(%tenant, "outbound send deferred, tenant rate limit exhausted");
            outbound.status = MessageStatus::Failed;
            outbound.error_reason = Some("rate limited".to_string());
            return self.context.insert_message(&outbound);
        }

        match self
            .channel
            .send_text(&credentials.channel_api_token, &OutboundText { to: to.to_string(), body: body.to_string() })
            .await
        {
            Ok(result) => {
                outbound.channel_message_id = Some(result.channel_message_id);
                outbound.status = MessageStatus::Sent;
            }
            Err(err) => {
                warn!(error = %err, "outbound send failed after retries");
                outbound.status = MessageStatus::Failed;
                outbound.error_reason = Some(err.to_string());
            }
        }
        self.context.insert_message(&outbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use conversa_channel::{ContactInfo, GroupInfo, OutboundMedia, SendResult, SessionStatus};
    use conversa_core::ids::TenantId;
    use conversa_llm::{ChatRequest, ChatResponse, LlmError};
    use rusqlite::Connection;

    struct StubChannel;

    #[async_trait]
    impl ChannelClient for StubChannel {
        async fn send_text(&self, _api_token: &str, _msg: &OutboundText) -> Result<SendResult, conversa_channel::ChannelError> {
            Ok(SendResult { channel_message_id: "gw-1".to_string() })
        }
        async fn send_media(
            &self,
            _api_token: &str,
            _msg: &OutboundMedia,
        ) -> Result<SendResult, conversa_channel::ChannelError> {
            unimplemented!()
        }
        async fn list_groups(&self, _api_token: &str) -> Result<Vec<GroupInfo>, conversa_channel::ChannelError> {
            Ok(vec![])
        }
        async fn list_contacts(&self, _api_token: &str) -> Result<Vec<ContactInfo>, conversa_channel::ChannelError> {
            Ok(vec![])
        }
        async fn session_status(&self, _api_token: &str) -> Result<SessionStatus, conversa_channel::ChannelError> {
            Ok(SessionStatus::Connected)
        }
    }

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn name(&self) -> &str {
            "stub"
        }
        async fn complete_chat(&self, _api_key: &str, _req: &ChatRequest) -> Result<ChatResponse, LlmError> {
            Ok(ChatResponse { content: "Thanks for your message!".to_string(), tokens_in: 10, tokens_out: 10 })
        }
        async fn embed(&self, _api_key: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(inputs.iter().map(|_| vec![0.0; 8]).collect())
        }
        fn embedding_dimensions(&self) -> usize {
            8
        }
    }

    fn processor() -> (MessageProcessor, Arc<AnalyticsQueue>) {
        let context = ContextRepository::new(Connection::open_in_memory().unwrap()).unwrap();
        let knowledge = KnowledgeStore::new(Connection::open_in_memory().unwrap(), 8).unwrap();
        let cooldown = DiscoveryCallCooldown::new(24);
        let analytics = Arc::new(AnalyticsQueue::new(64));
        let processor = MessageProcessor::new(
            Arc::new(StubChannel),
            Arc::new(StubLlm),
            Arc::new(knowledge),
            Arc::new(context),
            Arc::new(cooldown),
            Arc::new(RateLimiter::new(20, 600)),
            analytics.clone(),
            "gpt-4o-mini".to_string(),
            "https://example.test/discovery-call".to_string(),
        );
        (processor, analytics)
    }

    fn credentials() -> TenantCredentials {
        TenantCredentials { llm_api_key: "sk-test".to_string(), channel_api_token: "token".to_string() }
    }

    #[tokio::test]
    async fn echo_of_bot_number_is_ignored() {
        let (processor, _analytics) = processor();
        let event = InboundEvent {
            tenant: TenantId::new(),
            from: "15550000000".to_string(),
            channel_message_id: Some("wamid.1".to_string()),
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };
        let outcome = processor.process(event, &credentials(), Some("15550000000")).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Stopped(StopReason::EchoOrSelf)));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_ignored() {
        let (processor, _analytics) = processor();
        let tenant = TenantId::new();
        let make_event = || InboundEvent {
            tenant: tenant.clone(),
            from: "15551234567".to_string(),
            channel_message_id: Some("wamid.dup".to_string()),
            text: "we need pricing for 200 seats please".to_string(),
            timestamp: Utc::now(),
        };

        let first = processor.process(make_event(), &credentials(), None).await.unwrap();
        assert!(!matches!(first, ProcessOutcome::Stopped(_)));

        let second = processor.process(make_event(), &credentials(), None).await.unwrap();
        assert!(matches!(second, ProcessOutcome::Stopped(StopReason::DuplicateEvent)));
    }

    #[tokio::test]
    async fn ordinary_message_gets_a_reply() {
        let (processor, analytics) = processor();
        let event = InboundEvent {
            tenant: TenantId::new(),
            from: "15557654321".to_string(),
            channel_message_id: Some("wamid.ok".to_string()),
            text: "hi there, what services do you offer?".to_string(),
            timestamp: Utc::now(),
        };
        let outcome = processor.process(event, &credentials(), None).await.unwrap();
        match outcome {
            ProcessOutcome::Replied { message, .. } => assert!(!message.is_empty()),
            other => panic!("expected a reply, got {other:?}"),
        }
        assert!(!analytics.is_empty());
    }

    #[tokio::test]
    async fn reply_records_message_and_performance_samples() {
        let (processor, analytics) = processor();
        let event = InboundEvent {
            tenant: TenantId::new(),
            from: "15559990000".to_string(),
            channel_message_id: Some("wamid.analytics".to_string()),
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };
        processor.process(event, &credentials(), None).await.unwrap();

        let drained = analytics.drain();
        assert!(drained.iter().any(|e| matches!(e, conversa_analytics::AnalyticsEvent::Message(_))));
        assert!(drained.iter().any(|e| matches!(e, conversa_analytics::AnalyticsEvent::Performance(_))));
    }

    /// Always qualifies the lead (for `assess`'s JSON-mode call) while still
    /// returning a plain reply for the ordinary chat-completion calls.
    struct QualifyingStubLlm;

    #[async_trait]
    impl LlmProvider for QualifyingStubLlm {
        fn name(&self) -> &str {
            "qualifying-stub"
        }
        async fn complete_chat(&self, _api_key: &str, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
            if req.json_mode {
                return Ok(ChatResponse {
                    content: r#"{"score": 95, "confidence": 0.95, "reasons": ["budget confirmed"]}"#.to_string(),
                    tokens_in: 5,
                    tokens_out: 5,
                });
            }
            Ok(ChatResponse { content: "Happy to help with pricing!".to_string(), tokens_in: 10, tokens_out: 10 })
        }
        async fn embed(&self, _api_key: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(inputs.iter().map(|_| vec![0.0; 8]).collect())
        }
        fn embedding_dimensions(&self) -> usize {
            8
        }
    }

    fn qualifying_processor() -> (MessageProcessor, Arc<AnalyticsQueue>) {
        let context = ContextRepository::new(Connection::open_in_memory().unwrap()).unwrap();
        let knowledge = KnowledgeStore::new(Connection::open_in_memory().unwrap(), 8).unwrap();
        let cooldown = DiscoveryCallCooldown::new(24);
        let analytics = Arc::new(AnalyticsQueue::new(64));
        let processor = MessageProcessor::new(
            Arc::new(StubChannel),
            Arc::new(QualifyingStubLlm),
            Arc::new(knowledge),
            Arc::new(context),
            Arc::new(cooldown),
            Arc::new(RateLimiter::new(20, 600)),
            analytics.clone(),
            "gpt-4o-mini".to_string(),
            "https://example.test/discovery-call".to_string(),
        );
        (processor, analytics)
    }

    #[tokio::test]
    async fn discovery_call_cta_is_not_repeated_within_cooldown() {
        let (processor, _analytics) = qualifying_processor();
        let tenant = TenantId::new();
        let from = "15551112222";
        let event = |seq: u32, text: &str| InboundEvent {
            tenant: tenant.clone(),
            from: from.to_string(),
            channel_message_id: Some(format!("wamid.cooldown.{seq}")),
            text: text.to_string(),
            timestamp: Utc::now(),
        };

        // Walk the contact's journey stage Discovery -> Interest -> Evaluation, then into
        // Decision (which is where the personalization strategy picks CtaType::ScheduleCall).
        processor.process(event(1, "I'm interested, tell me more"), &credentials(), None).await.unwrap();
        processor.process(event(2, "how does this compare to alternatives?"), &credentials(), None).await.unwrap();

        let third = processor.process(event(3, "we're ready to proceed, let's get started"), &credentials(), None).await.unwrap();
        match third {
            ProcessOutcome::Replied { discovery_call_offered, .. } => assert!(discovery_call_offered),
            other => panic!("expected a reply, got {other:?}"),
        }

        let fourth = processor.process(event(4, "how much does this cost? we have a budget approved"), &credentials(), None).await.unwrap();
        match fourth {
            ProcessOutcome::Replied { discovery_call_offered, message, .. } => {
                assert!(!discovery_call_offered);
                assert!(!message.contains("example.test/discovery-call"));
            }
            other => panic!("expected a reply, got {other:?}"),
        }
    }
}
