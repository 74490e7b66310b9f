use chrono::{DateTime, Utc};
use tracing::{info, warn};

use conversa_channel::{ChannelClient, OutboundText};
use conversa_context::ContextRepository;
use conversa_handover::rescue::{apology_message, auto_resolution_reason, is_abandoned, needs_stage_update, progressive_message, RescueStage};

use crate::credentials::TenantCredentialResolver;
use crate::error::Result;

/// Fallback stage thresholds used when the configured list doesn't have one
/// entry per [`RescueStage::ALL`] member.
const DEFAULT_STAGE_MINUTES: [u32; 4] = [10, 20, 30, 45];

#[derive(Debug, Default)]
pub struct RescueOutcome {
    pub progressive_updates_sent: usize,
    pub conversations_auto_resolved: usize,
}

/// Pairs each [`RescueStage`] with its configured threshold, falling back to
/// [`DEFAULT_STAGE_MINUTES`] (with a warning) when `configured` doesn't have
/// exactly one entry per stage.
fn resolve_stage_minutes(configured: &[u32]) -> [i64; 4] {
    if configured.len() != RescueStage::ALL.len() {
        warn!(
            configured = configured.len(),
            expected = RescueStage::ALL.len(),
            "rescue_stage_minutes has the wrong number of entries, using defaults"
        );
        return DEFAULT_STAGE_MINUTES.map(i64::from);
    }
    [
        i64::from(configured[0]),
        i64::from(configured[1]),
        i64::from(configured[2]),
        i64::from(configured[3]),
    ]
}

/// One tick of the handover-rescue loop: walk every conversation sitting
/// with a human, and either nudge the customer with a progressive update or
/// force-resume the bot once the hard timeout has passed.
pub async fn run_once(
    context: &ContextRepository,
    channel: &dyn ChannelClient,
    credentials: &dyn TenantCredentialResolver,
    stage_minutes: &[u32],
    abandonment_timeout_minutes: i64,
    now: DateTime<Utc>,
) -> Result<RescueOutcome> {
    let mut outcome = RescueOutcome::default();
    let thresholds = resolve_stage_minutes(stage_minutes);
    let pending = context.conversations_pending_rescue()?;

    for mut conversation in pending {
        let Some(api_token) = credentials.channel_api_token(&conversation.tenant) else {
            warn!(tenant = %conversation.tenant, "no channel credential for tenant, skipping rescue");
            continue;
        };
        let contact = match context.contact_by_id(&conversation.contact) {
            Ok(contact) => contact,
            Err(e) => {
                warn!(error = %e, "contact lookup failed during rescue sweep");
                continue;
            }
        };
        let customer_name = contact.name.clone().unwrap_or_else(|| "there".to_string());

        if is_abandoned(&conversation, now, abandonment_timeout_minutes) {
            let body = apology_message(&customer_name, &conversation, now);
            if send(channel, &api_token, &contact.phone_number, &body).await {
                conversation.bot_enabled = true;
                conversation.handover_resolved_at = Some(now);
                conversation.handover_resolution_reason = Some(auto_resolution_reason(&conversation, now));
                conversation.handover_updates_sent.clear();
                context.save_conversation(&conversation)?;
                outcome.conversations_auto_resolved += 1;
                info!(conversation = %conversation.id, "handover auto-resolved after timeout");
            }
            continue;
        }

        let due_stage = RescueStage::ALL
            .into_iter()
            .zip(thresholds)
            .find(|(stage, threshold)| needs_stage_update(&conversation, *stage, *threshold, now))
            .map(|(stage, _)| stage);

        if let Some(stage) = due_stage {
            let body = progressive_message(stage, &customer_name, &conversation, now);
            if send(channel, &api_token, &contact.phone_number, &body).await {
                conversation.handover_updates_sent.insert(stage.key().to_string(), now);
                context.save_conversation(&conversation)?;
                outcome.progressive_updates_sent += 1;
            }
        }
    }

    Ok(outcome)
}

async fn send(channel: &dyn ChannelClient, api_token: &str, to: &str, body: &str) -> bool {
    match channel.send_text(api_token, &OutboundText { to: to.to_string(), body: body.to_string() }).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "rescue message send failed");
            false
        }
    }
}
