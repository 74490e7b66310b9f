use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use conversa_channel::{ChannelClient, OutboundText};
use conversa_context::ContextRepository;

use crate::credentials::TenantCredentialResolver;
use crate::repository::ScheduleRepository;
use crate::rescue;
use crate::schedule::next_occurrence;
use crate::types::MessageResult;

/// Drives the two periodic duties of the scheduler worker: firing due
/// campaign/scheduled messages, and nudging or auto-resolving conversations
/// stuck waiting on a human handover.
pub struct SchedulerEngine {
    schedule: Arc<ScheduleRepository>,
    context: Arc<ContextRepository>,
    channel: Arc<dyn ChannelClient>,
    credentials: Arc<dyn TenantCredentialResolver>,
    scheduled_tick_secs: u64,
    rescue_tick_secs: u64,
    rescue_stage_minutes: Vec<u32>,
    rescue_timeout_minutes: i64,
}

impl SchedulerEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schedule: Arc<ScheduleRepository>,
        context: Arc<ContextRepository>,
        channel: Arc<dyn ChannelClient>,
        credentials: Arc<dyn TenantCredentialResolver>,
        scheduled_tick_secs: u64,
        rescue_tick_secs: u64,
        rescue_stage_minutes: Vec<u32>,
        rescue_timeout_minutes: i64,
    ) -> Self {
        Self {
            schedule,
            context,
            channel,
            credentials,
            scheduled_tick_secs,
            rescue_tick_secs,
            rescue_stage_minutes,
            rescue_timeout_minutes,
        }
    }

    /// Runs both tick loops until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        let mut scheduled_interval = tokio::time::interval(std::time::Duration::from_secs(self.scheduled_tick_secs));
        let mut rescue_interval = tokio::time::interval(std::time::Duration::from_secs(self.rescue_tick_secs));

        loop {
            tokio::select! {
                _ = scheduled_interval.tick() => {
                    if let Err(e) = self.tick_scheduled_messages().await {
                        error!("scheduled-message tick error: {e}");
                    }
                }
                _ = rescue_interval.tick() => {
                    let outcome = rescue::run_once(
                        &self.context,
                        self.channel.as_ref(),
                        self.credentials.as_ref(),
                        &self.rescue_stage_minutes,
                        self.rescue_timeout_minutes,
                        Utc::now(),
                    ).await;
                    match outcome {
                        Ok(outcome) => {
                            if outcome.progressive_updates_sent > 0 || outcome.conversations_auto_resolved > 0 {
                                info!(
                                    updates = outcome.progressive_updates_sent,
                                    resolved = outcome.conversations_auto_resolved,
                                    "handover rescue sweep completed"
                                );
                            }
                        }
                        Err(e) => error!("handover rescue tick error: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick_scheduled_messages(&self) -> crate::error::Result<()> {
        let now = Utc::now();
        let due = self.schedule.due(now)?;

        for message in due {
            self.schedule.mark_processing(&message.id)?;

            let Some(api_token) = self.credentials.channel_api_token(&message.tenant) else {
                warn!(tenant = %message.tenant, scheduled_message = %message.id, "no channel credential for tenant");
                continue;
            };

            let mut sent = 0u32;
            let mut failed = 0u32;
            for target in &message.target_groups {
                let outcome = self
                    .channel
                    .send_text(&api_token, &OutboundText { to: target.clone(), body: message.message_content.clone() })
                    .await;
                let (success, error_reason) = match outcome {
                    Ok(_) => {
                        sent += 1;
                        (true, None)
                    }
                    Err(e) => {
                        failed += 1;
                        (false, Some(e.to_string()))
                    }
                };
                self.schedule.record_result(&MessageResult {
                    scheduled_message_id: message.id.clone(),
                    target: target.clone(),
                    success,
                    error_reason,
                    created_at: now,
                })?;
            }

            let next_send_at = message
                .recurring_pattern
                .map(|pattern| next_occurrence(pattern, message.recurring_interval.unwrap_or(1), now));

            self.schedule.finish_run(&message.id, sent, failed, next_send_at, now)?;
            info!(scheduled_message = %message.id, sent, failed, recurring = next_send_at.is_some(), "scheduled message fired");
        }

        Ok(())
    }
}
