use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use conversa_channel::{ChannelClient, OutboundText};
use conversa_core::phone;

use crate::error::{CampaignError, Result};
use crate::repository::CampaignRepository;
use crate::types::{CampaignStatus, MessageResult, TargetOutcome};

const DEFAULT_PACE: Duration = Duration::from_secs(10);

/// Runs one campaign to completion: a sequential per-recipient send loop
/// with a pacing delay between sends, cancellation checked between every
/// target, and per-target results recorded regardless of outcome.
pub struct CampaignRunner {
    repository: Arc<CampaignRepository>,
    channel: Arc<dyn ChannelClient>,
    pace: Duration,
}

impl CampaignRunner {
    pub fn new(repository: Arc<CampaignRepository>, channel: Arc<dyn ChannelClient>) -> Self {
        Self { repository, channel, pace: DEFAULT_PACE }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub async fn run(&self, campaign_id: &str, api_token: &str) -> Result<()> {
        let campaign = self.repository.get(campaign_id)?;
        if campaign.recipients.is_empty() {
            return Err(CampaignError::NoRecipients);
        }

        self.repository.set_status(campaign_id, CampaignStatus::Running, Utc::now())?;

        let mut sent = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;

        for (index, recipient) in campaign.recipients.iter().enumerate() {
            if self.repository.is_cancelled(campaign_id)? {
                let remaining = campaign.recipients.len() - index;
                warn!(campaign = campaign_id, remaining, "campaign cancelled mid-run, unsent targets left as skipped");
                for unsent in &campaign.recipients[index..] {
                    self.record(campaign_id, unsent, TargetOutcome::Skipped, Some("campaign cancelled".to_string())).await?;
                    skipped += 1;
                }
                break;
            }

            let canonical = phone::canonicalize(recipient);
            if !phone::is_valid(&canonical) {
                self.record(campaign_id, recipient, TargetOutcome::Skipped, Some("invalid recipient".to_string())).await?;
                skipped += 1;
                continue;
            }

            let body = campaign.message_content.clone();
            match self.channel.send_text(api_token, &OutboundText { to: canonical, body }).await {
                Ok(_) => {
                    self.record(campaign_id, recipient, TargetOutcome::Sent, None).await?;
                    sent += 1;
                }
                Err(e) => {
                    self.record(campaign_id, recipient, TargetOutcome::Failed, Some(e.to_string())).await?;
                    failed += 1;
                }
            }

            if index + 1 < campaign.recipients.len() {
                tokio::time::sleep(self.pace).await;
            }
        }

        self.repository.bump_counters(campaign_id, sent, failed, skipped)?;

        let final_status = if self.repository.is_cancelled(campaign_id)? {
            CampaignStatus::Cancelled
        } else if failed == 0 {
            CampaignStatus::Completed
        } else if sent > 0 {
            CampaignStatus::Partial
        } else {
            CampaignStatus::Failed
        };
        self.repository.set_status(campaign_id, final_status, Utc::now())?;
        info!(campaign = campaign_id, sent, failed, skipped, status = %final_status, "campaign finished");

        Ok(())
    }

    async fn record(&self, campaign_id: &str, target: &str, outcome: TargetOutcome, reason: Option<String>) -> Result<()> {
        self.repository.record_result(&MessageResult {
            campaign_id: campaign_id.to_string(),
            target: target.to_string(),
            outcome,
            reason,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use conversa_channel::{ChannelError, ContactInfo, GroupInfo, OutboundMedia, SendResult, SessionStatus};
    use conversa_core::ids::TenantId;
    use rusqlite::Connection;

    use crate::types::Campaign;

    struct FlakyChannel;

    #[async_trait]
    impl ChannelClient for FlakyChannel {
        async fn send_text(&self, _api_token: &str, msg: &OutboundText) -> std::result::Result<SendResult, ChannelError> {
            if msg.to.ends_with('1') {
                Ok(SendResult { channel_message_id: "gw-1".to_string() })
            } else {
                Err(ChannelError::Transient("rejected".to_string()))
            }
        }
        async fn send_media(&self, _api_token: &str, _msg: &OutboundMedia) -> std::result::Result<SendResult, ChannelError> {
            unimplemented!()
        }
        async fn list_groups(&self, _api_token: &str) -> std::result::Result<Vec<GroupInfo>, ChannelError> {
            Ok(vec![])
        }
        async fn list_contacts(&self, _api_token: &str) -> std::result::Result<Vec<ContactInfo>, ChannelError> {
            Ok(vec![])
        }
        async fn session_status(&self, _api_token: &str) -> std::result::Result<SessionStatus, ChannelError> {
            Ok(SessionStatus::Connected)
        }
    }

    fn runner() -> (Arc<CampaignRepository>, CampaignRunner) {
        let repo = Arc::new(CampaignRepository::new(Connection::open_in_memory().unwrap()).unwrap());
        let runner = CampaignRunner::new(repo.clone(), Arc::new(FlakyChannel)).with_pace(Duration::from_millis(1));
        (repo, runner)
    }

    #[tokio::test]
    async fn partial_when_some_targets_fail() {
        let (repo, runner) = runner();
        let campaign = Campaign::new(TenantId::new(), "hi".to_string(), vec!["15550000001".to_string(), "15550000002".to_string()]);
        repo.insert(&campaign).unwrap();

        runner.run(&campaign.id, "token").await.unwrap();

        let reloaded = repo.get(&campaign.id).unwrap();
        assert_eq!(reloaded.status, CampaignStatus::Partial);
        assert_eq!(reloaded.total_sent, 1);
        assert_eq!(reloaded.total_failed, 1);
    }

    #[tokio::test]
    async fn invalid_recipients_are_skipped_not_sent() {
        let (repo, runner) = runner();
        let campaign = Campaign::new(TenantId::new(), "hi".to_string(), vec!["abc".to_string(), "15550000001".to_string()]);
        repo.insert(&campaign).unwrap();

        runner.run(&campaign.id, "token").await.unwrap();

        let reloaded = repo.get(&campaign.id).unwrap();
        assert_eq!(reloaded.total_skipped, 1);
        assert_eq!(reloaded.total_sent, 1);
        assert_eq!(reloaded.status, CampaignStatus::Partial);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_rejected() {
        let (repo, runner) = runner();
        let campaign = Campaign::new(TenantId::new(), "hi".to_string(), vec![]);
        repo.insert(&campaign).unwrap();

        let result = runner.run(&campaign.id, "token").await;
        assert!(matches!(result, Err(CampaignError::NoRecipients)));
    }
}
