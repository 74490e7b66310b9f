//! Progressive timeout messaging for handovers nobody on the human side has
//! picked up yet, plus the emergency auto-re-enable once a handover has sat
//! unresolved past the hard timeout.

use chrono::{DateTime, Duration, Utc};
use conversa_core::domain::Conversation;

/// One progressive check-in point, keyed by minutes since handover started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescueStage {
    Min10,
    Min20,
    Min30,
    Min45,
}

impl RescueStage {
    pub const ALL: [RescueStage; 4] =
        [RescueStage::Min10, RescueStage::Min20, RescueStage::Min30, RescueStage::Min45];

    /// Stable key used in [`Conversation::handover_updates_sent`].
    pub fn key(self) -> &'static str {
        match self {
            RescueStage::Min10 => "10m",
            RescueStage::Min20 => "20m",
            RescueStage::Min30 => "30m",
            RescueStage::Min45 => "45m",
        }
    }
}

/// True when a handover has been waiting at least `threshold_minutes` but the
/// stage hasn't already been sent for this conversation.
pub fn needs_stage_update(conversation: &Conversation, stage: RescueStage, threshold_minutes: i64, now: DateTime<Utc>) -> bool {
    if !conversation.handover_requested || conversation.bot_enabled {
        return false;
    }
    let Some(handover_at) = conversation.handover_timestamp else { return false };
    if conversation.handover_updates_sent.contains_key(stage.key()) {
        return false;
    }
    now - handover_at >= Duration::minutes(threshold_minutes)
}

/// True once a handover has sat unresolved past `timeout_minutes` and should
/// be force-resolved with an apology and bot re-enablement.
pub fn is_abandoned(conversation: &Conversation, now: DateTime<Utc>, timeout_minutes: i64) -> bool {
    if !conversation.handover_requested || conversation.bot_enabled {
        return false;
    }
    match conversation.handover_timestamp {
        Some(handover_at) => now - handover_at >= Duration::minutes(timeout_minutes),
        None => false,
    }
}

fn wait_minutes(conversation: &Conversation, now: DateTime<Utc>) -> i64 {
    conversation
        .handover_timestamp
        .map(|t| (now - t).num_minutes())
        .unwrap_or(0)
        .max(0)
}

/// Builds the check-in message for one progressive stage.
pub fn progressive_message(stage: RescueStage, customer_name: &str, conversation: &Conversation, now: DateTime<Utc>) -> String {
    let minutes = wait_minutes(conversation, now);
    match stage {
        RescueStage::Min10 => format!(
            "Hi {customer_name}, just checking in — our team has your message and is working on a reply. \
             Thanks for your patience, it's been about {minutes} minutes so far."
        ),
        RescueStage::Min20 => format!(
            "Hi {customer_name}, I know the wait has stretched to around {minutes} minutes now. \
             Our human team is still catching up on your request and hasn't forgotten you."
        ),
        RescueStage::Min30 => format!(
            "Hi {customer_name}, this has now been about {minutes} minutes without a reply from our team, \
             and I wanted to personally follow up. If anything urgent comes up in the meantime, let me know \
             and I'll see what I can help with directly."
        ),
        RescueStage::Min45 => format!(
            "Hi {customer_name}, I'm sorry this is taking so long — about {minutes} minutes now. \
             If you'd like, I can step back in with full context of our conversation while you wait \
             for the team, just say the word."
        ),
    }
}

/// Builds the apology sent when the bot force-resumes a conversation after
/// the handover timeout elapses unresolved.
pub fn apology_message(customer_name: &str, conversation: &Conversation, now: DateTime<Utc>) -> String {
    let minutes = wait_minutes(conversation, now);
    format!(
        "Hi {customer_name}! I sincerely apologize — you've been waiting {minutes} minutes for our \
         human team, and that's not the experience we want for you. I'm back with the full context of \
         our conversation and can keep helping right now. A human teammate can still step in any time \
         you'd like, but you won't be left waiting in the meantime."
    )
}

/// Reason string recorded on auto-resolution.
pub fn auto_resolution_reason(conversation: &Conversation, now: DateTime<Utc>) -> String {
    format!("auto-resolved: emergency timeout after {} minutes", wait_minutes(conversation, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ids::TenantId;

    fn handed_over_conversation(minutes_ago: i64) -> (Conversation, DateTime<Utc>) {
        let tenant = TenantId::new();
        let mut conversation = Conversation::new(tenant, conversa_core::ids::ContactId::new());
        let now = Utc::now();
        conversation.bot_enabled = false;
        conversation.handover_requested = true;
        conversation.handover_timestamp = Some(now - Duration::minutes(minutes_ago));
        (conversation, now)
    }

    #[test]
    fn needs_stage_update_fires_once_threshold_crossed() {
        let (conversation, now) = handed_over_conversation(12);
        assert!(needs_stage_update(&conversation, RescueStage::Min10, 10, now));
        assert!(!needs_stage_update(&conversation, RescueStage::Min20, 20, now));
    }

    #[test]
    fn needs_stage_update_skips_already_sent_stage() {
        let (mut conversation, now) = handed_over_conversation(15);
        conversation.handover_updates_sent.insert("10m".to_string(), now);
        assert!(!needs_stage_update(&conversation, RescueStage::Min10, 10, now));
    }

    #[test]
    fn is_abandoned_after_timeout() {
        let (conversation, now) = handed_over_conversation(65);
        assert!(is_abandoned(&conversation, now, 60));
    }

    #[test]
    fn not_abandoned_before_timeout() {
        let (conversation, now) = handed_over_conversation(30);
        assert!(!is_abandoned(&conversation, now, 60));
    }

    #[test]
    fn resolved_conversation_never_needs_updates() {
        let (mut conversation, now) = handed_over_conversation(90);
        conversation.bot_enabled = true;
        conversation.handover_requested = false;
        assert!(!is_abandoned(&conversation, now, 60));
        assert!(!needs_stage_update(&conversation, RescueStage::Min45, 45, now));
    }
}
