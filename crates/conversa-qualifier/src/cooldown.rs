//! Prevents re-sending the discovery-call offer to the same contact within
//! the configured window.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use conversa_core::ids::ContactId;

pub struct DiscoveryCallCooldown {
    window: Duration,
    last_offered: DashMap<ContactId, DateTime<Utc>>,
}

impl DiscoveryCallCooldown {
    pub fn new(cooldown_hours: i64) -> Self {
        Self { window: Duration::hours(cooldown_hours), last_offered: DashMap::new() }
    }

    /// True if the contact has not been offered a discovery call within the
    /// cooldown window (or has never been offered one at all).
    pub fn is_elapsed(&self, contact: &ContactId) -> bool {
        match self.last_offered.get(contact) {
            Some(last) => Utc::now() - *last >= self.window,
            None => true,
        }
    }

    /// Records that the offer was just sent, starting a fresh cooldown.
    pub fn record_offer(&self, contact: &ContactId) {
        self.last_offered.insert(contact.clone(), Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_for_contact_never_offered() {
        let cooldown = DiscoveryCallCooldown::new(24);
        assert!(cooldown.is_elapsed(&ContactId::new()));
    }

    #[test]
    fn not_elapsed_immediately_after_offer() {
        let cooldown = DiscoveryCallCooldown::new(24);
        let contact = ContactId::new();
        cooldown.record_offer(&contact);
        assert!(!cooldown.is_elapsed(&contact));
    }

    #[test]
    fn elapsed_once_window_passes() {
        let cooldown = DiscoveryCallCooldown::new(0);
        let contact = ContactId::new();
        cooldown.record_offer(&contact);
        assert!(cooldown.is_elapsed(&contact));
    }
}
