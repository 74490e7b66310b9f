use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashSet;

/// Fast first line of defense against re-delivered webhooks: a bounded
/// recently-seen set. The durable backstop is the unique index on
/// `Message.channel_message_id` in `conversa-context`, which catches
/// anything that ages out of this cache or arrives on a different
/// process.
pub struct IdempotencyCache {
    seen: DashSet<String>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl IdempotencyCache {
    pub fn new(capacity: usize) -> Self {
        Self { seen: DashSet::new(), order: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    /// Records `channel_message_id` as seen, returning `true` if it was
    /// already present (a duplicate delivery).
    pub fn is_duplicate(&self, channel_message_id: &str) -> bool {
        if !self.seen.insert(channel_message_id.to_string()) {
            return true;
        }

        let mut order = self.order.lock().unwrap();
        order.push_back(channel_message_id.to_string());
        if order.len() > self.capacity {
            if let Some(evicted) = order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_sighting_is_a_duplicate() {
        let cache = IdempotencyCache::new(10);
        assert!(!cache.is_duplicate("wamid.1"));
        assert!(cache.is_duplicate("wamid.1"));
    }

    #[test]
    fn eviction_forgets_the_oldest_entry() {
        let cache = IdempotencyCache::new(2);
        assert!(!cache.is_duplicate("a"));
        assert!(!cache.is_duplicate("b"));
        assert!(!cache.is_duplicate("c")); // evicts "a"
        assert!(!cache.is_duplicate("a")); // forgotten, looks new again
    }
}
