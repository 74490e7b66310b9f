use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::warn;

use crate::types::AnalyticsEvent;

const DEFAULT_CAPACITY: usize = 4096;

/// Fire-and-forget landing spot for analytics events produced on the hot
/// path. Bounded so a slow or stalled drain never lets the queue grow
/// without limit; on overflow the oldest queued event is dropped.
pub struct AnalyticsQueue {
    events: Mutex<VecDeque<AnalyticsEvent>>,
    capacity: usize,
}

impl AnalyticsQueue {
    pub fn new(capacity: usize) -> Self {
        Self { events: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn record(&self, event: AnalyticsEvent) {
        let mut events = self.events.lock().unwrap();
        if events.len() >= self.capacity {
            events.pop_front();
            warn!("analytics queue at capacity, dropped oldest event");
        }
        events.push_back(event);
    }

    /// Drains every currently-queued event for a durable-storage pass.
    pub fn drain(&self) -> Vec<AnalyticsEvent> {
        let mut events = self.events.lock().unwrap();
        events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AnalyticsQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PerformanceSample;
    use chrono::Utc;

    fn sample(tag: &str) -> AnalyticsEvent {
        AnalyticsEvent::Performance(PerformanceSample {
            endpoint: tag.to_string(),
            op: "test".to_string(),
            latency_ms: 1,
            status: "ok".to_string(),
            model: None,
            tokens: None,
            cost: None,
            error_reason: None,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn overflow_drops_the_oldest_event() {
        let queue = AnalyticsQueue::new(2);
        queue.record(sample("first"));
        queue.record(sample("second"));
        queue.record(sample("third"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        match &drained[0] {
            AnalyticsEvent::Performance(p) => assert_eq!(p.endpoint, "second"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn drain_empties_the_queue() {
        let queue = AnalyticsQueue::new(8);
        queue.record(sample("one"));
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
