use std::time::{Duration, Instant};

use conversa_core::ids::TenantId;
use dashmap::DashMap;

/// Per-tenant token-bucket limiter covering both a per-minute and a
/// per-hour ceiling on outbound sends. A send only proceeds when both
/// buckets have a token available.
pub struct RateLimiter {
    per_minute_capacity: u32,
    per_hour_capacity: u32,
    buckets: DashMap<TenantId, TenantBuckets>,
}

struct TenantBuckets {
    minute: Bucket,
    hour: Bucket,
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: u32, window: Duration) -> Self {
        let capacity = capacity as f64;
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    pub fn new(per_minute_capacity: u32, per_hour_capacity: u32) -> Self {
        Self {
            per_minute_capacity,
            per_hour_capacity,
            buckets: DashMap::new(),
        }
    }

    /// Attempt to consume one token from both of the tenant's buckets.
    /// Returns `false` (and consumes nothing) if either is exhausted.
    pub fn try_acquire(&self, tenant: &TenantId) -> bool {
        let mut entry = self.buckets.entry(tenant.clone()).or_insert_with(|| TenantBuckets {
            minute: Bucket::new(self.per_minute_capacity, Duration::from_secs(60)),
            hour: Bucket::new(self.per_hour_capacity, Duration::from_secs(3600)),
        });

        // Peek both before committing either, so a consumed minute-token
        // isn't wasted when the hourly bucket rejects the send.
        let minute_ok = entry.minute.tokens >= 1.0
            || entry.minute.last_refill.elapsed().as_secs_f64() * entry.minute.refill_per_sec >= 1.0;
        let hour_ok = entry.hour.tokens >= 1.0
            || entry.hour.last_refill.elapsed().as_secs_f64() * entry.hour.refill_per_sec >= 1.0;

        if !minute_ok || !hour_ok {
            return false;
        }

        entry.minute.try_consume() && entry.hour.try_consume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity_then_blocks() {
        let limiter = RateLimiter::new(2, 100);
        let tenant = TenantId::new();
        assert!(limiter.try_acquire(&tenant));
        assert!(limiter.try_acquire(&tenant));
        assert!(!limiter.try_acquire(&tenant));
    }

    #[test]
    fn buckets_are_independent_per_tenant() {
        let limiter = RateLimiter::new(1, 100);
        let a = TenantId::new();
        let b = TenantId::new();
        assert!(limiter.try_acquire(&a));
        assert!(!limiter.try_acquire(&a));
        assert!(limiter.try_acquire(&b));
    }

    #[test]
    fn hourly_cap_can_block_even_with_minute_tokens() {
        let limiter = RateLimiter::new(10, 1);
        let tenant = TenantId::new();
        assert!(limiter.try_acquire(&tenant));
        assert!(!limiter.try_acquire(&tenant));
    }
}
