use std::time::{Duration, Instant};

use conversa_core::crypto::MasterKey;
use conversa_core::ids::TenantId;
use dashmap::DashMap;

use crate::error::LlmError;

const TTL: Duration = Duration::from_secs(5 * 60);

struct CachedKey {
    plaintext: String,
    expires_at: Instant,
}

/// Caches decrypted per-tenant API keys for a short window so the hot path
/// of message processing doesn't pay the AEAD decrypt cost on every message,
/// while keeping the window short enough that a rotated key takes effect
/// quickly.
pub struct KeyCache {
    master: MasterKey,
    entries: DashMap<TenantId, CachedKey>,
}

impl KeyCache {
    pub fn new(master: MasterKey) -> Self {
        Self {
            master,
            entries: DashMap::new(),
        }
    }

    /// Resolve the plaintext key for `tenant`, decrypting `encrypted` if
    /// the cache has no fresh entry.
    pub fn resolve(&self, tenant: &TenantId, encrypted: Option<&str>) -> Result<String, LlmError> {
        if let Some(cached) = self.entries.get(tenant) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.plaintext.clone());
            }
        }

        let encrypted = encrypted.ok_or(LlmError::MissingKey)?;
        let plaintext = self
            .master
            .decrypt(encrypted)
            .map_err(|e| LlmError::Http(e.to_string()))?;

        self.entries.insert(
            tenant.clone(),
            CachedKey {
                plaintext: plaintext.clone(),
                expires_at: Instant::now() + TTL,
            },
        );
        Ok(plaintext)
    }

    /// Drop a tenant's cached key, forcing the next resolve to re-decrypt.
    /// Called after a key rotation.
    pub fn invalidate(&self, tenant: &TenantId) {
        self.entries.remove(tenant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn cache() -> KeyCache {
        KeyCache::new(MasterKey::from_base64(&STANDARD.encode([3u8; 32])).unwrap())
    }

    #[test]
    fn resolves_and_caches() {
        let cache = cache();
        let tenant = TenantId::new();
        let encrypted = cache.master.encrypt("sk-test-key").unwrap();

        let first = cache.resolve(&tenant, Some(&encrypted)).unwrap();
        assert_eq!(first, "sk-test-key");

        // Second call succeeds from cache even without the ciphertext.
        let second = cache.resolve(&tenant, None).unwrap();
        assert_eq!(second, "sk-test-key");
    }

    #[test]
    fn missing_key_errors() {
        let cache = cache();
        let tenant = TenantId::new();
        assert!(matches!(cache.resolve(&tenant, None), Err(LlmError::MissingKey)));
    }

    #[test]
    fn invalidate_forces_redecrypt() {
        let cache = cache();
        let tenant = TenantId::new();
        let encrypted = cache.master.encrypt("sk-one").unwrap();
        cache.resolve(&tenant, Some(&encrypted)).unwrap();

        cache.invalidate(&tenant);
        assert!(cache.resolve(&tenant, None).is_err());
    }
}
