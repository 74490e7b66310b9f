use std::sync::Arc;

use conversa_context::{ApiKeyKind, ContextRepository};
use conversa_core::config::AppConfig;
use conversa_core::crypto::MasterKey;
use conversa_core::ids::TenantId;
use conversa_llm::KeyCache;
use conversa_processor::TenantCredentials;

/// Resolves the per-tenant secrets every outbound call needs: a provisioned
/// `ApiKey` row decrypted through the deployment's master key, falling back
/// to the deployment-wide default from config when a tenant hasn't
/// provisioned one of their own (§6's `LLM_API_KEY`/`CHANNEL_API_TOKEN`
/// fallback).
pub struct GatewayCredentialResolver {
    context: Arc<ContextRepository>,
    master: MasterKey,
    llm_cache: Arc<KeyCache>,
    default_llm_key: Option<String>,
    default_channel_token: Option<String>,
}

impl GatewayCredentialResolver {
    pub fn new(context: Arc<ContextRepository>, master: MasterKey, llm_cache: Arc<KeyCache>, config: &AppConfig) -> Self {
        Self {
            context,
            master,
            llm_cache,
            default_llm_key: config.llm.default_api_key.clone(),
            default_channel_token: config.channel.api_token.clone(),
        }
    }

    pub fn llm_api_key(&self, tenant: &TenantId) -> Option<String> {
        match self.context.active_api_key(tenant, ApiKeyKind::Llm) {
            Ok(Some(key)) => {
                let resolved = self.llm_cache.resolve(tenant, Some(&key.encrypted_secret)).ok();
                if resolved.is_some() {
                    let _ = self.context.touch_api_key_usage(&key.id);
                }
                resolved.or_else(|| self.default_llm_key.clone())
            }
            _ => self.default_llm_key.clone(),
        }
    }

    /// Channel tokens aren't cached the way LLM keys are: `KeyCache` is
    /// keyed by tenant alone, built for the single-secret-per-tenant hot
    /// path of LLM calls, and a tenant can carry both an LLM and a channel
    /// key at once. Decrypting directly here trades a cheap AEAD op for
    /// correctness rather than stretching that cache to hold two kinds.
    pub fn channel_api_token(&self, tenant: &TenantId) -> Option<String> {
        match self.context.active_api_key(tenant, ApiKeyKind::Channel) {
            Ok(Some(key)) => {
                let decrypted = self.master.decrypt(&key.encrypted_secret).ok();
                if decrypted.is_some() {
                    let _ = self.context.touch_api_key_usage(&key.id);
                }
                decrypted.or_else(|| self.default_channel_token.clone())
            }
            _ => self.default_channel_token.clone(),
        }
    }

    pub fn tenant_credentials(&self, tenant: &TenantId) -> Option<TenantCredentials> {
        Some(TenantCredentials {
            llm_api_key: self.llm_api_key(tenant)?,
            channel_api_token: self.channel_api_token(tenant)?,
        })
    }
}

impl conversa_scheduler::TenantCredentialResolver for GatewayCredentialResolver {
    fn channel_api_token(&self, tenant: &TenantId) -> Option<String> {
        GatewayCredentialResolver::channel_api_token(self, tenant)
    }
}
