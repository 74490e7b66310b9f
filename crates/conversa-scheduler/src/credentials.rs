use conversa_core::ids::TenantId;

/// Resolves the channel API token a tenant's outbound sends are
/// authenticated with. The scheduler and campaign engine only ever send
/// plain text through C1, so they need nothing from the LLM credential set.
pub trait TenantCredentialResolver: Send + Sync {
    fn channel_api_token(&self, tenant: &TenantId) -> Option<String>;
}
