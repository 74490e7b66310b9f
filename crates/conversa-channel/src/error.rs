use thiserror::Error;

/// Errors that can occur while talking to the channel gateway.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("channel session disconnected")]
    SessionDisconnected,

    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ChannelError {
    /// Whether a retry loop should attempt this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient(_) | Self::Timeout { .. }
        )
    }
}
