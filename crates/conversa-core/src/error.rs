use thiserror::Error;

/// Cross-cutting error type used at composition-root boundaries (the HTTP
/// layer converts this to a status code). Individual components define their
/// own narrower error enum and convert into this one at the edge.
#[derive(Debug, Error)]
pub enum ConversaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("channel error ({channel}): {reason}")]
    Channel { channel: String, reason: String },

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("contact not found: {0}")]
    ContactNotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConversaError {
    /// Short, stable error code string suitable for logging and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Channel { .. } => "CHANNEL_ERROR",
            Self::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            Self::ContactNotFound(_) => "CONTACT_NOT_FOUND",
            Self::ConversationNotFound(_) => "CONVERSATION_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Encryption(_) => "ENCRYPTION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversaError>;
