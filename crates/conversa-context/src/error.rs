use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("contact not found: {0}")]
    ContactNotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("message already processed")]
    DuplicateMessage,

    #[error("illegal message status transition: {from} -> {to}")]
    IllegalStatusTransition { from: String, to: String },
}
