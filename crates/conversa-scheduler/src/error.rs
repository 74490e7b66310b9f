use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("context error: {0}")]
    Context(#[from] conversa_context::ContextError),

    #[error("invalid recurring pattern: {0}")]
    InvalidPattern(String),

    #[error("scheduled message not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
