use thiserror::Error;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("campaign not found: {0}")]
    NotFound(String),

    #[error("campaign has no valid recipients")]
    NoRecipients,
}

pub type Result<T> = std::result::Result<T, CampaignError>;
