//! Contact and conversation persistence, plus the lexical signal inference
//! (journey advancement, behavioral traits) folded into every inbound turn.

pub mod api_keys;
pub mod db;
pub mod error;
pub mod repository;
pub mod signals;
pub mod webhook_events;

pub use api_keys::{ApiKey, ApiKeyKind};
pub use error::ContextError;
pub use repository::ContextRepository;
pub use webhook_events::{WebhookEvent, WebhookEventStatus};
