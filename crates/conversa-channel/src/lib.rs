//! Outbound messaging gateway client: HTTP transport to the channel
//! provider, message chunking for the provider's length limits, and a
//! per-tenant rate limiter.

pub mod chunking;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod types;

pub use chunking::split_message;
pub use client::{ChannelClient, HttpChannelClient};
pub use error::ChannelError;
pub use rate_limit::RateLimiter;
pub use types::{ContactInfo, GroupInfo, OutboundMedia, OutboundText, SendResult, SessionStatus};
