//! Analytics sink: append-only event capture off the hot path, with a
//! bounded drop-oldest queue and an idempotent daily aggregation job.

pub mod db;
pub mod error;
pub mod repository;
pub mod sink;
pub mod types;
pub mod worker;

pub use error::{AnalyticsError, Result};
pub use repository::AnalyticsRepository;
pub use sink::AnalyticsQueue;
pub use types::{
    AnalyticsEvent, ConversationSession, DailyAggregate, LeadScore, MessageAnalytics, PerformanceSample,
    SESSION_INACTIVITY_MINUTES,
};
