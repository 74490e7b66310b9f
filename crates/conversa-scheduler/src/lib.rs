//! Scheduler worker: fires due scheduled/recurring messages and runs the
//! handover timeout-rescue sweep.

pub mod credentials;
pub mod db;
pub mod engine;
pub mod error;
pub mod repository;
pub mod rescue;
pub mod schedule;
pub mod types;

pub use credentials::TenantCredentialResolver;
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use repository::ScheduleRepository;
pub use types::{MessageResult, RecurringPattern, ScheduledMessage, ScheduledMessageStatus};
