//! Inbound message pipeline: idempotency, context update, gating, handover,
//! lead qualification, reply generation, and outbound send.

pub mod idempotency;
pub mod processor;
pub mod types;

pub use processor::MessageProcessor;
pub use types::{InboundEvent, ProcessOutcome, StopReason, TenantCredentials};
