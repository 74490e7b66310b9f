//! Human-handover decisioning: when to hand a conversation off, and how to
//! keep a customer informed while it sits in the human queue.

pub mod classify;
pub mod rescue;

pub use classify::{classify, fallback_classify, Classification};
pub use rescue::RescueStage;
