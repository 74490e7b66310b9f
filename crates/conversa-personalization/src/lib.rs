//! Turns a contact's accumulated context into a concrete response strategy
//! and a block of prompt guidance text for the reply-generation call.

pub mod prompt;
pub mod strategy;
pub mod types;

pub use strategy::plan;
pub use types::Strategy;
