//! Shared primitives used by every `conversa-*` crate: identifiers, domain
//! entities and their state machines, phone-number canonicalization,
//! configuration, the cross-cutting error type, and at-rest encryption.

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod ids;
pub mod phone;

pub use config::AppConfig;
pub use error::{ConversaError, Result};
