//! Decides whether a lead is ready for a discovery-call offer: a cheap
//! pre-gate, an LLM-scored assessment, and a per-contact cooldown on the
//! offer itself.

pub mod assess;
pub mod cooldown;
pub mod gate;

pub use assess::{assess, Assessment};
pub use cooldown::DiscoveryCallCooldown;
pub use gate::passes_pre_gate;
