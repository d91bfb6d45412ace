// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod agent;
pub mod config;
pub mod notify;
pub mod publish;
pub mod source;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::{AgentConfig, SmtpConfig};
pub use crate::notify::Notifier;
pub use crate::source::{Mix, MixSource};
pub use crate::store::Store;
