//! Agent lifecycle subsystem.
//!
//! Provides the [`manager::AgentManager`] table of running agents, the
//! [`process`] launcher/monitor it hands children to, and shared [`types`].

pub mod manager;
pub(crate) mod process;
pub mod types;

pub use manager::AgentManager;
pub use types::{AgentEvent, OutputStream, SpawnReceipt, SpawnedProcessInfo};
