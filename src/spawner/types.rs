//! Type definitions for the agent spawner.
//!
//! These types form the vocabulary between the [`super::manager::AgentManager`],
//! the chat-bridge adapter that drives it, and whatever observes agent output.
//! Snapshot types derive [`serde::Serialize`] for JSON responses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which output stream of the agent a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Side-channel notifications emitted by the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// One line of agent output. Content is never interpreted.
    Output {
        project: String,
        stream: OutputStream,
        line: String,
    },

    /// The agent process was reaped and its slot released.
    ///
    /// `code` is `None` when the process was ended by a signal or when
    /// waiting on it failed.
    Exited { project: String, code: Option<i32> },
}

/// Read-only view of a running agent, returned by `list_spawned_processes`.
///
/// This is a snapshot: the agent may exit right after it is taken.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnedProcessInfo {
    /// Registered project name.
    pub project_name: String,
    /// OS process id.
    pub process_id: u32,
    pub start_time: DateTime<Utc>,
    pub initial_prompt: Option<String>,
    /// Whole minutes since `start_time`, computed when the snapshot was taken.
    pub elapsed_minutes: i64,
}

/// Successful spawn result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnReceipt {
    pub project_name: String,
    pub process_id: u32,
    pub initial_prompt: Option<String>,
}

impl fmt::Display for SpawnReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent started in {}", self.project_name)?;
        if let Some(prompt) = &self.initial_prompt {
            write!(f, " with prompt: \"{prompt}\"")?;
        }
        Ok(())
    }
}
