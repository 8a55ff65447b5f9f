//! Central table of running agents.
//!
//! [`AgentManager`] is the single source of truth for "is this project's
//! agent running". It wraps a `HashMap` behind `Arc<Mutex<..>>` keyed by the
//! lowercased project name, so each project has exactly one slot.
//!
//! **Concurrency model:** table accesses are short and never held across an
//! `.await`. Spawns are additionally serialized by an async lock held from
//! the running check until the new entry is inserted, which keeps
//! check-then-launch atomic even when two requests for the same project
//! arrive together.
//!
//! **Lifetime model:** the manager tracks agents, it does not own them.
//! Agents are detached from the host, and a new manager knows nothing about
//! agents started by a previous one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::process::{self, LaunchSettings};
use super::types::{AgentEvent, SpawnReceipt, SpawnedProcessInfo};
use crate::config::AppConfig;
use crate::error::{KillError, SpawnError};
use crate::registry::ProjectRegistry;

/// Internal table entry. Callers see [`SpawnedProcessInfo`] snapshots.
struct AgentEntry {
    /// Distinguishes successive agents in the same slot, so a late exit
    /// notification never clears a newer entry.
    spawn_id: String,
    /// Registered project name (original casing).
    project_name: String,
    pid: u32,
    start_time: DateTime<Utc>,
    initial_prompt: Option<String>,
}

/// Tracks at most one running agent per registered project.
///
/// Cloning yields another handle to the same table. Separately constructed
/// managers share nothing.
#[derive(Clone)]
pub struct AgentManager {
    entries: Arc<Mutex<HashMap<String, AgentEntry>>>,
    spawn_lock: Arc<tokio::sync::Mutex<()>>,
    registry: ProjectRegistry,
    launch: LaunchSettings,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl AgentManager {
    /// Create a manager that resolves projects through `registry`.
    ///
    /// - `config`: supplies the agent executable and the spawn marker variable.
    /// - `event_tx`: optional channel receiving agent output and exit events.
    pub fn new(
        registry: ProjectRegistry,
        config: &AppConfig,
        event_tx: Option<UnboundedSender<AgentEvent>>,
    ) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            spawn_lock: Arc::new(tokio::sync::Mutex::new(())),
            registry,
            launch: LaunchSettings {
                command: config.agent_command.clone(),
                spawn_marker: config.spawn_marker.clone(),
            },
            event_tx,
        }
    }

    /// The registry this manager resolves projects against.
    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    /// Start the agent in a registered project.
    ///
    /// 1. Reject if the project already has a running agent.
    /// 2. Resolve the project directory through the registry.
    /// 3. Launch the agent there, detached, with the spawn marker set.
    /// 4. Record it and hand the child to a monitor task that releases the
    ///    slot when it exits, then touch the project.
    pub async fn spawn_agent(
        &self,
        project_name: &str,
        initial_prompt: Option<String>,
    ) -> Result<SpawnReceipt, SpawnError> {
        let guard = self.spawn_lock.lock().await;

        if self.is_agent_running(project_name) {
            return Err(SpawnError::AlreadyRunning {
                project: project_name.to_string(),
            });
        }

        let project = match self.registry.find_project(project_name).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                return Err(SpawnError::ProjectNotFound {
                    project: project_name.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(project = %project_name, error = %e, "Registry lookup failed");
                return Err(SpawnError::LaunchFailed {
                    project: project_name.to_string(),
                    reason: "project registry unavailable".to_string(),
                });
            }
        };

        if !ProjectRegistry::validate_project_path(&project.path).await {
            tracing::error!(project = %project.name, path = %project.path.display(), "Project directory missing");
            return Err(SpawnError::LaunchFailed {
                project: project.name,
                reason: "project directory does not exist".to_string(),
            });
        }

        let child = process::launch(&self.launch, &project.path, initial_prompt.as_deref())
            .map_err(|e| {
                tracing::error!(project = %project.name, command = %self.launch.command, error = %e, "Failed to launch agent");
                SpawnError::LaunchFailed {
                    project: project.name.clone(),
                    reason: process::launch_failure_reason(&self.launch.command, &e),
                }
            })?;

        // A freshly spawned child always has a pid until it is reaped.
        let Some(pid) = child.id() else {
            return Err(SpawnError::LaunchFailed {
                project: project.name,
                reason: "agent exited before it could be tracked".to_string(),
            });
        };

        let spawn_id = Uuid::new_v4().to_string();
        let start_time = Utc::now();
        self.entries.lock().unwrap().insert(
            slot_key(&project.name),
            AgentEntry {
                spawn_id: spawn_id.clone(),
                project_name: project.name.clone(),
                pid,
                start_time,
                initial_prompt: initial_prompt.clone(),
            },
        );
        // No await between insert and supervise: a cancelled caller must
        // never leave an entry without a monitor.
        process::supervise(self.clone(), project.name.clone(), spawn_id, child);
        drop(guard);

        tracing::info!(project = %project.name, pid, path = %project.path.display(), "Agent started");

        if let Err(e) = self.registry.touch_project(&project.name).await {
            tracing::warn!(project = %project.name, error = %e, "Failed to update last access time");
        }

        Ok(SpawnReceipt {
            project_name: project.name,
            process_id: pid,
            initial_prompt,
        })
    }

    /// Send SIGTERM to a project's agent and release its slot.
    ///
    /// The slot is released before the signal is sent and stays released
    /// even if delivery fails. Does not wait for the process to exit.
    pub fn kill_agent(&self, project_name: &str) -> Result<(), KillError> {
        let entry = self
            .entries
            .lock()
            .unwrap()
            .remove(&slot_key(project_name))
            .ok_or_else(|| KillError::NotRunning {
                project: project_name.to_string(),
            })?;

        match signal::kill(Pid::from_raw(entry.pid as i32), Signal::SIGTERM) {
            Ok(()) => {
                tracing::info!(project = %entry.project_name, pid = entry.pid, "Agent terminated");
                Ok(())
            }
            Err(errno) => {
                tracing::warn!(project = %entry.project_name, pid = entry.pid, error = %errno, "Failed to signal agent");
                Err(KillError::KillFailed {
                    project: entry.project_name,
                    reason: errno.desc().to_string(),
                })
            }
        }
    }

    /// Snapshot of all running agents, oldest first.
    pub fn list_spawned_processes(&self) -> Vec<SpawnedProcessInfo> {
        let now = Utc::now();
        let entries = self.entries.lock().unwrap();
        let mut infos: Vec<SpawnedProcessInfo> = entries
            .values()
            .map(|e| SpawnedProcessInfo {
                project_name: e.project_name.clone(),
                process_id: e.pid,
                start_time: e.start_time,
                initial_prompt: e.initial_prompt.clone(),
                elapsed_minutes: (now - e.start_time).num_minutes(),
            })
            .collect();
        infos.sort_by_key(|i| i.start_time);
        infos
    }

    /// Whether the project currently has a tracked agent.
    pub fn is_agent_running(&self, project_name: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .contains_key(&slot_key(project_name))
    }

    /// Remove the project's entry if it still belongs to `spawn_id`.
    ///
    /// Returns `false` when the slot was already released (killed) or has
    /// since been taken by a newer agent.
    pub(crate) fn release_slot(&self, project_name: &str, spawn_id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let key = slot_key(project_name);
        let is_current = entries.get(&key).is_some_and(|e| e.spawn_id == spawn_id);
        if is_current {
            entries.remove(&key);
        }
        is_current
    }

    /// Forward an event to the observer channel, if any.
    pub(crate) fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// Table key: project names are case-insensitive.
fn slot_key(project_name: &str) -> String {
    project_name.to_lowercase()
}
