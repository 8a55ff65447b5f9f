use serde::Deserialize;
use std::path::PathBuf;

/// The TOML file structure for innervoice.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub registry: Option<RegistryConfig>,
    pub agent: Option<AgentConfig>,
}

#[derive(Debug, Deserialize)]
pub struct RegistryConfig {
    /// Location of the projects JSON file. A leading `~/` is expanded.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Executable launched in each project directory.
    pub command: Option<String>,
    /// Environment variable set to `1` in every spawned agent.
    pub spawn_marker: Option<String>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub registry_path: PathBuf,
    pub agent_command: String,
    pub spawn_marker: String,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub registry_path: Option<PathBuf>,
    pub agent_command: Option<String>,
    pub spawn_marker: Option<String>,
}

impl ConfigFile {
    /// Flatten the sectioned file layout into a [`PartialConfig`].
    pub fn to_partial(&self) -> PartialConfig {
        let registry = self.registry.as_ref();
        let agent = self.agent.as_ref();
        PartialConfig {
            registry_path: registry
                .and_then(|r| r.path.as_deref())
                .map(super::expand_home),
            agent_command: agent.and_then(|a| a.command.clone()),
            spawn_marker: agent.and_then(|a| a.spawn_marker.clone()),
        }
    }
}
