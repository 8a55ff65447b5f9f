use super::schema::{AppConfig, PartialConfig};

/// Executable launched when nothing else is configured.
pub const DEFAULT_AGENT_COMMAND: &str = "claude";

/// Environment variable marking an agent as remotely spawned.
pub const DEFAULT_SPAWN_MARKER: &str = "INNERVOICE_SPAWNED";

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            registry_path: self.registry_path.or(fallback.registry_path),
            agent_command: self.agent_command.or(fallback.agent_command),
            spawn_marker: self.spawn_marker.or(fallback.spawn_marker),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            registry_path: self
                .registry_path
                .unwrap_or_else(super::default_registry_path),
            agent_command: self
                .agent_command
                .unwrap_or_else(|| DEFAULT_AGENT_COMMAND.to_string()),
            spawn_marker: self
                .spawn_marker
                .unwrap_or_else(|| DEFAULT_SPAWN_MARKER.to_string()),
        }
    }
}
