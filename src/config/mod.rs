pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Load configuration by merging the config file and CLI sources.
/// Precedence: CLI > config file > defaults.
///
/// Missing config files are handled gracefully (defaults apply).
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: config file (--config, or the platform config directory)
    let file = match cli.config.clone().or_else(global_config_path) {
        Some(path) => load_toml_file(&path),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    };

    // Layer 2: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    Ok(cli_partial.with_fallback(file).finalize())
}

/// Load a TOML config file into a PartialConfig.
/// Missing or malformed files log and fall back to an empty PartialConfig.
fn load_toml_file(path: &Path) -> PartialConfig {
    match read_toml_file(path) {
        Ok(Some(partial)) => {
            tracing::info!("Loaded config from {}", path.display());
            partial
        }
        Ok(None) => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            PartialConfig::default()
        }
        Err(e) => {
            tracing::warn!("Config error: {}", e);
            PartialConfig::default()
        }
    }
}

fn read_toml_file(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let config_file =
        toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(Some(config_file.to_partial()))
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/innervoice/innervoice.toml
/// macOS: ~/Library/Application Support/innervoice/innervoice.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "innervoice")
        .map(|dirs| dirs.config_dir().join("innervoice.toml"))
}

/// Default registry location: `~/.innervoice/projects.json`.
pub fn default_registry_path() -> PathBuf {
    expand_home("~/.innervoice/projects.json")
}

/// Expand a leading `~/` to the user's home directory.
/// Paths without the prefix, or with no resolvable home, are returned as-is.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    let agent_command = match &cli.command {
        Commands::Run { agent_command, .. } => agent_command.clone(),
        _ => None,
    };
    PartialConfig {
        registry_path: cli.registry.clone(),
        agent_command,
        ..Default::default()
    }
}
