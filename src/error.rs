use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Errors related to the project registry file.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The store exists but could not be read or parsed. Callers of
    /// `load` never see this: it is logged and degraded to an empty list.
    #[error("Project registry at {path} could not be read: {message}")]
    StoreUnreadable { path: PathBuf, message: String },

    #[error("Project registry at {path} could not be written: {message}")]
    StoreUnwritable { path: PathBuf, message: String },
}

/// Errors returned when starting an agent.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("Agent is already running in {project}")]
    AlreadyRunning { project: String },

    #[error(
        "Project \"{project}\" not found in registry. Register it first with: /register {project} /path/to/project"
    )]
    ProjectNotFound { project: String },

    #[error("Failed to start agent in {project}: {reason}")]
    LaunchFailed { project: String, reason: String },
}

/// Errors returned when stopping an agent.
#[derive(Debug, thiserror::Error)]
pub enum KillError {
    #[error("No running agent found for {project}")]
    NotRunning { project: String },

    #[error("Failed to stop agent in {project}: {reason}")]
    KillFailed { project: String, reason: String },
}
