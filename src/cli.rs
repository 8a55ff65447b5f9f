use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "innervoice",
    version,
    about = "Spawn and track coding agents in registered projects"
)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the project registry file
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a project directory (updates it if the name already exists)
    Register {
        /// Project name (matched case-insensitively)
        name: String,

        /// Project directory
        path: PathBuf,

        /// Mark the project as eligible for auto-spawn
        #[arg(long)]
        auto_spawn: Option<bool>,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Remove a project from the registry
    Unregister {
        /// Project name
        name: String,
    },
    /// List registered projects
    Projects {
        /// Only show projects marked for auto-spawn
        #[arg(long)]
        auto_spawn: bool,
    },
    /// Start an agent in a project and wait for it to exit
    Run {
        /// Project name
        name: String,

        /// Initial prompt passed to the agent
        prompt: Option<String>,

        /// Agent executable (e.g., "claude")
        #[arg(long)]
        agent_command: Option<String>,
    },
}
