use clap::Parser;

use innervoice::cli::{Cli, Commands};
use innervoice::config::{self, AppConfig};
use innervoice::error::KillError;
use innervoice::registry::{ProjectRegistry, RegisterOptions};
use innervoice::spawner::{AgentEvent, AgentManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = config::load_config(&cli)?;
    tracing::debug!(
        registry = %config.registry_path.display(),
        agent_command = %config.agent_command,
        "Config loaded"
    );

    let registry = ProjectRegistry::new(&config.registry_path);

    match cli.command {
        Commands::Register {
            name,
            path,
            auto_spawn,
            description,
            tags,
        } => {
            if !ProjectRegistry::validate_project_path(&path).await {
                anyhow::bail!("{} is not an existing directory", path.display());
            }
            let path = std::fs::canonicalize(&path)?;
            let options = RegisterOptions {
                auto_spawn,
                description,
                tags: (!tags.is_empty()).then_some(tags),
            };

            let project = registry.register(&name, path, options).await?;
            println!(
                "Registered {} at {}{}",
                project.name,
                project.path.display(),
                if project.auto_spawn { " (auto-spawn)" } else { "" }
            );
        }
        Commands::Unregister { name } => {
            if registry.unregister(&name).await? {
                println!("Unregistered {name}");
            } else {
                println!("Project \"{name}\" not found");
            }
        }
        Commands::Projects { auto_spawn } => {
            let projects = if auto_spawn {
                registry.get_auto_spawn_projects().await?
            } else {
                registry.load().await?
            };

            if projects.is_empty() {
                println!("No projects registered.");
            }
            for project in projects {
                let description = project
                    .metadata
                    .as_ref()
                    .and_then(|m| m.description.as_deref())
                    .map(|d| format!("  {d}"))
                    .unwrap_or_default();
                println!(
                    "{}{}  {}  (last accessed {}){}",
                    project.name,
                    if project.auto_spawn { " [auto]" } else { "" },
                    project.path.display(),
                    project.last_accessed.format("%Y-%m-%d %H:%M"),
                    description,
                );
            }
        }
        Commands::Run { name, prompt, .. } => {
            run_agent(registry, &config, &name, prompt).await?;
        }
    }

    Ok(())
}

/// Spawn an agent and block until it exits. Ctrl-C terminates it.
async fn run_agent(
    registry: ProjectRegistry,
    config: &AppConfig,
    name: &str,
    prompt: Option<String>,
) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let manager = AgentManager::new(registry, config, Some(event_tx));

    let receipt = manager.spawn_agent(name, prompt).await?;
    println!("{receipt} (pid {})", receipt.process_id);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(AgentEvent::Exited { code, .. }) => {
                    println!(
                        "Agent exited in {} (code: {})",
                        receipt.project_name,
                        code.map_or("none".to_string(), |c| c.to_string())
                    );
                    break;
                }
                Some(AgentEvent::Output { .. }) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => match manager.kill_agent(name) {
                Ok(()) => println!("Stopping agent in {}...", receipt.project_name),
                Err(e @ KillError::NotRunning { .. }) => {
                    eprintln!("{e}");
                    break;
                }
                Err(e) => eprintln!("{e}"),
            },
        }
    }

    Ok(())
}
