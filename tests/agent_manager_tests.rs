use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use innervoice::config::AppConfig;
use innervoice::error::{KillError, SpawnError};
use innervoice::registry::{ProjectRegistry, RegisterOptions};
use innervoice::spawner::{AgentEvent, AgentManager, OutputStream};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

// ─── Helper ───────────────────────────────────────────────────────────

struct Fixture {
    _dir: TempDir,
    project_dir: std::path::PathBuf,
    manager: AgentManager,
    events: UnboundedReceiver<AgentEvent>,
}

/// Registers one project "App" and builds a manager launching `command`.
async fn setup(command: &str) -> Fixture {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let project_dir = dir.path().join("app");
    std::fs::create_dir(&project_dir).unwrap();

    let config = test_config(dir.path(), command);
    let registry = ProjectRegistry::new(&config.registry_path);
    registry
        .register("App", &project_dir, RegisterOptions::default())
        .await
        .unwrap();

    let (tx, events) = tokio::sync::mpsc::unbounded_channel();
    let manager = AgentManager::new(registry, &config, Some(tx));

    Fixture {
        _dir: dir,
        project_dir,
        manager,
        events,
    }
}

fn test_config(root: &Path, command: &str) -> AppConfig {
    AppConfig {
        registry_path: root.join("projects.json"),
        agent_command: command.to_string(),
        spawn_marker: "INNERVOICE_SPAWNED".to_string(),
    }
}

/// Collect events until the agent's exit event arrives.
async fn wait_for_exit(events: &mut UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = events.recv().await {
            let done = matches!(event, AgentEvent::Exited { .. });
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("agent did not exit in time");
    seen
}

// ============================================================
// spawn
// ============================================================

#[tokio::test]
async fn test_spawn_marks_project_running() {
    let fx = setup("sleep").await;

    let receipt = fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();

    assert_eq!(receipt.project_name, "App");
    assert!(receipt.process_id > 0);
    assert!(fx.manager.is_agent_running("App"));
    assert!(fx.manager.is_agent_running("app"));

    fx.manager.kill_agent("App").unwrap();
}

#[tokio::test]
async fn test_second_spawn_is_already_running() {
    let fx = setup("sleep").await;

    fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();
    let second = fx.manager.spawn_agent("App", Some("30".into())).await;
    assert!(matches!(second, Err(SpawnError::AlreadyRunning { .. })));

    let differently_cased = fx.manager.spawn_agent("APP", None).await;
    assert!(matches!(differently_cased, Err(SpawnError::AlreadyRunning { .. })));

    assert_eq!(fx.manager.list_spawned_processes().len(), 1);
    fx.manager.kill_agent("App").unwrap();
}

#[tokio::test]
async fn test_concurrent_spawns_launch_once() {
    let fx = setup("sleep").await;

    let (a, b) = tokio::join!(
        fx.manager.spawn_agent("App", Some("30".into())),
        fx.manager.spawn_agent("app", Some("30".into())),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(fx.manager.list_spawned_processes().len(), 1);
    fx.manager.kill_agent("App").unwrap();
}

#[tokio::test]
async fn test_spawn_unregistered_project_not_found() {
    let fx = setup("sleep").await;

    let err = fx
        .manager
        .spawn_agent("Unregistered", Some("30".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, SpawnError::ProjectNotFound { .. }));
    assert!(err.to_string().contains("/register"));
    assert!(!fx.manager.is_agent_running("Unregistered"));
    assert!(fx.manager.list_spawned_processes().is_empty());
}

#[tokio::test]
async fn test_spawn_missing_executable_launch_failed() {
    let fx = setup("innervoice-test-no-such-agent").await;

    let err = fx.manager.spawn_agent("App", None).await.unwrap_err();

    match &err {
        SpawnError::LaunchFailed { reason, .. } => {
            assert!(reason.contains("innervoice-test-no-such-agent"));
            assert!(!reason.contains("os error"));
        }
        other => panic!("expected LaunchFailed, got {other:?}"),
    }
    assert!(!fx.manager.is_agent_running("App"));
}

#[tokio::test]
async fn test_spawn_in_deleted_project_directory_fails() {
    let fx = setup("sleep").await;
    std::fs::remove_dir(&fx.project_dir).unwrap();

    let err = fx.manager.spawn_agent("App", Some("30".into())).await.unwrap_err();

    assert!(matches!(err, SpawnError::LaunchFailed { .. }));
    assert!(!fx.manager.is_agent_running("App"));
}

#[tokio::test]
async fn test_spawn_touches_project() {
    let fx = setup("sleep").await;
    let before = Utc::now();

    fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();

    let project = fx.manager.registry().find_project("App").await.unwrap().unwrap();
    assert!(project.last_accessed >= before);
    fx.manager.kill_agent("App").unwrap();
}

#[tokio::test]
async fn test_agent_runs_in_project_dir_with_marker_and_output_is_forwarded() {
    let mut fx = setup("sh").await;
    std::fs::write(
        fx.project_dir.join("agent.sh"),
        "pwd\nprintf 'marker=%s\\n' \"$INNERVOICE_SPAWNED\"\necho oops >&2\n",
    )
    .unwrap();

    fx.manager.spawn_agent("App", Some("agent.sh".into())).await.unwrap();
    let events = wait_for_exit(&mut fx.events).await;

    let stdout: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Output {
                stream: OutputStream::Stdout,
                line,
                ..
            } => Some(line.as_str()),
            _ => None,
        })
        .collect();
    let canonical = std::fs::canonicalize(&fx.project_dir).unwrap();
    assert_eq!(stdout, vec![canonical.to_str().unwrap(), "marker=1"]);

    assert!(events.iter().any(|e| matches!(
        e,
        AgentEvent::Output { stream: OutputStream::Stderr, line, project } if line == "oops" && project == "App"
    )));
    assert_eq!(
        events.last(),
        Some(&AgentEvent::Exited {
            project: "App".into(),
            code: Some(0)
        })
    );
}

#[tokio::test]
async fn test_invalid_utf8_output_is_forwarded_and_agent_keeps_running() {
    let mut fx = setup("sh").await;
    std::fs::write(
        fx.project_dir.join("agent.sh"),
        "printf 'bad \\377\\n'\nsleep 1\nfor i in 1 2 3; do echo after$i; done\nexit 7\n",
    )
    .unwrap();

    fx.manager.spawn_agent("App", Some("agent.sh".into())).await.unwrap();
    let events = wait_for_exit(&mut fx.events).await;

    let stdout: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Output { line, .. } => Some(line.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(stdout, vec!["bad \u{FFFD}", "after1", "after2", "after3"]);
    assert_eq!(
        events.last(),
        Some(&AgentEvent::Exited {
            project: "App".into(),
            code: Some(7)
        })
    );
}

#[tokio::test]
async fn test_registry_failure_is_not_reported_as_missing_project() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let config = AppConfig {
        registry_path: blocker.join("projects.json"),
        ..test_config(dir.path(), "sleep")
    };
    let manager = AgentManager::new(ProjectRegistry::new(&config.registry_path), &config, None);

    let err = manager.spawn_agent("App", Some("30".into())).await.unwrap_err();

    match &err {
        SpawnError::LaunchFailed { reason, .. } => {
            assert_eq!(reason, "project registry unavailable");
        }
        other => panic!("expected LaunchFailed, got {other:?}"),
    }
    assert!(!err.to_string().contains("/register"));
    assert!(!manager.is_agent_running("App"));
}

#[tokio::test]
async fn test_cancelled_spawn_still_releases_slot_on_exit() {
    let mut fx = setup("sleep").await;

    // Drop the spawn future as soon as the agent is tracked, while it is
    // still updating the registry.
    let mut spawn = Box::pin(fx.manager.spawn_agent("App", Some("0".into())));
    loop {
        tokio::select! {
            biased;
            _ = &mut spawn => break,
            _ = tokio::task::yield_now() => {
                if fx.manager.is_agent_running("App") {
                    break;
                }
            }
        }
    }
    drop(spawn);

    wait_for_exit(&mut fx.events).await;
    assert!(!fx.manager.is_agent_running("App"));
}

// ============================================================
// exit / kill
// ============================================================

#[tokio::test]
async fn test_natural_exit_releases_slot() {
    let mut fx = setup("sleep").await;

    fx.manager.spawn_agent("App", Some("0".into())).await.unwrap();
    wait_for_exit(&mut fx.events).await;

    assert!(!fx.manager.is_agent_running("App"));
    assert!(fx.manager.list_spawned_processes().is_empty());
}

#[tokio::test]
async fn test_kill_after_natural_exit_is_not_running() {
    let mut fx = setup("sleep").await;

    fx.manager.spawn_agent("App", Some("0".into())).await.unwrap();
    wait_for_exit(&mut fx.events).await;

    let err = fx.manager.kill_agent("App").unwrap_err();
    assert!(matches!(err, KillError::NotRunning { .. }));
}

#[tokio::test]
async fn test_kill_terminates_and_releases_slot() {
    let mut fx = setup("sleep").await;
    fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();

    fx.manager.kill_agent("app").unwrap();
    assert!(!fx.manager.is_agent_running("App"));

    let events = wait_for_exit(&mut fx.events).await;
    assert_eq!(
        events.last(),
        Some(&AgentEvent::Exited {
            project: "App".into(),
            code: None
        })
    );

    let again = fx.manager.kill_agent("App").unwrap_err();
    assert!(matches!(again, KillError::NotRunning { .. }));
}

#[tokio::test]
async fn test_respawn_after_kill() {
    let mut fx = setup("sleep").await;
    let first = fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();
    fx.manager.kill_agent("App").unwrap();

    let second = fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();
    assert_ne!(first.process_id, second.process_id);

    // The first agent's exit must not clear the second agent's slot.
    wait_for_exit(&mut fx.events).await;
    assert!(fx.manager.is_agent_running("App"));

    fx.manager.kill_agent("App").unwrap();
}

// ============================================================
// list
// ============================================================

#[tokio::test]
async fn test_list_spawned_processes_snapshot() {
    let fx = setup("sleep").await;
    let receipt = fx.manager.spawn_agent("App", Some("30".into())).await.unwrap();

    let list = fx.manager.list_spawned_processes();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].project_name, "App");
    assert_eq!(list[0].process_id, receipt.process_id);
    assert_eq!(list[0].initial_prompt.as_deref(), Some("30"));
    assert_eq!(list[0].elapsed_minutes, 0);
    assert!(list[0].start_time <= Utc::now());

    fx.manager.kill_agent("App").unwrap();
}
