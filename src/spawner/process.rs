//! Agent process launcher and supervisor.
//!
//! Launches the agent executable as a tokio child with stdin closed and
//! stdout/stderr piped. Each output stream gets a reader task that forwards
//! lines to `tracing` and the manager's event channel; a monitor task waits
//! for exit and releases the project's slot.
//!
//! The child:
//! - Runs in its own process group (`process_group(0)`) so signals aimed at
//!   the host (e.g. Ctrl-C) do not reach it
//! - Is NOT killed on drop: the host may exit while the agent keeps running
//! - Carries the spawn marker variable set to `1`

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::manager::AgentManager;
use super::types::{AgentEvent, OutputStream};

/// How long the monitor waits for output readers to drain after exit.
/// Readers can outlive this if a grandchild still holds the pipes open.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// What to launch and how to mark it.
#[derive(Clone, Debug)]
pub(crate) struct LaunchSettings {
    pub command: String,
    pub spawn_marker: String,
}

/// Start the agent in `cwd`, passing `initial_prompt` as its only argument.
pub(crate) fn launch(
    settings: &LaunchSettings,
    cwd: &Path,
    initial_prompt: Option<&str>,
) -> std::io::Result<Child> {
    let mut command = Command::new(&settings.command);
    if let Some(prompt) = initial_prompt {
        command.arg(prompt);
    }

    command
        .current_dir(cwd)
        .env(&settings.spawn_marker, "1")
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false)
        .spawn()
}

/// Short, user-facing reason for a failed launch.
pub(crate) fn launch_failure_reason(command: &str, e: &std::io::Error) -> String {
    match e.kind() {
        std::io::ErrorKind::NotFound => format!("`{command}` was not found"),
        std::io::ErrorKind::PermissionDenied => format!("permission denied running `{command}`"),
        kind => kind.to_string(),
    }
}

/// Take ownership of a launched child: forward its output and release the
/// slot identified by `spawn_id` once it exits.
pub(crate) fn supervise(manager: AgentManager, project: String, spawn_id: String, mut child: Child) {
    let stdout_task = child
        .stdout
        .take()
        .map(|out| forward_lines(manager.clone(), project.clone(), OutputStream::Stdout, out));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| forward_lines(manager.clone(), project.clone(), OutputStream::Stderr, err));

    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => {
                tracing::info!(project = %project, code = ?status.code(), "Agent exited");
                status.code()
            }
            Err(e) => {
                tracing::error!(project = %project, error = %e, "Agent process wait failed");
                None
            }
        };

        if !manager.release_slot(&project, &spawn_id) {
            tracing::debug!(project = %project, "Slot already released (agent was killed)");
        }

        let drain = async {
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, drain).await.is_err() {
            tracing::debug!(project = %project, "Agent output still open after exit");
        }

        manager.emit(AgentEvent::Exited { project, code });
    });
}

/// Forward output line by line until EOF or a read error.
///
/// Bytes are decoded lossily: the reader must keep draining the pipe no
/// matter what the agent prints, or the agent dies on its next write.
fn forward_lines<R>(
    manager: AgentManager,
    project: String,
    stream: OutputStream,
    reader: R,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(project = %project, error = %e, "Agent output read failed");
                    break;
                }
            }

            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            match stream {
                OutputStream::Stdout => tracing::info!(project = %project, "{}", line),
                OutputStream::Stderr => tracing::warn!(project = %project, "{}", line),
            }
            manager.emit(AgentEvent::Output {
                project: project.clone(),
                stream,
                line,
            });
        }
    })
}
