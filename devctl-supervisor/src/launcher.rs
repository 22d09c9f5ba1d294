use devctl_core::{Error, ExitStatus, Result};
use devctl_logging::LogSink;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::platform::Platform;

pub type ExitReceiver = watch::Receiver<Option<ExitStatus>>;

#[derive(Debug)]
pub struct LaunchedProcess {
    pub pid: u32,
    /// Byte offset in the log where this run's output starts.
    pub log_offset: u64,
    /// Becomes `Some` once the child has been reaped.
    pub exit: ExitReceiver,
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions<'a> {
    pub name: &'a str,
    pub command: &'a str,
    pub cwd: &'a Path,
    pub env: &'a HashMap<String, String>,
}

/// Spawns the command in its own process group with output going to `sink`.
/// A background task owns the child, reaps it and publishes the exit status.
pub async fn launch(
    platform: &dyn Platform,
    opts: LaunchOptions<'_>,
    sink: &LogSink,
) -> Result<LaunchedProcess> {
    let log_offset = sink.prepare()?;
    let (stdout, stderr) = sink.child_stdio()?;

    let mut child = platform
        .shell_command(opts.command)
        .label(opts.name)
        .current_dir(opts.cwd)
        .envs(opts.env)
        .stdout(stdout)
        .stderr(stderr)
        .detached(true)
        .spawn()?;

    let Some(pid) = child.id() else {
        return Err(Error::Launch {
            name: opts.name.to_string(),
            reason: "process exited before its PID could be read".to_string(),
        });
    };

    info!("Launched {} (PID {}): {}", opts.name, pid, opts.command);

    let (tx, rx) = watch::channel(None);
    let name = opts.name.to_string();
    tokio::spawn(async move {
        let status = match child.wait().await {
            Ok(status) => ExitStatus::from_std(status),
            Err(e) => {
                warn!("Failed to wait for {} (PID {}): {}", name, pid, e);
                ExitStatus::new(None, None)
            }
        };

        debug!("{} (PID {}) exited: {}", name, pid, status.describe());
        tx.send_replace(Some(status));
    });

    Ok(LaunchedProcess {
        pid,
        log_offset,
        exit: rx,
    })
}

/// Waits until the child behind `exit` has been reaped.
pub async fn wait_for_exit(exit: &mut ExitReceiver) -> ExitStatus {
    match exit.wait_for(Option::is_some).await {
        Ok(status) => {
            let status = *status;
            status.unwrap_or(ExitStatus::new(None, None))
        }
        Err(_) => ExitStatus::new(None, None),
    }
}

pub fn has_exited(exit: &ExitReceiver) -> bool {
    exit.borrow().is_some()
}
