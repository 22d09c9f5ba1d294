#![allow(dead_code)]

use devctl_core::config::LogSettings;
use devctl_core::{AdapterConfig, Config};
use devctl_supervisor::Project;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

pub fn adapter(name: &str, start: &str) -> AdapterConfig {
    AdapterConfig::new(name, start)
}

pub async fn project(root: &Path, adapters: Vec<AdapterConfig>) -> Project {
    project_with_logs(root, adapters, LogSettings::default()).await
}

pub async fn project_with_logs(
    root: &Path,
    adapters: Vec<AdapterConfig>,
    logs: LogSettings,
) -> Project {
    Project::open(root, Config { adapters, logs }).await.unwrap()
}

/// A port nothing listens on.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Like [`pid_alive`], but an unreaped orphan counts as gone.
#[cfg(unix)]
pub async fn process_alive(pid: u32) -> bool {
    use devctl_supervisor::{NativePlatform, Platform};
    NativePlatform::new().pid_alive(pid).await
}
