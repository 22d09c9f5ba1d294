use async_trait::async_trait;
use devctl_core::{Error, HostOs, Result, Signal};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::platform::Platform;

#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    async fn run(program: &str, args: &[&str]) -> Result<std::process::Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Probe(format!("{} unavailable: {}", program, e)))
    }

    async fn taskkill(pid: u32, force: bool) -> Result<()> {
        let pid_arg = pid.to_string();
        let mut args = vec!["/PID", pid_arg.as_str(), "/T"];
        if force {
            args.push("/F");
        }

        let output = Self::run("taskkill", &args).await?;
        if !output.status.success() {
            // 128: no such process
            debug!(
                "taskkill {:?} exited with {:?}: {}",
                args,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for WindowsPlatform {
    fn os(&self) -> HostOs {
        HostOs::Windows
    }

    async fn find_process_by_port(&self, port: u16) -> Result<Vec<u32>> {
        let output = Self::run("netstat", &["-ano", "-p", "TCP"]).await?;
        Ok(parse_netstat_listeners(
            &String::from_utf8_lossy(&output.stdout),
            port,
        ))
    }

    async fn signal_process_tree(&self, pid: u32, signal: Signal) -> Result<()> {
        if !matches!(signal, Signal::Terminate | Signal::Kill | Signal::Interrupt) {
            warn!("{:?} has no Windows equivalent, terminating {} instead", signal, pid);
        }
        debug!("Terminating process tree {} (force: {})", pid, signal.is_forceful());
        Self::taskkill(pid, signal.is_forceful()).await
    }

    async fn check_port_listening(&self, port: u16) -> Result<bool> {
        Ok(!self.find_process_by_port(port).await?.is_empty())
    }

    // CREATE_NEW_PROCESS_GROUP makes the launched PID the group id; the
    // tree under it is what taskkill /T reaches
    async fn signal_group(&self, pgid: u32, signal: Signal) -> Result<()> {
        self.signal_process_tree(pgid, signal).await
    }

    async fn group_alive(&self, pgid: u32) -> bool {
        self.pid_alive(pgid).await
    }

    async fn process_group(&self, _pid: u32) -> Option<u32> {
        None
    }

    async fn pid_alive(&self, pid: u32) -> bool {
        let filter = format!("PID eq {}", pid);
        match Self::run("tasklist", &["/FI", &filter, "/NH", "/FO", "CSV"]).await {
            Ok(output) => {
                let needle = format!("\"{}\"", pid);
                String::from_utf8_lossy(&output.stdout).contains(&needle)
            }
            Err(e) => {
                debug!("tasklist failed: {}", e);
                false
            }
        }
    }
}

/// PIDs from `netstat -ano -p TCP` rows in LISTENING state on `port`.
fn parse_netstat_listeners(output: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{}", port);
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [proto, local, _remote, state, pid]
                    if proto.eq_ignore_ascii_case("TCP")
                        && *state == "LISTENING"
                        && local.ends_with(&suffix) =>
                {
                    pid.parse().ok()
                }
                _ => None,
            }
        })
        .filter(|pid| *pid != 0)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}
