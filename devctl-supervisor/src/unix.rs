use async_trait::async_trait;
use devctl_core::{Error, HostOs, Result, Signal};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal as NixSignal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::platform::Platform;

const TCP_LISTEN_STATE: &str = "0A";
#[cfg(target_os = "linux")]
const PROC_TCP_TABLES: [&str; 2] = ["/proc/net/tcp", "/proc/net/tcp6"];

#[derive(Debug, Default)]
pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn to_pid(pid: u32) -> Result<Pid> {
        i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 1)
            .map(Pid::from_raw)
            .ok_or_else(|| Error::Termination(format!("{} is not a signalable PID", pid)))
    }

    /// Signals every member of group `pgid`. Never falls back to a single
    /// PID: a number that leads no group is not ours to signal.
    fn signal_pgid(pgid: u32, sig: NixSignal) -> Result<()> {
        let target = Self::to_pid(pgid)?;
        if pgid == std::process::id() || target == nix::unistd::getpgrp() {
            return Err(Error::Termination(
                "refusing to signal the supervisor's own group".to_string(),
            ));
        }

        match signal::killpg(target, sig) {
            Ok(()) => {
                trace!("Sent {:?} to process group {}", sig, pgid);
                Ok(())
            }
            Err(Errno::ESRCH) => {
                trace!("Process group {} is already gone", pgid);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Signals the group `pid` belongs to, or only `pid` when that group is
    /// the supervisor's own.
    fn signal_owner(pid: u32, sig: NixSignal) -> Result<()> {
        if pid == std::process::id() {
            return Err(Error::Termination(
                "refusing to signal the supervisor itself".to_string(),
            ));
        }

        let target = Self::to_pid(pid)?;
        match nix::unistd::getpgid(Some(target)) {
            Ok(pgid) if pgid != nix::unistd::getpgrp() && pgid.as_raw() > 1 => {
                Self::signal_pgid(pgid.as_raw() as u32, sig)
            }
            Ok(_) => match signal::kill(target, sig) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(e) => Err(e.into()),
            },
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn lsof_listeners(port: u16) -> Result<Vec<u32>> {
        let output = Command::new("lsof")
            .args(["-t", &format!("-iTCP:{}", port), "-sTCP:LISTEN"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Probe(format!("lsof unavailable: {}", e)))?;

        // lsof exits 1 with empty output when nothing matches
        Ok(parse_pid_lines(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Inodes of LISTEN sockets on `port`, or `None` when `/proc` cannot be
    /// read.
    #[cfg(target_os = "linux")]
    async fn proc_listen_inodes(port: u16) -> Option<HashSet<u64>> {
        let mut readable = false;
        let mut inodes = HashSet::new();
        for table in PROC_TCP_TABLES {
            if let Ok(content) = tokio::fs::read_to_string(table).await {
                readable = true;
                inodes.extend(proc_net_listen_inodes(&content, port));
            }
        }
        readable.then_some(inodes)
    }

    #[cfg(not(target_os = "linux"))]
    async fn proc_listen_inodes(_port: u16) -> Option<HashSet<u64>> {
        None
    }
}

#[async_trait]
impl Platform for UnixPlatform {
    fn os(&self) -> HostOs {
        HostOs::current()
    }

    async fn find_process_by_port(&self, port: u16) -> Result<Vec<u32>> {
        let Some(inodes) = Self::proc_listen_inodes(port).await else {
            let pids = Self::lsof_listeners(port).await?;
            debug!("Port {} is held by {:?}", port, pids);
            return Ok(pids);
        };
        if inodes.is_empty() {
            return Ok(Vec::new());
        }

        let owners = tokio::task::spawn_blocking(move || socket_owners(&inodes))
            .await
            .unwrap_or_default();
        if !owners.is_empty() {
            debug!("Port {} is held by {:?}", port, owners);
            return Ok(owners);
        }

        // sockets of other users' processes are invisible in /proc/*/fd
        match Self::lsof_listeners(port).await {
            Ok(pids) => Ok(pids),
            Err(e) => {
                debug!("Owner of port {} not visible: {}", port, e);
                Ok(Vec::new())
            }
        }
    }

    async fn signal_process_tree(&self, pid: u32, signal: Signal) -> Result<()> {
        debug!("Sending {:?} to the group of PID {}", signal, pid);
        Self::signal_owner(pid, signal.to_nix())
    }

    async fn check_port_listening(&self, port: u16) -> Result<bool> {
        if let Some(inodes) = Self::proc_listen_inodes(port).await {
            return Ok(!inodes.is_empty());
        }
        Ok(!Self::lsof_listeners(port).await?.is_empty())
    }

    async fn signal_group(&self, pgid: u32, signal: Signal) -> Result<()> {
        Self::signal_pgid(pgid, signal.to_nix())
    }

    async fn group_alive(&self, pgid: u32) -> bool {
        let Ok(target) = Self::to_pid(pgid) else {
            return false;
        };
        matches!(signal::killpg(target, None), Ok(()) | Err(Errno::EPERM))
    }

    async fn process_group(&self, pid: u32) -> Option<u32> {
        let target = Self::to_pid(pid).ok()?;
        nix::unistd::getpgid(Some(target))
            .ok()
            .and_then(|pgid| u32::try_from(pgid.as_raw()).ok())
    }

    async fn pid_alive(&self, pid: u32) -> bool {
        let Ok(target) = Self::to_pid(pid) else {
            return false;
        };
        // EPERM still means the process exists
        matches!(signal::kill(target, None), Ok(()) | Err(Errno::EPERM)) && !is_zombie(pid)
    }
}

/// PIDs with an open descriptor on one of `inodes`.
fn socket_owners(inodes: &HashSet<u64>) -> Vec<u32> {
    let Ok(procs) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };

    let mut pids: Vec<u32> = procs
        .flatten()
        .filter_map(|entry| {
            let pid: u32 = entry.file_name().to_str()?.parse().ok()?;
            let fds = std::fs::read_dir(entry.path().join("fd")).ok()?;
            let holds = fds.flatten().any(|fd| {
                std::fs::read_link(fd.path())
                    .ok()
                    .and_then(|link| parse_socket_inode(&link.to_string_lossy()))
                    .is_some_and(|inode| inodes.contains(&inode))
            });
            holds.then_some(pid)
        })
        .collect();
    pids.sort_unstable();
    pids
}

/// `socket:[12345]` -> 12345
fn parse_socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

/// An orphan nobody reaped still answers signal 0.
#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| parse_stat_state(&stat))
        .is_some_and(|state| state == 'Z')
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

// the command name may contain spaces or parens, so the state follows the last ')'
#[cfg(any(target_os = "linux", test))]
fn parse_stat_state(stat: &str) -> Option<char> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

fn parse_pid_lines(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Inodes of the LISTEN sockets bound to `port` in a `/proc/net/tcp{,6}`
/// table.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn proc_net_listen_inodes(table: &str, port: u16) -> Vec<u64> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 || fields[3] != TCP_LISTEN_STATE {
                return None;
            }
            let local_port = fields[1]
                .rsplit_once(':')
                .and_then(|(_, hex)| u16::from_str_radix(hex, 16).ok())?;
            if local_port != port {
                return None;
            }
            fields[9].parse().ok()
        })
        .collect()
}
