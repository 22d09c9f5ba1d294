use devctl_core::{Action, CommandSpec, Signal};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::launcher::{ExitReceiver, wait_for_exit};
use crate::platform::Platform;

/// Upper bound for a configured stop/kill command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
/// How long `stop` waits for the process to disappear.
pub const STOP_WAIT: Duration = Duration::from_secs(5);
const KILL_WAIT: Duration = Duration::from_secs(2);
const EXIT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// SIGTERM / `taskkill /T`
    Graceful,
    /// SIGKILL / `taskkill /T /F`
    Force,
}

impl Mode {
    fn wait(&self) -> Duration {
        match self {
            Mode::Graceful => STOP_WAIT,
            Mode::Force => KILL_WAIT,
        }
    }
}

/// Everything known about the process to terminate.
#[derive(Debug)]
pub struct Target<'a> {
    pub name: &'a str,
    /// Configured stop or kill command, run before the group termination.
    pub command: Option<&'a CommandSpec>,
    /// Group of the launched (or adopted) process. Outlives the leader, so
    /// background members are reached after the leader has exited.
    pub pgid: Option<u32>,
    pub port: Option<u16>,
    pub cwd: &'a Path,
    pub env: &'a HashMap<String, String>,
    pub exit: Option<ExitReceiver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Victim {
    /// A group this supervisor launched; signalled with `killpg` only.
    Group(u32),
    /// A port owner found by lookup, with its own group or tree.
    PortOwner(u32),
}

impl Victim {
    fn id(&self) -> u32 {
        match self {
            Victim::Group(id) | Victim::PortOwner(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Terminator<'a> {
    platform: &'a dyn Platform,
}

impl<'a> Terminator<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Runs the configured command, terminates the process group (or the
    /// port owner when the group is gone or unknown), then waits for it to
    /// go away. Failures are logged, never returned.
    pub async fn terminate(&self, target: Target<'_>, mode: Mode) {
        if let Some(spec) = target.command {
            self.run_configured(&target, spec).await;
        }

        let victims = self.victims(&target).await;
        if victims.is_empty() {
            debug!("Nothing to terminate for {}", target.name);
            return;
        }

        let force = mode == Mode::Force;
        for victim in &victims {
            info!("Terminating {} ({:?}, force: {})", target.name, victim, force);
            let result = match *victim {
                Victim::Group(pgid) => {
                    let signal = if force { Signal::Kill } else { Signal::Terminate };
                    self.platform.signal_group(pgid, signal).await
                }
                Victim::PortOwner(pid) => self.platform.kill_process_tree(pid, force).await,
            };
            if let Err(e) = result {
                warn!("Failed to terminate {} ({:?}): {}", target.name, victim, e);
            }
        }

        self.wait_until_gone(target, &victims, mode.wait()).await;
    }

    /// Sends a `signal:` sentinel from a configured stop or kill command.
    async fn deliver(&self, victim: Victim, signal: Signal) -> devctl_core::Result<()> {
        match victim {
            Victim::Group(pgid) => self.platform.signal_group(pgid, signal).await,
            Victim::PortOwner(pid) => self.platform.signal_process_tree(pid, signal).await,
        }
    }

    async fn victims(&self, target: &Target<'_>) -> Vec<Victim> {
        if let Some(pgid) = target.pgid
            && self.platform.group_alive(pgid).await
        {
            return vec![Victim::Group(pgid)];
        }

        let Some(port) = target.port else {
            return Vec::new();
        };

        match self.platform.find_process_by_port(port).await {
            Ok(pids) => pids
                .into_iter()
                .filter(|pid| *pid != std::process::id())
                .map(Victim::PortOwner)
                .collect(),
            Err(e) => {
                debug!("Port lookup for {} failed: {}", target.name, e);
                Vec::new()
            }
        }
    }

    async fn run_configured(&self, target: &Target<'_>, spec: &CommandSpec) {
        let resolved = match self.platform.resolve_command(target.name, spec) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        match Action::parse(&resolved) {
            Ok(Action::Signal(signal)) => {
                for victim in self.victims(target).await {
                    debug!("Sending {:?} to {} ({:?})", signal, target.name, victim);
                    if let Err(e) = self.deliver(victim, signal).await {
                        warn!("Failed to signal {}: {}", target.name, e);
                    }
                }
            }
            Ok(Action::Run(cmd)) => self.run_command(target, &cmd).await,
            Err(e) => warn!("Invalid command for {}: {}", target.name, e),
        }
    }

    async fn run_command(&self, target: &Target<'_>, cmd: &str) {
        debug!("Running stop command for {}: {}", target.name, cmd);
        let child = self
            .platform
            .shell_command(cmd)
            .label(target.name)
            .current_dir(target.cwd)
            .envs(target.env)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        match tokio::time::timeout(COMMAND_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) if !status.success() => {
                debug!("Stop command for {} exited with {}", target.name, status)
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Stop command for {} failed: {}", target.name, e),
            Err(_) => {
                warn!(
                    "Stop command for {} did not finish within {:?}",
                    target.name, COMMAND_TIMEOUT
                );
                let _ = child.kill().await;
            }
        }
    }

    async fn wait_until_gone(&self, target: Target<'_>, victims: &[Victim], wait: Duration) {
        let deadline = Instant::now() + wait;
        if let Some(mut exit) = target.exit
            && tokio::time::timeout(wait, wait_for_exit(&mut exit))
                .await
                .is_err()
        {
            warn!("{} still running after {:?}", target.name, wait);
            return;
        }

        loop {
            if !self.any_alive(victims).await {
                return;
            }
            if Instant::now() >= deadline {
                warn!("{} still running after {:?}", target.name, wait);
                return;
            }
            tokio::time::sleep(EXIT_POLL).await;
        }
    }

    // members of a group are not enumerable; its leader stands in for them
    async fn any_alive(&self, victims: &[Victim]) -> bool {
        for victim in victims {
            if self.platform.pid_alive(victim.id()).await {
                return true;
            }
        }
        false
    }
}
