use async_trait::async_trait;
use devctl_core::{CommandSpec, Error, HostOs, ProcessBuilder, Result, Signal};
use std::fmt;

/// OS capabilities the adapter lifecycle needs. One implementation per
/// platform family, chosen once by [`crate::create_platform`].
#[async_trait]
pub trait Platform: Send + Sync + fmt::Debug {
    fn os(&self) -> HostOs;

    /// The command string `spec` holds for this host.
    fn resolve_command(&self, name: &str, spec: &CommandSpec) -> Result<String> {
        spec.resolve(self.os())
            .map(str::to_string)
            .ok_or_else(|| Error::UnsupportedPlatform {
                name: name.to_string(),
                os: self.os().to_string(),
            })
    }

    /// A builder that runs `cmd` directly or through the host shell.
    fn shell_command(&self, cmd: &str) -> ProcessBuilder {
        ProcessBuilder::for_os(cmd, self.os())
    }

    /// PIDs holding `port` in LISTEN state.
    async fn find_process_by_port(&self, port: u16) -> Result<Vec<u32>>;

    /// Delivers `signal` to `pid` together with its process group or tree.
    /// Used for processes this supervisor did not launch, such as port
    /// owners.
    async fn signal_process_tree(&self, pid: u32, signal: Signal) -> Result<()>;

    /// SIGTERM or SIGKILL through [`Platform::signal_process_tree`].
    async fn kill_process_tree(&self, pid: u32, force: bool) -> Result<()> {
        let signal = if force { Signal::Kill } else { Signal::Terminate };
        self.signal_process_tree(pid, signal).await
    }

    async fn check_port_listening(&self, port: u16) -> Result<bool>;

    /// Delivers `signal` to every member of the group `pgid`, including
    /// members that outlived the leader. A `pgid` that names no group is
    /// left alone.
    async fn signal_group(&self, pgid: u32, signal: Signal) -> Result<()>;

    /// Whether any process is left in the group `pgid`.
    async fn group_alive(&self, pgid: u32) -> bool;

    /// The process group of `pid`, when the platform can tell.
    async fn process_group(&self, pid: u32) -> Option<u32>;

    async fn pid_alive(&self, pid: u32) -> bool;
}
