use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::command::{CommandLine, HostOs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
    signal: Option<i32>,
}

impl ExitStatus {
    pub fn from_std(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
            #[cfg(not(unix))]
            signal: None,
        }
    }

    pub fn new(code: Option<i32>, signal: Option<i32>) -> Self {
        Self { code, signal }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn signal(&self) -> Option<i32> {
        self.signal
    }

    /// Rendering used in "exited before becoming ready (exit code: ...)".
    pub fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => code.to_string(),
            (None, Some(signal)) => format!("signal {}", signal),
            (None, None) => "unknown".to_string(),
        }
    }
}

pub struct ProcessBuilder {
    line: CommandLine,
    os: HostOs,
    label: Option<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    stdout: Stdio,
    stderr: Stdio,
    detached: bool,
}

impl ProcessBuilder {
    pub fn new(command: impl AsRef<str>) -> Self {
        Self::for_os(command, HostOs::current())
    }

    pub fn for_os(command: impl AsRef<str>, os: HostOs) -> Self {
        Self {
            line: CommandLine::parse(command.as_ref(), os),
            os,
            label: None,
            env: Vec::new(),
            cwd: None,
            stdout: Stdio::null(),
            stderr: Stdio::null(),
            detached: false,
        }
    }

    /// Name used in launch errors; defaults to the program.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn env<K, V>(mut self, key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (k, v) in vars {
            self.env
                .push((k.as_ref().to_string(), v.as_ref().to_string()));
        }
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdout(mut self, stdout: Stdio) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn stderr(mut self, stderr: Stdio) -> Self {
        self.stderr = stderr;
        self
    }

    /// Run in a fresh process group that outlives the supervisor.
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.line
    }

    pub fn spawn(self) -> crate::Result<Child> {
        let (program, args) = self.line.argv(self.os);

        tracing::info!("Spawning process: command='{}', args={:?}", program, args);

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdout(self.stdout)
            .stderr(self.stderr)
            .stdin(Stdio::null())
            .kill_on_drop(!self.detached);

        if let Some(cwd) = &self.cwd {
            tracing::debug!("Setting working directory to: {:?}", cwd);
            cmd.current_dir(cwd);
        }

        for (key, value) in self.env {
            cmd.env(key, value);
        }

        if self.detached {
            #[cfg(unix)]
            {
                cmd.process_group(0);
            }

            #[cfg(windows)]
            {
                use windows_sys::Win32::System::Threading::{
                    CREATE_NEW_PROCESS_GROUP, CREATE_NO_WINDOW,
                };
                cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
            }
        }

        let label = self.label.unwrap_or_else(|| program.clone());
        cmd.spawn().map_err(|e| crate::Error::Launch {
            name: label,
            reason: match &self.cwd {
                Some(cwd) => format!("{}: {} (cwd {})", program, e, cwd.display()),
                None => format!("{}: {}", program, e),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_describe() {
        let clean = ExitStatus::new(Some(0), None);
        assert!(clean.success());
        assert_eq!(clean.describe(), "0");

        let failed = ExitStatus::new(Some(1), None);
        assert!(!failed.success());
        assert_eq!(failed.describe(), "1");

        let killed = ExitStatus::new(None, Some(9));
        assert!(!killed.success());
        assert_eq!(killed.code(), None);
        assert_eq!(killed.signal(), Some(9));
        assert_eq!(killed.describe(), "signal 9");

        assert_eq!(ExitStatus::new(None, None).describe(), "unknown");
    }

    #[test]
    fn test_builder_keeps_parsed_line() {
        let builder = ProcessBuilder::for_os("server --port 4001", HostOs::Linux)
            .current_dir("/tmp")
            .env("PORT", "4001");

        assert_eq!(
            builder.command_line(),
            &CommandLine::Direct {
                program: "server".to_string(),
                args: vec!["--port".to_string(), "4001".to_string()],
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_missing_binary_is_launch_error() {
        let result = ProcessBuilder::new("this_command_does_not_exist_12345 --flag")
            .label("ghost")
            .spawn();

        match result {
            Err(crate::Error::Launch { name, .. }) => assert_eq!(name, "ghost"),
            other => panic!("expected launch error, got {:?}", other.map(|_| ())),
        }
    }
}
