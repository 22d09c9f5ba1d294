use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that turns a stop/kill command into a signal delivery.
pub const SIGNAL_PREFIX: &str = "signal:";

const SHELL_METACHARACTERS: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '*', '?', '[', ']', '{', '}', '~', '!', '\n',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    MacOs,
    Linux,
    Windows,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MacOs => "mac",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command as written in the project config: either one string for every
/// platform, or one string per host OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Plain(String),
    PerOs {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mac: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        windows: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linux: Option<String>,
    },
}

impl CommandSpec {
    pub fn plain(cmd: impl Into<String>) -> Self {
        Self::Plain(cmd.into())
    }

    /// Picks the command for `os`. Linux falls back to the `mac` entry since
    /// both run under a POSIX shell.
    pub fn resolve(&self, os: HostOs) -> Option<&str> {
        match self {
            Self::Plain(cmd) => Some(cmd.as_str()),
            Self::PerOs {
                mac,
                windows,
                linux,
            } => match os {
                HostOs::MacOs => mac.as_deref(),
                HostOs::Windows => windows.as_deref(),
                HostOs::Linux => linux.as_deref().or(mac.as_deref()),
            },
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(cmd: &str) -> Self {
        Self::Plain(cmd.to_string())
    }
}

/// What a resolved stop/kill command asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Signal(Signal),
    Run(String),
}

impl Action {
    pub fn parse(cmd: &str) -> crate::Result<Self> {
        match cmd.trim().strip_prefix(SIGNAL_PREFIX) {
            Some(name) => Signal::from_name(name).map(Self::Signal),
            None => Ok(Self::Run(cmd.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Kill,
    Interrupt,
    Hangup,
    Quit,
    User1,
    User2,
}

impl Signal {
    /// Accepts `TERM`, `SIGTERM` and `sigterm` alike.
    pub fn from_name(name: &str) -> crate::Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "TERM" => Ok(Self::Terminate),
            "KILL" => Ok(Self::Kill),
            "INT" => Ok(Self::Interrupt),
            "HUP" => Ok(Self::Hangup),
            "QUIT" => Ok(Self::Quit),
            "USR1" => Ok(Self::User1),
            "USR2" => Ok(Self::User2),
            _ => Err(crate::Error::InvalidSignal(name.to_string())),
        }
    }

    pub fn is_forceful(&self) -> bool {
        matches!(self, Self::Kill)
    }

    #[cfg(unix)]
    pub fn to_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal as NixSignal;
        match self {
            Signal::Terminate => NixSignal::SIGTERM,
            Signal::Kill => NixSignal::SIGKILL,
            Signal::Interrupt => NixSignal::SIGINT,
            Signal::Hangup => NixSignal::SIGHUP,
            Signal::Quit => NixSignal::SIGQUIT,
            Signal::User1 => NixSignal::SIGUSR1,
            Signal::User2 => NixSignal::SIGUSR2,
        }
    }
}

/// A command string prepared for execution. Plain invocations are split into
/// an argument vector and executed directly; anything that needs the shell
/// (pipes, globs, variable expansion, env prefixes) goes through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Direct { program: String, args: Vec<String> },
    Shell(String),
}

impl CommandLine {
    pub fn parse(cmd: &str, os: HostOs) -> Self {
        // cmd.exe resolves .cmd/.bat shims (npm, pnpm, yarn) only through the shell
        if os.is_windows() || cmd.contains(SHELL_METACHARACTERS) {
            return Self::Shell(cmd.to_string());
        }

        match shell_words::split(cmd) {
            Ok(parts) => {
                let mut parts = parts.into_iter();
                match parts.next() {
                    Some(program) if !program.contains('=') => Self::Direct {
                        program,
                        args: parts.collect(),
                    },
                    _ => Self::Shell(cmd.to_string()),
                }
            }
            Err(_) => Self::Shell(cmd.to_string()),
        }
    }

    /// Program and arguments to hand to the OS.
    pub fn argv(&self, os: HostOs) -> (String, Vec<String>) {
        match self {
            Self::Direct { program, args } => (program.clone(), args.clone()),
            Self::Shell(cmd) if os.is_windows() => {
                ("cmd".to_string(), vec!["/C".to_string(), cmd.clone()])
            }
            Self::Shell(cmd) => ("sh".to_string(), vec!["-c".to_string(), cmd.clone()]),
        }
    }
}
