use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to launch {name}: {reason}")]
    Launch { name: String, reason: String },

    #[error("{name} did not become ready within {timeout_ms}ms")]
    ReadinessTimeout { name: String, timeout_ms: u64 },

    #[error("{name} exited before becoming ready (exit code: {code})")]
    PrematureExit { name: String, code: String },

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Termination error: {0}")]
    Termination(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid adapter name: {0}")]
    InvalidAdapterName(String),

    #[error("No command configured for {os} in {name}")]
    UnsupportedPlatform { name: String, os: String },

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[cfg(unix)]
    #[error("Unix error: {0}")]
    Unix(#[from] nix::errno::Errno),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
