pub mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::command::CommandSpec;

pub use loader::ConfigLoader;

pub const DEFAULT_READY_TIMEOUT_MS: u64 = 120_000;

/// Directory under the project root holding the registry and logs.
pub const TOOL_DIR: &str = ".devctl";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterConfig {
    pub name: String,
    pub start: CommandSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_pattern: Option<String>,
    pub ready_timeout_ms: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: CommandSpec::plain(""),
            stop: None,
            kill: None,
            port: None,
            health: None,
            ready_pattern: None,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            env: HashMap::new(),
            cwd: None,
        }
    }
}

impl AdapterConfig {
    pub fn new(name: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: CommandSpec::plain(start),
            ..Default::default()
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_regex(&self) -> crate::Result<Option<Regex>> {
        self.ready_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    crate::Error::Config(format!(
                        "Invalid readyPattern for {}: {}",
                        self.name, e
                    ))
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> crate::Result<()> {
        validate_adapter_name(&self.name)?;

        if let CommandSpec::Plain(cmd) = &self.start
            && cmd.trim().is_empty()
        {
            return Err(crate::Error::Config(format!(
                "Adapter {} has an empty start command",
                self.name
            )));
        }

        if self.port == Some(0) {
            return Err(crate::Error::Config(format!(
                "Adapter {} has port 0",
                self.name
            )));
        }

        if let Some(health) = &self.health {
            url::Url::parse(health).map_err(|e| {
                crate::Error::Config(format!(
                    "Invalid health URL for {}: {} ({})",
                    self.name, health, e
                ))
            })?;
        }

        self.ready_regex()?;
        Ok(())
    }
}

/// Names end up as file names, so path separators are rejected.
pub fn validate_adapter_name(name: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(crate::Error::InvalidAdapterName(
            "name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(crate::Error::InvalidAdapterName(format!(
            "{}... (max 255 characters)",
            name.chars().take(32).collect::<String>()
        )));
    }

    if name.contains(['/', '\\', '\0', ':']) || name == "." || name == ".." {
        return Err(crate::Error::InvalidAdapterName(name.to_string()));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLayout {
    /// `<project>/.devctl/logs/<name>.log`
    #[default]
    Directory,
    /// `<project>/.devctl-<name>.log`
    Flat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Log truncated per run; the child writes to it directly.
    #[default]
    Truncate,
    /// Log appended per run; output is piped through the supervisor.
    Append,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSettings {
    #[serde(default)]
    pub layout: LogLayout,
    #[serde(default)]
    pub mode: LogMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
    #[serde(default)]
    pub logs: LogSettings,
}

impl Config {
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for adapter in &self.adapters {
            adapter.validate()?;
            if !seen.insert(adapter.name.as_str()) {
                return Err(crate::Error::Config(format!(
                    "Duplicate adapter name: {}",
                    adapter.name
                )));
            }
        }
        Ok(())
    }

    pub fn adapter(&self, name: &str) -> Option<&AdapterConfig> {
        self.adapters.iter().find(|a| a.name == name)
    }
}

// Raw deserialization struct for AdapterConfig
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdapterConfigRaw {
    pub name: String,
    pub start: CommandSpec,
    pub stop: Option<CommandSpec>,
    pub kill: Option<CommandSpec>,
    pub port: Option<u16>,
    pub health: Option<String>,
    pub ready_pattern: Option<String>,
    pub ready_timeout_ms: Option<u64>,
    pub env: Option<HashMap<String, String>>,
    pub cwd: Option<PathBuf>,
}

impl<'de> Deserialize<'de> for AdapterConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        AdapterConfigRaw::deserialize(deserializer).map(Into::into)
    }
}

impl From<AdapterConfigRaw> for AdapterConfig {
    fn from(raw: AdapterConfigRaw) -> Self {
        AdapterConfig {
            name: raw.name,
            start: raw.start,
            stop: raw.stop,
            kill: raw.kill,
            port: raw.port,
            health: raw.health.filter(|h| !h.trim().is_empty()),
            ready_pattern: raw.ready_pattern.filter(|p| !p.is_empty()),
            ready_timeout_ms: raw.ready_timeout_ms.unwrap_or(DEFAULT_READY_TIMEOUT_MS),
            env: raw.env.unwrap_or_default(),
            cwd: raw.cwd,
        }
    }
}
