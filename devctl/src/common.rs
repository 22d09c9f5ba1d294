use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use devctl_core::ConfigLoader;
use devctl_supervisor::Project;
use std::path::PathBuf;
use tracing::debug;

/// Standard success indicator for all commands
pub const SUCCESS_ICON: &str = "✓";
/// Standard failure indicator for all commands
pub const FAILURE_ICON: &str = "✗";
/// Standard running indicator for status displays
pub const RUNNING_ICON: &str = "●";
/// Standard stopped indicator for status displays
pub const STOPPED_ICON: &str = "○";

/// Which project the command operates on.
#[derive(Debug, Clone, Default)]
pub struct ProjectTarget {
    pub project: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl ProjectTarget {
    pub fn root(&self) -> Result<PathBuf> {
        match &self.project {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Cannot determine current directory"),
        }
    }

    /// Loads the config and opens the project, adopting processes an earlier
    /// invocation left running.
    pub async fn open(&self) -> Result<Project> {
        let root = self.root()?;
        if !root.is_dir() {
            anyhow::bail!("Project directory {} does not exist", root.display());
        }

        let config = match &self.config {
            Some(path) => ConfigLoader::new()
                .load_file(path)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ConfigLoader::for_project(&root)
                .load()
                .await
                .with_context(|| format!("Failed to load devctl config from {}", root.display()))?,
        };

        if config.adapters.is_empty() {
            anyhow::bail!("No adapters configured");
        }

        debug!("Loaded {} adapters for {:?}", config.adapters.len(), root);
        Project::open(&root, config)
            .await
            .context("Failed to open project")
    }
}

/// Format duration to human-readable string
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

pub fn uptime_secs(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<u64> {
    let started_at = started_at?;
    u64::try_from((now - started_at).num_seconds()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(60), "1m 0s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(3665), "1h 1m");
        assert_eq!(format_duration(86400), "1d 0h");
        assert_eq!(format_duration(90061), "1d 1h");
    }

    #[test]
    fn test_uptime() {
        let now = Utc::now();
        assert_eq!(uptime_secs(None, now), None);
        assert_eq!(uptime_secs(Some(now - Duration::seconds(90)), now), Some(90));
        // clock skew between invocations
        assert_eq!(uptime_secs(Some(now + Duration::seconds(5)), now), None);
    }

    #[test]
    fn test_explicit_project_root() {
        let target = ProjectTarget {
            project: Some(PathBuf::from("/work/shop")),
            config: None,
        };
        assert_eq!(target.root().unwrap(), PathBuf::from("/work/shop"));
    }
}
