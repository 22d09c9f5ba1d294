use super::Config;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "devctl.json";

/// Config loader with auto-discovery
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that only looks inside `root`.
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        Self {
            search_paths: vec![root.into()],
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Auto-discover and load config from the search paths
    pub async fn load(&self) -> crate::Result<Config> {
        // Priority order per directory:
        // 1. devctl.json
        // 2. package.json with a devctl section

        for dir in &self.search_paths {
            let devctl_json = dir.join(CONFIG_FILE);
            if devctl_json.exists() {
                return self.load_devctl_json(&devctl_json).await;
            }

            let package_json = dir.join("package.json");
            if package_json.exists()
                && let Ok(config) = self.load_package_json(&package_json).await
            {
                return Ok(config);
            }
        }

        Err(crate::Error::Config(format!(
            "No {} found (searched {})",
            CONFIG_FILE,
            self.search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Load a specific config file
    pub async fn load_file(&self, path: &Path) -> crate::Result<Config> {
        let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if filename == "package.json" {
            self.load_package_json(path).await
        } else {
            self.load_devctl_json(path).await
        }
    }

    async fn load_devctl_json(&self, path: &Path) -> crate::Result<Config> {
        debug!("Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    async fn load_package_json(&self, path: &Path) -> crate::Result<Config> {
        debug!("Loading config from devctl section of {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let package: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse package.json: {}", e)))?;

        let section = package.get("devctl").ok_or_else(|| {
            crate::Error::Config("No devctl section in package.json".to_string())
        })?;

        let config: Config = serde_json::from_value(section.clone()).map_err(|e| {
            crate::Error::Config(format!("Failed to parse devctl section: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}
