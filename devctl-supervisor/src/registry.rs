use chrono::{DateTime, Utc};
use devctl_core::Result;
use devctl_core::config::TOOL_DIR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

pub const REGISTRY_FILE: &str = "registry.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub status: EntryStatus,
    pub pid: Option<u32>,
    pub port: Option<u16>,
    pub log: PathBuf,
    pub project: PathBuf,
    pub health: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    pub fn is_running(&self) -> bool {
        self.status == EntryStatus::Running
    }
}

/// The shared status file of a project.
///
/// Every read-modify-write cycle happens under a mutex shared by all clones,
/// and the file is replaced through a rename. Separate processes are not
/// coordinated; the last writer wins.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn for_project(root: &Path) -> Self {
        Self::new(root.join(TOOL_DIR).join(REGISTRY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates or overwrites the entry for `name`.
    pub async fn register(&self, name: &str, entry: RegistryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await;
        debug!("Registering {} as {:?} (PID {:?})", name, entry.status, entry.pid);
        entries.insert(name.to_string(), entry);
        self.write(&entries).await
    }

    /// Marks the entry for `name` stopped. Unknown names are left absent.
    pub async fn deregister(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await;
        let Some(entry) = entries.get_mut(name) else {
            trace!("No registry entry for {}", name);
            return Ok(());
        };

        entry.status = EntryStatus::Stopped;
        entry.pid = None;
        entry.stopped_at = Some(Utc::now());
        debug!("Marked {} stopped in registry", name);
        self.write(&entries).await
    }

    pub async fn entries(&self) -> BTreeMap<String, RegistryEntry> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entries().await.remove(name)
    }

    async fn read(&self) -> BTreeMap<String, RegistryEntry> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Cannot read registry {:?}: {}", self.path, e);
                }
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt registry {:?}: {}", self.path, e);
            BTreeMap::new()
        })
    }

    async fn write(&self, entries: &BTreeMap<String, RegistryEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(pid: u32) -> RegistryEntry {
        RegistryEntry {
            status: EntryStatus::Running,
            pid: Some(pid),
            port: Some(4001),
            log: PathBuf::from("/p/.devctl/logs/api.log"),
            project: PathBuf::from("/p"),
            health: None,
            started_at: Some(Utc::now()),
            stopped_at: None,
        }
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(entry(42)).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["pid"], 42);
        assert_eq!(json["port"], 4001);
        assert!(json.get("startedAt").is_some());
        assert!(json["stoppedAt"].is_null());
        assert!(json["health"].is_null());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::for_project(dir.path());
        assert!(registry.entries().await.is_empty());
        assert!(registry.get("api").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::for_project(dir.path());
        std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();
        std::fs::write(registry.path(), "{ not json").unwrap();

        assert!(registry.entries().await.is_empty());

        registry.register("api", entry(7)).await.unwrap();
        assert_eq!(registry.get("api").await.unwrap().pid, Some(7));
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_noop() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::for_project(dir.path());
        registry.deregister("ghost").await.unwrap();
        assert!(!registry.path().exists());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::for_project(dir.path());
        registry.register("api", entry(1)).await.unwrap();
        registry.deregister("api").await.unwrap();

        let files: Vec<_> = std::fs::read_dir(registry.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from(REGISTRY_FILE)]);
    }
}
