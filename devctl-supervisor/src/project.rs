use devctl_core::{Config, Error, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::platform::Platform;
use crate::registry::Registry;

/// Outcome of a lifecycle operation on one adapter.
#[derive(Debug)]
pub struct AdapterOutcome {
    pub name: String,
    pub result: Result<()>,
}

/// The adapters of one project directory together with the registry they
/// share.
#[derive(Debug)]
pub struct Project {
    registry: Registry,
    adapters: Vec<Adapter>,
}

impl Project {
    pub async fn open(root: &Path, config: Config) -> Result<Self> {
        Self::with_platform(root, config, crate::create_platform()).await
    }

    /// Builds one adapter per config entry and adopts process groups the
    /// registry still lists as running. Entries whose PID no longer leads a
    /// group of ours are marked stopped instead.
    pub async fn with_platform(
        root: &Path,
        config: Config,
        platform: Arc<dyn Platform>,
    ) -> Result<Self> {
        config.validate()?;

        let root = std::path::absolute(root)?;
        let registry = Registry::for_project(&root);
        let logs = config.logs;

        let adapters: Vec<Adapter> = config
            .adapters
            .into_iter()
            .map(|adapter| {
                Adapter::new(adapter, &root, logs, platform.clone(), registry.clone())
            })
            .collect();

        let entries = registry.entries().await;
        for adapter in &adapters {
            let Some(entry) = entries.get(adapter.name()).filter(|e| e.is_running()) else {
                continue;
            };

            let owned = match entry.pid {
                Some(pid) => owns_group(platform.as_ref(), pid, adapter.config().port).await,
                None => false,
            };
            if owned && let Some(pid) = entry.pid {
                adapter.adopt(pid, entry.started_at);
                continue;
            }

            warn!(
                "Ignoring stale registry entry for {} (PID {:?})",
                adapter.name(),
                entry.pid
            );
            if let Err(e) = registry.deregister(adapter.name()).await {
                warn!("Failed to clear registry entry for {}: {}", adapter.name(), e);
            }
        }

        debug!("Opened project {:?} with {} adapters", root, adapters.len());
        Ok(Self { registry, adapters })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn adapter(&self, name: &str) -> Option<&Adapter> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// The named adapter, or all of them.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<Adapter>> {
        match name {
            Some(name) => self
                .adapter(name)
                .cloned()
                .map(|a| vec![a])
                .ok_or_else(|| Error::Config(format!("Unknown adapter: {}", name))),
            None => Ok(self.adapters.clone()),
        }
    }

    /// Starts the selected adapters concurrently. Outcomes are in config
    /// order.
    pub async fn start(&self, name: Option<&str>) -> Result<Vec<AdapterOutcome>> {
        let selected = self.select(name)?;
        let mut set = JoinSet::new();
        for (index, adapter) in selected.iter().cloned().enumerate() {
            set.spawn(async move { (index, adapter.start().await) });
        }

        let mut outcomes: Vec<Option<AdapterOutcome>> = selected.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    outcomes[index] = Some(AdapterOutcome {
                        name: selected[index].name().to_string(),
                        result,
                    });
                }
                Err(e) => warn!("Start task failed: {}", e),
            }
        }

        Ok(selected
            .iter()
            .zip(outcomes)
            .map(|(adapter, outcome)| {
                outcome.unwrap_or_else(|| AdapterOutcome {
                    name: adapter.name().to_string(),
                    result: Err(Error::Launch {
                        name: adapter.name().to_string(),
                        reason: "start task did not complete".to_string(),
                    }),
                })
            })
            .collect())
    }

    /// Stops the selected adapters concurrently, force-killing any that are
    /// still up afterwards.
    pub async fn stop(&self, name: Option<&str>) -> Result<()> {
        let selected = self.select(name)?;
        let mut set = JoinSet::new();
        for adapter in selected {
            set.spawn(async move {
                adapter.stop().await;
                if adapter.is_running().await {
                    warn!("{} survived stop, killing", adapter.name());
                    adapter.kill().await;
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("Stop task failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Whether `pgid` still names a group this project launched: the group
/// exists and, when a port is configured, one of its members holds it. A
/// recycled PID that leads no group never passes.
async fn owns_group(platform: &dyn Platform, pgid: u32, port: Option<u16>) -> bool {
    if !platform.group_alive(pgid).await {
        return false;
    }
    let Some(port) = port else {
        return true;
    };

    let owners = match platform.find_process_by_port(port).await {
        Ok(owners) => owners,
        Err(e) => {
            debug!("Cannot verify owner of port {}: {}", port, e);
            return true;
        }
    };
    for owner in owners {
        match platform.process_group(owner).await {
            Some(group) if group != pgid => continue,
            _ => return true,
        }
    }
    false
}
