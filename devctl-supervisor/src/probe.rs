use devctl_core::{Error, Result};
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::platform::Platform;

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

static HTTP_CLIENT: Lazy<std::result::Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(HEALTH_TIMEOUT)
        .no_proxy()
        .build()
        .map_err(|e| e.to_string())
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Stopped,
    /// The tracked PID no longer exists.
    Gone,
}

impl Liveness {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheck {
    Healthy,
    Unreachable,
    Status(u16),
}

/// What a liveness probe may look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeTarget<'a> {
    pub health: Option<&'a str>,
    pub port: Option<u16>,
    pub pid: Option<u32>,
}

/// One GET against a health endpoint.
pub async fn check_health(url: &str) -> Result<HealthCheck> {
    let client = HTTP_CLIENT
        .as_ref()
        .map_err(|e| Error::Probe(format!("HTTP client unavailable: {}", e)))?;

    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => Ok(HealthCheck::Healthy),
        Ok(response) => Ok(HealthCheck::Status(response.status().as_u16())),
        Err(e) => {
            trace!("Health check {} failed: {}", url, e);
            Ok(HealthCheck::Unreachable)
        }
    }
}

/// Checks health endpoint, then listening port, then PID, stopping at the
/// first check that gives an answer. Probe failures read as stopped.
pub async fn probe(platform: &dyn Platform, target: ProbeTarget<'_>) -> Liveness {
    match run_probe(platform, target).await {
        Ok(liveness) => liveness,
        Err(e) => {
            warn!("Liveness probe failed: {}", e);
            Liveness::Stopped
        }
    }
}

async fn run_probe(platform: &dyn Platform, target: ProbeTarget<'_>) -> Result<Liveness> {
    if let Some(url) = target.health {
        match check_health(url).await? {
            HealthCheck::Healthy => return Ok(Liveness::Running),
            HealthCheck::Unreachable => {
                debug!("{} unreachable", url);
                return Ok(Liveness::Stopped);
            }
            HealthCheck::Status(code) => {
                debug!("{} answered {}, checking further", url, code);
            }
        }
    }

    if let Some(port) = target.port {
        return Ok(if platform.check_port_listening(port).await? {
            Liveness::Running
        } else {
            Liveness::Stopped
        });
    }

    match target.pid {
        Some(pid) if platform.pid_alive(pid).await => Ok(Liveness::Running),
        Some(pid) => {
            debug!("PID {} is gone", pid);
            Ok(Liveness::Gone)
        }
        None => Ok(Liveness::Stopped),
    }
}
