use chrono::{DateTime, Utc};
use devctl_core::config::LogSettings;
use devctl_core::{AdapterConfig, Error, Result};
use devctl_logging::LogSink;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::launcher::{self, ExitReceiver, LaunchOptions, has_exited, wait_for_exit};
use crate::platform::Platform;
use crate::probe::{self, Liveness, ProbeTarget};
use crate::readiness::{Readiness, ReadinessDetector};
use crate::registry::{EntryStatus, Registry, RegistryEntry};
use crate::terminator::{Mode, Target, Terminator};

#[derive(Debug, Default)]
struct AdapterState {
    pid: Option<u32>,
    /// Process group of the launched or adopted process. Kept after the
    /// leader exits, until a stop or kill has signalled the group.
    pgid: Option<u32>,
    running: bool,
    starting: bool,
    last_error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    /// Exit notification of the child this process launched. Adopted PIDs
    /// have none.
    exit: Option<ExitReceiver>,
}

impl AdapterState {
    fn supervised(&self) -> bool {
        self.exit.as_ref().is_some_and(|exit| !has_exited(exit))
    }

    fn set_running(&mut self) {
        self.running = true;
        self.starting = false;
        self.last_error = None;
        self.started_at.get_or_insert_with(Utc::now);
    }

    fn clear(&mut self) {
        self.pid = None;
        self.running = false;
        self.starting = false;
        self.exit = None;
    }

    fn forget(&mut self) {
        self.clear();
        self.pgid = None;
    }
}

#[derive(Debug)]
struct Inner {
    config: AdapterConfig,
    project: PathBuf,
    cwd: PathBuf,
    log_path: PathBuf,
    logs: LogSettings,
    platform: Arc<dyn Platform>,
    registry: Registry,
    state: RwLock<AdapterState>,
    generation: AtomicU64,
    // orders registry writes for this adapter
    lifecycle: Mutex<()>,
}

/// Lifecycle of one supervised process.
///
/// At most one of `start`, `stop` or `kill` may be in flight at a time;
/// `is_running` may be called concurrently with any of them.
#[derive(Debug, Clone)]
pub struct Adapter {
    inner: Arc<Inner>,
}

impl Adapter {
    pub fn new(
        config: AdapterConfig,
        project: &Path,
        logs: LogSettings,
        platform: Arc<dyn Platform>,
        registry: Registry,
    ) -> Self {
        let cwd = match &config.cwd {
            Some(dir) => project.join(dir),
            None => project.to_path_buf(),
        };
        let log_path = devctl_logging::log_path(project, &config.name, logs.layout);

        Self {
            inner: Arc::new(Inner {
                config,
                project: project.to_path_buf(),
                cwd,
                log_path,
                logs,
                platform,
                registry,
                state: RwLock::new(AdapterState::default()),
                generation: AtomicU64::new(0),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    pub fn log_file(&self) -> &Path {
        &self.inner.log_path
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.state.read().pid
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.read().last_error.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().started_at
    }

    pub fn is_starting(&self) -> bool {
        self.inner.state.read().starting
    }

    /// `http://localhost:<port>`, or the origin of the health URL.
    pub fn url(&self) -> Option<String> {
        if let Some(port) = self.inner.config.port {
            return Some(format!("http://localhost:{}", port));
        }

        let health = self.inner.config.health.as_deref()?;
        let origin = url::Url::parse(health).ok()?.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }

    /// Tracks a process group leader recorded by an earlier invocation. The
    /// process is not a child of this one, so liveness is always probed.
    pub fn adopt(&self, pid: u32, started_at: Option<DateTime<Utc>>) {
        debug!("{} adopting process group {}", self.name(), pid);
        let mut state = self.inner.state.write();
        state.pid = Some(pid);
        state.pgid = Some(pid);
        state.started_at = started_at;
        state.exit = None;
    }

    /// Launches the process and, when a ready pattern is configured, waits
    /// for it. Any stale process from an earlier run is force-killed first.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let name = self.name().to_string();

        let command = match inner.platform.resolve_command(&name, &inner.config.start) {
            Ok(cmd) => cmd,
            Err(e) => return Err(self.fail(e)),
        };
        let ready = match inner.config.ready_regex() {
            Ok(ready) => ready,
            Err(e) => return Err(self.fail(e)),
        };

        self.kill().await;

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = inner.state.write();
            state.clear();
            state.starting = true;
            state.last_error = None;
            state.started_at = None;
        }

        let sink = LogSink::new(&inner.log_path, inner.logs.mode);
        let opts = LaunchOptions {
            name: &name,
            command: &command,
            cwd: &inner.cwd,
            env: &inner.config.env,
        };
        let launched = match launcher::launch(inner.platform.as_ref(), opts, &sink).await {
            Ok(launched) => launched,
            Err(e) => return Err(self.fail(e)),
        };

        {
            let mut state = inner.state.write();
            state.pid = Some(launched.pid);
            // launched with process_group(0), so the leader's PID names the group
            state.pgid = Some(launched.pid);
            state.started_at = Some(Utc::now());
            state.exit = Some(launched.exit.clone());
        }
        self.watch_exit(generation, launched.exit.clone());

        let Some(pattern) = ready else {
            info!("{} started (PID {})", name, launched.pid);
            inner.state.write().set_running();
            self.sync_registry(generation, EntryStatus::Running).await;
            return Ok(());
        };

        let detector = ReadinessDetector::new(pattern, inner.config.ready_timeout());
        let outcome = detector
            .watch(&inner.log_path, launched.log_offset, launched.exit)
            .await;

        match outcome {
            Ok(Readiness::Ready) => {
                info!("{} is ready (PID {})", name, launched.pid);
                inner.state.write().set_running();
                self.sync_registry(generation, EntryStatus::Running).await;
                Ok(())
            }
            Ok(Readiness::Exited(status)) => {
                inner.state.write().clear();
                Err(self.fail(Error::PrematureExit {
                    name,
                    code: status.describe(),
                }))
            }
            Ok(Readiness::TimedOut) => {
                // the process keeps running; a later probe may still find it up
                Err(self.fail(Error::ReadinessTimeout {
                    name,
                    timeout_ms: inner.config.ready_timeout_ms,
                }))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Graceful termination: configured stop command, then SIGTERM to the
    /// group. Waits up to five seconds for the process to exit.
    pub async fn stop(&self) {
        self.terminate(Mode::Graceful).await;
    }

    /// Forced termination with the configured kill command, then SIGKILL.
    pub async fn kill(&self) {
        self.terminate(Mode::Force).await;
    }

    /// Whether the process is up. A supervised child that is flagged running
    /// answers without probing.
    pub async fn is_running(&self) -> bool {
        let inner = &self.inner;
        let (pid, was_running, starting) = {
            let state = inner.state.read();
            if state.running && state.supervised() {
                return true;
            }
            (state.pid, state.running, state.starting)
        };

        let generation = inner.generation.load(Ordering::SeqCst);
        let target = ProbeTarget {
            health: inner.config.health.as_deref(),
            port: inner.config.port,
            pid,
        };
        let liveness = probe::probe(inner.platform.as_ref(), target).await;

        if starting {
            return liveness.is_running();
        }

        match liveness {
            Liveness::Running => {
                if !was_running {
                    debug!("{} found running", self.name());
                    inner.state.write().set_running();
                    self.sync_registry(generation, EntryStatus::Running).await;
                }
                true
            }
            Liveness::Stopped | Liveness::Gone => {
                {
                    let mut state = inner.state.write();
                    if liveness == Liveness::Gone {
                        state.pid = None;
                        state.exit = None;
                    }
                    state.running = false;
                }
                if was_running {
                    debug!("{} no longer running", self.name());
                    self.sync_registry(generation, EntryStatus::Stopped).await;
                }
                false
            }
        }
    }

    async fn terminate(&self, mode: Mode) {
        let inner = &self.inner;
        // invalidates registry writes still pending from the current run
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (pgid, exit) = {
            let state = inner.state.read();
            (state.pgid, state.exit.clone())
        };
        let command = match mode {
            Mode::Graceful => inner.config.stop.as_ref(),
            Mode::Force => inner.config.kill.as_ref(),
        };

        let target = Target {
            name: self.name(),
            command,
            pgid,
            port: inner.config.port,
            cwd: &inner.cwd,
            env: &inner.config.env,
            exit,
        };
        Terminator::new(inner.platform.as_ref())
            .terminate(target, mode)
            .await;

        inner.state.write().forget();
        self.sync_registry(generation, EntryStatus::Stopped).await;
    }

    fn watch_exit(&self, generation: u64, mut exit: ExitReceiver) {
        let adapter = self.clone();
        tokio::spawn(async move {
            let status = wait_for_exit(&mut exit).await;
            let inner = &adapter.inner;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }

            {
                let mut state = inner.state.write();
                if !state.running {
                    return;
                }
                warn!("{} exited: {}", adapter.name(), status.describe());
                state.clear();
            }
            adapter
                .sync_registry(generation, EntryStatus::Stopped)
                .await;
        });
    }

    fn fail(&self, e: Error) -> Error {
        error!("{}", e);
        let mut state = self.inner.state.write();
        state.running = false;
        state.starting = false;
        state.last_error = Some(e.to_string());
        e
    }

    async fn sync_registry(&self, generation: u64, status: EntryStatus) {
        let inner = &self.inner;
        let _guard = inner.lifecycle.lock().await;
        if inner.generation.load(Ordering::SeqCst) != generation {
            debug!("Skipping stale registry update for {}", self.name());
            return;
        }

        let result = match status {
            EntryStatus::Running => inner.registry.register(self.name(), self.entry()).await,
            EntryStatus::Stopped => inner.registry.deregister(self.name()).await,
        };
        if let Err(e) = result {
            warn!("Failed to update registry for {}: {}", self.name(), e);
        }
    }

    fn entry(&self) -> RegistryEntry {
        let state = self.inner.state.read();
        RegistryEntry {
            status: EntryStatus::Running,
            pid: state.pid.or(state.pgid),
            port: self.inner.config.port,
            log: self.inner.log_path.clone(),
            project: self.inner.project.clone(),
            health: self.inner.config.health.clone(),
            started_at: state.started_at,
            stopped_at: None,
        }
    }
}
