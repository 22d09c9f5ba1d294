use devctl_core::config::LogMode;
use devctl_core::Result;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;

/// An adapter's log file, prepared for one run.
///
/// The child writes straight into the file through an `O_APPEND`
/// descriptor in both modes, so it keeps logging after the supervisor has
/// exited. [`LogMode::Truncate`] empties the file first;
/// [`LogMode::Append`] keeps earlier runs.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
    mode: LogMode,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>, mode: LogMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Creates the parent directory and the file, truncating it in truncate
    /// mode. Returns the offset where this run's output begins.
    pub fn prepare(&self) -> Result<u64> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let offset = match self.mode {
            LogMode::Truncate => {
                File::create(&self.path)?;
                0
            }
            LogMode::Append => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                file.metadata()?.len()
            }
        };

        debug!("Prepared log {:?} ({:?}) at offset {}", self.path, self.mode, offset);
        Ok(offset)
    }

    /// Stdout and stderr handles for the child. Both share one append-mode
    /// descriptor so interleaved writes never clobber each other, and no
    /// pipe ties the child to the supervisor's lifetime.
    pub fn child_stdio(&self) -> Result<(Stdio, Stdio)> {
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let err = out.try_clone()?;
        Ok((Stdio::from(out), Stdio::from(err)))
    }
}
