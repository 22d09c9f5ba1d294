use devctl_core::{ExitStatus, Result};
use devctl_logging::{LogTail, strip_ansi};
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

use crate::launcher::{ExitReceiver, wait_for_exit};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output kept for matching; older bytes are dropped once exceeded.
const MAX_BUFFER: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Exited(ExitStatus),
    TimedOut,
}

/// Watches a run's log for the first match of a readiness pattern, racing it
/// against process exit and a deadline.
#[derive(Debug)]
pub struct ReadinessDetector {
    pattern: Regex,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReadinessDetector {
    pub fn new(pattern: Regex, timeout: Duration) -> Self {
        Self {
            pattern,
            timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn watch(&self, log: &Path, offset: u64, mut exit: ExitReceiver) -> Result<Readiness> {
        let mut scanner = Scanner {
            tail: LogTail::new(log, offset),
            buffer: Vec::new(),
            pattern: &self.pattern,
        };

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if scanner.scan().await? {
                        debug!("Ready pattern matched in {:?}", log);
                        return Ok(Readiness::Ready);
                    }
                }
                status = wait_for_exit(&mut exit) => {
                    // output written just before exit still counts
                    if scanner.scan().await? {
                        return Ok(Readiness::Ready);
                    }
                    debug!("Process exited before ready: {}", status.describe());
                    return Ok(Readiness::Exited(status));
                }
                _ = &mut deadline => {
                    if scanner.scan().await? {
                        return Ok(Readiness::Ready);
                    }
                    return Ok(Readiness::TimedOut);
                }
            }
        }
    }
}

struct Scanner<'a> {
    tail: LogTail,
    buffer: Vec<u8>,
    pattern: &'a Regex,
}

impl Scanner<'_> {
    async fn scan(&mut self) -> Result<bool> {
        let chunk = self.tail.read_new().await?;
        if chunk.is_empty() {
            return Ok(false);
        }
        trace!("Read {} new bytes of output", chunk.len());

        self.buffer.extend_from_slice(&chunk);
        if self.buffer.len() > MAX_BUFFER {
            let excess = self.buffer.len() - MAX_BUFFER;
            self.buffer.drain(..excess);
        }

        let text = String::from_utf8_lossy(&self.buffer);
        Ok(self.pattern.is_match(&strip_ansi(&text)))
    }
}
