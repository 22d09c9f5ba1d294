mod adapter;
pub mod launcher;
mod platform;
pub mod probe;
mod project;
pub mod readiness;
pub mod registry;
pub mod terminator;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixPlatform as NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsPlatform as NativePlatform;

pub use adapter::Adapter;
pub use platform::Platform;
pub use project::{AdapterOutcome, Project};
pub use registry::{EntryStatus, Registry, RegistryEntry};

use std::sync::Arc;
use tracing::debug;

pub fn create_platform() -> Arc<dyn Platform> {
    let platform = Arc::new(NativePlatform::new());
    debug!("Using {:?} for {}", platform, platform.os());
    platform
}
