mod ansi;
mod sink;
mod tail;

pub use ansi::strip_ansi;
pub use sink::LogSink;
pub use tail::{LogTail, tail};

use devctl_core::config::{LogLayout, TOOL_DIR};
use std::path::{Path, PathBuf};

/// Where an adapter's log lives for the given layout.
pub fn log_path(project_root: &Path, name: &str, layout: LogLayout) -> PathBuf {
    match layout {
        LogLayout::Directory => project_root
            .join(TOOL_DIR)
            .join("logs")
            .join(format!("{}.log", name)),
        LogLayout::Flat => project_root.join(format!("{}-{}.log", TOOL_DIR, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_layout() {
        let path = log_path(Path::new("/work/app"), "api", LogLayout::Directory);
        assert_eq!(path, PathBuf::from("/work/app/.devctl/logs/api.log"));
    }

    #[test]
    fn test_flat_layout() {
        let path = log_path(Path::new("/work/app"), "web", LogLayout::Flat);
        assert_eq!(path, PathBuf::from("/work/app/.devctl-web.log"));
    }
}
