use devctl_core::Result;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

/// Last `lines` lines of a log, or a short explanation when there is nothing
/// to show.
pub async fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![
            format!("No log file found at {}", path.display()),
            "The adapter has not been started from this project yet".to_string(),
        ]);
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Ok(vec![format!("Log file {} exists but is empty", path.display())]);
    }

    let file = tokio::fs::File::open(path).await.map_err(|e| {
        devctl_core::Error::Io(std::io::Error::new(
            e.kind(),
            format!("Cannot open log file {}: {}", path.display(), e),
        ))
    })?;

    let mut reader = BufReader::new(file);
    let mut all_lines = Vec::new();
    let mut raw = Vec::new();
    while reader.read_until(b'\n', &mut raw).await? > 0 {
        let line = String::from_utf8_lossy(&raw);
        all_lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        raw.clear();
    }

    let start = all_lines.len().saturating_sub(lines);
    Ok(all_lines.split_off(start))
}

/// Incremental reader over a file that another process is writing.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    offset: u64,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes appended since the last read. A missing file reads as empty; a
    /// file that shrank below the offset is read from the start.
    pub async fn read_new(&mut self) -> Result<Vec<u8>> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if len < self.offset {
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut chunk = Vec::with_capacity((len - self.offset) as usize);
        file.take(len - self.offset).read_to_end(&mut chunk).await?;
        self.offset += chunk.len() as u64;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tail_missing_file() {
        let dir = TempDir::new().unwrap();
        let lines = tail(&dir.path().join("nope.log"), 10).await.unwrap();
        assert!(lines[0].starts_with("No log file found"));
    }

    #[tokio::test]
    async fn test_tail_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        std::fs::write(&path, "").unwrap();

        let lines = tail(&path, 10).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("is empty"));
    }

    #[tokio::test]
    async fn test_tail_last_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let content: String = (1..=10).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(&path, content).unwrap();

        let lines = tail(&path, 3).await.unwrap();
        assert_eq!(lines, vec!["line 8", "line 9", "line 10"]);

        let all = tail(&path, 100).await.unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn test_tail_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.log");
        std::fs::write(&path, b"ok\n\xff\xfe broken\r\n").unwrap();

        let lines = tail(&path, 5).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok");
        assert!(lines[1].ends_with("broken"));
    }

    #[tokio::test]
    async fn test_log_tail_reads_increments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        std::fs::write(&path, "old output\n").unwrap();

        let mut reader = LogTail::new(&path, 11);
        assert!(reader.read_new().await.unwrap().is_empty());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"starting\n").unwrap();
        assert_eq!(reader.read_new().await.unwrap(), b"starting\n");

        file.write_all(b"ready\n").unwrap();
        assert_eq!(reader.read_new().await.unwrap(), b"ready\n");
        assert_eq!(reader.offset(), 26);
    }

    #[tokio::test]
    async fn test_log_tail_missing_then_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("later.log");

        let mut reader = LogTail::new(&path, 0);
        assert!(reader.read_new().await.unwrap().is_empty());

        std::fs::write(&path, "hello\n").unwrap();
        assert_eq!(reader.read_new().await.unwrap(), b"hello\n");
    }

    #[tokio::test]
    async fn test_log_tail_restarts_after_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotated.log");
        std::fs::write(&path, "a long first run\n").unwrap();

        let mut reader = LogTail::new(&path, 0);
        reader.read_new().await.unwrap();

        std::fs::write(&path, "new\n").unwrap();
        assert_eq!(reader.read_new().await.unwrap(), b"new\n");
    }
}
