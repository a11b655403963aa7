use std::path::{Path, PathBuf};
use tracing::error;

/// Reads the external log file shown on `/output`.
pub struct OutputLogReader {
    path: PathBuf,
}

impl OutputLogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full file contents; an unreadable file is logged and yields an empty
    /// string rather than an error.
    pub async fn read_contents(&self) -> String {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                error!(path = %self.path.display(), %err, "failed to read output log");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn returns_whole_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("output.log");
        std::fs::write(&path, "line one\nline two\n").unwrap();
        let reader = OutputLogReader::new(&path);
        assert_eq!(reader.read_contents().await, "line one\nline two\n");
    }

    #[tokio::test]
    async fn missing_file_yields_empty_body() {
        let temp = TempDir::new().unwrap();
        let reader = OutputLogReader::new(temp.path().join("absent.log"));
        assert_eq!(reader.read_contents().await, "");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("output.log");
        std::fs::write(&path, [b'o', b'k', 0xff]).unwrap();
        let contents = OutputLogReader::new(&path).read_contents().await;
        assert!(contents.starts_with("ok"));
    }
}
