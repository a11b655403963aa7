use crate::domain::comment::PluginConfig;
use crate::ports::ConfigStore;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const TMP_SUFFIX: &str = ".tmp";

/// Stores each config document as `<dir>/<name>.json`.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> anyhow::Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(|c: char| c == '/' || c == '\\')
        {
            bail!("invalid config name '{name}'");
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self, name: &str) -> anyhow::Result<PluginConfig> {
        let path = self.path_for(name)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PluginConfig::default())
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading relay config {}", path.display()))
            }
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(PluginConfig::default());
        }
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing relay config {}", path.display()))
    }

    async fn write(&self, name: &str, config: &PluginConfig) -> anyhow::Result<()> {
        let path = self.path_for(name)?;
        let json = serde_json::to_vec_pretty(config)?;
        let tmp_path = path.with_extension(format!("json{TMP_SUFFIX}"));

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating config directory {}", self.dir.display()))?;

        let mut file = fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("creating temp relay config {}", tmp_path.display()))?;
        file.write_all(&json)
            .await
            .with_context(|| format!("writing temp relay config {}", tmp_path.display()))?;
        file.flush().await?;
        drop(file);
        restrict_permissions(&tmp_path).await?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("renaming relay config to {}", path.display()))?;
        Ok(())
    }
}

// The file holds the shared secret; keep it owner-readable only.
#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .with_context(|| format!("restricting permissions on {}", path.display()))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_default() {
        let temp = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp.path());
        assert_eq!(store.load("relay").await.unwrap(), PluginConfig::default());
    }

    #[tokio::test]
    async fn persists_and_loads_config() {
        let temp = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp.path().join("nested"));
        let config: PluginConfig =
            serde_json::from_value(json!({"requestKey": "abc123", "port": 3034})).unwrap();
        store.write("relay", &config).await.unwrap();

        let reopened = FileConfigStore::new(temp.path().join("nested"));
        let loaded = reopened.load("relay").await.unwrap();
        assert_eq!(loaded, config);
        assert!(!temp.path().join("nested").join("relay.json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn written_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp.path());
        store.write("relay", &PluginConfig::default()).await.unwrap();
        let mode = std::fs::metadata(temp.path().join("relay.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn corrupted_config_returns_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("relay.json"), b"not-json").unwrap();
        let store = FileConfigStore::new(temp.path());
        assert!(store.load("relay").await.is_err());
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let temp = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp.path());
        assert!(store.load("../escape").await.is_err());
        assert!(store.write("", &PluginConfig::default()).await.is_err());
    }
}
