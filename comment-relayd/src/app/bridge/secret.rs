use crate::domain::comment::{PluginConfig, RequestKey};
use crate::ports::ConfigStore;
use crate::telemetry::RelayMetrics;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Makes sure a shared request key is persisted before the relay serves.
pub struct SecretProvisioner {
    store: Arc<dyn ConfigStore>,
    config_name: String,
    metrics: Option<Arc<RelayMetrics>>,
}

impl SecretProvisioner {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        config_name: impl Into<String>,
        metrics: Option<Arc<RelayMetrics>>,
    ) -> Self {
        Self {
            store,
            config_name: config_name.into(),
            metrics,
        }
    }

    /// Loads the config and generates a key when it is missing or empty.
    /// The config is only written back when a key was generated.
    pub async fn provision(&self) -> anyhow::Result<PluginConfig> {
        let mut config = self
            .store
            .load(&self.config_name)
            .await
            .with_context(|| format!("loading relay config '{}'", self.config_name))?;

        if config.needs_key() {
            let key = RequestKey::generate().context("generating request key")?;
            config.set_request_key(&key);
            self.store
                .write(&self.config_name, &config)
                .await
                .with_context(|| format!("persisting relay config '{}'", self.config_name))?;
            if let Some(metrics) = &self.metrics {
                metrics.record_key_generated();
            }
            info!(
                config = %self.config_name,
                fingerprint = %key.fingerprint(),
                "generated new request key"
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::config::{FileConfigStore, InMemoryConfigStore};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct ReadOnlyStore;

    #[async_trait]
    impl ConfigStore for ReadOnlyStore {
        async fn load(&self, _name: &str) -> anyhow::Result<PluginConfig> {
            Ok(PluginConfig::default())
        }

        async fn write(&self, _name: &str, _config: &PluginConfig) -> anyhow::Result<()> {
            anyhow::bail!("store is read-only")
        }
    }

    #[tokio::test]
    async fn generates_and_persists_missing_key() {
        let store = Arc::new(InMemoryConfigStore::new());
        let provisioner = SecretProvisioner::new(store.clone(), "relay", None);
        let config = provisioner.provision().await.unwrap();
        let key = config.request_key().expect("key generated");
        assert_eq!(key.as_str().len(), 32);
        assert_eq!(store.write_count(), 1);
        let stored = store.load("relay").await.unwrap();
        assert_eq!(stored.request_key, config.request_key);
    }

    #[tokio::test]
    async fn keeps_existing_key_without_writing() {
        let store = Arc::new(InMemoryConfigStore::with_config(
            "relay",
            serde_json::from_value(json!({"requestKey": "existing"})).unwrap(),
        ));
        let provisioner = SecretProvisioner::new(store.clone(), "relay", None);
        let config = provisioner.provision().await.unwrap();
        assert_eq!(config.request_key.as_deref(), Some("existing"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn empty_key_is_replaced() {
        let store = Arc::new(InMemoryConfigStore::with_config(
            "relay",
            serde_json::from_value(json!({"requestKey": "", "owner": "ops"})).unwrap(),
        ));
        let provisioner = SecretProvisioner::new(store.clone(), "relay", None);
        let config = provisioner.provision().await.unwrap();
        assert!(!config.needs_key());
        assert_eq!(config.extra.get("owner"), Some(&json!("ops")));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn key_survives_reload() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FileConfigStore::new(temp.path()));
        let first = SecretProvisioner::new(store.clone(), "relay", None)
            .provision()
            .await
            .unwrap();

        let reopened = Arc::new(FileConfigStore::new(temp.path()));
        let second = SecretProvisioner::new(reopened, "relay", None)
            .provision()
            .await
            .unwrap();
        assert_eq!(first.request_key, second.request_key);
    }

    #[tokio::test]
    async fn persistence_failure_is_fatal() {
        let provisioner = SecretProvisioner::new(Arc::new(ReadOnlyStore), "relay", None);
        let err = provisioner.provision().await.unwrap_err();
        assert!(format!("{err:#}").contains("read-only"));
    }
}
