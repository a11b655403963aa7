use crate::domain::comment::PluginConfig;
use crate::ports::ConfigStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryConfigStore {
    inner: RwLock<HashMap<String, PluginConfig>>,
    writes: AtomicUsize,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(name: impl Into<String>, config: PluginConfig) -> Self {
        let mut configs = HashMap::new();
        configs.insert(name.into(), config);
        Self {
            inner: RwLock::new(configs),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of writes since construction.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self, name: &str) -> anyhow::Result<PluginConfig> {
        Ok(self.inner.read().await.get(name).cloned().unwrap_or_default())
    }

    async fn write(&self, name: &str, config: &PluginConfig) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .insert(name.to_string(), config.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
