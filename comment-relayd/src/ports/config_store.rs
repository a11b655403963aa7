use crate::domain::comment::PluginConfig;
use async_trait::async_trait;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the stored config, or the default when none exists yet.
    async fn load(&self, name: &str) -> anyhow::Result<PluginConfig>;
    async fn write(&self, name: &str, config: &PluginConfig) -> anyhow::Result<()>;
}
