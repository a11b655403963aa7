use crate::domain::comment::OwnerIdentity;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn owner_identity(&self) -> anyhow::Result<OwnerIdentity>;
}
