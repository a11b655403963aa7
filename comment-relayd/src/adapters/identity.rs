use crate::domain::comment::OwnerIdentity;
use crate::ports::IdentityLookup;
use async_trait::async_trait;

/// Owner identity fixed at startup.
pub struct StaticOwnerIdentity {
    owner: OwnerIdentity,
}

impl StaticOwnerIdentity {
    pub fn new(owner: OwnerIdentity) -> Self {
        Self { owner }
    }
}

#[async_trait]
impl IdentityLookup for StaticOwnerIdentity {
    async fn owner_identity(&self) -> anyhow::Result<OwnerIdentity> {
        Ok(self.owner.clone())
    }
}
