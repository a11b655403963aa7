use crate::ports::ConfigStore;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::error;

/// Checks a caller-supplied key against the currently stored one.
///
/// The store is read on every call so an externally rotated key applies to
/// the next request.
pub struct Authenticator {
    store: Arc<dyn ConfigStore>,
    config_name: String,
}

impl Authenticator {
    pub fn new(store: Arc<dyn ConfigStore>, config_name: impl Into<String>) -> Self {
        Self {
            store,
            config_name: config_name.into(),
        }
    }

    pub async fn authenticate(&self, supplied: Option<&str>) -> bool {
        let Some(supplied) = supplied.filter(|key| !key.is_empty()) else {
            return false;
        };
        let config = match self.store.load(&self.config_name).await {
            Ok(config) => config,
            Err(err) => {
                error!(config = %self.config_name, error = %format!("{err:#}"), "failed to read relay config while authenticating");
                return false;
            }
        };
        let Some(expected) = config.request_key() else {
            return false;
        };
        keys_match(supplied, expected.as_str())
    }
}

fn keys_match(supplied: &str, expected: &str) -> bool {
    supplied.len() == expected.len() && supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::config::InMemoryConfigStore;
    use crate::domain::comment::PluginConfig;
    use proptest::prelude::*;

    fn config_with_key(key: &str) -> PluginConfig {
        PluginConfig {
            request_key: Some(key.to_string()),
            ..PluginConfig::default()
        }
    }

    fn authenticator(key: &str) -> (Authenticator, Arc<InMemoryConfigStore>) {
        let store = Arc::new(InMemoryConfigStore::with_config("relay", config_with_key(key)));
        (Authenticator::new(store.clone(), "relay"), store)
    }

    #[tokio::test]
    async fn accepts_exact_key_only() {
        let (auth, _) = authenticator("Secret123");
        assert!(auth.authenticate(Some("Secret123")).await);
        assert!(!auth.authenticate(Some("secret123")).await);
        assert!(!auth.authenticate(Some("Secret1234")).await);
        assert!(!auth.authenticate(Some("")).await);
        assert!(!auth.authenticate(None).await);
    }

    #[tokio::test]
    async fn rotated_key_applies_immediately() {
        let (auth, store) = authenticator("old-key");
        assert!(auth.authenticate(Some("old-key")).await);
        store.write("relay", &config_with_key("new-key")).await.unwrap();
        assert!(!auth.authenticate(Some("old-key")).await);
        assert!(auth.authenticate(Some("new-key")).await);
    }

    #[tokio::test]
    async fn unprovisioned_store_denies_everything() {
        let store = Arc::new(InMemoryConfigStore::new());
        let auth = Authenticator::new(store, "relay");
        assert!(!auth.authenticate(Some("anything")).await);
    }

    proptest! {
        #[test]
        fn only_identical_keys_match(expected in "[A-Za-z0-9]{1,40}", supplied in "[A-Za-z0-9]{0,40}") {
            prop_assert_eq!(keys_match(&supplied, &expected), supplied == expected);
        }
    }
}
