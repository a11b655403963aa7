use super::value_object::RequestKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted relay configuration.
///
/// Fields this crate does not know about are carried through `extra` so a
/// write-back never drops settings owned by someone else.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(rename = "requestKey", default, skip_serializing_if = "Option::is_none")]
    pub request_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginConfig {
    /// The provisioned key, if one is set and non-empty.
    pub fn request_key(&self) -> Option<RequestKey> {
        self.request_key
            .as_deref()
            .and_then(|key| RequestKey::new(key).ok())
    }

    pub fn needs_key(&self) -> bool {
        self.request_key().is_none()
    }

    pub fn set_request_key(&mut self, key: &RequestKey) {
        self.request_key = Some(key.as_str().to_string());
    }
}
