use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const REQUEST_KEY_LEN: usize = 32;
const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
// Largest multiple of the alphabet size that fits in a byte; bytes above it are rejected.
const KEY_SAMPLE_CEILING: u8 = (256 / KEY_ALPHABET.len() * KEY_ALPHABET.len()) as u8;

/// Raw amount of comments requested by the caller.
///
/// Only presence is checked here; the command subsystem owns numeric parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentAmount(String);

impl CommentAmount {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("amount cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity that receives the comments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivingId(String);

impl ReceivingId {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("receiving id cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceivingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operator identity every authenticated request acts on behalf of.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerIdentity(String);

impl OwnerIdentity {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("owner identity cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Command names are case sensitive; wrap them to prevent accidental mixing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandName(String);

impl CommandName {
    pub const COMMENT: &'static str = "comment";

    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        Ok(Self(name))
    }

    pub fn comment() -> Self {
        Self(Self::COMMENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared secret a caller must present to dispatch a command.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestKey(String);

impl RequestKey {
    /// Generates an alphanumeric key from the OS random source.
    pub fn generate() -> anyhow::Result<Self> {
        let mut key = String::with_capacity(REQUEST_KEY_LEN);
        let mut buf = [0u8; REQUEST_KEY_LEN * 2];
        while key.len() < REQUEST_KEY_LEN {
            getrandom::fill(&mut buf).map_err(|err| anyhow!("OS random source failed: {err}"))?;
            for byte in buf {
                if byte >= KEY_SAMPLE_CEILING {
                    continue;
                }
                key.push(KEY_ALPHABET[(byte as usize) % KEY_ALPHABET.len()] as char);
                if key.len() == REQUEST_KEY_LEN {
                    break;
                }
            }
        }
        Ok(Self(key))
    }

    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("request key cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix safe to print in logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestKey({})", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_is_alphanumeric() {
        let key = RequestKey::generate().unwrap();
        assert_eq!(key.as_str().len(), REQUEST_KEY_LEN);
        assert!(key.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_keys_differ() {
        let first = RequestKey::generate().unwrap();
        let second = RequestKey::generate().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn debug_hides_key_material() {
        let key = RequestKey::new("supersecret").unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("supersecret"));
        assert_eq!(key.fingerprint().len(), 12);
    }

    #[test]
    fn empty_values_are_rejected() {
        assert!(CommentAmount::new("").is_err());
        assert!(ReceivingId::new("").is_err());
        assert!(RequestKey::new("").is_err());
        assert!(OwnerIdentity::new("  ").is_err());
        assert!(CommandName::new("").is_err());
    }

    #[test]
    fn amount_keeps_raw_text() {
        let amount = CommentAmount::new("five").unwrap();
        assert_eq!(amount.as_str(), "five");
        assert_eq!(CommandName::comment().as_str(), "comment");
    }
}
