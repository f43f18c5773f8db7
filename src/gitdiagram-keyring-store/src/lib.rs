//! Local credential storage for GitDiagram.
//!
//! Holds the few values a client keeps between sessions:
//! - the user's own model API key,
//! - a GitHub personal access token for private repositories,
//! - the "used a free generation" flag.
//!
//! Values are opaque strings. The [`KeyringStore`] backend keeps them in the
//! OS-native keychain (Credential Manager, Keychain, Secret Service); the
//! [`MemoryStore`] backend keeps them for the lifetime of the process.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Default service name for keyring entries.
pub const DEFAULT_SERVICE: &str = "gitdiagram";

/// Well-known entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Model provider API key supplied by the user.
    ApiKey,
    /// GitHub personal access token.
    GithubPat,
    /// Set to `"true"` after the first successful generation.
    UsedFreeGeneration,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "openrouter_key",
            Self::GithubPat => "github_pat",
            Self::UsedFreeGeneration => "has_used_free_generation",
        }
    }
}

/// Errors that can occur during credential operations.
#[derive(Error, Debug)]
pub enum KeyringError {
    /// Failed to access the keyring.
    #[error("Failed to access keyring: {0}")]
    AccessDenied(String),

    /// Failed to store the credential.
    #[error("Failed to store credential: {0}")]
    StoreFailed(String),

    /// Failed to delete the credential.
    #[error("Failed to delete credential: {0}")]
    DeleteFailed(String),

    /// Internal keyring error.
    #[error("Keyring error: {0}")]
    Internal(String),
}

impl From<keyring::Error> for KeyringError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => {
                KeyringError::AccessDenied("Cannot access keyring storage".to_string())
            }
            keyring::Error::PlatformFailure(_) => {
                KeyringError::Internal("Platform-specific keyring failure".to_string())
            }
            _ => KeyringError::Internal(err.to_string()),
        }
    }
}

/// Result type for credential operations.
pub type Result<T> = std::result::Result<T, KeyringError>;

/// Opaque string storage keyed by [`CredentialKey`].
pub trait CredentialStore: Send + Sync {
    /// Read a value. Absent entries are `Ok(None)`.
    fn get(&self, key: CredentialKey) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: CredentialKey, value: &str) -> Result<()>;

    /// Remove a value. Returns whether an entry existed.
    fn delete(&self, key: CredentialKey) -> Result<bool>;

    /// Read a boolean flag stored as `"true"`.
    fn flag(&self, key: CredentialKey) -> Result<bool> {
        Ok(self.get(key)?.as_deref() == Some("true"))
    }

    /// Store a boolean flag.
    fn set_flag(&self, key: CredentialKey, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" })
    }
}

/// Keyring store for secure credential management.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a new keyring store with the default service name.
    pub fn new() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
        }
    }

    /// Create a new keyring store with a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: CredentialKey) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key.as_str()).map_err(KeyringError::from)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!(key = key.as_str(), "Retrieved credential");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeyringError::from(e)),
        }
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        self.entry(key)?.set_password(value).map_err(|e| {
            warn!(key = key.as_str(), error = %e, "Failed to store credential");
            KeyringError::StoreFailed(e.to_string())
        })?;
        debug!(key = key.as_str(), "Stored credential");
        Ok(())
    }

    fn delete(&self, key: CredentialKey) -> Result<bool> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(key = key.as_str(), "Deleted credential");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(KeyringError::DeleteFailed(e.to_string())),
        }
    }
}

/// Process-local store, for tests and for running without a keychain.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CredentialKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        Ok(self.entries.read().get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        self.entries.write().insert(key, value.to_string());
        Ok(())
    }

    fn delete(&self, key: CredentialKey) -> Result<bool> {
        Ok(self.entries.write().remove(&key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(CredentialKey::ApiKey).unwrap(), None);

        store.set(CredentialKey::ApiKey, "sk-test").unwrap();
        assert_eq!(
            store.get(CredentialKey::ApiKey).unwrap().as_deref(),
            Some("sk-test")
        );
        assert_eq!(store.get(CredentialKey::GithubPat).unwrap(), None);

        assert!(store.delete(CredentialKey::ApiKey).unwrap());
        assert!(!store.delete(CredentialKey::ApiKey).unwrap());
    }

    #[test]
    fn test_flags() {
        let store = MemoryStore::new();
        assert!(!store.flag(CredentialKey::UsedFreeGeneration).unwrap());

        store
            .set_flag(CredentialKey::UsedFreeGeneration, true)
            .unwrap();
        assert!(store.flag(CredentialKey::UsedFreeGeneration).unwrap());
        assert_eq!(
            store
                .get(CredentialKey::UsedFreeGeneration)
                .unwrap()
                .as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_key_names() {
        assert_eq!(CredentialKey::ApiKey.as_str(), "openrouter_key");
        assert_eq!(CredentialKey::GithubPat.as_str(), "github_pat");
        assert_eq!(
            CredentialKey::UsedFreeGeneration.as_str(),
            "has_used_free_generation"
        );
    }

    // Note: These tests require a working keyring on the system.
    // They are marked as ignored by default to avoid CI failures.

    #[test]
    #[ignore]
    fn test_keyring_store_and_retrieve() {
        let store = KeyringStore::with_service("gitdiagram-test");

        store.set(CredentialKey::GithubPat, "ghp_test").unwrap();
        assert_eq!(
            store.get(CredentialKey::GithubPat).unwrap().as_deref(),
            Some("ghp_test")
        );

        assert!(store.delete(CredentialKey::GithubPat).unwrap());
        assert!(store.get(CredentialKey::GithubPat).unwrap().is_none());
    }
}
