//! Platform keychain backend for key material.
//!
//! Uses the `keyring` crate for cross-platform access:
//! - macOS: Keychain Services
//! - Linux: kernel keyutils
//! - Windows: Credential Manager
//!
//! The share group, when given, is used as the keyring service name so that
//! every app configured with the same group sees the same entries. The
//! visibility policy has no keyring equivalent and is only logged.

use anyhow::{Context, Result};
use secstore_core::VisibilityPolicy;

use crate::backend::CredentialStore;

pub const DEFAULT_SERVICE: &str = "secstore";

/// Credential store backed by the platform keychain.
#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service: String,
}

impl KeychainCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, account: &str, group: Option<&str>) -> Result<keyring::Entry> {
        keyring::Entry::new(group.unwrap_or(&self.service), account)
            .with_context(|| format!("keychain entry creation for '{account}'"))
    }
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn load(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        let entry = self.entry(account, group)?;
        match entry.get_secret() {
            Ok(secret) => {
                tracing::trace!(key = account, %visibility, "loaded secret from platform keychain");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("keychain get for '{account}': {e}")),
        }
    }

    fn store(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
        secret: &[u8],
    ) -> Result<()> {
        let entry = self.entry(account, group)?;
        entry
            .set_secret(secret)
            .map_err(|e| anyhow::anyhow!("keychain store for '{account}': {e}"))?;
        tracing::debug!(key = account, %visibility, "stored secret in platform keychain");
        Ok(())
    }

    fn delete(
        &self,
        account: &str,
        _visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<()> {
        let entry = self.entry(account, group)?;
        match entry.delete_credential() {
            Ok(()) => {
                tracing::debug!(key = account, "deleted secret from platform keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // already deleted
            Err(e) => Err(anyhow::anyhow!("keychain delete for '{account}': {e}")),
        }
    }
}

/// Check if the platform keychain answers a lookup.
///
/// Creating an entry never touches the backend, so this reads a sentinel
/// account: a value or `NoEntry` means the store is reachable, any other
/// error (locked, no storage access, platform failure) means it is not.
pub fn is_available() -> bool {
    let entry = match keyring::Entry::new(DEFAULT_SERVICE, "__secstore_availability__") {
        Ok(entry) => entry,
        Err(e) => {
            tracing::debug!("keychain entry creation failed: {e}");
            return false;
        }
    };
    match entry.get_secret() {
        Ok(_) | Err(keyring::Error::NoEntry) => true,
        Err(e) => {
            tracing::debug!("keychain unavailable: {e}");
            false
        }
    }
}
