//! secstore-secrets: persistence of the AES key and IV outside the plain store
//!
//! Secret names are scoped by suite:
//!   `EncryptedDefaults.AESKey`            (no suite)
//!   `EncryptedDefaults.AESKey-<suite>`    (suite set)
//!
//! Failures of the underlying credential store are logged and reported as
//! `false` / `None`; no error detail reaches the caller.

pub mod backend;
pub mod keychain;

pub use backend::{CredentialStore, MemoryCredentialStore};
pub use keychain::KeychainCredentialStore;

use secstore_core::VisibilityPolicy;

/// The two kinds of secret material a store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Key,
    Iv,
}

impl SecretKind {
    pub fn base_name(&self) -> &'static str {
        match self {
            SecretKind::Key => names::AES_KEY,
            SecretKind::Iv => names::AES_IV,
        }
    }

    /// Account name for this kind within `namespace`.
    pub fn scoped(&self, namespace: Option<&str>) -> String {
        scoped_name(self.base_name(), namespace)
    }
}

/// Well-known secret base names
pub mod names {
    pub const AES_KEY: &str = "EncryptedDefaults.AESKey";
    pub const AES_IV: &str = "EncryptedDefaults.AESIV";
}

/// `"{name}-{namespace}"` when a namespace is given, else `name`.
pub fn scoped_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{name}-{ns}"),
        None => name.to_string(),
    }
}

/// Policy-carrying accessor over a [`CredentialStore`].
#[derive(Debug, Default)]
pub struct SecretMaterialStore<C> {
    backend: C,
}

impl<C: CredentialStore> SecretMaterialStore<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Replace (delete, then insert) the secret under `(name, namespace)`,
    /// or delete it when `value` is `None`.
    ///
    /// Returns whether the final operation succeeded. Deleting a secret
    /// that does not exist succeeds.
    pub fn set_secret(
        &self,
        name: &str,
        value: Option<&[u8]>,
        namespace: Option<&str>,
        visibility: VisibilityPolicy,
        share_group: Option<&str>,
    ) -> bool {
        let account = scoped_name(name, namespace);

        let deleted = self.backend.delete(&account, visibility, share_group);
        let Some(value) = value else {
            return match deleted {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key = %account, "secret delete failed: {e:#}");
                    false
                }
            };
        };
        if let Err(e) = deleted {
            tracing::debug!(key = %account, "pre-insert delete failed: {e:#}");
        }

        match self.backend.store(&account, visibility, share_group, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %account, "secret store failed: {e:#}");
                false
            }
        }
    }

    /// The secret under `(name, namespace)`, or `None` if it is missing or
    /// the backend failed.
    pub fn get_secret(
        &self,
        name: &str,
        namespace: Option<&str>,
        visibility: VisibilityPolicy,
        share_group: Option<&str>,
    ) -> Option<Vec<u8>> {
        let account = scoped_name(name, namespace);
        match self.backend.load(&account, visibility, share_group) {
            Ok(secret) => secret,
            Err(e) => {
                tracing::warn!(key = %account, "secret load failed: {e:#}");
                None
            }
        }
    }

    /// Delete the secret filed under the full account name `name`
    /// (already scoped, see [`scoped_name`]) in any share group.
    pub fn remove_secret(&self, name: &str, visibility: VisibilityPolicy) -> bool {
        match self.backend.delete(name, visibility, None) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %name, "secret remove failed: {e:#}");
                false
            }
        }
    }
}
