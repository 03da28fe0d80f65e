//! Credential store backends: the raw secret blob storage the material
//! store sits on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use secstore_core::VisibilityPolicy;
use zeroize::Zeroizing;

/// Secret blob storage keyed by account name.
///
/// A secret is identified by `(account, visibility)`. When `group` is
/// `Some`, only a secret filed under that share group matches; `None`
/// matches a secret in any group.
pub trait CredentialStore {
    /// Read a secret. A missing secret is `Ok(None)`.
    fn load(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<Option<Vec<u8>>>;

    /// Insert a secret. Callers delete first; backends may reject duplicates.
    fn store(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
        secret: &[u8],
    ) -> Result<()>;

    /// Delete a secret. Deleting a missing secret succeeds.
    fn delete(&self, account: &str, visibility: VisibilityPolicy, group: Option<&str>)
        -> Result<()>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn load(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        (**self).load(account, visibility, group)
    }

    fn store(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
        secret: &[u8],
    ) -> Result<()> {
        (**self).store(account, visibility, group, secret)
    }

    fn delete(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<()> {
        (**self).delete(account, visibility, group)
    }
}

type EntryKey = (String, VisibilityPolicy, Option<String>);

/// Thread-safe in-process credential store.
///
/// Mirrors keychain matching rules; used by tests and as a throwaway
/// backend when no platform keychain is wanted.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<EntryKey, Zeroizing<Vec<u8>>>>,
    unavailable: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, as a locked or missing keychain would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any secret is filed under `account`, regardless of policy.
    pub fn contains_account(&self, account: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .any(|(a, _, _)| a == account)
    }

    /// The entry map, or an error when the store is marked unavailable.
    fn entries(&self) -> Result<MutexGuard<'_, HashMap<EntryKey, Zeroizing<Vec<u8>>>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("credential store unavailable");
        }
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))
    }
}

fn matches(key: &EntryKey, account: &str, visibility: VisibilityPolicy, group: Option<&str>) -> bool {
    key.0 == account && key.1 == visibility && group.map_or(true, |g| key.2.as_deref() == Some(g))
}

impl CredentialStore for MemoryCredentialStore {
    fn load(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        let map = self.entries()?;
        // ungrouped entries first, then groups in name order
        Ok(map
            .iter()
            .filter(|(k, _)| matches(k, account, visibility, group))
            .min_by(|(a, _), (b, _)| a.2.cmp(&b.2))
            .map(|(_, v)| v.to_vec()))
    }

    fn store(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
        secret: &[u8],
    ) -> Result<()> {
        let key = (account.to_string(), visibility, group.map(str::to_string));
        let mut map = self.entries()?;
        if map.contains_key(&key) {
            anyhow::bail!("duplicate item: {account}");
        }
        map.insert(key, Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    fn delete(
        &self,
        account: &str,
        visibility: VisibilityPolicy,
        group: Option<&str>,
    ) -> Result<()> {
        let mut map = self.entries()?;
        map.retain(|k, _| !matches(k, account, visibility, group));
        Ok(())
    }
}
