//! secstore-storage: the plain preference store under the encryption layer
//!
//! Holds opaque blobs by string key. Nothing here knows about encryption;
//! whatever the caller writes is what lands on disk.

pub mod file;
pub mod memory;

pub use file::FilePreferenceStore;
pub use memory::MemoryPreferenceStore;

use anyhow::Result;
use std::sync::Arc;

/// Persistent key → blob storage.
pub trait PreferenceStore {
    /// Read the blob under `key`. A missing key is `Ok(None)`.
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write the blob under `key`; `None` deletes it.
    fn set_blob(&self, key: &str, value: Option<&[u8]>) -> Result<()>;

    /// All keys currently present, sorted.
    fn keys(&self) -> Result<Vec<String>>;

    fn remove(&self, key: &str) -> Result<()> {
        self.set_blob(key, None)
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Arc<T> {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get_blob(key)
    }

    fn set_blob(&self, key: &str, value: Option<&[u8]>) -> Result<()> {
        (**self).set_blob(key, value)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}
