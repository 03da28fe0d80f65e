use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;

use crate::PreferenceStore;

/// Thread-safe in-process preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("preference store lock poisoned"))
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_blob(&self, key: &str, value: Option<&[u8]>) -> Result<()> {
        let mut map = self.lock()?;
        match value {
            Some(bytes) => {
                map.insert(key.to_string(), bytes.to_vec());
            }
            None => {
                map.remove(key);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let store = MemoryPreferenceStore::new();
        assert!(store.get_blob("k").unwrap().is_none());

        store.set_blob("k", Some(b"v")).unwrap();
        assert_eq!(store.get_blob("k").unwrap().as_deref(), Some(&b"v"[..]));

        store.set_blob("k", None).unwrap();
        assert!(store.get_blob("k").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn keys_sorted() {
        let store = MemoryPreferenceStore::new();
        store.set_blob("b", Some(b"2")).unwrap();
        store.set_blob("a", Some(b"1")).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn remove_missing_is_ok() {
        let store = MemoryPreferenceStore::new();
        assert!(store.remove("absent").is_ok());
    }

    #[test]
    fn len_survives_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryPreferenceStore::new());
        store.set_blob("k", Some(b"v")).unwrap();

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(store.len(), 1);
        assert!(store.get_blob("k").is_err());
    }
}
