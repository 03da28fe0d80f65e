//! JSON-file preference store: one document per suite.
//!
//! File format:
//! ```json
//! { "version": 1, "entries": { "<key>": "<base64 blob>" } }
//! ```
//!
//! The document is rewritten (temp file + rename) on every mutation.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::PreferenceStore;

const FORMAT_VERSION: u32 = 1;

/// File stem used when no suite is given
pub const STANDARD_SUITE: &str = "standard";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Preference store persisted as a JSON file.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FilePreferenceStore {
    /// Open (or lazily create) the store for `suite` under `data_dir`.
    pub fn open(data_dir: &Path, suite: Option<&str>) -> Result<Self> {
        let data_dir = secstore_core::config::expand_tilde(data_dir);
        let path = data_dir.join(format!("{}.json", suite.unwrap_or(STANDARD_SUITE)));
        Self::open_path(path)
    }

    /// Open the store backed by exactly `path`.
    pub fn open_path(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            load_document(&path)?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened preference file");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("preference file lock poisoned: {}", self.path.display()))
    }

    fn save(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating dir: {}", parent.display()))?;
        }
        let doc = Document {
            version: FORMAT_VERSION,
            entries: entries
                .iter()
                .map(|(k, v)| (k.clone(), STANDARD.encode(v)))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&doc).context("serializing preference file")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("writing preference file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing preference file: {}", self.path.display()))
    }
}

fn load_document(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading preference file: {}", path.display()))?;
    let doc: Document = serde_json::from_str(&content)
        .with_context(|| format!("parsing preference file: {}", path.display()))?;
    if doc.version != FORMAT_VERSION {
        anyhow::bail!(
            "unsupported preference file version {} in {}",
            doc.version,
            path.display()
        );
    }
    doc.entries
        .into_iter()
        .map(|(k, v)| -> Result<(String, Vec<u8>)> {
            let blob = STANDARD
                .decode(v.as_bytes())
                .with_context(|| format!("decoding entry '{k}' in {}", path.display()))?;
            Ok((k, blob))
        })
        .collect()
}

impl PreferenceStore for FilePreferenceStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Updates memory, then the file. A failed save rolls the entry back.
    fn set_blob(&self, key: &str, value: Option<&[u8]>) -> Result<()> {
        let mut map = self.lock()?;
        let previous = match value {
            Some(bytes) => map.insert(key.to_string(), bytes.to_vec()),
            None => map.remove(key),
        };
        if previous.as_deref() == value {
            return Ok(());
        }

        if let Err(e) = self.save(&map) {
            match previous {
                Some(old) => map.insert(key.to_string(), old),
                None => map.remove(key),
            };
            return Err(e);
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
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FilePreferenceStore::open(dir.path(), Some("alpha")).unwrap();
        store.set_blob("k", Some(&[0, 1, 2, 255])).unwrap();
        drop(store);

        let reopened = FilePreferenceStore::open(dir.path(), Some("alpha")).unwrap();
        assert_eq!(reopened.get_blob("k").unwrap(), Some(vec![0, 1, 2, 255]));
        assert!(dir.path().join("alpha.json").exists());
    }

    #[test]
    fn test_suites_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();

        let a = FilePreferenceStore::open(dir.path(), Some("a")).unwrap();
        let standard = FilePreferenceStore::open(dir.path(), None).unwrap();
        a.set_blob("k", Some(b"a")).unwrap();

        assert!(standard.get_blob("k").unwrap().is_none());
        assert_eq!(standard.path(), dir.path().join("standard.json"));
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(dir.path(), None).unwrap();
        store.set_blob("k", Some(b"v")).unwrap();
        store.set_blob("k", None).unwrap();

        let reopened = FilePreferenceStore::open(dir.path(), None).unwrap();
        assert!(reopened.get_blob("k").unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_empty_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(&dir.path().join("nested"), None).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(!store.path().exists());

        store.set_blob("k", Some(b"v")).unwrap();
        assert!(store.path().exists(), "parent dirs are created on first write");
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standard.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FilePreferenceStore::open_path(path).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standard.json");
        std::fs::write(&path, r#"{"version": 9, "entries": {}}"#).unwrap();
        let err = FilePreferenceStore::open_path(path).unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }

    #[test]
    fn test_blobs_are_base64_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(dir.path(), None).unwrap();
        store.set_blob("k", Some(b"hello")).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("aGVsbG8="));
    }
}
