use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::VisibilityPolicy;

/// Top-level configuration (loaded from secstore.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecstoreConfig {
    pub store: StoreConfig,
    pub keychain: KeychainConfig,
    pub crypto: CryptoConfig,
    pub log: LogConfig,
}

impl SecstoreConfig {
    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the plain preference files (one per suite)
    pub data_dir: PathBuf,
    /// Suite name; separates independent stores and their key material
    pub suite: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeychainConfig {
    /// Service name under which key material is filed
    pub service: String,
    /// Accessibility class for persisted key material
    pub visibility: VisibilityPolicy,
    /// Share group; when set it replaces `service` so several apps can
    /// read the same key material
    pub access_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA1 iteration count (default: 10000)
    pub kdf_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.local/share/secstore"),
            suite: None,
        }
    }
}

impl Default for KeychainConfig {
    fn default() -> Self {
        Self {
            service: "secstore".into(),
            visibility: VisibilityPolicy::default(),
            access_group: None,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 10_000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        return PathBuf::from(home).join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[store]
data_dir = "/var/lib/secstore"
suite = "group.example.settings"

[keychain]
service = "example"
visibility = "when-unlocked-this-device-only"
access_group = "TEAMID.shared"

[crypto]
kdf_iterations = 20000

[log]
level = "debug"
format = "json"
"#;
        let config: SecstoreConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.store.data_dir, PathBuf::from("/var/lib/secstore"));
        assert_eq!(config.store.suite.as_deref(), Some("group.example.settings"));
        assert_eq!(config.keychain.service, "example");
        assert_eq!(
            config.keychain.visibility,
            VisibilityPolicy::WhenUnlockedThisDeviceOnly
        );
        assert_eq!(config.keychain.access_group.as_deref(), Some("TEAMID.shared"));
        assert_eq!(config.crypto.kdf_iterations, 20000);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: SecstoreConfig = toml::from_str("").unwrap();

        assert_eq!(config.store.data_dir, PathBuf::from("~/.local/share/secstore"));
        assert!(config.store.suite.is_none());
        assert_eq!(config.keychain.service, "secstore");
        assert_eq!(config.keychain.visibility, VisibilityPolicy::AfterFirstUnlock);
        assert!(config.keychain.access_group.is_none());
        assert_eq!(config.crypto.kdf_iterations, 10_000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[store]
suite = "alpha"
"#;
        let config: SecstoreConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.store.suite.as_deref(), Some("alpha"));
        // Defaults
        assert_eq!(config.store.data_dir, PathBuf::from("~/.local/share/secstore"));
        assert_eq!(config.crypto.kdf_iterations, 10_000);
    }

    #[test]
    fn test_unknown_visibility_rejected() {
        let toml_str = r#"
[keychain]
visibility = "sometimes"
"#;
        assert!(toml::from_str::<SecstoreConfig>(toml_str).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SecstoreConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.keychain.service, "secstore");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secstore.toml");
        std::fs::write(&path, "[crypto]\nkdf_iterations = 12\n").unwrap();

        let config = SecstoreConfig::load(&path).unwrap();
        assert_eq!(config.crypto.kdf_iterations, 12);
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/.local/share/secstore"));
        assert!(!expanded.to_str().unwrap().starts_with("~/"));
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SecstoreConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SecstoreConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.store.data_dir, parsed.store.data_dir);
        assert_eq!(config.keychain.visibility, parsed.keychain.visibility);
    }
}
