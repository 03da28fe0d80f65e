use secstore_core::config::SecstoreConfig;
use secstore_core::VisibilityPolicy;
use secstore_crypto::KdfParams;

/// Per-store settings: which suite, and how its key material is filed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Namespace for key material; stores with different suites never
    /// share a key or IV
    pub suite: Option<String>,
    /// Accessibility class for the persisted key and IV
    pub visibility: VisibilityPolicy,
    /// Credential share group
    pub share_group: Option<String>,
    /// Parameters for deriving a key from the passphrase
    pub kdf: KdfParams,
}

impl StoreOptions {
    pub fn with_suite(suite: impl Into<String>) -> Self {
        Self {
            suite: Some(suite.into()),
            ..Self::default()
        }
    }

    pub fn from_config(config: &SecstoreConfig) -> Self {
        Self {
            suite: config.store.suite.clone(),
            visibility: config.keychain.visibility,
            share_group: config.keychain.access_group.clone(),
            kdf: KdfParams {
                iterations: config.crypto.kdf_iterations,
            },
        }
    }
}
