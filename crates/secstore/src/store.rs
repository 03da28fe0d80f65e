//! The encrypted store: key/IV lifecycle plus encrypt-on-write,
//! decrypt-on-read over a plain preference store.
//!
//! Lifecycle per store:
//! ```text
//! Uninitialized ──ensure_key_material()──▶ KeyMaterialized ──first get/set──▶ CipherBound
//!       ▲                                                                        │
//!       └──────────── set_passphrase() / set_key() / set_iv() ───────────────────┘
//! ```

use secrecy::{ExposeSecret, SecretString};
use secstore_core::{SecstoreError, Value};
use secstore_crypto::{
    derive_key_with_params, fingerprint, random_iv, random_salt, CipherEngine, InitVector,
    KeyMaterial,
};
use secstore_secrets::{CredentialStore, SecretKind, SecretMaterialStore};
use secstore_storage::PreferenceStore;

use crate::codec::{JsonCodec, ValueCodec};
use crate::error::StoreError;
use crate::options::StoreOptions;

/// Where a store is in its key lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No key or IV held in memory
    Uninitialized,
    /// Key and IV loaded or created, no cipher built yet
    KeyMaterialized,
    /// At least one cipher built from the current key and IV
    CipherBound,
}

/// In-memory key state. Replaced as a whole whenever the key, IV, or
/// passphrase changes, so a cipher never outlives the material it was
/// built from.
#[derive(Default)]
struct KeyState {
    key: Option<KeyMaterial>,
    iv: Option<InitVector>,
    encrypter: Option<CipherEngine>,
    decrypter: Option<CipherEngine>,
}

impl KeyState {
    fn invalidate_ciphers(&mut self) {
        self.encrypter = None;
        self.decrypter = None;
    }
}

/// A preference store whose values are encrypted at rest.
///
/// Reads and writes never fail from the caller's point of view: anything
/// that goes wrong turns into an absent value (on read) or a deleted entry
/// (on write). The cause is kept in [`last_error`](Self::last_error).
///
/// All mutation goes through `&mut self`; share a store between threads
/// behind a lock.
pub struct EncryptedStore<P, C, K = JsonCodec> {
    plain: P,
    secrets: SecretMaterialStore<C>,
    codec: K,
    options: StoreOptions,
    passphrase: Option<SecretString>,
    state: KeyState,
    last_error: Option<StoreError>,
}

impl<P, C> EncryptedStore<P, C, JsonCodec>
where
    P: PreferenceStore,
    C: CredentialStore,
{
    pub fn new(plain: P, credentials: C, options: StoreOptions) -> Self {
        Self::with_codec(plain, credentials, JsonCodec, options)
    }
}

impl<P, C, K> EncryptedStore<P, C, K>
where
    P: PreferenceStore,
    C: CredentialStore,
    K: ValueCodec,
{
    pub fn with_codec(plain: P, credentials: C, codec: K, options: StoreOptions) -> Self {
        tracing::debug!(suite = ?options.suite, visibility = %options.visibility, "opening encrypted store");
        Self {
            plain,
            secrets: SecretMaterialStore::new(credentials),
            codec,
            options,
            passphrase: None,
            state: KeyState::default(),
            last_error: None,
        }
    }

    pub fn suite(&self) -> Option<&str> {
        self.options.suite.as_deref()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn plain_store(&self) -> &P {
        &self.plain
    }

    pub fn secrets(&self) -> &SecretMaterialStore<C> {
        &self.secrets
    }

    pub fn lifecycle(&self) -> Lifecycle {
        let state = &self.state;
        if state.encrypter.is_some() || state.decrypter.is_some() {
            Lifecycle::CipherBound
        } else if state.key.is_some() && state.iv.is_some() {
            Lifecycle::KeyMaterialized
        } else {
            Lifecycle::Uninitialized
        }
    }

    // ── Passphrase and key material ────────────────────────────────────────

    /// Replace the passphrase.
    ///
    /// Deletes the persisted key and IV for this suite and drops all cached
    /// material, so the next access derives a fresh key. Values written
    /// under the old key can no longer be decrypted.
    ///
    /// If the credential store fails to delete the old material the
    /// passphrase and cached state are left unchanged and an error is
    /// returned; the persisted material may be partly deleted, so retry.
    pub fn set_passphrase(&mut self, passphrase: Option<SecretString>) -> Result<(), StoreError> {
        let suite = self.options.suite.as_deref();
        let mut failed = Vec::new();
        for kind in [SecretKind::Key, SecretKind::Iv] {
            let name = kind.scoped(suite);
            if !self.secrets.remove_secret(&name, self.options.visibility) {
                failed.push(name);
                continue;
            }
            // keychain backends file grouped entries under the group
            if self.options.share_group.is_some() && self.persist(kind, None).is_err() {
                failed.push(name);
            }
        }

        if !failed.is_empty() {
            tracing::warn!(suite = ?self.options.suite, "passphrase not replaced; old key material still persisted");
            return Err(StoreError::KeyMaterial(format!(
                "could not delete {}",
                failed.join(", ")
            )));
        }

        self.passphrase = passphrase;
        self.state = KeyState::default();
        tracing::info!(suite = ?self.options.suite, "passphrase replaced; key material reset");
        Ok(())
    }

    pub fn has_passphrase(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Whether a key exists for this suite, in memory or persisted.
    ///
    /// Lets callers that share a suite set the passphrase only once.
    pub fn is_key_created(&self) -> bool {
        self.state.key.is_some() || self.load_secret(SecretKind::Key).is_some()
    }

    /// Fingerprint of the current key, without creating one.
    pub fn key_fingerprint(&self) -> Option<String> {
        match &self.state.key {
            Some(key) => Some(fingerprint(key.as_bytes())),
            None => self.load_secret(SecretKind::Key).map(|k| fingerprint(&k)),
        }
    }

    /// Install a caller-supplied key, or with `None` forget the current one.
    ///
    /// A key of the wrong length is rejected before anything is persisted.
    pub fn set_key(&mut self, key: Option<&[u8]>) -> Result<(), StoreError> {
        let material = key.map(KeyMaterial::from_slice).transpose()?;
        self.persist(SecretKind::Key, key)?;
        self.state.key = material;
        self.state.invalidate_ciphers();
        Ok(())
    }

    /// Install a caller-supplied IV, or with `None` forget the current one.
    pub fn set_iv(&mut self, iv: Option<&[u8]>) -> Result<(), StoreError> {
        let material = iv.map(InitVector::from_slice).transpose()?;
        self.persist(SecretKind::Iv, iv)?;
        self.state.iv = material;
        self.state.invalidate_ciphers();
        Ok(())
    }

    /// Load or create the key and IV for this suite.
    ///
    /// Key: the persisted one if present, otherwise derived from the
    /// passphrase with a fresh random salt and persisted. IV: the persisted
    /// one if present, otherwise random and persisted.
    pub fn ensure_key_material(&mut self) -> Result<(), StoreError> {
        if self.state.key.is_none() {
            let key = self.materialize_key()?;
            self.state.key = Some(key);
        }
        if self.state.iv.is_none() {
            let iv = self.materialize_iv()?;
            self.state.iv = Some(iv);
        }
        Ok(())
    }

    fn materialize_key(&self) -> Result<KeyMaterial, StoreError> {
        if let Some(bytes) = self.load_secret(SecretKind::Key) {
            let key = KeyMaterial::from_slice(&bytes)?;
            tracing::debug!(suite = ?self.options.suite, key = %fingerprint(key.as_bytes()), "loaded persisted key");
            return Ok(key);
        }

        let passphrase = self.passphrase.as_ref().ok_or(StoreError::MissingPassphrase)?;
        let key = derive_key_with_params(
            passphrase.expose_secret().as_bytes(),
            &random_salt(),
            &self.options.kdf,
        )?;
        self.persist(SecretKind::Key, Some(key.as_bytes()))?;
        tracing::info!(suite = ?self.options.suite, key = %fingerprint(key.as_bytes()), "derived new key from passphrase");
        Ok(key)
    }

    fn materialize_iv(&self) -> Result<InitVector, StoreError> {
        if let Some(bytes) = self.load_secret(SecretKind::Iv) {
            return Ok(InitVector::from_slice(&bytes)?);
        }

        let iv = random_iv();
        self.persist(SecretKind::Iv, Some(iv.as_bytes()))?;
        tracing::debug!(suite = ?self.options.suite, "generated new IV");
        Ok(iv)
    }

    fn load_secret(&self, kind: SecretKind) -> Option<Vec<u8>> {
        self.secrets.get_secret(
            kind.base_name(),
            self.options.suite.as_deref(),
            self.options.visibility,
            self.options.share_group.as_deref(),
        )
    }

    fn persist(&self, kind: SecretKind, value: Option<&[u8]>) -> Result<(), StoreError> {
        let stored = self.secrets.set_secret(
            kind.base_name(),
            value,
            self.options.suite.as_deref(),
            self.options.visibility,
            self.options.share_group.as_deref(),
        );
        if !stored {
            return Err(StoreError::KeyMaterial(format!(
                "could not persist {}",
                kind.scoped(self.options.suite.as_deref())
            )));
        }
        Ok(())
    }

    /// Ensure key material and return the cipher for one direction.
    ///
    /// # Panics
    ///
    /// If no key is persisted for the suite and no passphrase was set.
    fn bound_cipher(&mut self, encrypt: bool) -> Result<&CipherEngine, StoreError> {
        match self.ensure_key_material() {
            Err(StoreError::MissingPassphrase) => panic!(
                "passphrase must be set before key material can be derived (suite: {:?})",
                self.options.suite
            ),
            other => other?,
        }

        let state = &mut self.state;
        let (Some(key), Some(iv)) = (&state.key, &state.iv) else {
            return Err(StoreError::KeyMaterial("key material missing after load".into()));
        };
        let slot = if encrypt {
            &mut state.encrypter
        } else {
            &mut state.decrypter
        };
        Ok(slot.get_or_insert_with(|| CipherEngine::from_parts(key.clone(), iv.clone())))
    }

    // ── Values ─────────────────────────────────────────────────────────────

    /// Encrypt and store `value` under `name`; `None` deletes the entry.
    ///
    /// If encoding or encryption fails the entry is deleted instead.
    ///
    /// # Panics
    ///
    /// If a key has to be derived and no passphrase was set.
    pub fn set(&mut self, name: &str, value: Option<Value>) {
        self.last_error = None;

        let ciphertext = match value {
            None => None,
            Some(value) => match self.seal(&value) {
                Ok(ciphertext) => Some(ciphertext),
                Err(e) => {
                    tracing::warn!(key = name, "encrypting value failed, deleting entry: {e}");
                    self.last_error = Some(e);
                    None
                }
            },
        };

        if let Err(e) = self.plain.set_blob(name, ciphertext.as_deref()) {
            tracing::warn!(key = name, "plain store write failed: {e:#}");
            self.last_error = Some(SecstoreError::storage("write", name, &e).into());
        }
    }

    /// Store any value convertible into [`Value`].
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) {
        self.set(name, Some(value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.set(name, None);
    }

    /// Read and decrypt the value under `name`.
    ///
    /// `None` when the entry is missing or cannot be decrypted or decoded.
    ///
    /// # Panics
    ///
    /// If the entry exists, a key has to be derived, and no passphrase was set.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        self.last_error = None;

        let ciphertext = match self.plain.get_blob(name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = name, "plain store read failed: {e:#}");
                self.last_error = Some(SecstoreError::storage("read", name, &e).into());
                return None;
            }
        };

        match self.open(&ciphertext) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key = name, "stored value unreadable: {e}");
                self.last_error = Some(e);
                None
            }
        }
    }

    fn seal(&mut self, value: &Value) -> Result<Vec<u8>, StoreError> {
        let plaintext = self.codec.encode(value)?;
        let ciphertext = self.bound_cipher(true)?.encrypt(&plaintext)?;
        Ok(ciphertext)
    }

    fn open(&mut self, ciphertext: &[u8]) -> Result<Value, StoreError> {
        let plaintext = self.bound_cipher(false)?.decrypt(ciphertext)?;
        self.codec.decode(&plaintext)
    }

    // ── Raw access ─────────────────────────────────────────────────────────

    /// The stored bytes under `name`, bypassing decryption.
    pub fn raw_blob(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.plain
            .get_blob(name)
            .map_err(|e| SecstoreError::storage("read", name, &e).into())
    }

    /// Write bytes under `name` without encrypting them.
    pub fn set_raw_blob(&self, name: &str, value: Option<&[u8]>) -> Result<(), StoreError> {
        self.plain
            .set_blob(name, value)
            .map_err(|e| SecstoreError::storage("write", name, &e).into())
    }

    // ── Diagnostics ────────────────────────────────────────────────────────

    /// Cause of the most recent silent failure in `get`/`set`, cleared at
    /// the start of each call.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<StoreError> {
        self.last_error.take()
    }
}
