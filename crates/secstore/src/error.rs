use secstore_core::SecstoreError;
use secstore_crypto::CipherError;
use thiserror::Error;

/// Why a get or set fell back to "absent".
///
/// Never returned from `get`/`set` themselves; read it through
/// [`EncryptedStore::last_error`](crate::EncryptedStore::last_error).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Storage(#[from] SecstoreError),

    #[error("key material error: {0}")]
    KeyMaterial(String),

    #[error("no passphrase set and no key material persisted")]
    MissingPassphrase,
}
