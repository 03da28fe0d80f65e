//! Key derivation: PBKDF2-HMAC-SHA1 passphrase → 256-bit key

use hmac::Hmac;
use sha1::Sha1;
use zeroize::Zeroize;

use crate::error::{status, CipherError, CipherResult};
use crate::keys::KeyMaterial;
use crate::{KDF_ITERATIONS, KEY_SIZE};

/// PBKDF2 parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA1 rounds (default: 10000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: KDF_ITERATIONS,
        }
    }
}

/// Derive a 256-bit key from `password` and `salt` with the default
/// 10,000 rounds.
pub fn derive_key(password: &[u8], salt: &[u8]) -> CipherResult<KeyMaterial> {
    derive_key_with_params(password, salt, &KdfParams::default())
}

/// Derive a 256-bit key from `password` and `salt`.
///
/// Deterministic for a fixed `(password, salt, params)`.
pub fn derive_key_with_params(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> CipherResult<KeyMaterial> {
    if params.iterations == 0 {
        return Err(CipherError::KeyDerivationFailed {
            status: status::PARAM_ERROR,
        });
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, params.iterations, &mut key).map_err(|_| {
        CipherError::KeyDerivationFailed {
            status: status::PARAM_ERROR,
        }
    })?;

    let material = KeyMaterial::from_bytes(key);
    key.zeroize();
    Ok(material)
}
