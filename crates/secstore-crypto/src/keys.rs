//! Fixed-size key material: the 256-bit key and the 128-bit IV

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CipherError, CipherResult};
use crate::{BLOCK_SIZE, KEY_SIZE};

/// A 256-bit AES key. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy key bytes out of a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> CipherResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CipherError::BadKeyLength { got: bytes.len() })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 128-bit CBC initialization vector. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct InitVector {
    bytes: [u8; BLOCK_SIZE],
}

impl InitVector {
    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy IV bytes out of a slice, rejecting anything that is not 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> CipherResult<Self> {
        let bytes: [u8; BLOCK_SIZE] = bytes
            .try_into()
            .map_err(|_| CipherError::BadIvLength { got: bytes.len() })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }
}

impl Drop for InitVector {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for InitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitVector")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Short SHA-256 fingerprint (8 hex chars) for identifying key material in
/// logs without revealing it.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}
