//! AES-256-CBC with PKCS#7 padding
//!
//! Ciphertext format is the bare CBC output: no IV prefix, no tag. The
//! padded output is always `plaintext.len() + 1 ..= plaintext.len() + 16`
//! bytes and a multiple of the block size.
//!
//! There is no integrity protection. Decrypting tampered or foreign data
//! either fails with a padding error or returns garbage.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{status, CipherError, CipherResult};
use crate::keys::{InitVector, KeyMaterial};
use crate::BLOCK_SIZE;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// A key/IV pair bound for encryption and decryption.
///
/// Both are copied in at construction; the engine holds no other state.
#[derive(Debug, Clone)]
pub struct CipherEngine {
    key: KeyMaterial,
    iv: InitVector,
}

impl CipherEngine {
    /// Bind a key and IV, validating their lengths (32 and 16 bytes).
    pub fn new(key: &[u8], iv: &[u8]) -> CipherResult<Self> {
        let key = KeyMaterial::from_slice(key)?;
        let iv = InitVector::from_slice(iv)?;
        Ok(Self { key, iv })
    }

    pub fn from_parts(key: KeyMaterial, iv: InitVector) -> Self {
        Self { key, iv }
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    pub fn iv(&self) -> &InitVector {
        &self.iv
    }

    /// Encrypt `plaintext`, returning the padded ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let cipher = Aes256CbcEnc::new(self.key.as_bytes().into(), self.iv.as_bytes().into());
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Decrypt `ciphertext` and strip the padding.
    ///
    /// Fails with [`status::ALIGNMENT_ERROR`] when the input is not a whole
    /// number of blocks and [`status::DECODE_ERROR`] when the padding is bad.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::CryptoFailed {
                status: status::ALIGNMENT_ERROR,
            });
        }

        let cipher = Aes256CbcDec::new(self.key.as_bytes().into(), self.iv.as_bytes().into());
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::CryptoFailed {
                status: status::DECODE_ERROR,
            })
    }
}
