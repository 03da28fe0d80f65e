use thiserror::Error;

pub type CipherResult<T> = Result<T, CipherError>;

/// Status codes reported with [`CipherError::CryptoFailed`] and
/// [`CipherError::KeyDerivationFailed`].
pub mod status {
    /// Illegal parameter value (e.g. zero KDF rounds)
    pub const PARAM_ERROR: i32 = -4300;
    /// Input size was not aligned to the block size
    pub const ALIGNMENT_ERROR: i32 = -4303;
    /// Input data did not decode or decrypt properly (bad padding)
    pub const DECODE_ERROR: i32 = -4304;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("bad key length: {got} bytes (expected 32)")]
    BadKeyLength { got: usize },

    #[error("bad IV length: {got} bytes (expected 16)")]
    BadIvLength { got: usize },

    #[error("cipher operation failed with status {status}")]
    CryptoFailed { status: i32 },

    #[error("key derivation failed with status {status}")]
    KeyDerivationFailed { status: i32 },
}
