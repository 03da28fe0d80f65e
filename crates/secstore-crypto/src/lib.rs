//! secstore-crypto: symmetric primitives behind the encrypted preference store
//!
//! Cipher: AES-256 in CBC mode with PKCS#7 padding, no authentication tag.
//!
//! ```text
//! passphrase ──PBKDF2-HMAC-SHA1 (10k rounds, 8-byte random salt)──▶ 32-byte key
//! random 16-byte IV
//! (key, IV) ──▶ CipherEngine ──▶ encrypt / decrypt
//! ```
//!
//! Ciphertext carries no IV, salt, or version prefix: the key and IV live in
//! the credential store and are bound to the engine at construction.

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod random;

pub use cipher::CipherEngine;
pub use error::{status, CipherError, CipherResult};
pub use kdf::{derive_key, derive_key_with_params, KdfParams};
pub use keys::{fingerprint, InitVector, KeyMaterial};
pub use random::{random_bytes, random_iv, random_salt};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// AES block size, and therefore the IV size, in bytes
pub const BLOCK_SIZE: usize = 16;

/// Size of the transient PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 8;

/// Default PBKDF2 iteration count
pub const KDF_ITERATIONS: u32 = 10_000;
