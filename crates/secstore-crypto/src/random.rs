//! Secure random IVs and salts
//!
//! Draws from the thread-local CSPRNG seeded by the OS. A failing OS source
//! panics inside `rand`; callers never see a recoverable error.

use rand::RngCore;

use crate::keys::InitVector;
use crate::{BLOCK_SIZE, SALT_SIZE};

/// `length` cryptographically secure random bytes.
pub fn random_bytes(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    fill(&mut bytes);
    bytes
}

/// A fresh random 16-byte IV.
pub fn random_iv() -> InitVector {
    let mut bytes = [0u8; BLOCK_SIZE];
    fill(&mut bytes);
    InitVector::from_bytes(bytes)
}

/// A fresh random 8-byte PBKDF2 salt.
pub fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    fill(&mut salt);
    salt
}

fn fill(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}
