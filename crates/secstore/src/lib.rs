//! secstore: transparent at-rest encryption for a key-value preference store
//!
//! Values are encoded, encrypted with AES-256-CBC, and written to a plain
//! [`PreferenceStore`](secstore_storage::PreferenceStore). The key and IV
//! live in a [`CredentialStore`](secstore_secrets::CredentialStore), scoped
//! by suite:
//!
//! ```text
//! passphrase ──PBKDF2-HMAC-SHA1(10k, random salt)──▶ AES key ──▶ credential store
//!                                         random IV ──────────▶ credential store
//!
//! set(name, value) ─▶ encode ─▶ encrypt ─▶ plain store[name]
//! get(name)        ◀─ decode ◀─ decrypt ◀─ plain store[name]
//! ```
//!
//! Reads and writes never surface errors: failures read as absent values
//! and failed writes delete the entry. See [`EncryptedStore::last_error`].

pub mod codec;
pub mod error;
pub mod options;

mod accessors;
mod store;

pub use codec::{JsonCodec, ValueCodec};
pub use error::StoreError;
pub use options::StoreOptions;
pub use store::{EncryptedStore, Lifecycle};

pub use secrecy::SecretString;
pub use secstore_core::Value;
