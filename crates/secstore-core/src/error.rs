use thiserror::Error;

pub type SecstoreResult<T> = Result<T, SecstoreError>;

/// Failure of something underneath the encryption layer.
#[derive(Debug, Error)]
pub enum SecstoreError {
    /// The plain preference store could not read or write `key`
    #[error("preference store {op} failed for '{key}': {reason}")]
    Storage {
        op: &'static str,
        key: String,
        reason: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl SecstoreError {
    /// Wrap a backend error, keeping its full context chain as text.
    pub fn storage(op: &'static str, key: &str, err: &anyhow::Error) -> Self {
        SecstoreError::Storage {
            op,
            key: key.to_string(),
            reason: format!("{err:#}"),
        }
    }
}
