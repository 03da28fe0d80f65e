pub mod config;
pub mod error;
pub mod types;

pub use error::{SecstoreError, SecstoreResult};
pub use types::{Value, VisibilityPolicy};
