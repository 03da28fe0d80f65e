//! Value ↔ bytes encoding applied before encryption and after decryption.

use secstore_core::Value;

use crate::error::StoreError;

/// Byte encoding of application values.
pub trait ValueCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, StoreError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, StoreError>;
}

/// JSON encoding, adjacently tagged: `{"type":"integer","value":42}`.
///
/// Non-finite floats are written as `"NaN"`, `"inf"` or `"-inf"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }
}
